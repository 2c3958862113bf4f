//! Fixed-width fixtures and a bundle of fakes.

use ledgerline_protocol::Collaborators;
use std::sync::Arc;

use crate::broker::RecordingBroker;
use crate::services::{FixedHashFunction, ScriptedRelationalStore, StaticSecretStore};
use crate::storage::MemoryObjectStore;

/// One line with each value left-aligned, space-padded (or cut) to its width.
pub fn fixed_width_line(columns: &[(&str, usize)]) -> String {
    columns
        .iter()
        .map(|(value, width)| {
            let cut: String = value.chars().take(*width).collect();
            format!("{:<width$}", cut, width = *width)
        })
        .collect()
}

/// Join lines with `\n`, with a trailing newline.
pub fn fixed_width_file<S: AsRef<str>>(lines: &[S]) -> String {
    let mut file = String::new();
    for line in lines {
        file.push_str(line.as_ref());
        file.push('\n');
    }
    file
}

/// Every fake, kept reachable for assertions after wiring.
pub struct FakeServices {
    pub store: Arc<MemoryObjectStore>,
    pub secrets: Arc<StaticSecretStore>,
    pub hasher: Arc<FixedHashFunction>,
    pub relational: Arc<ScriptedRelationalStore>,
    pub broker: RecordingBroker,
}

impl FakeServices {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryObjectStore::new()),
            secrets: Arc::new(StaticSecretStore::new()),
            hasher: Arc::new(FixedHashFunction::default()),
            relational: Arc::new(ScriptedRelationalStore::new()),
            broker: RecordingBroker::new(),
        }
    }

    pub fn with_secrets(mut self, secrets: StaticSecretStore) -> Self {
        self.secrets = Arc::new(secrets);
        self
    }

    pub fn with_hasher(mut self, hasher: FixedHashFunction) -> Self {
        self.hasher = Arc::new(hasher);
        self
    }

    pub fn with_relational(mut self, relational: ScriptedRelationalStore) -> Self {
        self.relational = Arc::new(relational);
        self
    }

    pub fn with_broker(mut self, broker: RecordingBroker) -> Self {
        self.broker = broker;
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            object_store: self.store.clone(),
            secrets: self.secrets.clone(),
            hasher: self.hasher.clone(),
            relational: self.relational.clone(),
            broker: Arc::new(self.broker.clone()),
        }
    }
}

impl Default for FakeServices {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_pads_and_cuts() {
        assert_eq!(fixed_width_line(&[("H", 1), ("AB", 4), ("TOOLONG", 3)]), "HAB  TOO");
    }

    #[test]
    fn file_ends_with_newline() {
        assert_eq!(fixed_width_file(&["a", "b"]), "a\nb\n");
    }
}
