use ledgerline_protocol::{Credentials, SecretStore, ServiceError, ServiceResult};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Credentials read from a JSON object of `name -> {username, password}`.
///
/// The file is re-read on every lookup so rotated secrets take effect
/// without a restart.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: Option<PathBuf>,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A store that knows no secrets.
    pub fn empty() -> Self {
        Self { path: None }
    }

    fn load(&self) -> ServiceResult<HashMap<String, Credentials>> {
        let Some(path) = &self.path else {
            return Ok(HashMap::new());
        };
        let text = fs::read_to_string(path).map_err(|e| {
            ServiceError::failed(format!("cannot read secrets file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            ServiceError::failed(format!("secrets file {} is malformed: {}", path.display(), e))
        })
    }
}

impl SecretStore for FileSecretStore {
    fn get_secret(&self, name: &str) -> ServiceResult<Credentials> {
        self.load()?
            .remove(name)
            .ok_or_else(|| ServiceError::NotFound(format!("secret {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_named_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        fs::write(&path, r#"{"ops-db": {"username": "svc", "password": "pw"}}"#).unwrap();
        let store = FileSecretStore::new(&path);
        let creds = store.get_secret("ops-db").unwrap();
        assert_eq!(creds.username, "svc");
        assert!(matches!(store.get_secret("other"), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn empty_store_has_nothing() {
        assert!(FileSecretStore::empty().get_secret("ops-db").is_err());
    }
}
