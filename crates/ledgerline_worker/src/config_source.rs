//! Where the schema document comes from.
//!
//! The executor asks its source for a fresh catalog on every invocation;
//! nothing is cached between runs.

use ledgerline_protocol::{ObjectStore, TransformError, TransformResult};
use ledgerline_schema::SchemaCatalog;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub trait ConfigSource: Send + Sync {
    fn load(&self) -> TransformResult<SchemaCatalog>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// A document on the local filesystem. Side files resolve next to it.
#[derive(Debug, Clone)]
pub struct LocalConfigSource {
    path: PathBuf,
}

impl LocalConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for LocalConfigSource {
    fn load(&self) -> TransformResult<SchemaCatalog> {
        debug!(path = %self.path.display(), "Loading local schema document");
        SchemaCatalog::from_path(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A document held in object storage. Side files resolve against
/// `base_dir` when one is given.
pub struct ObjectStoreConfigSource {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    key: String,
    base_dir: Option<PathBuf>,
}

impl ObjectStoreConfigSource {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            key: key.into(),
            base_dir: None,
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }
}

impl ConfigSource for ObjectStoreConfigSource {
    fn load(&self) -> TransformResult<SchemaCatalog> {
        debug!(bucket = %self.bucket, key = %self.key, "Downloading schema document");
        let body = self.store.download(&self.bucket, &self.key).map_err(|e| {
            TransformError::missing_config(format!(
                "Cannot retrieve configuration s3://{}/{}: {}",
                self.bucket, self.key, e
            ))
        })?;
        let text = String::from_utf8(body).map_err(|_| {
            TransformError::invalid_config(format!(
                "Configuration s3://{}/{} is not UTF-8",
                self.bucket, self.key
            ))
        })?;
        SchemaCatalog::from_yaml_str(&text, self.base_dir.as_deref())
    }

    fn describe(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// A document already in memory.
#[derive(Debug, Clone)]
pub struct InlineConfigSource {
    text: String,
}

impl InlineConfigSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ConfigSource for InlineConfigSource {
    fn load(&self) -> TransformResult<SchemaCatalog> {
        SchemaCatalog::from_yaml_str(&self.text, None)
    }

    fn describe(&self) -> String {
        "inline document".to_string()
    }
}
