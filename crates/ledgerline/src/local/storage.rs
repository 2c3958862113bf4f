use chrono::{DateTime, Utc};
use ledgerline_protocol::{ObjectStore, ServiceError, ServiceResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Object storage on disk: `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object path. Keys may not climb out of their bucket.
    fn object_path(&self, bucket: &str, key: &str) -> ServiceResult<PathBuf> {
        let mut path = self.root.clone();
        for part in [bucket, key] {
            let relative = Path::new(part);
            if !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
            {
                return Err(ServiceError::failed(format!(
                    "object path s3://{}/{} must be relative and may not contain '..'",
                    bucket, key
                )));
            }
            path.push(relative);
        }
        Ok(path)
    }
}

impl ObjectStore for LocalObjectStore {
    fn download(&self, bucket: &str, key: &str) -> ServiceResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ServiceError::NotFound(format!("s3://{}/{}", bucket, key)),
            _ => ServiceError::Io(e),
        })
    }

    fn upload(&self, bucket: &str, key: &str, body: &[u8]) -> ServiceResult<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, body)?;
        debug!(path = %path.display(), bytes = body.len(), "Wrote object");
        Ok(())
    }

    fn exists(&self, bucket: &str, key: &str, date_check: bool) -> ServiceResult<bool> {
        let path = self.object_path(bucket, key)?;
        let metadata = match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(false),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(ServiceError::Io(e)),
        };
        if !date_check {
            return Ok(true);
        }
        let modified: DateTime<Utc> = metadata.modified()?.into();
        Ok(modified.date_naive() == Utc::now().date_naive())
    }
}
