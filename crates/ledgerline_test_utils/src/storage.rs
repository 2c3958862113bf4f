//! In-memory object storage.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ledgerline_protocol::{ObjectStore, ServiceError, ServiceResult};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::lock;

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    modified: DateTime<Utc>,
    /// Invisible to `exists`/`download` until this instant.
    visible_from: Instant,
}

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    uploads: Mutex<Vec<(String, String)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.insert(bucket, key, body.into(), Utc::now(), Instant::now());
    }

    /// Store an object last modified `days_ago` days before now.
    pub fn put_aged(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>, days_ago: i64) {
        let modified = Utc::now() - ChronoDuration::days(days_ago);
        self.insert(bucket, key, body.into(), modified, Instant::now());
    }

    /// Store an object that only becomes visible after `delay`.
    pub fn put_after(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>, delay: Duration) {
        self.insert(bucket, key, body.into(), Utc::now(), Instant::now() + delay);
    }

    fn insert(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        modified: DateTime<Utc>,
        visible_from: Instant,
    ) {
        lock(&self.objects).insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                modified,
                visible_from,
            },
        );
    }

    /// Current contents of an object, if visible.
    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.visible(bucket, key).map(|o| o.body)
    }

    /// `(bucket, key)` of every upload, in order.
    pub fn uploads(&self) -> Vec<(String, String)> {
        lock(&self.uploads).clone()
    }

    fn visible(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .filter(|o| o.visible_from <= Instant::now())
            .cloned()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn download(&self, bucket: &str, key: &str) -> ServiceResult<Vec<u8>> {
        self.get(bucket, key)
            .ok_or_else(|| ServiceError::NotFound(format!("s3://{}/{}", bucket, key)))
    }

    fn upload(&self, bucket: &str, key: &str, body: &[u8]) -> ServiceResult<()> {
        self.put(bucket, key, body.to_vec());
        lock(&self.uploads).push((bucket.to_string(), key.to_string()));
        Ok(())
    }

    fn exists(&self, bucket: &str, key: &str, date_check: bool) -> ServiceResult<bool> {
        Ok(match self.visible(bucket, key) {
            Some(object) if date_check => object.modified.date_naive() == Utc::now().date_naive(),
            Some(_) => true,
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dated_existence_requires_today() {
        let store = MemoryObjectStore::new();
        store.put("b", "fresh", "x");
        store.put_aged("b", "stale", "x", 2);
        assert!(store.exists("b", "fresh", true).unwrap());
        assert!(!store.exists("b", "stale", true).unwrap());
        assert!(store.exists("b", "stale", false).unwrap());
    }

    #[test]
    fn delayed_objects_are_hidden_until_due() {
        let store = MemoryObjectStore::new();
        store.put_after("b", "late", "x", Duration::from_secs(60));
        assert!(!store.exists("b", "late", false).unwrap());
        assert!(matches!(
            store.download("b", "late"),
            Err(ServiceError::NotFound(_))
        ));
    }
}
