use ledgerline_protocol::{ObjectStore, ProducerReceipt, Record};
use ledgerline_schema::BlobFormat;
use std::sync::Arc;
use tracing::info;

use crate::{SinkError, SinkResult};

/// Uploads the whole record set as one blob.
pub struct ObjectStoreProducer {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    key: String,
    format: BlobFormat,
}

impl ObjectStoreProducer {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        key: impl Into<String>,
        format: BlobFormat,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            key: key.into(),
            format,
        }
    }

    pub fn publish(&self, records: &[Record]) -> SinkResult<ProducerReceipt> {
        let body = encode(records, self.format)?;
        self.store
            .upload(&self.bucket, &self.key, &body)
            .map_err(|e| SinkError::service("upload", e))?;
        let destination = format!("s3://{}/{}", self.bucket, self.key);
        info!(
            destination = %destination,
            format = self.format.as_str(),
            bytes = body.len(),
            "Uploaded result blob"
        );
        Ok(ProducerReceipt {
            producer: "ObjectStore".to_string(),
            destination,
            records: records.len(),
        })
    }
}

fn encode(records: &[Record], format: BlobFormat) -> SinkResult<Vec<u8>> {
    let failed = |e: serde_json::Error| SinkError::message(format!("Failed to encode records: {}", e));
    match format {
        BlobFormat::Json => serde_json::to_vec(records).map_err(failed),
        BlobFormat::Jsonl => {
            let mut body = Vec::new();
            for record in records {
                serde_json::to_writer(&mut body, record).map_err(failed)?;
                body.push(b'\n');
            }
            Ok(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Vec<Record> {
        vec![json!({"id": 1}), json!({"id": 2})]
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect()
    }

    #[test]
    fn json_is_one_array() {
        let body = encode(&records(), BlobFormat::Json).unwrap();
        assert_eq!(String::from_utf8(body).unwrap(), r#"[{"id":1},{"id":2}]"#);
    }

    #[test]
    fn jsonl_is_one_line_per_record() {
        let body = encode(&records(), BlobFormat::Jsonl).unwrap();
        assert_eq!(String::from_utf8(body).unwrap(), "{\"id\":1}\n{\"id\":2}\n");
    }
}
