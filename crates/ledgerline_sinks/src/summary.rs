use ledgerline_protocol::{ProducerReceipt, Record};
use tracing::info;

use crate::SinkResult;

/// Logs the record count and a few sample records.
#[derive(Debug, Clone, Copy)]
pub struct SummaryProducer {
    sample_size: usize,
}

impl SummaryProducer {
    pub fn new(sample_size: usize) -> Self {
        Self { sample_size }
    }

    pub fn publish(&self, records: &[Record]) -> SinkResult<ProducerReceipt> {
        info!(records = records.len(), "Result summary");
        for (index, record) in records.iter().take(self.sample_size).enumerate() {
            let sample = serde_json::Value::Object(record.clone());
            info!(index, sample = %sample, "Sample record");
        }
        Ok(ProducerReceipt {
            producer: "Summary".to_string(),
            destination: "log".to_string(),
            records: records.len(),
        })
    }
}
