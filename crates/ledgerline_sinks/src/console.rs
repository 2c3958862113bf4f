use ledgerline_protocol::{ProducerReceipt, Record};

use crate::{SinkError, SinkResult};

/// Prints each record as one JSON line on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProducer;

impl ConsoleProducer {
    pub fn publish(&self, records: &[Record]) -> SinkResult<ProducerReceipt> {
        for record in records {
            let line = serde_json::to_string(record)
                .map_err(|e| SinkError::message(format!("Failed to serialize record: {}", e)))?;
            println!("{}", line);
        }
        Ok(ProducerReceipt {
            producer: "Console".to_string(),
            destination: "stdout".to_string(),
            records: records.len(),
        })
    }
}
