use ledgerline_protocol::{Broker, BrokerConfig, BrokerSession, Record, ServiceError, ServiceResult};
use serde_json::json;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// Writes each broker session to its own JSON-lines file under `root`.
///
/// Every line is `{"topic": ..., "record": {...}}`. Lines reach disk on
/// `flush`, mirroring a batched producer.
#[derive(Debug, Clone)]
pub struct JsonlBroker {
    root: PathBuf,
}

impl JsonlBroker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Broker for JsonlBroker {
    fn connect(&self, config: &BrokerConfig) -> ServiceResult<Box<dyn BrokerSession>> {
        fs::create_dir_all(&self.root)?;
        let path = self
            .root
            .join(format!("{}-{}.jsonl", config.client_id, Uuid::new_v4()));
        let file = File::create(&path)?;
        debug!(path = %path.display(), client_id = %config.client_id, "Opened broker session");
        Ok(Box::new(JsonlSession {
            path,
            writer: BufWriter::new(file),
            pending: Vec::new(),
        }))
    }
}

struct JsonlSession {
    path: PathBuf,
    writer: BufWriter<File>,
    pending: Vec<String>,
}

impl BrokerSession for JsonlSession {
    fn publish(&mut self, topic: &str, record: &Record) -> ServiceResult<()> {
        let line = serde_json::to_string(&json!({ "topic": topic, "record": record }))
            .map_err(|e| ServiceError::failed(format!("cannot encode record: {}", e)))?;
        self.pending.push(line);
        Ok(())
    }

    fn flush(&mut self) -> ServiceResult<()> {
        for line in self.pending.drain(..) {
            self.writer.write_all(line.as_bytes())?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> ServiceResult<()> {
        self.flush()?;
        debug!(path = %self.path.display(), "Closed broker session");
        Ok(())
    }
}
