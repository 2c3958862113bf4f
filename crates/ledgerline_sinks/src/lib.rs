//! Result producers.
//!
//! Each producer receives the final record list and delivers it to one
//! destination. Producers handle:
//! - Destination naming (object keys, topics)
//! - Serialization
//! - Batching and, for the broker, concurrent sharded publishing
//!
//! Producers never share mutable state; the registry runs them in declared
//! order and stops at the first failure.

use ledgerline_protocol::defaults::FILE_NAME_TOKEN;
use ledgerline_protocol::{Collaborators, ProducerReceipt, Record, ServiceError, TransformError};
use ledgerline_schema::ProducerSpec;
use thiserror::Error;
use tracing::{debug, info};

mod broker;
mod console;
mod object_store;
mod summary;

pub use broker::{shard_ranges, BrokerProducer};
pub use console::ConsoleProducer;
pub use object_store::ObjectStoreProducer;
pub use summary::SummaryProducer;

/// Errors returned by producers.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("{message}")]
    Message { message: String },
    #[error("{message}")]
    Source {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type SinkResult<T> = std::result::Result<T, SinkError>;

impl SinkError {
    pub(crate) fn message(message: impl Into<String>) -> Self {
        SinkError::Message {
            message: message.into(),
        }
    }

    pub(crate) fn service(context: &str, err: ServiceError) -> Self {
        SinkError::Source {
            message: format!("{}: {}", context, err),
            source: anyhow::Error::new(err),
        }
    }
}

impl From<anyhow::Error> for SinkError {
    fn from(err: anyhow::Error) -> Self {
        SinkError::Source {
            message: err.to_string(),
            source: err,
        }
    }
}

/// A failure attributed to the producer that raised it.
#[derive(Debug, Error)]
#[error("producer '{producer}' failed: {error}")]
pub struct ProducerFailure {
    pub producer: String,
    #[source]
    pub error: SinkError,
}

impl From<ProducerFailure> for TransformError {
    fn from(failure: ProducerFailure) -> Self {
        TransformError::Producer {
            producer: failure.producer,
            message: failure.error.to_string(),
        }
    }
}

/// Invocation values available to destination templates.
#[derive(Debug, Clone)]
pub struct ProducerContext {
    /// Basename of the source file.
    pub file_name: String,
    pub request_id: String,
}

impl ProducerContext {
    pub fn new(file_name: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            request_id: request_id.into(),
        }
    }

    /// Expand `{file_name}` and `{request_id}`.
    pub fn render(&self, template: &str) -> String {
        template
            .replace(&format!("{{{}}}", FILE_NAME_TOKEN), &self.file_name)
            .replace("{request_id}", &self.request_id)
    }
}

pub enum Producer {
    Console(ConsoleProducer),
    ObjectStore(ObjectStoreProducer),
    Broker(Box<BrokerProducer>),
    Summary(SummaryProducer),
}

impl Producer {
    pub fn name(&self) -> &'static str {
        match self {
            Producer::Console(_) => "Console",
            Producer::ObjectStore(_) => "ObjectStore",
            Producer::Broker(_) => "Broker",
            Producer::Summary(_) => "Summary",
        }
    }

    pub fn publish(&self, records: &[Record]) -> SinkResult<ProducerReceipt> {
        match self {
            Producer::Console(producer) => producer.publish(records),
            Producer::ObjectStore(producer) => producer.publish(records),
            Producer::Broker(producer) => producer.publish(records),
            Producer::Summary(producer) => producer.publish(records),
        }
    }
}

/// Build the producer a compiled spec describes.
pub fn create_producer(
    spec: &ProducerSpec,
    collaborators: &Collaborators,
    context: &ProducerContext,
) -> Producer {
    match spec {
        ProducerSpec::Console => Producer::Console(ConsoleProducer),
        ProducerSpec::ObjectStore {
            bucket,
            key,
            format,
        } => Producer::ObjectStore(ObjectStoreProducer::new(
            collaborators.object_store.clone(),
            bucket.clone(),
            context.render(key),
            *format,
        )),
        ProducerSpec::Broker(target) => Producer::Broker(Box::new(BrokerProducer::new(
            collaborators.broker.clone(),
            collaborators.secrets.clone(),
            target.clone(),
        ))),
        ProducerSpec::Summary { sample_size } => {
            Producer::Summary(SummaryProducer::new(*sample_size))
        }
    }
}

/// Producers for one invocation, in declared order.
pub struct ProducerRegistry {
    producers: Vec<Producer>,
}

impl ProducerRegistry {
    pub fn from_specs(
        specs: &[ProducerSpec],
        collaborators: &Collaborators,
        context: &ProducerContext,
    ) -> Self {
        Self {
            producers: specs
                .iter()
                .map(|spec| create_producer(spec, collaborators, context))
                .collect(),
        }
    }

    /// Run every producer; the first failure aborts the rest.
    pub fn publish_all(
        &self,
        records: &[Record],
    ) -> std::result::Result<Vec<ProducerReceipt>, ProducerFailure> {
        let mut receipts = Vec::with_capacity(self.producers.len());
        for producer in &self.producers {
            debug!(producer = producer.name(), records = records.len(), "Publishing");
            let receipt = producer.publish(records).map_err(|error| ProducerFailure {
                producer: producer.name().to_string(),
                error,
            })?;
            info!(
                producer = %receipt.producer,
                destination = %receipt.destination,
                records = receipt.records,
                "Producer finished"
            );
            receipts.push(receipt);
        }
        Ok(receipts)
    }
}
