//! Publish/subscribe producer.
//!
//! Ordered publishing uses one session. Unordered batches above the shard
//! threshold are split into `BROKER_SHARD_COUNT` contiguous, disjoint shards,
//! each published from its own thread over its own session; the call returns
//! only after every shard worker has joined.

use ledgerline_protocol::defaults::BROKER_SHARD_COUNT;
use ledgerline_protocol::{
    Broker, BrokerConfig, ProducerReceipt, Record, SecretStore,
};
use ledgerline_schema::BrokerTarget;
use std::ops::Range;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

use crate::{SinkError, SinkResult};

pub struct BrokerProducer {
    broker: Arc<dyn Broker>,
    secrets: Arc<dyn SecretStore>,
    target: BrokerTarget,
}

impl BrokerProducer {
    pub fn new(broker: Arc<dyn Broker>, secrets: Arc<dyn SecretStore>, target: BrokerTarget) -> Self {
        Self {
            broker,
            secrets,
            target,
        }
    }

    fn config(&self) -> SinkResult<BrokerConfig> {
        let credentials = match &self.target.secret_name {
            Some(name) => Some(
                self.secrets
                    .get_secret(name)
                    .map_err(|e| SinkError::service("broker credentials", e))?,
            ),
            None => None,
        };
        Ok(BrokerConfig {
            client_id: self.target.client_id.clone(),
            cluster_name: self.target.cluster_name.clone(),
            broker_urls: self.target.broker_urls.clone(),
            batch_size: self.target.batch_size,
            credentials,
        })
    }

    pub fn publish(&self, records: &[Record]) -> SinkResult<ProducerReceipt> {
        let config = self.config()?;
        let sharded = !self.target.ordered && records.len() > self.target.shard_threshold;
        if sharded {
            self.publish_sharded(&config, records)?;
        } else {
            publish_session(self.broker.as_ref(), &config, &self.target.topic, records)?;
        }
        info!(
            topic = %self.target.topic,
            records = records.len(),
            sharded,
            "Published to broker"
        );
        Ok(ProducerReceipt {
            producer: "Broker".to_string(),
            destination: self.target.topic.clone(),
            records: records.len(),
        })
    }

    fn publish_sharded(&self, config: &BrokerConfig, records: &[Record]) -> SinkResult<()> {
        let ranges = shard_ranges(records.len(), BROKER_SHARD_COUNT);
        debug!(shards = ranges.len(), records = records.len(), "Sharding broker batch");
        let broker = self.broker.as_ref();
        let topic = self.target.topic.as_str();

        let results: Vec<SinkResult<()>> = thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .iter()
                .cloned()
                .map(|range| {
                    let shard = &records[range];
                    scope.spawn(move || publish_session(broker, config, topic, shard))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(SinkError::message("broker shard worker panicked")))
                })
                .collect()
        });

        let failures: Vec<String> = results
            .into_iter()
            .enumerate()
            .filter_map(|(shard, result)| result.err().map(|e| format!("shard {}: {}", shard, e)))
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            warn!(failed = failures.len(), "Broker shards failed");
            Err(SinkError::message(failures.join("; ")))
        }
    }
}

/// One session: connect, publish in `batch_size` chunks with a flush after
/// each, close.
fn publish_session(
    broker: &dyn Broker,
    config: &BrokerConfig,
    topic: &str,
    records: &[Record],
) -> SinkResult<()> {
    let mut session = broker
        .connect(config)
        .map_err(|e| SinkError::service("broker connect", e))?;
    for chunk in records.chunks(config.batch_size.max(1)) {
        for record in chunk {
            session
                .publish(topic, record)
                .map_err(|e| SinkError::service("broker publish", e))?;
        }
        session
            .flush()
            .map_err(|e| SinkError::service("broker flush", e))?;
    }
    session
        .close()
        .map_err(|e| SinkError::service("broker close", e))
}

/// Split `0..total` into `shards` contiguous, disjoint ranges covering every
/// index. The first `total % shards` ranges are one longer.
pub fn shard_ranges(total: usize, shards: usize) -> Vec<Range<usize>> {
    let shards = shards.max(1);
    let base = total / shards;
    let remainder = total % shards;
    let mut start = 0;
    (0..shards)
        .map(|i| {
            let len = base + usize::from(i < remainder);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}
