//! Producer fan-out against in-memory collaborators.

use ledgerline_protocol::Record;
use ledgerline_schema::{BlobFormat, BrokerTarget, ProducerSpec};
use ledgerline_sinks::{ProducerContext, ProducerRegistry};
use ledgerline_test_utils::{FakeServices, RecordingBroker, StaticSecretStore};
use serde_json::json;

fn records(n: usize) -> Vec<Record> {
    (0..n)
        .filter_map(|i| json!({ "seq": i }).as_object().cloned())
        .collect()
}

fn target(ordered: bool, shard_threshold: usize) -> BrokerTarget {
    BrokerTarget {
        topic: "payments".into(),
        secret_name: Some("broker".into()),
        cluster_name: Some("cluster-a".into()),
        broker_urls: Vec::new(),
        client_id: "default-client".into(),
        batch_size: 4,
        ordered,
        shard_threshold,
    }
}

fn seqs(records: &[(String, Record)]) -> Vec<u64> {
    records
        .iter()
        .filter_map(|(_, r)| r.get("seq").and_then(|v| v.as_u64()))
        .collect()
}

fn fakes() -> FakeServices {
    FakeServices::new().with_secrets(StaticSecretStore::new().with_secret("broker", "svc", "pw"))
}

#[test]
fn ordered_publishing_keeps_order_in_one_session() {
    let fakes = fakes();
    let registry = ProducerRegistry::from_specs(
        &[ProducerSpec::Broker(target(true, 5))],
        &fakes.collaborators(),
        &ProducerContext::new("PAY_1.txt", "r1"),
    );
    let receipts = registry.publish_all(&records(10)).unwrap();
    assert_eq!(receipts[0].records, 10);

    let sessions = fakes.broker.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(seqs(&sessions[0].records), (0..10).collect::<Vec<_>>());
    assert_eq!(sessions[0].flushes, 3);
    assert!(sessions[0].closed);
    let credentials = sessions[0].config.credentials.as_ref().unwrap();
    assert_eq!(credentials.username, "svc");
}

#[test]
fn unordered_large_batch_uses_four_disjoint_sessions() {
    let fakes = fakes();
    let registry = ProducerRegistry::from_specs(
        &[ProducerSpec::Broker(target(false, 10))],
        &fakes.collaborators(),
        &ProducerContext::new("PAY_1.txt", "r1"),
    );
    registry.publish_all(&records(25)).unwrap();

    let sessions = fakes.broker.sessions();
    assert_eq!(sessions.len(), 4);
    assert!(sessions.iter().all(|s| s.closed));
    let mut all: Vec<u64> = sessions.iter().flat_map(|s| seqs(&s.records)).collect();
    all.sort_unstable();
    assert_eq!(all, (0..25).collect::<Vec<_>>());
    for session in &sessions {
        let shard = seqs(&session.records);
        let contiguous = shard.windows(2).all(|w| w[1] == w[0] + 1);
        assert!(contiguous, "shard {:?} is not contiguous", shard);
    }
}

#[test]
fn unordered_small_batch_stays_single_session() {
    let fakes = fakes();
    let registry = ProducerRegistry::from_specs(
        &[ProducerSpec::Broker(target(false, 100))],
        &fakes.collaborators(),
        &ProducerContext::new("PAY_1.txt", "r1"),
    );
    registry.publish_all(&records(25)).unwrap();
    assert_eq!(fakes.broker.sessions().len(), 1);
}

#[test]
fn object_store_key_is_templated() {
    let fakes = fakes();
    let registry = ProducerRegistry::from_specs(
        &[
            ProducerSpec::ObjectStore {
                bucket: "out".into(),
                key: "results/{file_name}.jsonl".into(),
                format: BlobFormat::Jsonl,
            },
            ProducerSpec::Summary { sample_size: 1 },
        ],
        &fakes.collaborators(),
        &ProducerContext::new("PAY_1.txt", "r1"),
    );
    let receipts = registry.publish_all(&records(2)).unwrap();
    assert_eq!(receipts.len(), 2);
    assert_eq!(receipts[0].destination, "s3://out/results/PAY_1.txt.jsonl");
    let body = fakes.store.get("out", "results/PAY_1.txt.jsonl").unwrap();
    assert_eq!(String::from_utf8(body).unwrap().lines().count(), 2);
}

#[test]
fn first_failure_names_the_producer_and_stops() {
    let fakes = fakes().with_broker(RecordingBroker::refusing());
    let registry = ProducerRegistry::from_specs(
        &[
            ProducerSpec::Broker(target(true, 5)),
            ProducerSpec::ObjectStore {
                bucket: "out".into(),
                key: "never.json".into(),
                format: BlobFormat::Json,
            },
        ],
        &fakes.collaborators(),
        &ProducerContext::new("PAY_1.txt", "r1"),
    );
    let failure = registry.publish_all(&records(1)).unwrap_err();
    assert_eq!(failure.producer, "Broker");
    assert!(fakes.store.uploads().is_empty());
}

#[test]
fn missing_broker_secret_fails() {
    let fakes = FakeServices::new();
    let registry = ProducerRegistry::from_specs(
        &[ProducerSpec::Broker(target(true, 5))],
        &fakes.collaborators(),
        &ProducerContext::new("PAY_1.txt", "r1"),
    );
    assert!(registry.publish_all(&records(1)).is_err());
    assert!(fakes.broker.sessions().is_empty());
}
