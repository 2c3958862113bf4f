//! End-to-end invocations against in-memory collaborators.

use ledgerline_protocol::{ExecutorResponse, InvocationEvent, OutcomeStatus};
use ledgerline_test_utils::{fixed_width_file, fixed_width_line, FakeServices, FixedHashFunction};
use ledgerline_worker::{Executor, ExecutorState, InlineConfigSource};
use serde_json::Value;
use std::time::Duration;

const INBOUND: &str = "inbound";

const DOCUMENT: &str = r#"
files:
  payments:
    pattern: PAY_\d+\.txt
    source:
      header:
        formatter: HeaderSourceFormatter
        format:
          - name: batchId
            spec: "1,9"
      body:
        formatter: BodySourceFormatter
        format:
          - name: account
            spec: "0,4"
            validators:
              - name: UniqueValueValidator
          - name: amount
            spec: "4,10"
            converter: ToNumber
      footer:
        formatter: FooterSourceFormatter
        format:
          - name: count
            spec: "1,6"
            validators:
              - name: RefValidator
                arguments: {type: count, ref: body.account}
__CONSTRAINTS__
    output:
      producer:
        - name: S3Result
          arguments: {bucket: out, key: "{file_name}.json"}
      format:
__FORMAT__
"#;

const ROOT_FORMAT: &str = r#"
        root:
          - name: batch
            value: header.batchId
          - name: account
            value: body.account
          - name: amount
            value: body.amount
          - name: seq
            value: IncrementalIdGenerator
"#;

const GROUPED_FORMAT: &str = r#"
        meta:
          - name: batch
            value: header.batchId
          - name: receivedAt
            value: TimestampGenerator
        payment:
          - name: account
            value: body.account
          - name: amount
            value: body.amount
"#;

const HASH_CONSTRAINT: &str = r#"
      - name: HashConstraint
        max_wait_time: 5
        wait_interval: 1
        arguments:
          bucket: digests
          algorithm: sha256
          file_config:
            extraction_regex: PAY_(\d+)
            replacement_text: "{n}"
            result_file_name: "PAY_{n}.sha256"
"#;

const FILE_REFERENCE_CONSTRAINT: &str = r#"
      - name: S3FileRefConstraint
        arguments:
          bucket: refs
          file_name: ledger.txt
          format:
            entries:
              formatter: BodyOnlySourceFormatter
              format:
                - name: acct
                  spec: "0,4"
                - name: amt
                  spec: "4,10"
          config:
            - source_segment: body
              ref_segment: entries
              source_aggregate: account
              ref_aggregate: acct
              fields:
                - source: amount
                  ref: amt
"#;

fn document(constraints: &[&str], format: &str) -> String {
    let constraints = if constraints.is_empty() {
        String::new()
    } else {
        format!("    constraints:{}", constraints.concat())
    };
    DOCUMENT
        .replace("__CONSTRAINTS__\n", &constraints)
        .replace("__FORMAT__\n", format.trim_start_matches('\n'))
}

fn payments(footer_count: &str) -> String {
    let mut lines = vec![fixed_width_line(&[("H", 1), ("B0000001", 8)])];
    for (account, amount) in [("ACC1", "000100"), ("ACC2", "000200"), ("ACC3", "000300"), ("ACC4", "000400"), ("ACC5", "000500")] {
        lines.push(fixed_width_line(&[(account, 4), (amount, 6)]));
    }
    lines.push(fixed_width_line(&[("T", 1), (footer_count, 5)]));
    fixed_width_file(&lines)
}

fn ledger(rows: &[(&str, &str)]) -> String {
    let lines: Vec<String> = rows
        .iter()
        .map(|(acct, amt)| fixed_width_line(&[(acct, 4), (amt, 6)]))
        .collect();
    fixed_width_file(&lines)
}

fn run(fakes: &FakeServices, document: String, key: &str) -> ExecutorResponse {
    let executor = Executor::new(Box::new(InlineConfigSource::new(document)), fakes.collaborators());
    executor.execute(&InvocationEvent::new(INBOUND, key, "req-1"))
}

fn uploaded_records(fakes: &FakeServices, key: &str) -> Vec<Value> {
    let body = fakes.store.get("out", key).expect("result blob was uploaded");
    serde_json::from_slice(&body).unwrap()
}

#[test]
fn header_values_are_stamped_on_every_record() {
    let fakes = FakeServices::new();
    fakes.store.put(INBOUND, "drop/PAY_1.txt", payments("00005"));

    let response = run(&fakes, document(&[], ROOT_FORMAT), "drop/PAY_1.txt");
    let ExecutorResponse::Success(success) = response else {
        panic!("expected success, got {:?}", response);
    };
    assert_eq!(success.envelope.status_code, 200);
    assert_eq!(success.record_count, 5);
    assert_eq!(success.destinations[0].destination, "s3://out/PAY_1.txt.json");
    assert!(success
        .validations
        .iter()
        .all(|v| v.status == OutcomeStatus::Passed));

    let records = uploaded_records(&fakes, "PAY_1.txt.json");
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r["batch"] == "B0000001"));
    assert_eq!(records[0]["amount"], 100);
    assert_eq!(records[4]["account"], "ACC5");
    assert_eq!(records[4]["seq"], 5);
}

#[test]
fn named_groups_nest_each_record() {
    let fakes = FakeServices::new();
    fakes.store.put(INBOUND, "PAY_1.txt", payments("00005"));

    let response = run(&fakes, document(&[], GROUPED_FORMAT), "PAY_1.txt");
    assert!(response.is_success(), "{:?}", response);

    let records = uploaded_records(&fakes, "PAY_1.txt.json");
    assert_eq!(records.len(), 5);
    assert_eq!(records[2]["meta"]["batch"], "B0000001");
    assert!(records[2]["meta"]["receivedAt"].is_string());
    assert_eq!(records[2]["payment"]["amount"], 300);
}

#[test]
fn footer_count_mismatch_is_a_validation_error() {
    let fakes = FakeServices::new();
    fakes.store.put(INBOUND, "PAY_1.txt", payments("00004"));

    let response = run(&fakes, document(&[], ROOT_FORMAT), "PAY_1.txt");
    let ExecutorResponse::ValidationError(error) = response else {
        panic!("expected validation error, got {:?}", response);
    };
    assert_eq!(error.envelope.status_code, 400);
    assert_eq!(error.failure_reason, "ValidationError");
    let failed: Vec<_> = error
        .validations
        .iter()
        .filter(|v| v.status == OutcomeStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!((failed[0].segment.as_str(), failed[0].field.as_str()), ("footer", "count"));
    assert_eq!((failed[0].fail_count, failed[0].record_count), (1, 5));
    assert!(fakes.store.uploads().is_empty());
}

#[test]
fn unmatched_file_name_is_missing_config() {
    let fakes = FakeServices::new();
    fakes.store.put(INBOUND, "REFUND_1.txt", payments("00005"));

    let response = run(&fakes, document(&[], ROOT_FORMAT), "REFUND_1.txt");
    let ExecutorResponse::GenericError(error) = response else {
        panic!("expected generic error, got {:?}", response);
    };
    assert_eq!(error.envelope.status_code, 500);
    assert_eq!(error.failure_reason, "MissingConfigError");
    assert!(error.failure_message.contains("REFUND_1.txt"));
}

#[test]
fn absent_source_object_is_a_source_file_error() {
    let fakes = FakeServices::new();
    let response = run(&fakes, document(&[], ROOT_FORMAT), "PAY_9.txt");
    let ExecutorResponse::GenericError(error) = response else {
        panic!("expected generic error, got {:?}", response);
    };
    assert_eq!(error.failure_reason, "SourceFileError");
}

#[test]
fn hash_constraint_waits_for_a_late_digest() {
    let fakes = FakeServices::new().with_hasher(FixedHashFunction::new("abc123"));
    fakes.store.put(INBOUND, "PAY_1.txt", payments("00005"));
    fakes
        .store
        .put_after("digests", "PAY_1.sha256", "abc123\n", Duration::from_millis(1500));

    let response = run(&fakes, document(&[HASH_CONSTRAINT], ROOT_FORMAT), "PAY_1.txt");
    let ExecutorResponse::Success(success) = response else {
        panic!("expected success, got {:?}", response);
    };
    assert_eq!(success.constraints.len(), 1);
    assert_eq!(success.constraints[0].status, OutcomeStatus::Passed);

    let requests = fakes.hasher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "FileTransformerHash");
    assert_eq!(requests[0].1.algorithm, "sha256");
    assert!(requests[0].1.absolute_path.ends_with("PAY_1.txt"));
}

#[test]
fn digest_mismatch_is_a_constraint_error() {
    let fakes = FakeServices::new().with_hasher(FixedHashFunction::new("abc123"));
    fakes.store.put(INBOUND, "PAY_1.txt", payments("00005"));
    fakes.store.put("digests", "PAY_1.sha256", "ffff00");

    let response = run(&fakes, document(&[HASH_CONSTRAINT], ROOT_FORMAT), "PAY_1.txt");
    let ExecutorResponse::ConstraintError(error) = response else {
        panic!("expected constraint error, got {:?}", response);
    };
    assert_eq!(error.envelope.status_code, 500);
    assert_eq!(error.failure_reason, "FailedConstraintException");
    assert_eq!(error.constraints[0].status, OutcomeStatus::Failed);
    assert!(fakes.store.uploads().is_empty());
}

#[test]
fn reference_file_in_another_order_passes() {
    let fakes = FakeServices::new();
    fakes.store.put(INBOUND, "PAY_1.txt", payments("00005"));
    fakes.store.put(
        "refs",
        "ledger.txt",
        ledger(&[
            ("ACC3", "000300"),
            ("ACC5", "000500"),
            ("ACC1", "000100"),
            ("ACC4", "000400"),
            ("ACC2", "000200"),
        ]),
    );

    let response = run(&fakes, document(&[FILE_REFERENCE_CONSTRAINT], ROOT_FORMAT), "PAY_1.txt");
    assert!(response.is_success(), "{:?}", response);
}

#[test]
fn every_constraint_runs_before_failing() {
    let fakes = FakeServices::new().with_hasher(FixedHashFunction::new("abc123"));
    fakes.store.put(INBOUND, "PAY_1.txt", payments("00005"));
    fakes.store.put("digests", "PAY_1.sha256", "ffff00");
    fakes.store.put(
        "refs",
        "ledger.txt",
        ledger(&[("ACC1", "000100"), ("ACC2", "000200"), ("ACC3", "000300"), ("ACC4", "000400"), ("ACC5", "000999")]),
    );

    let response = run(
        &fakes,
        document(&[HASH_CONSTRAINT, FILE_REFERENCE_CONSTRAINT], ROOT_FORMAT),
        "PAY_1.txt",
    );
    let ExecutorResponse::ConstraintError(error) = response else {
        panic!("expected constraint error, got {:?}", response);
    };
    assert_eq!(error.failure_reason, "FailedConstraintsException");
    assert_eq!(error.constraints.len(), 2);
    let reference = &error.constraints[1].failures[0];
    assert_eq!(reference.segment.as_deref(), Some("body"));
    assert_eq!((reference.fail_count, reference.record_count), (1, 5));
}

#[test]
fn missing_reference_file_is_a_service_error() {
    let fakes = FakeServices::new();
    fakes.store.put(INBOUND, "PAY_1.txt", payments("00005"));

    let response = run(&fakes, document(&[FILE_REFERENCE_CONSTRAINT], ROOT_FORMAT), "PAY_1.txt");
    let ExecutorResponse::GenericError(error) = response else {
        panic!("expected generic error, got {:?}", response);
    };
    assert_eq!(error.failure_reason, "ServiceError");
}

#[test]
fn executor_state_names() {
    assert_eq!(ExecutorState::ResolvingConfig.as_str(), "resolving_config");
    assert!(ExecutorState::Failed.is_terminal());
}
