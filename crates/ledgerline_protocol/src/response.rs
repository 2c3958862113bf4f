//! Invocation event and response shapes.
//!
//! Every response carries the same envelope (`sourceBucket`, `sourceFile`,
//! `requestTime`, `requestId`, `statusCode`) flattened next to its payload.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ConstraintFailure, ValidationFailure};

/// A file-created notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationEvent {
    pub bucket: String,
    pub key: String,
    #[serde(alias = "requestId")]
    pub request_id: String,
}

impl InvocationEvent {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            request_id: request_id.into(),
        }
    }

    /// Last path component of the key.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Passed,
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Passed => "Passed",
            OutcomeStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a validator ran against source tables or prepared output groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleOrigin {
    Source,
    Result,
}

impl RuleOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleOrigin::Source => "Source",
            RuleOrigin::Result => "Result",
        }
    }
}

impl fmt::Display for RuleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RuleOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "source" => Ok(RuleOrigin::Source),
            "result" => Ok(RuleOrigin::Result),
            _ => Err(format!("Unknown rule origin: {}", s)),
        }
    }
}

/// Diagnostic entry for one validation rule that ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleOutcome {
    #[serde(rename = "type")]
    pub origin: RuleOrigin,
    pub segment: String,
    pub field: String,
    pub validator: String,
    pub status: OutcomeStatus,
    pub fail_count: usize,
    pub record_count: usize,
    pub message: String,
}

impl RuleOutcome {
    pub fn passed(
        origin: RuleOrigin,
        validator: &str,
        segment: &str,
        field: &str,
        record_count: usize,
    ) -> Self {
        Self {
            origin,
            segment: segment.to_string(),
            field: field.to_string(),
            validator: validator.to_string(),
            status: OutcomeStatus::Passed,
            fail_count: 0,
            record_count,
            message: String::new(),
        }
    }

    pub fn failed(origin: RuleOrigin, failure: &ValidationFailure) -> Self {
        Self {
            origin,
            segment: failure.segment.clone(),
            field: failure.field.clone(),
            validator: failure.validator.clone(),
            status: OutcomeStatus::Failed,
            fail_count: failure.fail_count,
            record_count: failure.record_count,
            message: failure.message.clone(),
        }
    }
}

/// Diagnostic entry for one constraint that ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintOutcome {
    pub constraint: String,
    pub status: OutcomeStatus,
    pub failures: Vec<ConstraintFailure>,
}

impl ConstraintOutcome {
    pub fn passed(constraint: impl Into<String>) -> Self {
        Self {
            constraint: constraint.into(),
            status: OutcomeStatus::Passed,
            failures: Vec::new(),
        }
    }

    pub fn failed(constraint: impl Into<String>, failures: Vec<ConstraintFailure>) -> Self {
        Self {
            constraint: constraint.into(),
            status: OutcomeStatus::Failed,
            failures,
        }
    }
}

/// Where a producer delivered records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerReceipt {
    pub producer: String,
    pub destination: String,
    pub records: usize,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub source_bucket: String,
    pub source_file: String,
    pub request_time: String,
    pub request_id: String,
    pub status_code: u16,
}

impl ResponseEnvelope {
    pub fn new(event: &InvocationEvent, request_time: DateTime<Utc>, status_code: u16) -> Self {
        Self {
            source_bucket: event.bucket.clone(),
            source_file: event.key.clone(),
            request_time: request_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            request_id: event.request_id.clone(),
            status_code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResultResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    pub destinations: Vec<ProducerReceipt>,
    pub record_count: usize,
    pub validations: Vec<RuleOutcome>,
    pub constraints: Vec<ConstraintOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrorResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    pub record_count: usize,
    pub failure_reason: String,
    pub validations: Vec<RuleOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintErrorResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    pub record_count: usize,
    pub failure_reason: String,
    pub failure_message: String,
    pub constraints: Vec<ConstraintOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericErrorResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    pub failure_reason: String,
    pub failure_message: String,
    pub validations: Vec<RuleOutcome>,
    pub constraints: Vec<ConstraintOutcome>,
}

/// The single structured outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExecutorResponse {
    Success(SuccessResultResponse),
    ValidationError(ValidationErrorResponse),
    ConstraintError(ConstraintErrorResponse),
    GenericError(GenericErrorResponse),
}

impl ExecutorResponse {
    pub fn envelope(&self) -> &ResponseEnvelope {
        match self {
            ExecutorResponse::Success(r) => &r.envelope,
            ExecutorResponse::ValidationError(r) => &r.envelope,
            ExecutorResponse::ConstraintError(r) => &r.envelope,
            ExecutorResponse::GenericError(r) => &r.envelope,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.envelope().status_code
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExecutorResponse::Success(_) => "SuccessResultResponse",
            ExecutorResponse::ValidationError(_) => "ValidationErrorResponse",
            ExecutorResponse::ConstraintError(_) => "ConstraintErrorResponse",
            ExecutorResponse::GenericError(_) => "GenericErrorResponse",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutorResponse::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event() -> InvocationEvent {
        InvocationEvent::new("inbound", "daily/PAY_20240102.txt", "req-1")
    }

    #[test]
    fn event_accepts_camel_case_request_id() {
        let parsed: InvocationEvent =
            serde_json::from_str(r#"{"bucket":"b","key":"k","requestId":"r"}"#).unwrap();
        assert_eq!(parsed.request_id, "r");
        assert_eq!(event().file_name(), "PAY_20240102.txt");
    }

    #[test]
    fn envelope_is_flattened() {
        let time = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let response = ExecutorResponse::GenericError(GenericErrorResponse {
            envelope: ResponseEnvelope::new(&event(), time, 500),
            failure_reason: "MissingConfigError".into(),
            failure_message: "no pattern".into(),
            validations: Vec::new(),
            constraints: Vec::new(),
        });
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["statusCode"], 500);
        assert_eq!(value["sourceBucket"], "inbound");
        assert_eq!(value["sourceFile"], "daily/PAY_20240102.txt");
        assert_eq!(value["requestTime"], "2024-01-02T03:04:05.000Z");
        assert_eq!(value["failureReason"], "MissingConfigError");
        assert!(value.get("envelope").is_none());
        assert_eq!(response.status_code(), 500);
    }

    #[test]
    fn rule_outcome_uses_type_key() {
        let failure = ValidationFailure::new("NaN", "body", "ALL").with_counts(2, 5);
        let outcome = RuleOutcome::failed(RuleOrigin::Result, &failure);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["type"], "Result");
        assert_eq!(value["status"], "Failed");
        assert_eq!(value["failCount"], 2);
    }
}
