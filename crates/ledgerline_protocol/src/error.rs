//! Failure taxonomy shared by every pipeline stage.
//!
//! Validators and the file-reference constraint collect failures and raise one
//! aggregate; everything else propagates immediately to the executor, which
//! maps `ErrorKind` onto a response shape.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Failure records
// ============================================================================

/// One failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    pub validator: String,
    pub segment: String,
    pub field: String,
    pub fail_count: usize,
    pub record_count: usize,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(
        validator: impl Into<String>,
        segment: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            validator: validator.into(),
            segment: segment.into(),
            field: field.into(),
            fail_count: 0,
            record_count: 0,
            message: String::new(),
        }
    }

    pub fn with_counts(mut self, fail_count: usize, record_count: usize) -> Self {
        self.fail_count = fail_count;
        self.record_count = record_count;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed on {}.{} ({} of {} records)",
            self.validator, self.segment, self.field, self.fail_count, self.record_count
        )?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// One failed constraint check (or one collected sub-failure of a constraint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintFailure {
    pub constraint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    pub fail_count: usize,
    pub record_count: usize,
    pub message: String,
}

impl ConstraintFailure {
    pub fn new(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            constraint: constraint.into(),
            segment: None,
            fail_count: 1,
            record_count: 0,
            message: message.into(),
        }
    }

    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    pub fn with_counts(mut self, fail_count: usize, record_count: usize) -> Self {
        self.fail_count = fail_count;
        self.record_count = record_count;
        self
    }
}

impl fmt::Display for ConstraintFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.segment {
            Some(segment) => write!(f, "{} [{}]: {}", self.constraint, segment, self.message),
            None => write!(f, "{}: {}", self.constraint, self.message),
        }
    }
}

fn join_display<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Error Types
// ============================================================================

/// Stable classification used for response mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    Validation,
    Constraint,
    SourceFile,
    Conversion,
    Service,
    Producer,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Validation => "validation",
            ErrorKind::Constraint => "constraint",
            ErrorKind::SourceFile => "source_file",
            ErrorKind::Conversion => "conversion",
            ErrorKind::Service => "service",
            ErrorKind::Producer => "producer",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
pub enum TransformError {
    #[error("missing configuration: {0}")]
    MissingConfig(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("constraint '{constraint}' is misconfigured: {message}")]
    ConstraintMisconfiguration { constraint: String, message: String },
    #[error("{0}")]
    Validation(ValidationFailure),
    #[error("{} validation rule(s) failed: {}", .0.len(), join_display(.0))]
    ValidationFailures(Vec<ValidationFailure>),
    #[error("{0}")]
    FailedConstraint(ConstraintFailure),
    #[error("{} constraint failure(s): {}", .0.len(), join_display(.0))]
    FailedConstraints(Vec<ConstraintFailure>),
    #[error("source file '{file}': {message}")]
    SourceFile { file: String, message: String },
    #[error("cannot convert {segment}.{field}: {cause} (rows {rows:?})")]
    Conversion {
        segment: String,
        field: String,
        cause: String,
        rows: Vec<usize>,
    },
    #[error("{service} failed: {message}")]
    Service { service: String, message: String },
    #[error("producer '{producer}' failed: {message}")]
    Producer { producer: String, message: String },
}

pub type TransformResult<T> = std::result::Result<T, TransformError>;

impl TransformError {
    pub fn missing_config(message: impl Into<String>) -> Self {
        TransformError::MissingConfig(message.into())
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        TransformError::InvalidConfig(message.into())
    }

    pub fn misconfigured(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        TransformError::ConstraintMisconfiguration {
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    pub fn source_file(file: impl Into<String>, message: impl Into<String>) -> Self {
        TransformError::SourceFile {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn service(service: impl Into<String>, message: impl Into<String>) -> Self {
        TransformError::Service {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TransformError::MissingConfig(_)
            | TransformError::InvalidConfig(_)
            | TransformError::ConstraintMisconfiguration { .. } => ErrorKind::Config,
            TransformError::Validation(_) | TransformError::ValidationFailures(_) => {
                ErrorKind::Validation
            }
            TransformError::FailedConstraint(_) | TransformError::FailedConstraints(_) => {
                ErrorKind::Constraint
            }
            TransformError::SourceFile { .. } => ErrorKind::SourceFile,
            TransformError::Conversion { .. } => ErrorKind::Conversion,
            TransformError::Service { .. } => ErrorKind::Service,
            TransformError::Producer { .. } => ErrorKind::Producer,
        }
    }

    /// Name reported as `failureReason` in responses.
    pub fn reason(&self) -> &'static str {
        match self {
            TransformError::MissingConfig(_) => "MissingConfigError",
            TransformError::InvalidConfig(_) => "InvalidConfigError",
            TransformError::ConstraintMisconfiguration { .. } => {
                "ConstraintMisconfigurationException"
            }
            TransformError::Validation(_) => "ValidationError",
            TransformError::ValidationFailures(_) => "ValidationFailureError",
            TransformError::FailedConstraint(_) => "FailedConstraintException",
            TransformError::FailedConstraints(_) => "FailedConstraintsException",
            TransformError::SourceFile { .. } => "SourceFileError",
            TransformError::Conversion { .. } => "ConversionError",
            TransformError::Service { .. } => "ServiceError",
            TransformError::Producer { .. } => "ProducerError",
        }
    }

    /// Validation failures carried by this error, if any.
    pub fn validation_failures(&self) -> &[ValidationFailure] {
        match self {
            TransformError::Validation(failure) => std::slice::from_ref(failure),
            TransformError::ValidationFailures(failures) => failures,
            _ => &[],
        }
    }

    /// Constraint failures carried by this error, if any.
    pub fn constraint_failures(&self) -> &[ConstraintFailure] {
        match self {
            TransformError::FailedConstraint(failure) => std::slice::from_ref(failure),
            TransformError::FailedConstraints(failures) => failures,
            _ => &[],
        }
    }

    /// Collapse collected validation failures: none is `Ok`, otherwise one aggregate.
    pub fn from_validation_failures(failures: Vec<ValidationFailure>) -> TransformResult<()> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(TransformError::ValidationFailures(failures))
        }
    }

    /// Collapse collected constraint failures: none is `Ok`, otherwise one aggregate.
    pub fn from_constraint_failures(failures: Vec<ConstraintFailure>) -> TransformResult<()> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(TransformError::FailedConstraints(failures))
        }
    }
}

/// Failure reported by a collaborator implementation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub fn failed(message: impl Into<String>) -> Self {
        ServiceError::Failed(message.into())
    }

    /// Attach the collaborator name and lift into the pipeline taxonomy.
    pub fn into_transform(self, service: &str) -> TransformError {
        TransformError::service(service, self.to_string())
    }
}
