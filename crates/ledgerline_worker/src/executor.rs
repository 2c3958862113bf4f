//! Invocation executor.
//!
//! One call to [`Executor::execute`] walks a single file through the whole
//! pipeline and always returns a response. States advance strictly in order;
//! any error moves the run to `Failed`, and the error's kind picks the
//! response shape. Outcomes recorded before the failure are kept in the
//! response.

use chrono::{DateTime, Utc};
use ledgerline_protocol::{
    Collaborators, ConstraintErrorResponse, ConstraintOutcome, ErrorKind, ExecutorResponse,
    GenericErrorResponse, InvocationEvent, ProducerReceipt, ResponseEnvelope, RuleOutcome,
    SuccessResultResponse, TableSet, TransformError, TransformResult, ValidationErrorResponse,
};
use ledgerline_schema::FileSchema;
use ledgerline_sinks::{ProducerContext, ProducerRegistry};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, info_span};

use crate::config_source::ConfigSource;
use crate::constraints::{check_constraints, ConstraintEnv};
use crate::convert::apply_converters;
use crate::parser::parse_file;
use crate::result::{prepare, transform};
use crate::rules::{validate, RuleContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    ResolvingConfig,
    RetrievingFile,
    Parsing,
    CheckingConstraints,
    Validating,
    BuildingResult,
    Producing,
    Done,
    Failed,
}

impl ExecutorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorState::ResolvingConfig => "resolving_config",
            ExecutorState::RetrievingFile => "retrieving_file",
            ExecutorState::Parsing => "parsing",
            ExecutorState::CheckingConstraints => "checking_constraints",
            ExecutorState::Validating => "validating",
            ExecutorState::BuildingResult => "building_result",
            ExecutorState::Producing => "producing",
            ExecutorState::Done => "done",
            ExecutorState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutorState::Done | ExecutorState::Failed)
    }
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostics gathered while one invocation runs.
#[derive(Debug)]
struct Invocation {
    state: ExecutorState,
    validations: Vec<RuleOutcome>,
    constraints: Vec<ConstraintOutcome>,
    record_count: usize,
}

impl Invocation {
    fn new() -> Self {
        Self {
            state: ExecutorState::ResolvingConfig,
            validations: Vec::new(),
            constraints: Vec::new(),
            record_count: 0,
        }
    }

    fn advance(&mut self, next: ExecutorState) {
        info!(from = %self.state, to = %next, "State transition");
        self.state = next;
    }
}

pub struct Executor {
    config: Box<dyn ConfigSource>,
    collaborators: Collaborators,
    work_dir: Option<PathBuf>,
}

impl Executor {
    pub fn new(config: Box<dyn ConfigSource>, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
            work_dir: None,
        }
    }

    /// Parent directory for the per-invocation scratch directory.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(work_dir.into());
        self
    }

    /// Process one file-created event.
    pub fn execute(&self, event: &InvocationEvent) -> ExecutorResponse {
        let request_time = Utc::now();
        let span = info_span!(
            "invocation",
            request_id = %event.request_id,
            bucket = %event.bucket,
            key = %event.key
        );
        let _guard = span.enter();
        info!(config = %self.config.describe(), "Invocation started");

        let mut run = Invocation::new();
        match self.run(event, &mut run) {
            Ok(destinations) => {
                run.advance(ExecutorState::Done);
                info!(records = run.record_count, producers = destinations.len(), "Invocation succeeded");
                ExecutorResponse::Success(SuccessResultResponse {
                    envelope: ResponseEnvelope::new(event, request_time, 200),
                    destinations,
                    record_count: run.record_count,
                    validations: run.validations,
                    constraints: run.constraints,
                })
            }
            Err(err) => {
                let failed_in = run.state;
                run.advance(ExecutorState::Failed);
                error!(
                    state = %failed_in,
                    kind = %err.kind(),
                    reason = err.reason(),
                    error = %err,
                    "Invocation failed"
                );
                failure_response(event, request_time, run, &err)
            }
        }
    }

    fn run(&self, event: &InvocationEvent, run: &mut Invocation) -> TransformResult<Vec<ProducerReceipt>> {
        let catalog = self.config.load()?;
        let schema = catalog.resolve(event.file_name())?;
        info!(entry = %schema.name, "Resolved file entry");

        run.advance(ExecutorState::RetrievingFile);
        let body = self
            .collaborators
            .object_store
            .download(&event.bucket, &event.key)
            .map_err(|e| TransformError::source_file(&event.key, e.to_string()))?;
        let text = String::from_utf8_lossy(&body).into_owned();
        let scratch = self.scratch_dir()?;
        let source_path = scratch.path().join(event.file_name());
        fs::write(&source_path, &body)
            .map_err(|e| TransformError::service("work dir", format!("{}: {}", source_path.display(), e)))?;

        run.advance(ExecutorState::Parsing);
        let mut tables = parse_file(&schema.segments, &text, &event.key)?;
        run.record_count = tables.values().map(|t| t.row_count()).max().unwrap_or(0);

        run.advance(ExecutorState::CheckingConstraints);
        let env = ConstraintEnv {
            collaborators: &self.collaborators,
            event,
            source_path: &source_path,
            source_text: &text,
            tables: &tables,
        };
        check_constraints(&schema.constraints, &env, &mut run.constraints)?;

        run.advance(ExecutorState::Validating);
        let now = Utc::now();
        validate(&schema.validators, &self.rule_context(&tables, now), &mut run.validations)?;
        apply_converters(&schema.converters, &mut tables)?;

        run.advance(ExecutorState::BuildingResult);
        let records = build_records(schema, &tables, self, now, run)?;

        run.advance(ExecutorState::Producing);
        let context = ProducerContext::new(event.file_name(), &event.request_id);
        let registry = ProducerRegistry::from_specs(&schema.output.producers, &self.collaborators, &context);
        let receipts = registry.publish_all(&records).map_err(TransformError::from)?;
        Ok(receipts)
    }

    fn rule_context<'a>(&'a self, tables: &'a TableSet, now: DateTime<Utc>) -> RuleContext<'a> {
        RuleContext {
            tables,
            secrets: self.collaborators.secrets.as_ref(),
            relational: self.collaborators.relational.as_ref(),
            now,
        }
    }

    fn scratch_dir(&self) -> TransformResult<tempfile::TempDir> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("ledgerline-");
            builder
        };
        let created = match &self.work_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        };
        created.map_err(|e| TransformError::service("work dir", e.to_string()))
    }
}

fn build_records(
    schema: &FileSchema,
    tables: &TableSet,
    executor: &Executor,
    now: DateTime<Utc>,
    run: &mut Invocation,
) -> TransformResult<Vec<ledgerline_protocol::Record>> {
    let prepared = prepare(&schema.output, tables)?;
    validate(
        &schema.output.validators,
        &executor.rule_context(&prepared, now),
        &mut run.validations,
    )?;
    let records = transform(&schema.output, &prepared);
    run.record_count = records.len();
    info!(records = records.len(), groups = prepared.len(), "Built result records");
    Ok(records)
}

fn failure_response(
    event: &InvocationEvent,
    request_time: DateTime<Utc>,
    run: Invocation,
    err: &TransformError,
) -> ExecutorResponse {
    match err.kind() {
        ErrorKind::Validation => ExecutorResponse::ValidationError(ValidationErrorResponse {
            envelope: ResponseEnvelope::new(event, request_time, 400),
            record_count: run.record_count,
            failure_reason: err.reason().to_string(),
            validations: run.validations,
        }),
        ErrorKind::Constraint => ExecutorResponse::ConstraintError(ConstraintErrorResponse {
            envelope: ResponseEnvelope::new(event, request_time, 500),
            record_count: run.record_count,
            failure_reason: err.reason().to_string(),
            failure_message: err.to_string(),
            constraints: run.constraints,
        }),
        _ => ExecutorResponse::GenericError(GenericErrorResponse {
            envelope: ResponseEnvelope::new(event, request_time, 500),
            failure_reason: err.reason().to_string(),
            failure_message: err.to_string(),
            validations: run.validations,
            constraints: run.constraints,
        }),
    }
}
