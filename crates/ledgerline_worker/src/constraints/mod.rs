//! Constraint engine.
//!
//! Constraints compare the parsed file against outside evidence: a companion
//! digest, a relational lookup, or a second reference file. Every declared
//! constraint runs, in order. Each returns the data failures it found; those
//! are collected and raised together once all constraints have run.
//! Misconfiguration and collaborator errors abort at once.

mod file_reference;
mod hash;
mod sql;

use ledgerline_protocol::{
    Collaborators, ConstraintFailure, ConstraintOutcome, InvocationEvent, TableSet,
    TransformError, TransformResult,
};
use ledgerline_schema::{ConstraintKind, ConstraintRule};
use std::path::Path;
use tracing::{info, warn};

pub use file_reference::composite_keys;
pub use sql::render_query;

/// What the constraints of one invocation can see.
pub struct ConstraintEnv<'a> {
    pub collaborators: &'a Collaborators,
    pub event: &'a InvocationEvent,
    /// Local copy of the source file, handed to the hash function.
    pub source_path: &'a Path,
    pub source_text: &'a str,
    pub tables: &'a TableSet,
}

/// Run every constraint, recording one outcome per constraint.
pub fn check_constraints(
    rules: &[ConstraintRule],
    env: &ConstraintEnv<'_>,
    outcomes: &mut Vec<ConstraintOutcome>,
) -> TransformResult<()> {
    let mut collected: Vec<ConstraintFailure> = Vec::new();
    for rule in rules {
        let failures = match &rule.kind {
            ConstraintKind::Hash(check) => hash::check(&rule.name, check, env)?,
            ConstraintKind::Sql(check) => sql::check(&rule.name, check, env)?,
            ConstraintKind::FileReference(check) => file_reference::check(&rule.name, check, env)?,
        };
        if failures.is_empty() {
            info!(constraint = %rule.name, kind = rule.kind.name(), "Constraint passed");
            outcomes.push(ConstraintOutcome::passed(&rule.name));
        } else {
            warn!(
                constraint = %rule.name,
                kind = rule.kind.name(),
                failures = failures.len(),
                "Constraint failed"
            );
            outcomes.push(ConstraintOutcome::failed(&rule.name, failures.clone()));
            collected.extend(failures);
        }
    }

    match collected.len() {
        0 => Ok(()),
        1 => Err(TransformError::FailedConstraint(collected.remove(0))),
        _ => Err(TransformError::FailedConstraints(collected)),
    }
}
