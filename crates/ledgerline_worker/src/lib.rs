//! Ledgerline pipeline.
//!
//! Everything between "a file landed" and "records were produced":
//!
//! - [`config_source`]: where the schema document is loaded from
//! - [`parser`]: fixed-width slicing into segment tables
//! - [`constraints`]: Hash, Sql and FileReference checks against outside state
//! - [`rules`]: field validators over parsed and prepared tables
//! - [`convert`]: in-place field converters
//! - [`result`]: output groups and record construction
//! - [`executor`]: the per-invocation state machine tying the stages together

pub mod config_source;
pub mod constraints;
pub mod convert;
pub mod executor;
pub mod parser;
pub mod result;
pub mod rules;

pub use config_source::{ConfigSource, InlineConfigSource, LocalConfigSource, ObjectStoreConfigSource};
pub use constraints::{check_constraints, ConstraintEnv};
pub use convert::apply_converters;
pub use executor::{Executor, ExecutorState};
pub use parser::{parse_file, parse_segment};
pub use result::{prepare, transform};
pub use rules::{validate, RuleContext};
