//! Ledgerline schema documents.
//!
//! A schema document maps file-name patterns to the full processing recipe for
//! matching files: segment layouts, field validators and converters,
//! constraints, the result template and its producers.
//!
//! Loading is two-phase. [`raw`] mirrors the YAML permissively; [`compile`]
//! then resolves every rule name into a closed enum and checks every argument
//! and `segment.field` reference. Anything wrong with the document surfaces
//! here, before a single byte of the input file is read.
//!
//! # Modules
//!
//! - [`model`]: segment and field layout
//! - [`rules`]: validators and converters
//! - [`constraints`]: Hash, Sql and FileReference checks
//! - [`naming`]: companion file naming templates
//! - [`output`]: result groups, generators and producers
//! - [`catalog`]: compiled documents and pattern resolution

pub mod args;
pub mod catalog;
pub mod compile;
pub mod constraints;
pub mod model;
pub mod naming;
pub mod output;
pub mod raw;
pub mod rules;

pub use catalog::{FileSchema, SchemaCatalog};
pub use compile::compile_segments;
pub use constraints::{
    AggregateKeys, ConstraintKind, ConstraintRule, FieldPair, FileReferenceCheck, HashCheck,
    SegmentCheckRule, SqlCheck, SqlConnectionArgs, SqlSourceBinding,
};
pub use model::{ColumnRange, FieldRef, FieldSpec, ParserKind, SegmentSpec};
pub use naming::{CompanionFile, FileNameTemplate, Replacement};
pub use output::{
    BlobFormat, BrokerTarget, FieldSource, GeneratorKind, ProducerSpec, ResultFieldSpec,
    ResultGroup, ResultSchema,
};
pub use rules::{
    compile_validator, Condition, ConditionalAggregate, ConversionRule, ConverterKind,
    CountDirection, DateMode, RefMode, RegexMode, SqlLookup, ValidationRule, ValidatorKind,
};

use std::path::{Path, PathBuf};

/// Read a file named in the document, relative to the document's directory.
pub(crate) fn read_relative(base_dir: Option<&Path>, path: &str) -> Result<String, String> {
    let candidate = Path::new(path);
    let resolved: PathBuf = match base_dir {
        Some(base) if candidate.is_relative() => base.join(candidate),
        _ => candidate.to_path_buf(),
    };
    std::fs::read_to_string(&resolved)
        .map_err(|e| format!("cannot read {}: {}", resolved.display(), e))
}
