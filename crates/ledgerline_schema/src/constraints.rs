//! Constraint family: Hash, Sql and FileReference checks.

use ledgerline_protocol::defaults::{DEFAULT_HASH_FUNCTION, DEFAULT_SQL_ENGINE, DEFAULT_SQL_PORT};
use ledgerline_protocol::{TransformError, TransformResult};
use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

use crate::args::{ArgumentOwner, Arguments};
use crate::model::{ColumnRange, FieldSpec, SegmentSpec};
use crate::naming::{compile_companion, CompanionFile};

#[derive(Debug, Clone)]
pub struct HashCheck {
    pub bucket: String,
    pub companion: CompanionFile,
    pub algorithm: String,
    pub max_wait: Duration,
    pub wait_interval: Duration,
    pub function_name: String,
    pub use_line_ending_conversion: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlConnectionArgs {
    pub secret_name: String,
    pub engine: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

/// Where `{token}` values of a Sql constraint query come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlSourceBinding {
    /// Only `{file_name}` is available.
    None,
    /// First row of a parsed source segment.
    Segment(String),
    /// Inline column specs applied to the first line of the source file.
    Inline(Vec<FieldSpec>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlCheck {
    pub connection: SqlConnectionArgs,
    pub query: String,
    pub binding: SqlSourceBinding,
    pub date_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPair {
    pub source: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateKeys {
    pub source: String,
    pub reference: String,
}

/// One segment-pair comparison of the FileReference constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentCheckRule {
    pub source_segment: String,
    pub ref_segment: String,
    pub aggregate: Option<AggregateKeys>,
    pub fields: Vec<FieldPair>,
}

impl SegmentCheckRule {
    /// Columns concatenated into the source composite, aggregate key first.
    pub fn source_columns(&self) -> Vec<&str> {
        self.aggregate
            .iter()
            .map(|a| a.source.as_str())
            .chain(self.fields.iter().map(|f| f.source.as_str()))
            .collect()
    }

    pub fn reference_columns(&self) -> Vec<&str> {
        self.aggregate
            .iter()
            .map(|a| a.reference.as_str())
            .chain(self.fields.iter().map(|f| f.reference.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct FileReferenceCheck {
    pub bucket: String,
    pub companion: CompanionFile,
    pub reference_segments: Vec<SegmentSpec>,
    pub rules: Vec<SegmentCheckRule>,
}

#[derive(Debug, Clone)]
pub enum ConstraintKind {
    Hash(HashCheck),
    Sql(SqlCheck),
    FileReference(FileReferenceCheck),
}

impl ConstraintKind {
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintKind::Hash(_) => "Hash",
            ConstraintKind::Sql(_) => "Sql",
            ConstraintKind::FileReference(_) => "FileReference",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstraintRule {
    /// Name as written in the document.
    pub name: String,
    pub kind: ConstraintKind,
}

/// Inputs the constraint compiler needs from the enclosing file entry.
pub struct ConstraintContext<'a> {
    pub base_dir: Option<&'a Path>,
    pub source_segments: &'a [SegmentSpec],
}

fn canonical_constraint(name: &str) -> Option<&'static str> {
    match name {
        "Hash" | "HashConstraint" => Some("Hash"),
        "Sql" | "SqlConstraint" => Some("Sql"),
        "FileReference" | "S3FileRefConstraint" | "FileRefConstraint" => Some("FileReference"),
        _ => None,
    }
}

pub fn compile_constraint(
    name: &str,
    values: &Map<String, Value>,
    ctx: &ConstraintContext<'_>,
) -> TransformResult<ConstraintRule> {
    let canonical = canonical_constraint(name)
        .ok_or_else(|| TransformError::invalid_config(format!("Unknown constraint '{}'", name)))?;
    let args = Arguments::new(ArgumentOwner::Constraint, name, values);
    let kind = match canonical {
        "Hash" => ConstraintKind::Hash(compile_hash(&args)?),
        "Sql" => ConstraintKind::Sql(compile_sql(&args, ctx)?),
        _ => ConstraintKind::FileReference(compile_file_reference(&args, ctx)?),
    };
    Ok(ConstraintRule {
        name: name.to_string(),
        kind,
    })
}

fn seconds(args: &Arguments<'_>, key: &str) -> TransformResult<Duration> {
    let value = args.required_f64(&[key])?;
    if !value.is_finite() || value < 0.0 {
        return Err(args.invalid(key, "must be a non-negative number of seconds"));
    }
    Ok(Duration::from_secs_f64(value))
}

fn compile_hash(args: &Arguments<'_>) -> TransformResult<HashCheck> {
    let bucket = args.required_text(&["bucket"])?;
    let algorithm = args.required_text(&["algorithm"])?;
    let max_wait = seconds(args, "max_wait_time")?;
    let wait_interval = seconds(args, "wait_interval")?;
    if wait_interval.is_zero() {
        return Err(args.invalid("wait_interval", "must be greater than zero"));
    }
    let companion = compile_companion(args)?;
    if let CompanionFile::Derived(template) = &companion {
        if template.uses_source_fields() {
            return Err(args.invalid(
                "file_config",
                "${segment.field} tokens are only available to FileReference constraints",
            ));
        }
    }
    Ok(HashCheck {
        bucket,
        companion,
        algorithm,
        max_wait,
        wait_interval,
        function_name: args
            .optional_text(&["function_name"])?
            .unwrap_or_else(|| DEFAULT_HASH_FUNCTION.to_string()),
        use_line_ending_conversion: args.flag("use_line_ending_conversion")?,
    })
}

/// Parse `"(0,5),(5,10)"` style inline specs.
fn parse_colspecs(args: &Arguments<'_>, raw: &str) -> TransformResult<Vec<ColumnRange>> {
    let pattern = Regex::new(r"\(\s*(\d+)\s*,\s*(\d+)\s*\)")
        .map_err(|e| args.invalid("source_colspecs", e.to_string()))?;
    pattern
        .captures_iter(raw)
        .map(|caps| {
            let start = caps[1].parse::<usize>();
            let end = caps[2].parse::<usize>();
            match (start, end) {
                (Ok(start), Ok(end)) => ColumnRange::new(start, end)
                    .map_err(|e| args.invalid("source_colspecs", e.to_string())),
                _ => Err(args.invalid("source_colspecs", format!("'{}' is malformed", raw))),
            }
        })
        .collect()
}

fn compile_sql(args: &Arguments<'_>, ctx: &ConstraintContext<'_>) -> TransformResult<SqlCheck> {
    let port = match args.optional_usize(&["database_port"])? {
        Some(port) => u16::try_from(port)
            .map_err(|_| args.invalid("database_port", format!("{} is out of range", port)))?,
        None => DEFAULT_SQL_PORT,
    };
    let connection = SqlConnectionArgs {
        secret_name: args.required_text(&["secret_name"])?,
        engine: args
            .optional_text(&["database_engine"])?
            .map(|engine| engine.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_SQL_ENGINE.to_string()),
        host: args.required_text(&["database_host"])?,
        port,
        database: args.required_text(&["database_name"])?,
    };
    let query = args.required_str(&["query"])?;

    let colnames = args.string_list(&["source_colnames"])?;
    let colspecs = match args.optional_text(&["source_colspecs"])? {
        Some(raw) => parse_colspecs(args, &raw)?,
        None => Vec::new(),
    };
    let binding = match args.optional_text(&["source_data_segment"])? {
        None => SqlSourceBinding::None,
        Some(segment) if !colnames.is_empty() || !colspecs.is_empty() => {
            if colnames.len() != colspecs.len() {
                return Err(args.invalid(
                    "source_colspecs",
                    format!(
                        "{} column names but {} column specs for segment {}",
                        colnames.len(),
                        colspecs.len(),
                        segment
                    ),
                ));
            }
            SqlSourceBinding::Inline(
                colnames
                    .into_iter()
                    .zip(colspecs)
                    .map(|(name, range)| FieldSpec::new(name, range))
                    .collect(),
            )
        }
        Some(segment) if segment == "file_name" => SqlSourceBinding::None,
        Some(segment) => {
            if !ctx.source_segments.iter().any(|s| s.name == segment) {
                return Err(args.invalid(
                    "source_data_segment",
                    format!("unknown segment '{}'", segment),
                ));
            }
            SqlSourceBinding::Segment(segment)
        }
    };

    Ok(SqlCheck {
        connection,
        query,
        binding,
        date_format: args.optional_text(&["source_date_format"])?,
    })
}

fn load_reference_format(
    args: &Arguments<'_>,
    ctx: &ConstraintContext<'_>,
) -> TransformResult<serde_yaml::Mapping> {
    match args.get(&["format"]) {
        Some(Value::String(path)) => {
            let text = crate::read_relative(ctx.base_dir, path)
                .map_err(|e| args.invalid("format", e))?;
            serde_yaml::from_str(&text).map_err(|e| {
                args.invalid("format", format!("{} is not a segment map: {}", path, e))
            })
        }
        Some(value @ Value::Object(_)) => serde_yaml::to_value(value)
            .and_then(serde_yaml::from_value)
            .map_err(|e| args.invalid("format", e.to_string())),
        Some(_) => Err(args.invalid("format", "expected a path or a segment map")),
        None => Err(args.missing("format")),
    }
}

fn compile_check_rule(args: &Arguments<'_>, value: &Value) -> TransformResult<SegmentCheckRule> {
    let map = match value {
        Value::Object(map) if !map.is_empty() => map,
        _ => return Err(args.invalid("config", "Provided segment config is empty")),
    };
    let rule = Arguments::new(ArgumentOwner::Constraint, args.rule(), map);
    let source_segment = rule.required_text(&["source_segment"])?;
    let ref_segment = rule.required_text(&["ref_segment"])?;
    let source_aggregate = rule.optional_text(&["source_aggregate"])?.unwrap_or_default();
    let ref_aggregate = rule.optional_text(&["ref_aggregate"])?.unwrap_or_default();
    let aggregate = match (source_aggregate.is_empty(), ref_aggregate.is_empty()) {
        (true, true) => None,
        (false, false) => Some(AggregateKeys {
            source: source_aggregate,
            reference: ref_aggregate,
        }),
        _ => {
            return Err(TransformError::misconfigured(
                args.rule(),
                format!(
                    "Field {}:{} source_aggregate or ref_aggregate. Both must be provided.",
                    source_segment, ref_segment
                ),
            ))
        }
    };
    let fields = match rule.get(&["fields"]) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Object(pair) => {
                    let pair = Arguments::new(ArgumentOwner::Constraint, args.rule(), pair);
                    Ok(FieldPair {
                        source: pair.required_text(&["source"])?,
                        reference: pair.required_text(&["ref"])?,
                    })
                }
                _ => Err(rule.invalid("fields", "entries must be {source, ref} mappings")),
            })
            .collect::<TransformResult<Vec<_>>>()?,
        Some(_) => return Err(rule.invalid("fields", "expected a list")),
        None => return Err(rule.missing("fields")),
    };
    if fields.is_empty() && aggregate.is_none() {
        return Err(rule.invalid("fields", "nothing to compare"));
    }
    Ok(SegmentCheckRule {
        source_segment,
        ref_segment,
        aggregate,
        fields,
    })
}

fn check_columns(
    args: &Arguments<'_>,
    segments: &[SegmentSpec],
    segment: &str,
    columns: &[&str],
    side: &str,
) -> TransformResult<()> {
    let spec = segments.iter().find(|s| s.name == segment).ok_or_else(|| {
        TransformError::misconfigured(
            args.rule(),
            format!("{} segment '{}' is not defined", side, segment),
        )
    })?;
    for column in columns {
        if spec.field(column).is_none() {
            return Err(TransformError::misconfigured(
                args.rule(),
                format!("{} segment '{}' has no field '{}'", side, segment, column),
            ));
        }
    }
    Ok(())
}

fn compile_file_reference(
    args: &Arguments<'_>,
    ctx: &ConstraintContext<'_>,
) -> TransformResult<FileReferenceCheck> {
    let bucket = args.required_text(&["bucket"])?;
    let companion = compile_companion(args)?;
    for field in companion.field_refs() {
        check_columns(args, ctx.source_segments, &field.segment, &[&field.field], "source")?;
    }
    let format = load_reference_format(args, ctx)?;
    let reference_segments = crate::compile::compile_segments(&format)
        .map_err(|e| TransformError::misconfigured(args.rule(), format!("reference format: {}", e)))?;

    let rules = match args.get(&["config", "rules"]) {
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|item| compile_check_rule(args, item))
            .collect::<TransformResult<Vec<_>>>()?,
        Some(_) => return Err(args.invalid("config", "expected a non-empty list of segment rules")),
        None => return Err(args.missing("config")),
    };
    for rule in &rules {
        check_columns(
            args,
            ctx.source_segments,
            &rule.source_segment,
            &rule.source_columns(),
            "source",
        )?;
        check_columns(
            args,
            &reference_segments,
            &rule.ref_segment,
            &rule.reference_columns(),
            "reference",
        )?;
    }

    Ok(FileReferenceCheck {
        bucket,
        companion,
        reference_segments,
        rules,
    })
}
