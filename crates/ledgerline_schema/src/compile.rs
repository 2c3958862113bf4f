//! Strict compilation of raw file entries into [`FileSchema`]s.
//!
//! Every problem in an entry is collected. One problem is returned as-is so
//! its kind survives (`MissingConfig`, `ConstraintMisconfiguration`, ...);
//! several are folded into a single `InvalidConfig` listing all of them.

use ledgerline_protocol::defaults::ALL_FIELDS;
use ledgerline_protocol::{RuleOrigin, TransformError, TransformResult};
use regex::Regex;
use serde_yaml::Mapping;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::debug;

use crate::catalog::FileSchema;
use crate::constraints::{compile_constraint, ConstraintContext};
use crate::model::{apply_skip_rows, ColumnRange, FieldRef, FieldSpec, ParserKind, SegmentSpec};
use crate::output::{
    check_formatter, compile_producer, FieldSource, ResultFieldSpec, ResultGroup, ResultSchema,
};
use crate::raw::{RawFileEntry, RawResultField, RawRule, RawSegment};
use crate::rules::{compile_validator, ConversionRule, ConverterKind, ValidationRule, ValidatorKind};

pub(crate) struct Issues {
    context: String,
    errors: Vec<TransformError>,
}

impl Issues {
    pub(crate) fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn check<T>(&mut self, result: TransformResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.errors.push(err);
                None
            }
        }
    }

    pub(crate) fn push(&mut self, err: TransformError) {
        self.errors.push(err);
    }

    pub(crate) fn finish(mut self) -> TransformResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            n => Err(TransformError::invalid_config(format!(
                "{}: {} configuration errors: {}",
                self.context,
                n,
                self.errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            ))),
        }
    }
}

fn mapping_key(key: &serde_yaml::Value) -> TransformResult<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        other => Err(TransformError::invalid_config(format!(
            "mapping key {:?} must be a string",
            other
        ))),
    }
}

fn raw_segments(mapping: &Mapping) -> TransformResult<Vec<(String, RawSegment)>> {
    mapping
        .iter()
        .map(|(key, value)| {
            let name = mapping_key(key)?;
            let segment: RawSegment = serde_yaml::from_value(value.clone()).map_err(|e| {
                TransformError::invalid_config(format!("segment '{}': {}", name, e))
            })?;
            Ok((name, segment))
        })
        .collect()
}

fn field_range(segment: &str, field: &crate::raw::RawField) -> TransformResult<ColumnRange> {
    match &field.spec {
        Some(serde_json::Value::String(spec)) => spec.parse::<ColumnRange>().map_err(|e| {
            TransformError::invalid_config(format!("{}.{}: {}", segment, field.name, e))
        }),
        Some(other) => Err(TransformError::invalid_config(format!(
            "{}.{}: column spec must be a \"start,end\" string, got {}",
            segment, field.name, other
        ))),
        None => Err(TransformError::invalid_config(format!(
            "{}.{}: column spec is missing",
            segment, field.name
        ))),
    }
}

fn segment_spec(name: &str, raw: &RawSegment, issues: &mut Issues) -> Option<SegmentSpec> {
    let kind = issues.check(ParserKind::from_formatter(&raw.formatter).ok_or_else(|| {
        TransformError::invalid_config(format!(
            "segment '{}': unknown formatter '{}'",
            name, raw.formatter
        ))
    }));
    if raw.format.is_empty() {
        issues.push(TransformError::invalid_config(format!(
            "segment '{}' declares no fields",
            name
        )));
    }
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(raw.format.len());
    for field in &raw.format {
        if !seen.insert(field.name.as_str()) {
            issues.push(TransformError::invalid_config(format!(
                "segment '{}' has duplicate field '{}'",
                name, field.name
            )));
        }
        if let Some(range) = issues.check(field_range(name, field)) {
            fields.push(FieldSpec::new(field.name.clone(), range));
        }
    }
    Some(SegmentSpec {
        name: name.to_string(),
        kind: kind?,
        fields,
        skip_header_row: false,
        skip_footer_row: false,
    })
}

/// Compile a segment map (the `source` section, or a reference file format).
pub fn compile_segments(mapping: &Mapping) -> TransformResult<Vec<SegmentSpec>> {
    let mut issues = Issues::new("segments");
    let segments = build_segments(&raw_segments(mapping)?, &mut issues);
    issues.finish()?;
    Ok(segments)
}

fn build_segments(raw: &[(String, RawSegment)], issues: &mut Issues) -> Vec<SegmentSpec> {
    if raw.is_empty() {
        issues.push(TransformError::invalid_config(
            "a schema must declare at least one segment",
        ));
    }
    let mut segments: Vec<SegmentSpec> = raw
        .iter()
        .filter_map(|(name, segment)| segment_spec(name, segment, issues))
        .collect();
    apply_skip_rows(&mut segments);
    segments
}

/// Known `segment -> fields` for reference checks.
struct FieldCatalog {
    fields: BTreeMap<String, Vec<String>>,
}

impl FieldCatalog {
    fn from_segments(segments: &[SegmentSpec]) -> Self {
        Self {
            fields: segments
                .iter()
                .map(|s| (s.name.clone(), s.field_names().map(String::from).collect()))
                .collect(),
        }
    }

    fn from_groups(groups: &[ResultGroup]) -> Self {
        Self {
            fields: groups
                .iter()
                .map(|g| {
                    (
                        g.name.clone(),
                        g.fields.iter().map(|f| f.output_name.clone()).collect(),
                    )
                })
                .collect(),
        }
    }

    fn check(&self, context: &str, reference: &FieldRef) -> TransformResult<()> {
        match self.fields.get(&reference.segment) {
            None => Err(TransformError::invalid_config(format!(
                "{} references unknown segment '{}'",
                context, reference.segment
            ))),
            Some(fields) if !fields.iter().any(|f| f == &reference.field) => {
                Err(TransformError::invalid_config(format!(
                    "{} references unknown field '{}'",
                    context, reference
                )))
            }
            Some(_) => Ok(()),
        }
    }

    fn check_rule(&self, rule: &ValidationRule) -> TransformResult<()> {
        let context = rule.to_string();
        let whole_segment = matches!(rule.kind, ValidatorKind::NaN | ValidatorKind::NaNOnly)
            && rule.field.eq_ignore_ascii_case(ALL_FIELDS);
        if !whole_segment {
            self.check(&context, &FieldRef::new(&rule.segment, &rule.field))?;
        }
        if let ValidatorKind::DuplicateGrouped { ref_field } = &rule.kind {
            self.check(&context, &FieldRef::new(&rule.segment, ref_field))?;
        }
        for reference in rule.kind.references() {
            self.check(&context, &reference)?;
        }
        Ok(())
    }
}

fn compile_rules(
    origin: RuleOrigin,
    segment: &str,
    field: &str,
    rules: &[RawRule],
    issues: &mut Issues,
) -> Vec<ValidationRule> {
    rules
        .iter()
        .filter_map(|raw| {
            let kind = compile_validator(&raw.name, &raw.merged_arguments()).map_err(|e| {
                match e {
                    TransformError::InvalidConfig(message) => TransformError::InvalidConfig(
                        format!("{}.{}: {}", segment, field, message),
                    ),
                    other => other,
                }
            });
            issues.check(kind).map(|kind| ValidationRule {
                origin,
                segment: segment.to_string(),
                field: field.to_string(),
                kind,
            })
        })
        .collect()
}

fn load_format(
    format: &Mapping,
    base_dir: Option<&Path>,
) -> TransformResult<Mapping> {
    let include = format.get("include");
    match include {
        Some(serde_yaml::Value::String(path)) => {
            let text = crate::read_relative(base_dir, path).map_err(TransformError::InvalidConfig)?;
            serde_yaml::from_str(&text).map_err(|e| {
                TransformError::invalid_config(format!(
                    "included result format {} is not a group map: {}",
                    path, e
                ))
            })
        }
        Some(_) => Err(TransformError::invalid_config(
            "result format include must be a path",
        )),
        None => Ok(format.clone()),
    }
}

fn compile_output(
    raw: &RawFileEntry,
    sources: &FieldCatalog,
    base_dir: Option<&Path>,
    issues: &mut Issues,
) -> Option<ResultSchema> {
    let Some(output) = &raw.output else {
        issues.push(TransformError::missing_config(
            "output section is missing in configuration",
        ));
        return None;
    };
    issues.check(check_formatter(output.formatter.as_deref()));

    let producers: Vec<_> = output
        .producer
        .clone()
        .map(|p| p.into_vec())
        .unwrap_or_default()
        .iter()
        .filter_map(|p| issues.check(compile_producer(&p.name, &p.merged_arguments())))
        .collect();
    if output.producer.is_none() {
        issues.push(TransformError::missing_config(
            "output must declare at least one producer",
        ));
    }

    let mut groups = Vec::new();
    let mut validators = Vec::new();
    let format = match &output.format {
        Some(format) => issues.check(load_format(format, base_dir))?,
        None => Mapping::new(),
    };
    for (key, value) in &format {
        let Some(group_name) = issues.check(mapping_key(key)) else {
            continue;
        };
        let raw_fields: Vec<RawResultField> =
            match issues.check(serde_yaml::from_value(value.clone()).map_err(|e| {
                TransformError::invalid_config(format!("result group '{}': {}", group_name, e))
            })) {
                Some(fields) => fields,
                None => continue,
            };
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(raw_fields.len());
        for field in &raw_fields {
            if !seen.insert(field.name.as_str()) {
                issues.push(TransformError::invalid_config(format!(
                    "result group '{}' has duplicate field '{}'",
                    group_name, field.name
                )));
            }
            let source = issues.check(FieldSource::parse(&field.value));
            if let Some(FieldSource::Reference(reference)) = &source {
                issues.check(sources.check(
                    &format!("result field {}.{}", group_name, field.name),
                    reference,
                ));
            }
            if let Some(source) = source {
                fields.push(ResultFieldSpec {
                    output_name: field.name.clone(),
                    source,
                });
            }
            validators.extend(compile_rules(
                RuleOrigin::Result,
                &group_name,
                &field.name,
                &field.validators,
                issues,
            ));
        }
        groups.push(ResultGroup {
            name: group_name,
            fields,
        });
    }

    let prepared = if groups.is_empty() {
        None
    } else {
        Some(FieldCatalog::from_groups(&groups))
    };
    for rule in &validators {
        // Without groups the prepared set is the source tables themselves.
        let catalog = prepared.as_ref().unwrap_or(sources);
        issues.check(catalog.check_rule(rule));
    }

    Some(ResultSchema {
        groups,
        validators,
        producers,
    })
}

/// Compile one `files` entry.
pub fn compile_entry(
    name: &str,
    raw: &RawFileEntry,
    base_dir: Option<&Path>,
) -> TransformResult<FileSchema> {
    let mut issues = Issues::new(format!("file entry '{}'", name));

    let pattern = issues.check(
        Regex::new(&format!("^(?:{})", raw.pattern)).map_err(|e| {
            TransformError::invalid_config(format!("pattern '{}': {}", raw.pattern, e))
        }),
    );

    let raw_source = match &raw.source {
        Some(mapping) if !mapping.is_empty() => issues.check(raw_segments(mapping)),
        Some(_) => {
            issues.push(TransformError::invalid_config("source segment cannot be empty"));
            None
        }
        None => {
            issues.push(TransformError::invalid_config(
                "source segment is missing in configuration",
            ));
            None
        }
    }
    .unwrap_or_default();
    let segments = if raw_source.is_empty() {
        Vec::new()
    } else {
        build_segments(&raw_source, &mut issues)
    };
    let sources = FieldCatalog::from_segments(&segments);

    let mut validators = Vec::new();
    let mut converters = Vec::new();
    for (segment, raw_segment) in &raw_source {
        for field in &raw_segment.format {
            validators.extend(compile_rules(
                RuleOrigin::Source,
                segment,
                &field.name,
                &field.validators,
                &mut issues,
            ));
            if let Some(converter) = &field.converter {
                if let Some(kind) = issues.check(ConverterKind::from_name(converter.name())) {
                    converters.push(ConversionRule {
                        segment: segment.clone(),
                        field: field.name.clone(),
                        kind,
                    });
                }
            }
        }
    }
    for rule in &validators {
        issues.check(sources.check_rule(rule));
    }

    let ctx = ConstraintContext {
        base_dir,
        source_segments: &segments,
    };
    let constraints: Vec<_> = raw
        .constraints
        .clone()
        .map(|c| c.into_vec())
        .unwrap_or_default()
        .iter()
        .filter_map(|rule| issues.check(compile_constraint(&rule.name, &rule.merged_arguments(), &ctx)))
        .collect();

    let output = compile_output(raw, &sources, base_dir, &mut issues);

    issues.finish()?;
    let (Some(pattern), Some(output)) = (pattern, output) else {
        return Err(TransformError::invalid_config(format!(
            "file entry '{}' is incomplete",
            name
        )));
    };
    debug!(
        entry = %name,
        segments = segments.len(),
        validators = validators.len(),
        constraints = constraints.len(),
        "Compiled file entry"
    );
    Ok(FileSchema {
        name: name.to_string(),
        pattern,
        segments,
        validators,
        converters,
        constraints,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(yaml: &str) -> TransformResult<FileSchema> {
        let raw: RawFileEntry = serde_yaml::from_str(yaml).unwrap();
        compile_entry("test", &raw, None)
    }

    const BASE: &str = r#"
pattern: ^PAY_\d+\.txt$
source:
  header:
    formatter: HeaderSourceFormatter
    format:
      - name: kind
        spec: "0,1"
  body:
    formatter: body
    format:
      - name: id
        spec: "0,3"
        validators:
          - name: Unique
      - name: amount
        spec: "3,8"
        converter: ToNumber
  footer:
    formatter: footer
    format:
      - name: count
        spec: "1,6"
        validators:
          - name: RefValidator
            arguments: {type: count, ref: body.id}
output:
  producer:
    name: ConsoleResult
  format:
    root:
      - name: id
        value: body.id
      - name: kind
        value: header.kind
      - name: uid
        value: UuidGenerator
"#;

    #[test]
    fn compiles_full_entry() {
        let schema = entry(BASE).unwrap();
        assert_eq!(schema.segments.len(), 3);
        let body = schema.segment("body").unwrap();
        assert!(body.skip_header_row && body.skip_footer_row);
        assert_eq!(schema.validators.len(), 2);
        assert_eq!(schema.converters.len(), 1);
        assert_eq!(schema.output.groups[0].fields.len(), 3);
        assert!(schema.matches("PAY_1.txt"));
        assert!(!schema.matches("archive/PAY_1.txt"));
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let yaml = BASE.replace("value: body.id", "value: body.missing");
        let err = entry(&yaml).unwrap_err();
        assert!(err.to_string().contains("body.missing"));
    }

    #[test]
    fn multiple_problems_fold_into_invalid_config() {
        let yaml = BASE
            .replace("name: Unique", "name: Uniq")
            .replace("name: ConsoleResult", "name: Kinesis");
        let err = entry(&yaml).unwrap_err();
        match err {
            TransformError::InvalidConfig(message) => {
                assert!(message.contains("2 configuration errors"), "{message}");
                assert!(message.contains("Uniq"));
                assert!(message.contains("Kinesis"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn duplicate_field_names_are_rejected() {
        let yaml = BASE.replace("name: amount", "name: id");
        assert!(entry(&yaml).is_err());
    }

    #[test]
    fn missing_producer_is_missing_config() {
        let yaml = BASE.replace("  producer:\n    name: ConsoleResult\n", "");
        assert!(matches!(entry(&yaml), Err(TransformError::MissingConfig(_))));
    }

    #[test]
    fn non_string_spec_is_rejected() {
        let yaml = BASE.replace("spec: \"0,1\"", "spec: 1");
        assert!(matches!(entry(&yaml), Err(TransformError::InvalidConfig(_))));
    }
}
