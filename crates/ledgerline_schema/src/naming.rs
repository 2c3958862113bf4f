//! Companion file naming (`file_name` / `file_config`).
//!
//! A derived name starts from `result_file_name`, expands any
//! `${segment.field}` or `${segment.field[start,end]}` tokens from the first
//! row of the parsed source tables, then substitutes the `replacement_text`
//! placeholders with the capture groups `extraction_regex` finds in the
//! source file's basename.

use ledgerline_protocol::{TableSet, TransformError, TransformResult};
use regex::Regex;

use crate::args::Arguments;
use crate::model::FieldRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// Replaced by the first capture.
    Single(String),
    /// Replaced pairwise by the captures, which must match in number.
    Many(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameToken {
    Literal(String),
    Field {
        field: FieldRef,
        slice: Option<(usize, usize)>,
    },
}

#[derive(Debug, Clone)]
pub struct FileNameTemplate {
    extraction: Regex,
    replacement: Replacement,
    tokens: Vec<NameToken>,
}

impl FileNameTemplate {
    pub fn uses_source_fields(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t, NameToken::Field { .. }))
    }

    /// Source fields the template reads.
    pub fn field_refs(&self) -> impl Iterator<Item = &FieldRef> {
        self.tokens.iter().filter_map(|t| match t {
            NameToken::Field { field, .. } => Some(field),
            NameToken::Literal(_) => None,
        })
    }

    pub fn render(
        &self,
        constraint: &str,
        source_name: &str,
        tables: Option<&TableSet>,
    ) -> TransformResult<String> {
        let mut name = String::new();
        for token in &self.tokens {
            match token {
                NameToken::Literal(text) => name.push_str(text),
                NameToken::Field { field, slice } => {
                    let value = tables
                        .and_then(|t| t.get(&field.segment))
                        .and_then(|table| table.cell(0, &field.field))
                        .map(|cell| cell.to_string())
                        .ok_or_else(|| {
                            TransformError::misconfigured(
                                constraint,
                                format!("file name token ${{{}}} has no source value", field),
                            )
                        })?;
                    match slice {
                        Some((start, end)) => {
                            name.extend(value.chars().skip(*start).take(end.saturating_sub(*start)))
                        }
                        None => name.push_str(&value),
                    }
                }
            }
        }

        let captures = self.extraction.captures(source_name).ok_or_else(|| {
            TransformError::misconfigured(
                constraint,
                format!(
                    "No matches found matching extraction regex [{}] in '{}'",
                    self.extraction.as_str(),
                    source_name
                ),
            )
        })?;
        let matches: Vec<String> = if captures.len() > 1 {
            captures
                .iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect()
        } else {
            vec![captures[0].to_string()]
        };

        match &self.replacement {
            Replacement::Single(placeholder) => {
                name = name.replace(placeholder.as_str(), &matches[0]);
            }
            Replacement::Many(placeholders) => {
                if placeholders.len() != matches.len() {
                    return Err(TransformError::misconfigured(
                        constraint,
                        format!(
                            "replacement_text has {} entries but extraction regex captured {}",
                            placeholders.len(),
                            matches.len()
                        ),
                    ));
                }
                for (placeholder, value) in placeholders.iter().zip(&matches) {
                    name = name.replace(placeholder.as_str(), value);
                }
            }
        }
        Ok(name)
    }
}

/// Where a constraint finds its companion object.
#[derive(Debug, Clone)]
pub enum CompanionFile {
    Named(String),
    Derived(FileNameTemplate),
}

impl CompanionFile {
    pub fn resolve(
        &self,
        constraint: &str,
        source_name: &str,
        tables: Option<&TableSet>,
    ) -> TransformResult<String> {
        match self {
            CompanionFile::Named(name) => Ok(name.clone()),
            CompanionFile::Derived(template) => template.render(constraint, source_name, tables),
        }
    }

    pub fn field_refs(&self) -> Vec<FieldRef> {
        match self {
            CompanionFile::Named(_) => Vec::new(),
            CompanionFile::Derived(template) => template.field_refs().cloned().collect(),
        }
    }
}

fn parse_tokens(args: &Arguments<'_>, template: &str) -> TransformResult<Vec<NameToken>> {
    let mut tokens = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        if start > 0 {
            tokens.push(NameToken::Literal(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| args.invalid("result_file_name", "unterminated ${ token"))?;
        let body = &after[..end];
        let (reference, slice) = match body.split_once('[') {
            Some((reference, range)) => {
                let range = range.strip_suffix(']').ok_or_else(|| {
                    args.invalid("result_file_name", format!("malformed slice in ${{{}}}", body))
                })?;
                let (s, e) = range.split_once(',').ok_or_else(|| {
                    args.invalid("result_file_name", format!("malformed slice in ${{{}}}", body))
                })?;
                let s = s.trim().parse::<usize>();
                let e = e.trim().parse::<usize>();
                match (s, e) {
                    (Ok(s), Ok(e)) => (reference, Some((s, e))),
                    _ => {
                        return Err(args.invalid(
                            "result_file_name",
                            format!("malformed slice in ${{{}}}", body),
                        ))
                    }
                }
            }
            None => (body, None),
        };
        let field = reference
            .parse::<FieldRef>()
            .map_err(|e| args.invalid("result_file_name", e.to_string()))?;
        tokens.push(NameToken::Field { field, slice });
        rest = &after[end + 1..];
    }
    if !rest.is_empty() {
        tokens.push(NameToken::Literal(rest.to_string()));
    }
    Ok(tokens)
}

/// Read `file_name` or `file_config` from constraint arguments.
pub fn compile_companion(args: &Arguments<'_>) -> TransformResult<CompanionFile> {
    if let Some(name) = args.optional_text(&["file_name"])? {
        return Ok(CompanionFile::Named(name));
    }
    let config = match args.get(&["file_config"]) {
        Some(serde_json::Value::Object(config)) => config,
        Some(_) => return Err(args.invalid("file_config", "expected a mapping")),
        None => {
            return Err(TransformError::misconfigured(
                args.rule(),
                format!(
                    "Either file_name or file_config must be provided in the arguments for {}",
                    args.rule()
                ),
            ))
        }
    };
    let inner = Arguments::new(crate::args::ArgumentOwner::Constraint, args.rule(), config);
    let pattern = inner.required_str(&["extraction_regex"])?;
    let extraction =
        Regex::new(&pattern).map_err(|e| inner.invalid("extraction_regex", e.to_string()))?;
    let replacement = match inner.get(&["replacement_text"]) {
        Some(serde_json::Value::String(text)) => Replacement::Single(text.clone()),
        Some(serde_json::Value::Array(_)) => Replacement::Many(inner.string_list(&["replacement_text"])?),
        Some(_) => return Err(inner.invalid("replacement_text", "expected a string or a list")),
        None => return Err(inner.missing("replacement_text")),
    };
    let result_name = inner.required_str(&["result_file_name"])?;
    Ok(CompanionFile::Derived(FileNameTemplate {
        extraction,
        replacement,
        tokens: parse_tokens(&inner, &result_name)?,
    }))
}
