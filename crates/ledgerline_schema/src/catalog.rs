//! Compiled schema documents and file-pattern resolution.

use ledgerline_protocol::{TransformError, TransformResult};
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

use crate::compile::{compile_entry, Issues};
use crate::constraints::ConstraintRule;
use crate::model::SegmentSpec;
use crate::output::ResultSchema;
use crate::raw::{RawDocument, RawFileEntry};
use crate::rules::{ConversionRule, ValidationRule};

/// One compiled `files` entry. Immutable for the duration of an invocation.
#[derive(Debug, Clone)]
pub struct FileSchema {
    pub name: String,
    /// Anchored at the start of the key.
    pub pattern: Regex,
    pub segments: Vec<SegmentSpec>,
    pub validators: Vec<ValidationRule>,
    pub converters: Vec<ConversionRule>,
    pub constraints: Vec<ConstraintRule>,
    pub output: ResultSchema,
}

impl FileSchema {
    pub fn matches(&self, key: &str) -> bool {
        self.pattern.is_match(key)
    }

    pub fn segment(&self, name: &str) -> Option<&SegmentSpec> {
        self.segments.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    entries: Vec<FileSchema>,
}

impl SchemaCatalog {
    /// Parse and compile a whole document. Relative includes resolve against
    /// `base_dir`.
    pub fn from_yaml_str(text: &str, base_dir: Option<&Path>) -> TransformResult<Self> {
        let document: RawDocument = serde_yaml::from_str(text).map_err(|e| {
            TransformError::invalid_config(format!("Failed to parse schema YAML: {}", e))
        })?;
        if document.files.is_empty() {
            return Err(TransformError::missing_config(
                "schema document declares no files",
            ));
        }

        let mut issues = Issues::new("schema document");
        let mut entries = Vec::with_capacity(document.files.len());
        for (key, value) in &document.files {
            let name = match key.as_str() {
                Some(name) => name.to_string(),
                None => {
                    issues.push(TransformError::invalid_config(format!(
                        "file entry key {:?} must be a string",
                        key
                    )));
                    continue;
                }
            };
            let raw: RawFileEntry = match serde_yaml::from_value(value.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    issues.push(TransformError::invalid_config(format!(
                        "file entry '{}': {}",
                        name, e
                    )));
                    continue;
                }
            };
            if let Some(entry) = issues.check(compile_entry(&name, &raw, base_dir)) {
                entries.push(entry);
            }
        }
        issues.finish()?;
        info!(entries = entries.len(), "Loaded schema document");
        Ok(Self { entries })
    }

    /// Load a document from disk; includes resolve next to it.
    pub fn from_path(path: &Path) -> TransformResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TransformError::missing_config(format!(
                "Failed to read schema document {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&text, path.parent())
    }

    pub fn entries(&self) -> &[FileSchema] {
        &self.entries
    }

    /// First entry, in document order, whose pattern matches the key.
    pub fn resolve(&self, key: &str) -> TransformResult<&FileSchema> {
        let found = self.entries.iter().find(|entry| entry.matches(key));
        match found {
            Some(entry) => {
                debug!(key = %key, entry = %entry.name, "Resolved file entry");
                Ok(entry)
            }
            None => Err(TransformError::missing_config(format!(
                "No matching regex pattern found for file with name [{}]. Please check configuration yaml file",
                key
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
files:
  payments:
    pattern: PAY_
    source:
      body:
        formatter: body_only
        format:
          - name: id
            spec: "0,3"
    output:
      producer: {name: Console}
  any_text:
    pattern: .*\.txt
    source:
      body:
        formatter: body_only
        format:
          - name: line
            spec: "0,80"
    output:
      producer: {name: Summary}
"#;

    #[test]
    fn first_matching_entry_wins() {
        let catalog = SchemaCatalog::from_yaml_str(DOC, None).unwrap();
        assert_eq!(catalog.entries().len(), 2);
        assert_eq!(catalog.resolve("PAY_1.txt").unwrap().name, "payments");
        assert_eq!(catalog.resolve("other.txt").unwrap().name, "any_text");
    }

    #[test]
    fn unmatched_key_is_missing_config() {
        let catalog = SchemaCatalog::from_yaml_str(DOC, None).unwrap();
        let err = catalog.resolve("report.csv").unwrap_err();
        assert!(matches!(err, TransformError::MissingConfig(_)));
    }

    #[test]
    fn broken_yaml_is_invalid_config() {
        let err = SchemaCatalog::from_yaml_str("files: [unclosed", None).unwrap_err();
        assert!(matches!(err, TransformError::InvalidConfig(_)));
    }
}
