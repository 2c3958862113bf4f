//! Permissive mirror of the YAML schema document.
//!
//! Nothing here is validated beyond YAML shape; [`crate::compile`] turns these
//! structs into the typed model. Maps whose order matters (`files`, `source`,
//! output `format`) stay as `serde_yaml::Mapping`.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Either a single item or a list of items.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub files: serde_yaml::Mapping,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFileEntry {
    pub pattern: String,
    #[serde(default)]
    pub source: Option<serde_yaml::Mapping>,
    #[serde(default)]
    pub constraints: Option<OneOrMany<RawRule>>,
    #[serde(default, alias = "result")]
    pub output: Option<RawOutput>,
}

/// A named rule with arguments. Keys beside `name` and `arguments` are
/// merged into the arguments (constraints historically put
/// `max_wait_time`/`wait_interval` at this level).
#[derive(Debug, Clone, Deserialize)]
pub struct RawRule {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawRule {
    pub fn merged_arguments(&self) -> Map<String, Value> {
        let mut merged = self.extra.clone();
        if let Some(arguments) = &self.arguments {
            for (key, value) in arguments {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSegment {
    #[serde(alias = "mapper")]
    pub formatter: String,
    #[serde(default)]
    pub format: Vec<RawField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawField {
    pub name: String,
    #[serde(default)]
    pub spec: Option<Value>,
    #[serde(default)]
    pub validators: Vec<RawRule>,
    #[serde(default)]
    pub converter: Option<RawConverter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawConverter {
    Name(String),
    Rule { name: String },
}

impl RawConverter {
    pub fn name(&self) -> &str {
        match self {
            RawConverter::Name(name) => name,
            RawConverter::Rule { name } => name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOutput {
    #[serde(default)]
    pub formatter: Option<String>,
    #[serde(default, alias = "result")]
    pub producer: Option<OneOrMany<RawRule>>,
    #[serde(default)]
    pub format: Option<serde_yaml::Mapping>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawResultField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub validators: Vec<RawRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_level_keys_merge_into_arguments() {
        let rule: RawRule = serde_yaml::from_str(
            "name: HashConstraint\nmax_wait_time: 60\narguments:\n  bucket: b\n",
        )
        .unwrap();
        let merged = rule.merged_arguments();
        assert_eq!(merged["max_wait_time"], 60);
        assert_eq!(merged["bucket"], "b");
    }

    #[test]
    fn single_constraint_or_list() {
        let one: OneOrMany<RawRule> = serde_yaml::from_str("name: Hash").unwrap();
        assert_eq!(one.into_vec().len(), 1);
        let many: OneOrMany<RawRule> = serde_yaml::from_str("- name: Hash\n- name: Sql").unwrap();
        assert_eq!(many.into_vec().len(), 2);
    }

    #[test]
    fn converter_accepts_name_or_rule() {
        let field: RawField =
            serde_yaml::from_str("name: amount\nspec: '0,5'\nconverter: {name: ToNumber}").unwrap();
        assert_eq!(field.converter.unwrap().name(), "ToNumber");
    }
}
