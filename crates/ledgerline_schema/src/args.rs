//! Typed access to untyped rule arguments.
//!
//! Missing required arguments become `MissingConfig` for validators and
//! producers, and `ConstraintMisconfiguration` for constraints. Numbers may be
//! written as YAML numbers or numeric strings.

use ledgerline_protocol::{TransformError, TransformResult};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentOwner {
    Validator,
    Constraint,
    Producer,
}

#[derive(Debug, Clone)]
pub struct Arguments<'a> {
    owner: ArgumentOwner,
    rule: &'a str,
    values: &'a Map<String, Value>,
}

impl<'a> Arguments<'a> {
    pub fn new(owner: ArgumentOwner, rule: &'a str, values: &'a Map<String, Value>) -> Self {
        Self {
            owner,
            rule,
            values,
        }
    }

    pub fn rule(&self) -> &str {
        self.rule
    }

    /// First present key among `keys` (aliases).
    pub fn get(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter()
            .filter_map(|k| self.values.get(*k))
            .find(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn missing(&self, key: &str) -> TransformError {
        self.error(format!(
            "Required argument [{}] is missing for {}",
            key, self.rule
        ))
    }

    pub fn invalid(&self, key: &str, message: impl AsRef<str>) -> TransformError {
        let message = format!(
            "Argument [{}] of {} is invalid: {}",
            key,
            self.rule,
            message.as_ref()
        );
        match self.owner {
            ArgumentOwner::Constraint => TransformError::misconfigured(self.rule, message),
            _ => TransformError::invalid_config(message),
        }
    }

    fn error(&self, message: String) -> TransformError {
        match self.owner {
            ArgumentOwner::Constraint => TransformError::misconfigured(self.rule, message),
            _ => TransformError::missing_config(message),
        }
    }

    /// A string argument. Must be a YAML string.
    pub fn required_str(&self, keys: &[&str]) -> TransformResult<String> {
        match self.get(keys) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(self.error(format!(
                "Required argument [{}] of {} is not of string type",
                keys[0], self.rule
            ))),
            None => Err(self.missing(keys[0])),
        }
    }

    /// A scalar argument rendered as text (numbers and booleans allowed).
    pub fn optional_text(&self, keys: &[&str]) -> TransformResult<Option<String>> {
        match self.get(keys) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(_) => Err(self.invalid(keys[0], "expected a scalar value")),
        }
    }

    pub fn required_text(&self, keys: &[&str]) -> TransformResult<String> {
        self.optional_text(keys)?
            .ok_or_else(|| self.missing(keys[0]))
    }

    pub fn optional_f64(&self, keys: &[&str]) -> TransformResult<Option<f64>> {
        match self.get(keys) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.invalid(keys[0], "not a number")),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| self.invalid(keys[0], format!("'{}' is not a number", s))),
            Some(_) => Err(self.invalid(keys[0], "expected a number")),
        }
    }

    pub fn required_f64(&self, keys: &[&str]) -> TransformResult<f64> {
        self.optional_f64(keys)?
            .ok_or_else(|| self.missing(keys[0]))
    }

    pub fn optional_usize(&self, keys: &[&str]) -> TransformResult<Option<usize>> {
        match self.get(keys) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(|v| Some(v as usize))
                .ok_or_else(|| self.invalid(keys[0], "expected a non-negative integer")),
            Some(Value::String(s)) => s.trim().parse::<usize>().map(Some).map_err(|_| {
                self.invalid(keys[0], format!("'{}' is not a non-negative integer", s))
            }),
            Some(_) => Err(self.invalid(keys[0], "expected a non-negative integer")),
        }
    }

    pub fn optional_bool(&self, keys: &[&str]) -> TransformResult<Option<bool>> {
        match self.get(keys) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Some(true)),
                "false" | "no" | "0" => Ok(Some(false)),
                _ => Err(self.invalid(keys[0], format!("'{}' is not a boolean", s))),
            },
            Some(_) => Err(self.invalid(keys[0], "expected a boolean")),
        }
    }

    /// Presence flag: a key that is present but empty counts as `true`.
    pub fn flag(&self, key: &str) -> TransformResult<bool> {
        match self.values.get(key) {
            None => Ok(false),
            Some(Value::Null) => Ok(true),
            Some(_) => Ok(self.optional_bool(&[key])?.unwrap_or(false)),
        }
    }

    /// A string or a list of strings.
    pub fn string_list(&self, keys: &[&str]) -> TransformResult<Vec<String>> {
        match self.get(keys) {
            None => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(s
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(self.invalid(keys[0], "list items must be strings")),
                })
                .collect(),
            Some(_) => Err(self.invalid(keys[0], "expected a string or a list of strings")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerline_protocol::ErrorKind;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn missing_argument_error_depends_on_owner() {
        let values = Map::new();
        let validator = Arguments::new(ArgumentOwner::Validator, "Regex", &values);
        assert!(matches!(
            validator.required_str(&["pattern"]),
            Err(TransformError::MissingConfig(_))
        ));
        let constraint = Arguments::new(ArgumentOwner::Constraint, "Hash", &values);
        let err = constraint.required_str(&["bucket"]).unwrap_err();
        assert!(matches!(err, TransformError::ConstraintMisconfiguration { .. }));
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn numbers_accept_numeric_strings_and_aliases() {
        let values = map(json!({"batchSize": "250", "max_wait_time": 5}));
        let args = Arguments::new(ArgumentOwner::Producer, "Broker", &values);
        assert_eq!(
            args.optional_usize(&["batch_size", "batchSize"]).unwrap(),
            Some(250)
        );
        assert_eq!(args.required_f64(&["max_wait_time"]).unwrap(), 5.0);
    }

    #[test]
    fn non_string_pattern_is_missing_config() {
        let values = map(json!({"pattern": 12}));
        let args = Arguments::new(ArgumentOwner::Validator, "Regex", &values);
        assert!(matches!(
            args.required_str(&["pattern"]),
            Err(TransformError::MissingConfig(_))
        ));
    }

    #[test]
    fn presence_flag() {
        let values = map(json!({"use_line_ending_conversion": null, "other": "false"}));
        let args = Arguments::new(ArgumentOwner::Constraint, "Hash", &values);
        assert!(args.flag("use_line_ending_conversion").unwrap());
        assert!(!args.flag("other").unwrap());
        assert!(!args.flag("absent").unwrap());
    }
}
