//! Validator and converter families.
//!
//! Rule names are resolved once, here, into closed enums. Unknown names and
//! malformed arguments never reach execution.

use chrono::format::{Item, StrftimeItems};
use chrono_tz::Tz;
use ledgerline_protocol::defaults::{
    DEFAULT_DATE_FORMAT, DEFAULT_SQL_ENGINE, DEFAULT_SQL_PORT, DEFAULT_TIMEZONE,
};
use ledgerline_protocol::{RuleOrigin, TransformError, TransformResult};
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;

use crate::args::{ArgumentOwner, Arguments};
use crate::model::FieldRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexMode {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefMode {
    Match,
    Count,
}

/// How a `Ref` count rule reads its two columns.
///
/// `Forward`: the rule's own column is counted, the referenced column holds
/// the expected count. `Reversed`: the rule's own column holds the expected
/// count and the referenced column is counted. `Auto` picks `Reversed` when
/// the rule's own column has exactly one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountDirection {
    Auto,
    Forward,
    Reversed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMode {
    Valid,
    Today,
    Yesterday,
    Future,
}

impl DateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateMode::Valid => "valid",
            DateMode::Today => "today",
            DateMode::Yesterday => "yesterday",
            DateMode::Future => "future",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalAggregate {
    Count,
    Sum,
}

/// Connection and query for the `Sql` validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlLookup {
    pub secret_name: String,
    pub engine: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub query: String,
}

#[derive(Debug, Clone)]
pub enum ValidatorKind {
    NaN,
    NaNOnly,
    Regex {
        pattern: Regex,
        mode: RegexMode,
    },
    Ref {
        mode: RefMode,
        target: FieldRef,
        direction: CountDirection,
    },
    Sql(SqlLookup),
    Unique,
    Date {
        format: String,
        mode: DateMode,
        timezone: Tz,
    },
    DuplicateGrouped {
        ref_field: String,
    },
    TotalReference {
        target: FieldRef,
    },
    ConditionalRef {
        criterion: FieldRef,
        condition: Condition,
        value: String,
        aggregate: ConditionalAggregate,
        target: FieldRef,
    },
    MinimumAmount {
        amount: f64,
    },
}

impl ValidatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValidatorKind::NaN => "NaN",
            ValidatorKind::NaNOnly => "NaNOnly",
            ValidatorKind::Regex { .. } => "Regex",
            ValidatorKind::Ref { .. } => "Ref",
            ValidatorKind::Sql(_) => "Sql",
            ValidatorKind::Unique => "Unique",
            ValidatorKind::Date { .. } => "Date",
            ValidatorKind::DuplicateGrouped { .. } => "DuplicateGrouped",
            ValidatorKind::TotalReference { .. } => "TotalReference",
            ValidatorKind::ConditionalRef { .. } => "ConditionalRef",
            ValidatorKind::MinimumAmount { .. } => "MinimumAmount",
        }
    }

    /// Columns outside the rule's own field that must exist.
    pub fn references(&self) -> Vec<FieldRef> {
        match self {
            ValidatorKind::Ref { target, .. } | ValidatorKind::TotalReference { target } => {
                vec![target.clone()]
            }
            ValidatorKind::ConditionalRef {
                criterion, target, ..
            } => vec![criterion.clone(), target.clone()],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationRule {
    pub origin: RuleOrigin,
    pub segment: String,
    pub field: String,
    pub kind: ValidatorKind,
}

impl ValidationRule {
    pub fn validator(&self) -> &'static str {
        self.kind.name()
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}.{}", self.kind.name(), self.segment, self.field)
    }
}

fn canonical_validator(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "NaN" | "NaNValidator" => "NaN",
        "NaNOnly" | "NaNOnlyValidator" => "NaNOnly",
        "Regex" | "RegexValidator" => "Regex",
        "Ref" | "RefValidator" => "Ref",
        "Sql" | "SqlValidator" => "Sql",
        "Unique" | "UniqueValueValidator" => "Unique",
        "Date" | "DateValidator" => "Date",
        "DuplicateGrouped" | "DuplicateGroupedValidator" => "DuplicateGrouped",
        "TotalReference" | "TotalReferenceValidator" => "TotalReference",
        "ConditionalRef" | "ConditionalRefValidator" => "ConditionalRef",
        "MinimumAmount" | "MinimumAmountValidator" => "MinimumAmount",
        _ => return None,
    };
    Some(canonical)
}

fn parse_ref(args: &Arguments<'_>, key: &str) -> TransformResult<FieldRef> {
    let raw = args.required_str(&[key])?;
    raw.parse::<FieldRef>()
        .map_err(|_| args.invalid(key, format!("'{}' is not a <segment>.<field> reference", raw)))
}

/// Build one validator from its configured name and arguments.
pub fn compile_validator(name: &str, values: &Map<String, Value>) -> TransformResult<ValidatorKind> {
    let canonical = canonical_validator(name)
        .ok_or_else(|| TransformError::invalid_config(format!("Unknown validator '{}'", name)))?;
    let args = Arguments::new(ArgumentOwner::Validator, canonical, values);

    let kind = match canonical {
        "NaN" => ValidatorKind::NaN,
        "NaNOnly" => ValidatorKind::NaNOnly,
        "Unique" => ValidatorKind::Unique,
        "Regex" => {
            let pattern = args.required_str(&["pattern"])?;
            let pattern = Regex::new(&pattern)
                .map_err(|e| args.invalid("pattern", e.to_string()))?;
            let mode = match args.optional_text(&["type"])?.as_deref() {
                None | Some("positive") => RegexMode::Positive,
                Some("negative") => RegexMode::Negative,
                Some(other) => {
                    return Err(TransformError::missing_config(format!(
                        "Required argument [type] value must be either positive or negative, got '{}'",
                        other
                    )))
                }
            };
            ValidatorKind::Regex { pattern, mode }
        }
        "Ref" => {
            let mode = match args.required_text(&["type"])?.as_str() {
                "match" => RefMode::Match,
                "count" => RefMode::Count,
                other => return Err(args.invalid("type", format!("'{}' is not match or count", other))),
            };
            let direction = match args.optional_text(&["direction"])?.as_deref() {
                None | Some("auto") => CountDirection::Auto,
                Some("forward") => CountDirection::Forward,
                Some("reversed") => CountDirection::Reversed,
                Some(other) => {
                    return Err(args.invalid(
                        "direction",
                        format!("'{}' is not auto, forward or reversed", other),
                    ))
                }
            };
            ValidatorKind::Ref {
                mode,
                target: parse_ref(&args, "ref")?,
                direction,
            }
        }
        "Sql" => {
            let port = match args.optional_usize(&["port", "database_port"])? {
                Some(port) => u16::try_from(port)
                    .map_err(|_| args.invalid("port", format!("{} is out of range", port)))?,
                None => DEFAULT_SQL_PORT,
            };
            ValidatorKind::Sql(SqlLookup {
                secret_name: args.required_str(&["secret_name"])?,
                engine: args
                    .optional_text(&["database_engine", "sql_language"])?
                    .map(|engine| engine.to_ascii_lowercase())
                    .unwrap_or_else(|| DEFAULT_SQL_ENGINE.to_string()),
                host: args.required_str(&["host", "database_host"])?,
                port,
                database: args.required_str(&["database", "database_name"])?,
                query: args.required_str(&["sql_query", "query"])?,
            })
        }
        "Date" => {
            let format = args
                .optional_text(&["format"])?
                .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
            if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
                return Err(args.invalid("format", format!("'{}' is not a valid date format", format)));
            }
            let mode = match args.optional_text(&["mode"])?.as_deref() {
                None | Some("valid") => DateMode::Valid,
                Some("today") => DateMode::Today,
                Some("yesterday") => DateMode::Yesterday,
                Some("future") => DateMode::Future,
                Some(other) => return Err(args.invalid("mode", format!("unknown mode {}", other))),
            };
            let zone = args
                .optional_text(&["timezone"])?
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
            let timezone = zone
                .parse::<Tz>()
                .map_err(|_| args.invalid("timezone", format!("'{}' is not an IANA time zone", zone)))?;
            ValidatorKind::Date {
                format,
                mode,
                timezone,
            }
        }
        "DuplicateGrouped" => ValidatorKind::DuplicateGrouped {
            ref_field: args.required_str(&["ref"])?,
        },
        "TotalReference" => ValidatorKind::TotalReference {
            target: parse_ref(&args, "ref")?,
        },
        "ConditionalRef" => {
            let criterion = parse_ref(&args, "criterion")?;
            let condition = match args.required_text(&["condition"])?.as_str() {
                "equal" => Condition::Equal,
                "not equal" => Condition::NotEqual,
                _ => {
                    return Err(TransformError::missing_config(
                        "Required argument [condition] value must be either equal or not equal",
                    ))
                }
            };
            let value = args.required_text(&["value"])?;
            let aggregate = match args.required_text(&["type"])?.as_str() {
                "count" => ConditionalAggregate::Count,
                "sum" => ConditionalAggregate::Sum,
                _ => {
                    return Err(TransformError::missing_config(
                        "Required argument [type] value must be either count or sum",
                    ))
                }
            };
            ValidatorKind::ConditionalRef {
                criterion,
                condition,
                value,
                aggregate,
                target: parse_ref(&args, "ref")?,
            }
        }
        "MinimumAmount" => ValidatorKind::MinimumAmount {
            amount: args.required_f64(&["amount"])?,
        },
        other => {
            return Err(TransformError::invalid_config(format!(
                "Unknown validator '{}'",
                other
            )))
        }
    };
    Ok(kind)
}

// ============================================================================
// Converters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterKind {
    /// Trim surrounding whitespace.
    ToString,
    /// Parse as an integer, falling back to a float.
    ToNumber,
}

impl ConverterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConverterKind::ToString => "ToString",
            ConverterKind::ToNumber => "ToNumber",
        }
    }

    pub fn from_name(name: &str) -> TransformResult<Self> {
        match name {
            "ToString" | "StrConverter" | "str" | "string" => Ok(ConverterKind::ToString),
            "ToNumber" | "NumberConverter" | "IntConverter" | "number" => {
                Ok(ConverterKind::ToNumber)
            }
            other => Err(TransformError::invalid_config(format!(
                "Unknown converter '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRule {
    pub segment: String,
    pub field: String,
    pub kind: ConverterKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn long_and_short_names_resolve() {
        let kind = compile_validator("UniqueValueValidator", &Map::new()).unwrap();
        assert_eq!(kind.name(), "Unique");
        let kind = compile_validator("NaN", &Map::new()).unwrap();
        assert_eq!(kind.name(), "NaN");
    }

    #[test]
    fn unknown_validator_is_invalid_config() {
        let err = compile_validator("Bogus", &Map::new()).unwrap_err();
        assert!(matches!(err, TransformError::InvalidConfig(ref m) if m.contains("Bogus")));
    }

    #[test]
    fn regex_requires_string_pattern() {
        let err = compile_validator("Regex", &Map::new()).unwrap_err();
        assert!(matches!(err, TransformError::MissingConfig(_)));
        let kind = compile_validator("Regex", &args(json!({"pattern": "^SX\\d+$", "type": "negative"})))
            .unwrap();
        assert!(matches!(kind, ValidatorKind::Regex { mode: RegexMode::Negative, .. }));
    }

    #[test]
    fn date_defaults_and_zone_check() {
        match compile_validator("DateValidator", &Map::new()).unwrap() {
            ValidatorKind::Date {
                format,
                mode,
                timezone,
            } => {
                assert_eq!(format, "%Y%m%d");
                assert_eq!(mode, DateMode::Valid);
                assert_eq!(timezone, chrono_tz::Asia::Singapore);
            }
            other => panic!("unexpected {:?}", other),
        }
        let err = compile_validator("Date", &args(json!({"timezone": "Mars/Olympus"}))).unwrap_err();
        assert!(matches!(err, TransformError::InvalidConfig(_)));
        let err = compile_validator("Date", &args(json!({"mode": "someday"}))).unwrap_err();
        assert!(matches!(err, TransformError::InvalidConfig(_)));
    }

    #[test]
    fn conditional_ref_arguments() {
        let kind = compile_validator(
            "ConditionalRefValidator",
            &args(json!({
                "criterion": "body.kind",
                "condition": "not equal",
                "value": "R",
                "type": "sum",
                "ref": "body.amount"
            })),
        )
        .unwrap();
        match kind {
            ValidatorKind::ConditionalRef {
                condition,
                aggregate,
                ..
            } => {
                assert_eq!(condition, Condition::NotEqual);
                assert_eq!(aggregate, ConditionalAggregate::Sum);
            }
            other => panic!("unexpected {:?}", other),
        }
        let err = compile_validator(
            "ConditionalRef",
            &args(json!({"criterion": "body.kind", "condition": "like", "value": "R", "type": "sum", "ref": "body.amount"})),
        )
        .unwrap_err();
        assert!(matches!(err, TransformError::MissingConfig(_)));
    }

    #[test]
    fn sql_validator_defaults() {
        let kind = compile_validator(
            "SqlValidator",
            &args(json!({"secret_name": "db", "host": "h", "database": "d", "sql_query": "SELECT 1"})),
        )
        .unwrap();
        match kind {
            ValidatorKind::Sql(lookup) => {
                assert_eq!(lookup.port, 3306);
                assert_eq!(lookup.engine, "mysql");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn converter_names() {
        assert_eq!(ConverterKind::from_name("StrConverter").unwrap(), ConverterKind::ToString);
        assert_eq!(ConverterKind::from_name("ToNumber").unwrap(), ConverterKind::ToNumber);
        assert!(ConverterKind::from_name("ToDate").is_err());
    }
}
