//! Validation engine.
//!
//! Each compiled [`ValidationRule`] is evaluated against the table set it was
//! declared on: source segments for field validators, prepared output groups
//! for result validators. A failing rule yields a [`ValidationFailure`]; the
//! engine records an outcome for every rule and raises one aggregate at the
//! end. Configuration and collaborator errors abort immediately.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use ledgerline_protocol::defaults::ALL_FIELDS;
use ledgerline_protocol::{
    Column, ConnectionInfo, RelationalStore, RuleOutcome, Scalar, SecretStore,
    TableSet, TransformError, TransformResult, ValidationFailure,
};
use ledgerline_schema::{
    Condition, ConditionalAggregate, CountDirection, DateMode, FieldRef, RefMode, RegexMode,
    SqlLookup, ValidationRule, ValidatorKind,
};
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Sums closer than this are equal.
const AMOUNT_TOLERANCE: f64 = 1e-6;

/// Everything a rule may read while it runs.
pub struct RuleContext<'a> {
    pub tables: &'a TableSet,
    pub secrets: &'a dyn SecretStore,
    pub relational: &'a dyn RelationalStore,
    /// Reference instant for the date modes.
    pub now: DateTime<Utc>,
}

impl<'a> RuleContext<'a> {
    fn column(&self, segment: &str, field: &str) -> TransformResult<&'a Column> {
        self.tables
            .get(segment)
            .and_then(|table| table.column(field))
            .ok_or_else(|| {
                TransformError::invalid_config(format!(
                    "validator references unknown column {}.{}",
                    segment, field
                ))
            })
    }

    fn rows(&self, segment: &str) -> usize {
        self.tables.get(segment).map(|t| t.row_count()).unwrap_or(0)
    }
}

/// Run every rule, recording one outcome per rule. Failing rules are collected
/// into a single `ValidationFailures`.
pub fn validate(
    rules: &[ValidationRule],
    ctx: &RuleContext<'_>,
    outcomes: &mut Vec<RuleOutcome>,
) -> TransformResult<()> {
    let mut failures = Vec::new();
    for rule in rules {
        match evaluate(rule, ctx)? {
            None => {
                debug!(rule = %rule, "Validator passed");
                outcomes.push(RuleOutcome::passed(
                    rule.origin,
                    rule.validator(),
                    &rule.segment,
                    &rule.field,
                    ctx.rows(&rule.segment),
                ));
            }
            Some(failure) => {
                warn!(
                    rule = %rule,
                    fail_count = failure.fail_count,
                    record_count = failure.record_count,
                    "Validator failed"
                );
                outcomes.push(RuleOutcome::failed(rule.origin, &failure));
                failures.push(failure);
            }
        }
    }
    TransformError::from_validation_failures(failures)
}

/// Evaluate one rule. `Ok(None)` means it passed.
pub fn evaluate(
    rule: &ValidationRule,
    ctx: &RuleContext<'_>,
) -> TransformResult<Option<ValidationFailure>> {
    let failure = || ValidationFailure::new(rule.validator(), &rule.segment, &rule.field);
    let label = format!("{}.{}", rule.segment, rule.field);

    match &rule.kind {
        ValidatorKind::NaN => {
            let (nulls, rows) = null_rows(ctx, &rule.segment, &rule.field)?;
            Ok((nulls > 0).then(|| {
                failure()
                    .with_counts(nulls, rows)
                    .with_message(format!("{}/{} records of {} are null", nulls, rows, label))
            }))
        }
        ValidatorKind::NaNOnly => {
            let (nulls, rows) = null_rows(ctx, &rule.segment, &rule.field)?;
            Ok((nulls == 0).then(|| {
                failure()
                    .with_counts(rows, rows)
                    .with_message(format!("{} was expected to hold nulls but has none", label))
            }))
        }
        ValidatorKind::Regex { pattern, mode } => {
            let column = ctx.column(&rule.segment, &rule.field)?;
            let failed = regex_failures(column, pattern, *mode);
            Ok((failed > 0).then(|| {
                failure().with_counts(failed, column.len()).with_message(format!(
                    "{}/{} records of {} failed pattern {}",
                    failed,
                    column.len(),
                    label,
                    pattern.as_str()
                ))
            }))
        }
        ValidatorKind::Ref {
            mode: RefMode::Match,
            target,
            ..
        } => {
            let own = ctx.column(&rule.segment, &rule.field)?;
            let other = ctx.column(&target.segment, &target.field)?;
            let failed = positional_mismatches(own, other);
            Ok((failed > 0).then(|| {
                failure().with_counts(failed, own.len()).with_message(format!(
                    "{}/{} records of {} do not match {}",
                    failed,
                    own.len(),
                    label,
                    target
                ))
            }))
        }
        ValidatorKind::Ref {
            mode: RefMode::Count,
            target,
            direction,
        } => {
            let own = ctx.column(&rule.segment, &rule.field)?;
            let other = ctx.column(&target.segment, &target.field)?;
            Ok(count_check(own, other, *direction, target)
                .map(|(fail, records, message)| failure().with_counts(fail, records).with_message(message)))
        }
        ValidatorKind::Sql(lookup) => {
            let own = ctx.column(&rule.segment, &rule.field)?;
            sql_check(ctx, lookup, own, &rule.field).map(|outcome| {
                outcome.map(|(fail, message)| failure().with_counts(fail, own.len()).with_message(message))
            })
        }
        ValidatorKind::Unique => {
            let column = ctx.column(&rule.segment, &rule.field)?;
            let distinct: HashSet<String> = column.values.iter().filter_map(cell_key).collect();
            let failed = column.len() - distinct.len();
            Ok((failed > 0).then(|| {
                failure().with_counts(failed, column.len()).with_message(format!(
                    "{}/{} records of {} are not unique",
                    failed,
                    column.len(),
                    label
                ))
            }))
        }
        ValidatorKind::Date {
            format,
            mode,
            timezone,
        } => {
            let column = ctx.column(&rule.segment, &rule.field)?;
            let today = ctx.now.with_timezone(timezone).date_naive();
            let failed = column
                .values
                .iter()
                .filter(|cell| !date_passes(cell.as_ref(), format, *mode, today))
                .count();
            Ok((failed > 0).then(|| {
                failure().with_counts(failed, column.len()).with_message(format!(
                    "{}/{} records of {} failed the {} date check",
                    failed,
                    column.len(),
                    label,
                    mode.as_str()
                ))
            }))
        }
        ValidatorKind::DuplicateGrouped { ref_field } => {
            let own = ctx.column(&rule.segment, &rule.field)?;
            let other = ctx.column(&rule.segment, ref_field)?;
            let pairs: HashSet<(Option<String>, Option<String>)> = own
                .values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| (cell_key(a), cell_key(b)))
                .collect();
            let failed = own.len() - pairs.len();
            Ok((failed > 0).then(|| {
                failure().with_counts(failed, own.len()).with_message(format!(
                    "{} records of {} repeat a value grouped with {}",
                    failed, label, ref_field
                ))
            }))
        }
        ValidatorKind::TotalReference { target } => {
            let own = ctx.column(&rule.segment, &rule.field)?;
            let other = ctx.column(&target.segment, &target.field)?;
            Ok(total_check(own, other, &label, target)
                .map(|message| failure().with_counts(own.len(), own.len()).with_message(message)))
        }
        ValidatorKind::ConditionalRef {
            criterion,
            condition,
            value,
            aggregate,
            target,
        } => {
            let own = ctx.column(&rule.segment, &rule.field)?;
            let criteria = ctx.column(&criterion.segment, &criterion.field)?;
            let reference = ctx.column(&target.segment, &target.field)?;
            let filtered = filter_by_condition(reference, criteria, *condition, value);
            debug!(
                rule = %rule,
                kept = filtered.len(),
                of = reference.len(),
                "Filtered conditional reference"
            );
            let outcome = match aggregate {
                ConditionalAggregate::Count => {
                    count_check(own, &filtered, CountDirection::Auto, target)
                }
                ConditionalAggregate::Sum => total_check(own, &filtered, &label, target)
                    .map(|message| (own.len(), own.len(), message)),
            };
            Ok(outcome.map(|(fail, records, message)| failure().with_counts(fail, records).with_message(message)))
        }
        ValidatorKind::MinimumAmount { amount } => {
            let column = ctx.column(&rule.segment, &rule.field)?;
            let failed = column
                .values
                .iter()
                .filter(|cell| !matches!(cell.as_ref().and_then(Scalar::as_f64), Some(v) if v >= *amount))
                .count();
            Ok((failed > 0).then(|| {
                failure().with_counts(failed, column.len()).with_message(format!(
                    "{}/{} records of {} are below {}",
                    failed,
                    column.len(),
                    label,
                    amount
                ))
            }))
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Trimmed text of a cell; the comparison key for equality-style rules.
pub(crate) fn cell_key(cell: &Option<Scalar>) -> Option<String> {
    cell.as_ref().map(|value| value.to_string().trim().to_string())
}

/// Rows holding a null in `field` (or in any field for `ALL`), and the row count.
fn null_rows(ctx: &RuleContext<'_>, segment: &str, field: &str) -> TransformResult<(usize, usize)> {
    if field.eq_ignore_ascii_case(ALL_FIELDS) {
        let table = ctx.tables.get(segment).ok_or_else(|| {
            TransformError::invalid_config(format!("validator references unknown segment {}", segment))
        })?;
        let rows = table.row_count();
        let nulls = (0..rows)
            .filter(|&row| table.columns().iter().any(|c| c.values[row].is_none()))
            .count();
        Ok((nulls, rows))
    } else {
        let column = ctx.column(segment, field)?;
        Ok((column.null_count(), column.len()))
    }
}

fn regex_failures(column: &Column, pattern: &Regex, mode: RegexMode) -> usize {
    column
        .values
        .iter()
        .filter(|cell| match cell {
            None => true,
            Some(value) => {
                let found = pattern.is_match(&value.to_string());
                match mode {
                    RegexMode::Positive => !found,
                    RegexMode::Negative => found,
                }
            }
        })
        .count()
}

/// Positions that differ plus the length difference.
fn positional_mismatches(own: &Column, other: &Column) -> usize {
    let differing = own
        .values
        .iter()
        .zip(&other.values)
        .filter(|(a, b)| cell_key(a) != cell_key(b))
        .count();
    differing + own.len().abs_diff(other.len())
}

/// Row-count comparison. Returns `(fail_count, record_count, message)` on failure.
fn count_check(
    own: &Column,
    other: &Column,
    direction: CountDirection,
    target: &FieldRef,
) -> Option<(usize, usize, String)> {
    let reversed = match direction {
        CountDirection::Auto => own.len() == 1,
        CountDirection::Forward => false,
        CountDirection::Reversed => true,
    };
    let (counted, expected_column) = if reversed { (other, own) } else { (own, other) };
    let actual = counted.len();
    let expected = expected_column
        .values
        .first()
        .and_then(|cell| cell.as_ref())
        .and_then(Scalar::as_i64)
        .and_then(|v| usize::try_from(v).ok());
    match expected {
        Some(expected) if expected == actual => None,
        Some(expected) => Some((
            expected.abs_diff(actual),
            actual,
            format!(
                "{}/{} record count mismatch against {}",
                expected, actual, target
            ),
        )),
        None => Some((
            actual,
            actual,
            format!("expected record count against {} is missing or not a number", target),
        )),
    }
}

/// Numeric sum of a column. Nulls are skipped; any other non-numeric cell
/// makes the sum undefined.
fn column_sum(column: &Column) -> Option<f64> {
    column
        .values
        .iter()
        .flatten()
        .map(Scalar::as_f64)
        .sum::<Option<f64>>()
}

fn total_check(own: &Column, other: &Column, label: &str, target: &FieldRef) -> Option<String> {
    match (column_sum(own), column_sum(other)) {
        (Some(a), Some(b)) if (a - b).abs() <= AMOUNT_TOLERANCE => None,
        (Some(a), Some(b)) => Some(format!(
            "{}/{} total of {} does not match {}",
            a, b, label, target
        )),
        (None, _) => Some(format!("{} contains non numeric values", label)),
        (_, None) => Some(format!("{} contains non numeric values", target)),
    }
}

/// Reference rows whose aligned criterion value satisfies the condition.
/// Rows beyond the shorter column are dropped.
fn filter_by_condition(reference: &Column, criteria: &Column, condition: Condition, value: &str) -> Column {
    let value = value.trim();
    let values = reference
        .values
        .iter()
        .zip(&criteria.values)
        .filter(|(_, criterion)| {
            let equal = cell_key(criterion).as_deref() == Some(value);
            match condition {
                Condition::Equal => equal,
                Condition::NotEqual => !equal,
            }
        })
        .map(|(cell, _)| cell.clone())
        .collect();
    Column::new(reference.name.clone(), values)
}

fn date_passes(cell: Option<&Scalar>, format: &str, mode: DateMode, today: NaiveDate) -> bool {
    let Some(value) = cell else {
        return false;
    };
    let text = value.to_string();
    let text = text.trim();
    let parsed = NaiveDateTime::parse_from_str(text, format)
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(text, format));
    let Ok(date) = parsed else {
        return false;
    };
    match mode {
        DateMode::Valid => true,
        DateMode::Today => date == today,
        DateMode::Yesterday => Some(date) == today.checked_sub_signed(Duration::days(1)),
        DateMode::Future => date > today,
    }
}

/// Compare a column with the same-named column of a query result.
fn sql_check(
    ctx: &RuleContext<'_>,
    lookup: &SqlLookup,
    own: &Column,
    field: &str,
) -> TransformResult<Option<(usize, String)>> {
    let credentials = ctx
        .secrets
        .get_secret(&lookup.secret_name)
        .map_err(|e| e.into_transform("secret store"))?;
    let connection = ConnectionInfo {
        engine: lookup.engine.clone(),
        host: lookup.host.clone(),
        port: lookup.port,
        database: lookup.database.clone(),
        credentials,
    };
    let result = ctx
        .relational
        .query(&connection, &lookup.query)
        .map_err(|e| e.into_transform("relational store"))?;

    let Some(expected) = result.column(field) else {
        return Ok(Some((
            own.len(),
            format!("query result has no column {}", field),
        )));
    };
    let expected = Column::new(
        field,
        expected.into_iter().map(|v| v.map(Scalar::Text)).collect(),
    );
    let failed = positional_mismatches(own, &expected);
    Ok((failed > 0).then(|| {
        (
            failed,
            format!("{}/{} records of {} differ from the query result", failed, own.len(), field),
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ledgerline_protocol::{ParsedTable, RuleOrigin};
    use ledgerline_schema::compile_validator;
    use ledgerline_test_utils::{ScriptedRelationalStore, StaticSecretStore};
    use serde_json::{json, Map, Value};

    fn table(name: &str, columns: &[(&str, &[Option<&str>])]) -> ParsedTable {
        let columns = columns
            .iter()
            .map(|(field, values)| {
                Column::new(*field, values.iter().map(|v| v.map(Scalar::text)).collect())
            })
            .collect();
        ParsedTable::from_columns(name, columns).unwrap()
    }

    fn tables(list: Vec<ParsedTable>) -> TableSet {
        list.into_iter().map(|t| (t.name().to_string(), t)).collect()
    }

    fn rule(segment: &str, field: &str, name: &str, args: Value) -> ValidationRule {
        let args: Map<String, Value> = args.as_object().cloned().unwrap_or_default();
        ValidationRule {
            origin: RuleOrigin::Source,
            segment: segment.into(),
            field: field.into(),
            kind: compile_validator(name, &args).unwrap(),
        }
    }

    fn run(rule: &ValidationRule, tables: &TableSet) -> Option<ValidationFailure> {
        let secrets = StaticSecretStore::new();
        let relational = ScriptedRelationalStore::new();
        let ctx = RuleContext {
            tables,
            secrets: &secrets,
            relational: &relational,
            now: Utc.with_ymd_and_hms(2024, 3, 10, 2, 0, 0).unwrap(),
        };
        evaluate(rule, &ctx).unwrap()
    }

    fn body_and_footer(count: &str) -> TableSet {
        tables(vec![
            table(
                "body",
                &[("id", &[Some("1"), Some("2"), Some("3"), Some("4"), Some("5")])],
            ),
            table("footer", &[("recordCount", &[Some(count)])]),
        ])
    }

    #[test]
    fn regex_counts_non_matching_rows() {
        let r = rule("body", "ref", "Regex", json!({"pattern": r"^SX\d+$"}));
        let pass = tables(vec![table("body", &[("ref", &[Some("SX1"), Some("SX2"), Some("SX3")])])]);
        assert!(run(&r, &pass).is_none());

        let fail = tables(vec![table("body", &[("ref", &[Some("SX1"), Some("YY2")])])]);
        let failure = run(&r, &fail).unwrap();
        assert_eq!((failure.fail_count, failure.record_count), (1, 2));
    }

    #[test]
    fn negative_regex_fails_on_matches() {
        let r = rule("body", "ref", "RegexValidator", json!({"pattern": "TEST", "type": "negative"}));
        let t = tables(vec![table("body", &[("ref", &[Some("A"), Some("TEST1")])])]);
        assert_eq!(run(&r, &t).unwrap().fail_count, 1);
    }

    #[test]
    fn ref_count_reads_footer_as_expected_count() {
        let r = rule("footer", "recordCount", "Ref", json!({"type": "count", "ref": "body.id"}));
        assert!(run(&r, &body_and_footer("5")).is_none());
        let failure = run(&r, &body_and_footer("4")).unwrap();
        assert_eq!(failure.fail_count, 1);
        assert_eq!(failure.record_count, 5);

        let forward = rule("body", "id", "Ref", json!({"type": "count", "ref": "footer.recordCount"}));
        assert!(run(&forward, &body_and_footer("5")).is_none());
        assert_eq!(run(&forward, &body_and_footer("7")).unwrap().fail_count, 2);
    }

    #[test]
    fn ref_match_keeps_row_order() {
        let t = tables(vec![
            table("body", &[("a", &[Some("1"), Some("2")]), ("b", &[Some("2"), Some("1")])]),
        ]);
        let r = rule("body", "a", "Ref", json!({"type": "match", "ref": "body.b"}));
        assert_eq!(run(&r, &t).unwrap().fail_count, 2);
        let same = rule("body", "a", "Ref", json!({"type": "match", "ref": "body.a"}));
        assert!(run(&same, &t).is_none());
    }

    #[test]
    fn nan_all_checks_every_cell() {
        let t = tables(vec![table(
            "body",
            &[("a", &[Some("1"), Some("2")]), ("b", &[None, Some("x")])],
        )]);
        let all = rule("body", "ALL", "NaN", json!({}));
        assert_eq!(run(&all, &t).unwrap().fail_count, 1);
        let a = rule("body", "a", "NaN", json!({}));
        assert!(run(&a, &t).is_none());
        let only = rule("body", "a", "NaNOnly", json!({}));
        assert!(run(&only, &t).is_some());
    }

    #[test]
    fn unique_and_grouped_duplicates() {
        let t = tables(vec![table(
            "body",
            &[
                ("id", &[Some("1"), Some("1"), Some("2"), Some("2")]),
                ("ccy", &[Some("SGD"), Some("SGD"), Some("SGD"), Some("USD")]),
            ],
        )]);
        let unique = rule("body", "id", "UniqueValueValidator", json!({}));
        assert_eq!(run(&unique, &t).unwrap().fail_count, 2);
        let grouped = rule("body", "id", "DuplicateGrouped", json!({"ref": "ccy"}));
        assert_eq!(run(&grouped, &t).unwrap().fail_count, 1);
    }

    #[test]
    fn total_reference_sums_and_flags_text() {
        let t = tables(vec![
            table("body", &[("amount", &[Some(" 100"), Some("250.5 "), None])]),
            table("footer", &[("total", &[Some("350.5")]), ("bad", &[Some("1O0")])]),
        ]);
        let r = rule("footer", "total", "TotalReference", json!({"ref": "body.amount"}));
        assert!(run(&r, &t).is_none());
        let bad = rule("footer", "bad", "TotalReference", json!({"ref": "body.amount"}));
        let failure = run(&bad, &t).unwrap();
        assert!(failure.message.contains("non numeric"));
    }

    #[test]
    fn date_modes_use_the_zone_local_day() {
        // 2024-03-10T02:00Z is 10:00 on 2024-03-10 in Singapore.
        let t = tables(vec![table(
            "header",
            &[("d", &[Some("20240310")]), ("y", &[Some("20240309")]), ("f", &[Some("20240311")]), ("x", &[Some("2024-13-01")])],
        )]);
        assert!(run(&rule("header", "d", "Date", json!({"mode": "today"})), &t).is_none());
        assert!(run(&rule("header", "y", "Date", json!({"mode": "yesterday"})), &t).is_none());
        assert!(run(&rule("header", "f", "Date", json!({"mode": "future"})), &t).is_none());
        assert!(run(&rule("header", "d", "Date", json!({"mode": "future"})), &t).is_some());
        assert!(run(&rule("header", "x", "Date", json!({})), &t).is_some());
    }

    #[test]
    fn minimum_amount_counts_low_and_non_numeric() {
        let t = tables(vec![table(
            "body",
            &[("amount", &[Some("10"), Some("2"), Some("abc"), Some("5")])],
        )]);
        let r = rule("body", "amount", "MinimumAmount", json!({"amount": 5}));
        assert_eq!(run(&r, &t).unwrap().fail_count, 2);
    }

    #[test]
    fn conditional_ref_filters_before_counting() {
        let t = tables(vec![
            table(
                "body",
                &[
                    ("kind", &[Some("C"), Some("D"), Some("C")]),
                    ("amount", &[Some("10"), Some("5"), Some("20")]),
                ],
            ),
            table("footer", &[("credits", &[Some("2")]), ("creditTotal", &[Some("30")])]),
        ]);
        let count = rule(
            "footer",
            "credits",
            "ConditionalRef",
            json!({"criterion": "body.kind", "condition": "equal", "value": "C", "type": "count", "ref": "body.amount"}),
        );
        assert!(run(&count, &t).is_none());
        let sum = rule(
            "footer",
            "creditTotal",
            "ConditionalRef",
            json!({"criterion": "body.kind", "condition": "not equal", "value": "D", "type": "sum", "ref": "body.amount"}),
        );
        assert!(run(&sum, &t).is_none());
    }

    #[test]
    fn sql_validator_compares_the_named_column() {
        let t = tables(vec![table("body", &[("code", &[Some("A"), Some("B")])])]);
        let r = rule(
            "body",
            "code",
            "Sql",
            json!({"secret_name": "db", "host": "h", "database": "d", "sql_query": "SELECT code FROM codes"}),
        );
        let secrets = StaticSecretStore::new().with_secret("db", "u", "p");
        let relational = ScriptedRelationalStore::new().respond(
            "FROM codes",
            &["code"],
            &[&["A"], &["C"]],
        );
        let ctx = RuleContext {
            tables: &t,
            secrets: &secrets,
            relational: &relational,
            now: Utc::now(),
        };
        let failure = evaluate(&r, &ctx).unwrap().unwrap();
        assert_eq!(failure.fail_count, 1);
        assert_eq!(relational.executed().len(), 1);
    }

    #[test]
    fn validate_collects_every_failure() {
        let t = tables(vec![table("body", &[("ref", &[Some("SX1"), None])])]);
        let rules = vec![
            rule("body", "ref", "NaN", json!({})),
            rule("body", "ref", "Regex", json!({"pattern": "^SX"})),
            rule("body", "ref", "Unique", json!({})),
        ];
        let secrets = StaticSecretStore::new();
        let relational = ScriptedRelationalStore::new();
        let ctx = RuleContext {
            tables: &t,
            secrets: &secrets,
            relational: &relational,
            now: Utc::now(),
        };
        let mut outcomes = Vec::new();
        let err = validate(&rules, &ctx, &mut outcomes).unwrap_err();
        assert_eq!(err.validation_failures().len(), 3);
        assert_eq!(outcomes.len(), 3);
    }

    #[test]
    fn unknown_column_is_a_config_error() {
        let t = tables(vec![table("body", &[("a", &[Some("1")])])]);
        let r = rule("body", "missing", "Unique", json!({}));
        let secrets = StaticSecretStore::new();
        let relational = ScriptedRelationalStore::new();
        let ctx = RuleContext {
            tables: &t,
            secrets: &secrets,
            relational: &relational,
            now: Utc::now(),
        };
        assert!(matches!(evaluate(&r, &ctx), Err(TransformError::InvalidConfig(_))));
    }
}
