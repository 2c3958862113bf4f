use chrono::{NaiveDate, NaiveDateTime};
use ledgerline_protocol::defaults::FILE_NAME_TOKEN;
use ledgerline_protocol::{ConnectionInfo, ConstraintFailure, TransformError, TransformResult};
use ledgerline_schema::{SqlCheck, SqlSourceBinding};
use regex::{Captures, Regex};
use std::collections::HashMap;
use tracing::debug;

use super::ConstraintEnv;
use crate::parser::{slice_line, split_lines};

/// Run the rendered query; an empty result is a failure.
pub(super) fn check(
    name: &str,
    check: &SqlCheck,
    env: &ConstraintEnv<'_>,
) -> TransformResult<Vec<ConstraintFailure>> {
    let values = source_values(name, check, env)?;
    let query = render_query(
        name,
        &check.query,
        env.event.file_name(),
        &values,
        check.date_format.as_deref(),
    )?;
    debug!(constraint = name, query = %query, "Rendered constraint query");

    let credentials = env
        .collaborators
        .secrets
        .get_secret(&check.connection.secret_name)
        .map_err(|e| e.into_transform("secret store"))?;
    let connection = ConnectionInfo {
        engine: check.connection.engine.clone(),
        host: check.connection.host.clone(),
        port: check.connection.port,
        database: check.connection.database.clone(),
        credentials,
    };
    let result = env
        .collaborators
        .relational
        .query(&connection, &query)
        .map_err(|e| e.into_transform("relational store"))?;

    if result.is_empty() {
        return Ok(vec![ConstraintFailure::new(name, "query returned no rows")
            .with_segment("NA")
            .with_counts(1, 1)]);
    }
    Ok(Vec::new())
}

/// Field values available to query tokens, taken from the first source row.
fn source_values(
    name: &str,
    check: &SqlCheck,
    env: &ConstraintEnv<'_>,
) -> TransformResult<HashMap<String, String>> {
    let mut values = HashMap::new();
    match &check.binding {
        SqlSourceBinding::None => {}
        SqlSourceBinding::Segment(segment) => {
            let table = env.tables.get(segment).ok_or_else(|| {
                TransformError::misconfigured(name, format!("source segment {} was not parsed", segment))
            })?;
            for field in table.field_names() {
                if let Some(value) = table.cell(0, field) {
                    values.insert(field.to_string(), value.to_string().trim().to_string());
                }
            }
        }
        SqlSourceBinding::Inline(fields) => {
            let first = split_lines(env.source_text).into_iter().next().unwrap_or_default();
            for (field, cell) in fields.iter().zip(slice_line(first, fields)) {
                if let Some(value) = cell {
                    values.insert(field.name.clone(), value.to_string().trim().to_string());
                }
            }
        }
    }
    Ok(values)
}

/// Substitute `{token}` placeholders. `{file_name}` is the source basename;
/// other tokens take a source value, rewritten to `%Y-%m-%d` when it parses
/// under `date_format` and used verbatim otherwise.
pub fn render_query(
    constraint: &str,
    template: &str,
    file_name: &str,
    values: &HashMap<String, String>,
    date_format: Option<&str>,
) -> TransformResult<String> {
    let token = Regex::new(r"\{([a-zA-Z0-9_]*)\}")
        .map_err(|e| TransformError::invalid_config(e.to_string()))?;

    let mut missing = Vec::new();
    let rendered = token.replace_all(template, |caps: &Captures<'_>| {
        let key = &caps[1];
        if key == FILE_NAME_TOKEN {
            return file_name.to_string();
        }
        match values.get(key) {
            Some(value) => reformat_date(value, date_format),
            None => {
                missing.push(key.to_string());
                caps[0].to_string()
            }
        }
    });

    if !missing.is_empty() {
        return Err(TransformError::misconfigured(
            constraint,
            format!("query tokens without a source value: {}", missing.join(", ")),
        ));
    }
    Ok(rendered.into_owned())
}

fn reformat_date(value: &str, date_format: Option<&str>) -> String {
    let Some(format) = date_format else {
        return value.to_string();
    };
    NaiveDate::parse_from_str(value, format)
        .or_else(|_| NaiveDateTime::parse_from_str(value, format).map(|dt| dt.date()))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| value.to_string())
}
