//! Result construction.
//!
//! [`prepare`] shapes validated source tables into output groups, one table
//! per group. [`transform`] turns the groups into records. Both stages
//! broadcast: a shorter column (or group) repeats its first value across the
//! longest one, so a single header value lands on every body row.

use chrono::{SecondsFormat, Utc};
use ledgerline_protocol::defaults::ROOT_GROUP;
use ledgerline_protocol::{Column, ParsedTable, Record, Scalar, TableSet, TransformError, TransformResult};
use ledgerline_schema::{FieldSource, GeneratorKind, ResultGroup, ResultSchema};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// Build one table per output group. Without groups the source tables pass
/// through unchanged.
pub fn prepare(schema: &ResultSchema, tables: &TableSet) -> TransformResult<TableSet> {
    if schema.groups.is_empty() {
        return Ok(tables.clone());
    }
    schema
        .groups
        .iter()
        .map(|group| Ok((group.name.clone(), prepare_group(group, tables)?)))
        .collect()
}

fn prepare_group(group: &ResultGroup, tables: &TableSet) -> TransformResult<ParsedTable> {
    let rows = group
        .referenced_segments()
        .filter_map(|segment| tables.get(segment))
        .map(ParsedTable::row_count)
        .max()
        .unwrap_or(1);

    let mut columns = Vec::with_capacity(group.fields.len());
    for field in &group.fields {
        let values = match &field.source {
            FieldSource::Reference(reference) => {
                let column = tables
                    .get(&reference.segment)
                    .and_then(|t| t.column(&reference.field))
                    .ok_or_else(|| {
                        TransformError::invalid_config(format!(
                            "output field {}.{} references unknown column {}",
                            group.name, field.output_name, reference
                        ))
                    })?;
                broadcast(&column.values, rows)
            }
            FieldSource::Generator(kind) => generate(*kind, rows),
        };
        columns.push(Column::new(field.output_name.clone(), values));
    }

    let table = ParsedTable::from_columns(&group.name, columns)
        .map_err(|e| TransformError::invalid_config(e.to_string()))?;
    debug!(group = %group.name, rows = table.row_count(), "Prepared output group");
    Ok(table)
}

/// The column as-is when it is long enough, otherwise its first value repeated.
fn broadcast(values: &[Option<Scalar>], rows: usize) -> Vec<Option<Scalar>> {
    if values.len() >= rows {
        values[..rows].to_vec()
    } else {
        let first = values.first().cloned().flatten();
        vec![first; rows]
    }
}

/// Fresh values for every row; nothing is shared between rows.
fn generate(kind: GeneratorKind, rows: usize) -> Vec<Option<Scalar>> {
    (0..rows)
        .map(|row| {
            Some(match kind {
                GeneratorKind::Uuid => Scalar::Text(Uuid::new_v4().to_string()),
                GeneratorKind::IncrementalId => Scalar::Integer(row as i64 + 1),
                GeneratorKind::Timestamp => {
                    Scalar::Text(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
                }
            })
        })
        .collect()
}

/// Turn prepared groups into output records.
///
/// A lone `root` group yields its rows as flat records. Otherwise every group
/// is broadcast to the longest group and each record maps group name to that
/// group's row.
pub fn transform(schema: &ResultSchema, prepared: &TableSet) -> Vec<Record> {
    let single_root = schema.groups.len() == 1 && schema.groups[0].name == ROOT_GROUP;
    if single_root {
        return prepared
            .get(ROOT_GROUP)
            .map(ParsedTable::to_records)
            .unwrap_or_default();
    }

    let groups: Vec<&ParsedTable> = if schema.groups.is_empty() {
        prepared.values().collect()
    } else {
        schema
            .groups
            .iter()
            .filter_map(|g| prepared.get(&g.name))
            .collect()
    };
    let rows = groups.iter().map(|t| t.row_count()).max().unwrap_or(0);

    (0..rows)
        .map(|row| {
            groups
                .iter()
                .map(|table| {
                    let value = match table.row_count() {
                        0 => Value::Null,
                        n if row < n => Value::Object(table.record(row)),
                        _ => Value::Object(table.record(0)),
                    };
                    (table.name().to_string(), value)
                })
                .collect()
        })
        .collect()
}
