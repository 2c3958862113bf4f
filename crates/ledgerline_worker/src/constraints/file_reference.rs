use ledgerline_protocol::{ConstraintFailure, ParsedTable, TableError, TransformError, TransformResult};
use ledgerline_schema::{FileReferenceCheck, SegmentCheckRule};
use tracing::{debug, info};

use super::ConstraintEnv;
use crate::parser::parse_file;
use crate::rules::cell_key;

/// Separator between field values in a row composite.
const COMPOSITE_SEPARATOR: &str = "\u{1f}";

/// Download and parse the reference file, then compare segment pairs.
/// Every failing pair is reported; none short-circuits the others.
pub(super) fn check(
    name: &str,
    check: &FileReferenceCheck,
    env: &ConstraintEnv<'_>,
) -> TransformResult<Vec<ConstraintFailure>> {
    let companion = check
        .companion
        .resolve(name, env.event.file_name(), Some(env.tables))?;
    let body = env
        .collaborators
        .object_store
        .download(&check.bucket, &companion)
        .map_err(|e| e.into_transform("object store"))?;
    let text = String::from_utf8_lossy(&body);
    let reference = parse_file(&check.reference_segments, &text, &companion)?;
    info!(
        constraint = name,
        reference = %companion,
        segments = reference.len(),
        "Parsed reference file"
    );

    let mut failures = Vec::new();
    for rule in &check.rules {
        let source = env.tables.get(&rule.source_segment).ok_or_else(|| {
            TransformError::misconfigured(
                name,
                format!("source segment {} was not parsed", rule.source_segment),
            )
        })?;
        let target = reference.get(&rule.ref_segment).ok_or_else(|| {
            TransformError::misconfigured(
                name,
                format!("reference segment {} was not parsed", rule.ref_segment),
            )
        })?;
        if let Some(failure) = compare(name, rule, source, target)? {
            failures.push(failure);
        }
    }
    Ok(failures)
}

fn compare(
    name: &str,
    rule: &SegmentCheckRule,
    source: &ParsedTable,
    target: &ParsedTable,
) -> TransformResult<Option<ConstraintFailure>> {
    let rows = source.row_count();
    if rows != target.row_count() {
        return Ok(Some(
            ConstraintFailure::new(
                name,
                format!(
                    "{} has {} rows but reference {} has {}",
                    rule.source_segment,
                    rows,
                    rule.ref_segment,
                    target.row_count()
                ),
            )
            .with_segment(&rule.source_segment)
            .with_counts(rows.abs_diff(target.row_count()), rows),
        ));
    }

    let misconfigured = |e: TableError| TransformError::misconfigured(name, e.to_string());
    let (source, target) = match &rule.aggregate {
        Some(keys) => (
            source.sorted_by(&keys.source).map_err(misconfigured)?,
            target.sorted_by(&keys.reference).map_err(misconfigured)?,
        ),
        None => (source.clone(), target.clone()),
    };

    let left = composite_keys(name, &source, &rule.source_columns())?;
    let right = composite_keys(name, &target, &rule.reference_columns())?;
    let mismatched = left.iter().zip(&right).filter(|(a, b)| a != b).count();
    debug!(
        constraint = name,
        segment = %rule.source_segment,
        rows,
        mismatched,
        "Compared segment with reference"
    );
    if mismatched == 0 {
        return Ok(None);
    }
    Ok(Some(
        ConstraintFailure::new(
            name,
            format!(
                "{}/{} rows of {} differ from reference {}",
                mismatched, rows, rule.source_segment, rule.ref_segment
            ),
        )
        .with_segment(&rule.source_segment)
        .with_counts(mismatched, rows),
    ))
}

/// One composite string per row: the trimmed values of `columns`, joined.
pub fn composite_keys(
    constraint: &str,
    table: &ParsedTable,
    columns: &[&str],
) -> TransformResult<Vec<String>> {
    let columns = columns
        .iter()
        .map(|field| {
            table.column(field).ok_or_else(|| {
                TransformError::misconfigured(
                    constraint,
                    format!("{} has no field {}", table.name(), field),
                )
            })
        })
        .collect::<TransformResult<Vec<_>>>()?;

    Ok((0..table.row_count())
        .map(|row| {
            let parts: Vec<String> = columns
                .iter()
                .map(|c| cell_key(&c.values[row]).unwrap_or_default())
                .collect();
            parts.join(COMPOSITE_SEPARATOR)
        })
        .collect())
}
