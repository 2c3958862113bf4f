//! Column converters, applied after validation.

use ledgerline_protocol::{Scalar, TableSet, TransformError, TransformResult};
use ledgerline_schema::{ConversionRule, ConverterKind};
use tracing::debug;

/// Rewrite every converted column in place. A column with cells that cannot
/// be coerced fails as a whole, listing the offending row indices.
pub fn apply_converters(rules: &[ConversionRule], tables: &mut TableSet) -> TransformResult<()> {
    for rule in rules {
        let table = tables.get_mut(&rule.segment).ok_or_else(|| {
            TransformError::invalid_config(format!(
                "converter references unknown segment {}",
                rule.segment
            ))
        })?;
        let column = table.column(&rule.field).ok_or_else(|| {
            TransformError::invalid_config(format!(
                "converter references unknown column {}.{}",
                rule.segment, rule.field
            ))
        })?;

        let mut converted = Vec::with_capacity(column.len());
        let mut bad_rows = Vec::new();
        for (row, cell) in column.values.iter().enumerate() {
            match convert_cell(cell.as_ref(), rule.kind) {
                Ok(value) => converted.push(value),
                Err(()) => {
                    bad_rows.push(row);
                    converted.push(None);
                }
            }
        }
        if !bad_rows.is_empty() {
            return Err(TransformError::Conversion {
                segment: rule.segment.clone(),
                field: rule.field.clone(),
                cause: format!("{} value(s) are not numeric", bad_rows.len()),
                rows: bad_rows,
            });
        }

        table
            .replace_column(&rule.field, converted)
            .map_err(|e| TransformError::invalid_config(e.to_string()))?;
        debug!(
            segment = %rule.segment,
            field = %rule.field,
            converter = rule.kind.as_str(),
            "Converted column"
        );
    }
    Ok(())
}

fn convert_cell(cell: Option<&Scalar>, kind: ConverterKind) -> Result<Option<Scalar>, ()> {
    let Some(value) = cell else {
        return Ok(None);
    };
    match kind {
        ConverterKind::ToString => Ok(Some(Scalar::Text(value.to_string().trim().to_string()))),
        ConverterKind::ToNumber => match value {
            Scalar::Integer(_) | Scalar::Float(_) => Ok(Some(value.clone())),
            Scalar::Text(text) => parse_number(text).map(Some).ok_or(()),
        },
    }
}

/// Integer first, then float. Non-finite floats are rejected.
fn parse_number(text: &str) -> Option<Scalar> {
    let trimmed = text.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(Scalar::Integer(v));
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(Scalar::Float(v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerline_protocol::{Column, ParsedTable};

    fn tables(values: &[Option<&str>]) -> TableSet {
        let column = Column::new("amount", values.iter().map(|v| v.map(Scalar::text)).collect());
        let table = ParsedTable::from_columns("body", vec![column]).unwrap();
        TableSet::from([("body".to_string(), table)])
    }

    fn rule(kind: ConverterKind) -> ConversionRule {
        ConversionRule {
            segment: "body".into(),
            field: "amount".into(),
            kind,
        }
    }

    #[test]
    fn to_number_prefers_integers() {
        let mut t = tables(&[Some(" 0042"), Some("1.50 "), None]);
        apply_converters(&[rule(ConverterKind::ToNumber)], &mut t).unwrap();
        let values = &t["body"].column("amount").unwrap().values;
        assert_eq!(values[0], Some(Scalar::Integer(42)));
        assert_eq!(values[1], Some(Scalar::Float(1.5)));
        assert_eq!(values[2], None);
    }

    #[test]
    fn to_number_reports_failing_rows() {
        let mut t = tables(&[Some("1"), Some("x1"), Some("2"), Some("NaN")]);
        let err = apply_converters(&[rule(ConverterKind::ToNumber)], &mut t).unwrap_err();
        match err {
            TransformError::Conversion { segment, field, rows, .. } => {
                assert_eq!((segment.as_str(), field.as_str()), ("body", "amount"));
                assert_eq!(rows, vec![1, 3]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn to_string_trims() {
        let mut t = tables(&[Some("  SGD ")]);
        apply_converters(&[rule(ConverterKind::ToString)], &mut t).unwrap();
        assert_eq!(t["body"].cell(0, "amount"), Some(&Scalar::text("SGD")));
    }
}
