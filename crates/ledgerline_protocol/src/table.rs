//! Parsed segment tables.
//!
//! A `ParsedTable` is column-oriented: every column holds one nullable
//! `Scalar` per row and all columns have the same length. Parsers only ever
//! produce `Scalar::Text`; converters may rewrite a column to numbers.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// One output record (field name -> JSON value).
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Parsed tables keyed by segment (or output group) name.
pub type TableSet = BTreeMap<String, ParsedTable>;

/// A non-null cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn text(value: impl Into<String>) -> Self {
        Scalar::Text(value.into())
    }

    /// Numeric view of the cell. Text is trimmed before parsing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Integer view of the cell. Text is trimmed; floats must be integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Integer(v) => Some(*v),
            Scalar::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Scalar::Float(_) => None,
            Scalar::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| match trimmed.parse::<f64>() {
                        Ok(f) if f.fract() == 0.0 => Some(f as i64),
                        _ => None,
                    })
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Integer(v) => serde_json::Value::from(*v),
            Scalar::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Scalar::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Ordering used when aligning tables on an aggregate key.
    /// Numbers sort before text; numbers compare numerically and text
    /// compares without its fixed-width padding.
    pub fn sort_cmp(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Scalar::Text(a), Scalar::Text(b)) => a.trim().cmp(b.trim()),
            (Scalar::Text(_), _) => Ordering::Greater,
            (_, Scalar::Text(_)) => Ordering::Less,
            (a, b) => {
                let a = a.as_f64().unwrap_or(f64::NAN);
                let b = b.as_f64().unwrap_or(f64::NAN);
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Null-aware ordering: nulls sort last.
pub fn cell_sort_cmp(a: &Option<Scalar>, b: &Option<Scalar>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.sort_cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn cell_to_json(cell: &Option<Scalar>) -> serde_json::Value {
    cell.as_ref()
        .map(Scalar::to_json)
        .unwrap_or(serde_json::Value::Null)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<Scalar>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Option<Scalar>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}

/// Error raised when a table would violate the equal-length invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("table '{table}' expects {expected} values per row, got {actual}")]
    RowWidth {
        table: String,
        expected: usize,
        actual: usize,
    },
    #[error("column '{column}' of table '{table}' has {actual} rows, expected {expected}")]
    ColumnLength {
        table: String,
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    name: String,
    columns: Vec<Column>,
    row_count: usize,
}

impl ParsedTable {
    /// Empty table with the given column order.
    pub fn new<I, S>(name: impl Into<String>, field_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: field_names
                .into_iter()
                .map(|n| Column::new(n, Vec::new()))
                .collect(),
            row_count: 0,
        }
    }

    /// Build a table from whole columns; all columns must be the same length.
    pub fn from_columns(name: impl Into<String>, columns: Vec<Column>) -> Result<Self, TableError> {
        let name = name.into();
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        for column in &columns {
            if column.len() != row_count {
                return Err(TableError::ColumnLength {
                    table: name,
                    column: column.name.clone(),
                    expected: row_count,
                    actual: column.len(),
                });
            }
        }
        Ok(Self {
            name,
            columns,
            row_count,
        })
    }

    pub fn push_row(&mut self, values: Vec<Option<Scalar>>) -> Result<(), TableError> {
        if values.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                table: self.name.clone(),
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.values.push(value);
        }
        self.row_count += 1;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, field: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == field)
    }

    pub fn cell(&self, row: usize, field: &str) -> Option<&Scalar> {
        self.column(field)
            .and_then(|c| c.values.get(row))
            .and_then(Option::as_ref)
    }

    /// Replace the values of an existing column, keeping its position.
    pub fn replace_column(
        &mut self,
        field: &str,
        values: Vec<Option<Scalar>>,
    ) -> Result<(), TableError> {
        if values.len() != self.row_count {
            return Err(TableError::ColumnLength {
                table: self.name.clone(),
                column: field.to_string(),
                expected: self.row_count,
                actual: values.len(),
            });
        }
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == field)
            .ok_or_else(|| TableError::UnknownColumn {
                table: self.name.clone(),
                column: field.to_string(),
            })?;
        column.values = values;
        Ok(())
    }

    /// Stable sort of all rows by one column (nulls last).
    pub fn sorted_by(&self, field: &str) -> Result<ParsedTable, TableError> {
        let key = self.column(field).ok_or_else(|| TableError::UnknownColumn {
            table: self.name.clone(),
            column: field.to_string(),
        })?;
        let mut order: Vec<usize> = (0..self.row_count).collect();
        order.sort_by(|&a, &b| cell_sort_cmp(&key.values[a], &key.values[b]));
        Ok(self.take_rows(&order))
    }

    fn take_rows(&self, indices: &[usize]) -> ParsedTable {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                Column::new(
                    c.name.clone(),
                    indices.iter().map(|&i| c.values[i].clone()).collect(),
                )
            })
            .collect();
        ParsedTable {
            name: self.name.clone(),
            columns,
            row_count: indices.len(),
        }
    }

    /// One row as a JSON record, in column order.
    pub fn record(&self, row: usize) -> Record {
        self.columns
            .iter()
            .map(|c| {
                let value = c.values.get(row).map(cell_to_json).unwrap_or_default();
                (c.name.clone(), value)
            })
            .collect()
    }

    pub fn to_records(&self) -> Vec<Record> {
        (0..self.row_count).map(|row| self.record(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Option<Scalar> {
        Some(Scalar::text(s))
    }

    #[test]
    fn push_row_rejects_wrong_width() {
        let mut table = ParsedTable::new("body", ["a", "b"]);
        table.push_row(vec![text("1"), text("2")]).unwrap();
        let err = table.push_row(vec![text("1")]).unwrap_err();
        assert!(matches!(err, TableError::RowWidth { expected: 2, actual: 1, .. }));
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn from_columns_requires_equal_lengths() {
        let err = ParsedTable::from_columns(
            "g",
            vec![
                Column::new("a", vec![text("1")]),
                Column::new("b", vec![text("1"), text("2")]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, TableError::ColumnLength { .. }));
    }

    #[test]
    fn sorted_by_is_stable_with_nulls_last() {
        let mut table = ParsedTable::new("body", ["key", "tag"]);
        table.push_row(vec![text("B"), text("first-b")]).unwrap();
        table.push_row(vec![None, text("null")]).unwrap();
        table.push_row(vec![text("A"), text("a")]).unwrap();
        table.push_row(vec![text("B"), text("second-b")]).unwrap();

        let sorted = table.sorted_by("key").unwrap();
        let tags: Vec<_> = sorted
            .column("tag")
            .unwrap()
            .values
            .iter()
            .map(|v| v.as_ref().unwrap().to_string())
            .collect();
        assert_eq!(tags, vec!["a", "first-b", "second-b", "null"]);
    }

    #[test]
    fn sorted_by_ignores_padding() {
        let mut table = ParsedTable::new("body", ["key"]);
        table.push_row(vec![text(" 9")]).unwrap();
        table.push_row(vec![text("10")]).unwrap();
        table.push_row(vec![text("9 ")]).unwrap();

        let sorted = table.sorted_by("key").unwrap();
        let keys: Vec<_> = sorted
            .column("key")
            .unwrap()
            .values
            .iter()
            .map(|v| v.as_ref().unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["10", " 9", "9 "]);
    }

    #[test]
    fn numeric_views_trim_text() {
        assert_eq!(Scalar::text(" 42 ").as_i64(), Some(42));
        assert_eq!(Scalar::text("10.50").as_f64(), Some(10.5));
        assert_eq!(Scalar::text("12.5").as_i64(), None);
        assert_eq!(Scalar::text("abc").as_f64(), None);
    }

    #[test]
    fn record_keeps_nulls() {
        let mut table = ParsedTable::new("h", ["a", "b"]);
        table.push_row(vec![text("x"), None]).unwrap();
        let record = table.record(0);
        assert_eq!(record["a"], serde_json::json!("x"));
        assert!(record["b"].is_null());
    }
}
