//! Fixed-width segment parser.
//!
//! Slicing is by character, not byte. A slice that starts past the end of the
//! line, or that holds only whitespace, is null; a short line never errors.
//! Values keep their raw text; trimming and typing belong to converters.

use ledgerline_protocol::{ParsedTable, Scalar, TableSet, TransformError, TransformResult};
use ledgerline_schema::{ColumnRange, FieldSpec, ParserKind, SegmentSpec};
use tracing::debug;

/// Physical lines of a source file. `\r\n` endings are normalised and blank
/// lines are dropped.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// The cell for one column range of one line.
pub fn slice_field(chars: &[char], range: ColumnRange) -> Option<Scalar> {
    if range.start >= chars.len() {
        return None;
    }
    let end = range.end.min(chars.len());
    let value: String = chars[range.start..end].iter().collect();
    if value.trim().is_empty() {
        None
    } else {
        Some(Scalar::Text(value))
    }
}

/// Slice one line into a row of cells in field order.
pub fn slice_line(line: &str, fields: &[FieldSpec]) -> Vec<Option<Scalar>> {
    let chars: Vec<char> = line.chars().collect();
    fields.iter().map(|f| slice_field(&chars, f.range)).collect()
}

/// Parse one segment from the file's physical lines.
pub fn parse_segment(spec: &SegmentSpec, lines: &[&str], file: &str) -> TransformResult<ParsedTable> {
    if lines.is_empty() {
        return Err(TransformError::source_file(file, "file has no lines"));
    }

    let selected: &[&str] = match spec.kind {
        ParserKind::Header => &lines[..1],
        ParserKind::Footer => &lines[lines.len() - 1..],
        ParserKind::BodyOnly => lines,
        ParserKind::Body => {
            let start = usize::from(spec.skip_header_row);
            let end = lines.len().saturating_sub(usize::from(spec.skip_footer_row));
            if start >= end {
                &[]
            } else {
                &lines[start..end]
            }
        }
    };

    if selected.is_empty() {
        return Err(TransformError::source_file(
            file,
            format!("segment '{}' has no rows", spec.name),
        ));
    }

    let mut table = ParsedTable::new(&spec.name, spec.field_names());
    for line in selected {
        table
            .push_row(slice_line(line, &spec.fields))
            .map_err(|e| TransformError::source_file(file, e.to_string()))?;
    }
    debug!(segment = %spec.name, kind = spec.kind.as_str(), rows = table.row_count(), "Parsed segment");
    Ok(table)
}

/// Parse every segment of a file.
pub fn parse_file(segments: &[SegmentSpec], text: &str, file: &str) -> TransformResult<TableSet> {
    let lines = split_lines(text);
    if lines.is_empty() {
        return Err(TransformError::source_file(file, "file has no lines"));
    }
    segments
        .iter()
        .map(|spec| Ok((spec.name.clone(), parse_segment(spec, &lines, file)?)))
        .collect()
}
