//! Segment layout model: field column ranges and segment parser kinds.

use ledgerline_protocol::{TransformError, TransformResult};
use std::fmt;
use std::str::FromStr;

/// Half-open character range `[start, end)` of one fixed-width field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
}

impl ColumnRange {
    pub fn new(start: usize, end: usize) -> TransformResult<Self> {
        if end < start {
            return Err(TransformError::invalid_config(format!(
                "column range end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn width(&self) -> usize {
        self.end - self.start
    }
}

impl fmt::Display for ColumnRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.start, self.end)
    }
}

impl FromStr for ColumnRange {
    type Err = TransformError;

    /// `"start,end"`: exactly one comma, both sides integers after trimming.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let malformed = || {
            TransformError::invalid_config(format!(
                "column spec '{}' must be two comma separated integers, e.g. 0,5",
                spec
            ))
        };
        let (start, end) = spec.split_once(',').ok_or_else(malformed)?;
        if end.contains(',') {
            return Err(malformed());
        }
        let start = start.trim().parse::<usize>().map_err(|_| malformed())?;
        let end = end.trim().parse::<usize>().map_err(|_| malformed())?;
        ColumnRange::new(start, end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub range: ColumnRange,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, range: ColumnRange) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }
}

/// Which physical lines a segment reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserKind {
    /// First physical line.
    Header,
    /// Every line except the header/footer lines claimed by sibling segments.
    Body,
    /// Last physical line.
    Footer,
    /// Every line.
    BodyOnly,
}

impl ParserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserKind::Header => "header",
            ParserKind::Body => "body",
            ParserKind::Footer => "footer",
            ParserKind::BodyOnly => "body_only",
        }
    }

    /// Resolve a formatter name, accepting the legacy class names.
    pub fn from_formatter(name: &str) -> Option<Self> {
        match name {
            "header" | "Header" | "HeaderSourceFormatter" | "HeaderMapper" => {
                Some(ParserKind::Header)
            }
            "body" | "Body" | "BodySourceFormatter" | "BodyMapper" => Some(ParserKind::Body),
            "footer" | "Footer" | "FooterSourceFormatter" | "FooterMapper" => {
                Some(ParserKind::Footer)
            }
            "body_only" | "BodyOnly" | "BodyOnlySourceFormatter" | "BodyOnlyMapper" => {
                Some(ParserKind::BodyOnly)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSpec {
    pub name: String,
    pub kind: ParserKind,
    pub fields: Vec<FieldSpec>,
    pub skip_header_row: bool,
    pub skip_footer_row: bool,
}

impl SegmentSpec {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Fill in body skipping from the kinds present among sibling segments.
pub fn apply_skip_rows(segments: &mut [SegmentSpec]) {
    let has_header = segments.iter().any(|s| s.kind == ParserKind::Header);
    let has_footer = segments.iter().any(|s| s.kind == ParserKind::Footer);
    for segment in segments.iter_mut() {
        let is_body = segment.kind == ParserKind::Body;
        segment.skip_header_row = is_body && has_header;
        segment.skip_footer_row = is_body && has_footer;
    }
}

/// A `"<segment>.<field>"` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub segment: String,
    pub field: String,
}

impl FieldRef {
    pub fn new(segment: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            field: field.into(),
        }
    }

    /// Whether a result `value` expression looks like a reference.
    pub fn is_reference(expression: &str) -> bool {
        expression.contains('.')
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.segment, self.field)
    }
}

impl FromStr for FieldRef {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(segment), Some(field), None) if !segment.is_empty() && !field.is_empty() => {
                Ok(FieldRef::new(segment, field))
            }
            _ => Err(TransformError::invalid_config(format!(
                "'{}' is not a <segment>.<field> reference",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_spec_requires_exactly_one_comma() {
        assert_eq!(
            " 0 , 5 ".parse::<ColumnRange>().unwrap(),
            ColumnRange { start: 0, end: 5 }
        );
        for bad in ["1", "1,2,3", "a,2", "", "3,1"] {
            assert!(bad.parse::<ColumnRange>().is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn body_skips_only_when_siblings_exist() {
        let segment = |name: &str, kind| SegmentSpec {
            name: name.into(),
            kind,
            fields: Vec::new(),
            skip_header_row: false,
            skip_footer_row: false,
        };
        let mut segments = vec![
            segment("header", ParserKind::Header),
            segment("body", ParserKind::Body),
        ];
        apply_skip_rows(&mut segments);
        assert!(segments[1].skip_header_row);
        assert!(!segments[1].skip_footer_row);
        assert!(!segments[0].skip_header_row);
    }

    #[test]
    fn field_ref_parsing() {
        let r: FieldRef = "footer.recordCount".parse().unwrap();
        assert_eq!(r, FieldRef::new("footer", "recordCount"));
        assert!("footer".parse::<FieldRef>().is_err());
        assert!("a.b.c".parse::<FieldRef>().is_err());
        assert_eq!(r.to_string(), "footer.recordCount");
    }

    #[test]
    fn formatter_aliases() {
        assert_eq!(
            ParserKind::from_formatter("HeaderSourceFormatter"),
            Some(ParserKind::Header)
        );
        assert_eq!(ParserKind::from_formatter("footer"), Some(ParserKind::Footer));
        assert_eq!(ParserKind::from_formatter("CSVHeaderFormatter"), None);
    }
}
