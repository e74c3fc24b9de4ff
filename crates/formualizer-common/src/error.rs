//! Excel-compatible error singletons.
//!
//! The engine only ever produces the six error codes Excel itself raises
//! for the operations this crate implements. `ExcelError` is a plain
//! `Copy` enum rather than the richer, context-carrying error type some
//! spreadsheet engines use internally — callers that need a location
//! attach it themselves (see `formualizer-eval::error::EngineError`).

use std::fmt;

use crate::CellValue;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExcelError {
    Na,
    Value,
    Ref,
    Div,
    Num,
    Name,
}

impl ExcelError {
    /// The wire form Excel itself displays, e.g. `"#DIV/0!"`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Na => "#N/A",
            Self::Value => "#VALUE!",
            Self::Ref => "#REF!",
            Self::Div => "#DIV/0!",
            Self::Num => "#NUM!",
            Self::Name => "#NAME?",
        }
    }

    /// Parse a wire-form error code, case-insensitively. Returns `None`
    /// for anything that isn't one of the six recognised codes.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "#N/A" => Some(Self::Na),
            "#VALUE!" => Some(Self::Value),
            "#REF!" => Some(Self::Ref),
            "#DIV/0!" => Some(Self::Div),
            "#NUM!" => Some(Self::Num),
            "#NAME?" => Some(Self::Name),
            _ => None,
        }
    }
}

impl fmt::Display for ExcelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::error::Error for ExcelError {}

impl PartialEq<str> for ExcelError {
    fn eq(&self, other: &str) -> bool {
        self.code() == other
    }
}

impl PartialEq<&str> for ExcelError {
    fn eq(&self, other: &&str) -> bool {
        self.code() == *other
    }
}

impl From<ExcelError> for CellValue {
    fn from(error: ExcelError) -> Self {
        CellValue::Error(error)
    }
}

/// `true` for any value holding an Excel error.
pub fn is_error(value: &CellValue) -> bool {
    matches!(value, CellValue::Error(_))
}

/// The leftmost error among `values`, if any — the propagation order
/// scalar arithmetic and comparisons use (aggregation functions like
/// `SUM`/`AVERAGE` instead skip errors; see `formualizer-eval::builtins::stats`).
pub fn first_error(values: &[CellValue]) -> Option<ExcelError> {
    values.iter().find_map(|v| match v {
        CellValue::Error(e) => Some(*e),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_code() {
        assert_eq!(ExcelError::Div.to_string(), "#DIV/0!");
        assert_eq!(ExcelError::Na.to_string(), "#N/A");
        assert_eq!(ExcelError::Name.to_string(), "#NAME?");
    }

    #[test]
    fn parse_roundtrip() {
        for err in [
            ExcelError::Na,
            ExcelError::Value,
            ExcelError::Ref,
            ExcelError::Div,
            ExcelError::Num,
            ExcelError::Name,
        ] {
            assert_eq!(ExcelError::parse(err.code()), Some(err));
        }
        assert_eq!(ExcelError::parse("#div/0!"), Some(ExcelError::Div));
        assert_eq!(ExcelError::parse("not an error"), None);
    }

    #[test]
    fn first_error_is_leftmost() {
        let values = vec![
            CellValue::Number(1.0),
            CellValue::Error(ExcelError::Value),
            CellValue::Error(ExcelError::Div),
        ];
        assert_eq!(first_error(&values), Some(ExcelError::Value));
    }
}
