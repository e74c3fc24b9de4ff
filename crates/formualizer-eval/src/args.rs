//! The value shape that flows between the interpreter and the function
//! registry: either a resolved scalar or a 2-D range.

use formualizer_common::{CellValue, ExcelError, RangeValue};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(CellValue),
    Range(RangeValue),
}

impl Value {
    pub fn empty() -> Self {
        Value::Scalar(CellValue::Empty)
    }

    pub fn error(e: ExcelError) -> Self {
        Value::Scalar(CellValue::Error(e))
    }

    pub fn number(n: f64) -> Self {
        Value::Scalar(CellValue::Number(n))
    }

    pub fn int(n: i64) -> Self {
        Value::Scalar(CellValue::Int(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Scalar(CellValue::Text(s.into()))
    }

    pub fn boolean(b: bool) -> Self {
        Value::Scalar(CellValue::Boolean(b))
    }

    /// Collapse to a single `CellValue` — ranges collapse to their
    /// top-left cell (Excel's implicit intersection for scalar context).
    pub fn as_scalar(&self) -> CellValue {
        match self {
            Value::Scalar(v) => v.clone(),
            Value::Range(r) => r.get(1, 1),
        }
    }

    /// Flatten to a row-major `Vec<CellValue>` regardless of shape.
    pub fn flatten(&self) -> Vec<CellValue> {
        match self {
            Value::Scalar(v) => vec![v.clone()],
            Value::Range(r) => r.flatten(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.as_scalar(), CellValue::Error(_))
    }

    pub fn as_error(&self) -> Option<ExcelError> {
        match self.as_scalar() {
            CellValue::Error(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CellValue> for Value {
    fn from(v: CellValue) -> Self {
        Value::Scalar(v)
    }
}

impl From<RangeValue> for Value {
    fn from(v: RangeValue) -> Self {
        Value::Range(v)
    }
}

/// The leftmost error among `args` when flattened, if any — used by
/// `Normal` builtins that must propagate rather than skip.
pub fn first_error(args: &[Value]) -> Option<ExcelError> {
    args.iter().find_map(|a| a.as_error())
}

/// Flatten every arg and coerce to `f64`, skipping non-numeric cells
/// (text, empty, errors) — the aggregation contract SUM/AVERAGE/etc use.
pub fn coerce_numeric(args: &[Value]) -> Vec<f64> {
    args.iter()
        .flat_map(|a| a.flatten())
        .filter_map(|v| match v {
            CellValue::Int(i) => Some(i as f64),
            CellValue::Number(n) => Some(n),
            CellValue::Boolean(b) => Some(if b { 1.0 } else { 0.0 }),
            _ => None,
        })
        .collect()
}

/// Excel's string rendering for text-producing functions — `Empty` is
/// `""`, booleans render as `TRUE`/`FALSE`.
pub fn coerce_text(v: &CellValue) -> String {
    match v {
        CellValue::Empty => String::new(),
        other => other.to_string(),
    }
}
