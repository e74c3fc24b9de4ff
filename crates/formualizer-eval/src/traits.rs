//! The boundary between this engine and everything it does not implement:
//! `.xlsx` I/O, the styled-cell model, workbook/worksheet proxy objects.
//! Consumers implement [`WorkbookView`] over whatever storage they have;
//! the engine only ever reads through this trait.

use chrono::NaiveDateTime;

/// The wire-level tag for a cell's raw content, as `WorkbookView` exposes
/// it. Converted to `formualizer_common::CellValue` during `load()`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCellValue {
    Empty,
    Int(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
    /// A wire-form error code, e.g. `"#DIV/0!"`.
    ErrorCode(String),
    /// Formula text including the leading `=`.
    Formula(String),
}

/// A single sheet's identity and cell contents, as `WorkbookView` yields
/// them to `load()`.
pub struct SheetCells<'a> {
    pub name: &'a str,
    pub cells: Vec<(u32, u32, RawCellValue)>,
}

/// Consumed by `WorkbookEvaluator::load`. Implementations own sheet
/// enumeration, cell storage, and defined names; this engine never
/// performs I/O of its own.
pub trait WorkbookView {
    /// Sheets in declaration order.
    fn sheets(&self) -> Vec<SheetCells<'_>>;

    /// Upper-cased name -> refers-to string (single ref or range).
    fn defined_names(&self) -> Vec<(String, String)>;
}

/// Samples the wall clock for `NOW`/`TODAY`. The default implementation
/// reads the host clock; tests inject a fixed value for determinism.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
