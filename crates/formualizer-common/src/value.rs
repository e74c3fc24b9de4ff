//! The cell value model and Excel's 1900 date-serial arithmetic.
//!
//! Dates and times have no dedicated `CellValue` variant — like Excel
//! itself, they are plain `Number`s that `formualizer-eval`'s date/time
//! builtins interpret as serials via [`serial_to_datetime`] /
//! [`datetime_to_serial`]. Only those two conversion functions need to
//! know about the 1900 leap-year quirk; everything upstream just sees
//! an `f64`.

use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

use chrono::{Datelike, Duration as ChronoDur, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::ExcelError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ───────────────────── Excel date-serial utilities ───────────────────
Excel's serial date system:
  Serial 1  = 1900-01-01
  Serial 59 = 1900-02-28
  Serial 60 = 1900-02-29  (phantom – Lotus 1-2-3's leap-year bug, which
                            Excel deliberately preserved for compatibility)
  Serial 61 = 1900-03-01
Base date = 1899-12-31 so that serial 1 = base + 1 day = 1900-01-01.
Time is stored as fractional days (no timezone).
------------------------------------------------------------------- */

/// Base date for the 1900 date system. Serial 1 = base + 1 day = 1900-01-01.
const EXCEL_EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap();

pub fn datetime_to_serial(dt: &NaiveDateTime) -> f64 {
    let days = (dt.date() - EXCEL_EPOCH).num_days();
    // Dates on or after 1900-03-01 get +1 to account for the phantom Feb 29.
    let serial_days = if dt.date() >= NaiveDate::from_ymd_opt(1900, 3, 1).unwrap() {
        days + 1
    } else {
        days
    };

    let secs_in_day = dt.time().num_seconds_from_midnight() as f64;
    serial_days as f64 + secs_in_day / 86_400.0
}

pub fn serial_to_datetime(serial: f64) -> NaiveDateTime {
    let days = serial.trunc() as i64;
    let frac_secs = (serial.fract() * 86_400.0).round() as i64;

    // 1900-02-29 never happened on the real Gregorian calendar, so `NaiveDate`
    // has no value to represent it; day-arithmetic callers (EDATE, EOMONTH,
    // DAYS) get it collapsed onto 1900-02-28, same as serial 59. Callers that
    // need Excel's own (year, month, day) for serial 60 — YEAR/MONTH/DAY —
    // must go through `serial_to_ymd` instead, which reports the phantom day
    // directly rather than its collapsed stand-in.
    let offset = if days < 60 { days } else { days - 1 };
    let date = EXCEL_EPOCH + ChronoDur::days(offset);

    let time =
        NaiveTime::from_num_seconds_from_midnight_opt((frac_secs.rem_euclid(86_400)) as u32, 0)
            .unwrap();
    date.and_time(time)
}

/// The `(year, month, day)` Excel reports for a serial, honoring the Lotus
/// phantom leap day at serial 60 that `serial_to_datetime` cannot represent
/// as a real `NaiveDate`.
pub fn serial_to_ymd(serial: f64) -> (i32, u32, u32) {
    if serial.trunc() as i64 == 60 {
        return (1900, 2, 29);
    }
    let dt = serial_to_datetime(serial);
    (dt.year(), dt.month(), dt.day())
}

/// A single cell's value, as produced by `calculate()`/`recalculate()`.
///
/// `Formula` is what `load()` writes into the value store for a formula
/// cell before its first evaluation — every other variant is a settled
/// result (input literal or computed output).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Int(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(ExcelError),
    Formula(String),
}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            CellValue::Empty => state.write_u8(0),
            CellValue::Int(i) => i.hash(state),
            CellValue::Number(n) => n.to_bits().hash(state),
            CellValue::Text(s) => s.hash(state),
            CellValue::Boolean(b) => b.hash(state),
            CellValue::Error(e) => e.hash(state),
            CellValue::Formula(s) => s.hash(state),
        }
    }
}

impl Eq for CellValue {}

impl Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => write!(f, ""),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Error(e) => write!(f, "{e}"),
            CellValue::Formula(s) => write!(f, "{s}"),
        }
    }
}

impl CellValue {
    /// Numeric coercion used by arithmetic and the date/time builtins.
    /// `Empty` coerces to `0.0` (Excel's blank-cell-in-arithmetic rule);
    /// `Text`/`Error`/`Formula` have no numeric reading.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Empty => Some(0.0),
            _ => None,
        }
    }

    /// `as_f64` with non-numeric values folded to `0.0` — the loose
    /// coercion builtin argument parsing uses where a missing/malformed
    /// numeric argument should degrade rather than abort the formula.
    pub fn as_f64_or_zero(&self) -> f64 {
        self.as_f64().unwrap_or(0.0)
    }

    /// Excel's truthiness coercion for `IF`/`AND`/`OR` and friends.
    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Boolean(b) => *b,
            CellValue::Int(i) => *i != 0,
            CellValue::Number(n) => *n != 0.0,
            CellValue::Text(s) => !s.is_empty(),
            CellValue::Error(_) => false,
            CellValue::Empty => false,
            CellValue::Formula(_) => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Int(_) | CellValue::Number(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lotus_leap_year_quirk_round_trips() {
        // Serial 59 = 1900-02-28, serial 61 = 1900-03-01; serial 60 is the
        // phantom day and collapses onto 1900-02-28 for date arithmetic.
        let d59 = serial_to_datetime(59.0);
        assert_eq!(d59.date(), NaiveDate::from_ymd_opt(1900, 2, 28).unwrap());
        let d61 = serial_to_datetime(61.0);
        assert_eq!(d61.date(), NaiveDate::from_ymd_opt(1900, 3, 1).unwrap());
        assert_eq!(datetime_to_serial(&d61), 61.0);
    }

    #[test]
    fn serial_60_reports_the_phantom_leap_day() {
        assert_eq!(serial_to_ymd(60.0), (1900, 2, 29));
        assert_eq!(serial_to_ymd(59.0), (1900, 2, 28));
        assert_eq!(serial_to_ymd(61.0), (1900, 3, 1));
    }

    #[test]
    fn truthy_coercion() {
        assert!(CellValue::Int(1).is_truthy());
        assert!(!CellValue::Int(0).is_truthy());
        assert!(!CellValue::Text(String::new()).is_truthy());
        assert!(CellValue::Text("x".into()).is_truthy());
        assert!(!CellValue::Error(ExcelError::Na).is_truthy());
    }
}
