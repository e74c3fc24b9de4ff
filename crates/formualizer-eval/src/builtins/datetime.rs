//! Date/time builtins built on `formualizer_common`'s Lotus-quirk-aware
//! serial conversion. `NOW`/`TODAY` read the interpreter's sampled
//! clock value rather than the host clock directly, keeping every call
//! within one `calculate` pass consistent — grounded on the "sample the
//! wall clock once per call" note.

use chrono::{Datelike, Duration, NaiveDate, Timelike};
use formualizer_common::value::{datetime_to_serial, serial_to_datetime, serial_to_ymd};
use formualizer_common::ExcelError;

use crate::args::{first_error, Value};
use crate::interpreter::Interpreter;

pub fn today(interp: &Interpreter) -> Value {
    let midnight = interp.now.date().and_hms_opt(0, 0, 0).unwrap();
    Value::int(datetime_to_serial(&midnight) as i64)
}

pub fn now(interp: &Interpreter) -> Value {
    Value::number(datetime_to_serial(&interp.now))
}

/// `DATE(y, m, d)` normalises month overflow/underflow and maps
/// two-digit years 0-99 to 1900-1999.
pub fn date(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let (Some(y), Some(m), Some(d)) = (
        args.first().map(|v| v.as_scalar().as_f64_or_zero() as i64),
        args.get(1).map(|v| v.as_scalar().as_f64_or_zero() as i64),
        args.get(2).map(|v| v.as_scalar().as_f64_or_zero() as i64),
    ) else {
        return Value::empty();
    };

    let year = if (0..=99).contains(&y) { 1900 + y } else { y };
    let total_months = year * 12 + (m - 1);
    let norm_year = total_months.div_euclid(12);
    let norm_month = total_months.rem_euclid(12) + 1;

    let Some(base) = NaiveDate::from_ymd_opt(norm_year as i32, norm_month as u32, 1) else {
        return Value::error(ExcelError::Num);
    };
    let dt = base.and_hms_opt(0, 0, 0).unwrap() + Duration::days(d - 1);
    Value::int(datetime_to_serial(&dt) as i64)
}

pub fn year(args: &[Value]) -> Value {
    with_ymd(args, |(y, _, _)| Value::int(y as i64))
}

pub fn month(args: &[Value]) -> Value {
    with_ymd(args, |(_, m, _)| Value::int(m as i64))
}

pub fn day(args: &[Value]) -> Value {
    with_ymd(args, |(_, _, d)| Value::int(d as i64))
}

pub fn edate(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let (Some(serial), Some(n)) = (
        args.first().map(|v| v.as_scalar().as_f64_or_zero()),
        args.get(1).map(|v| v.as_scalar().as_f64_or_zero() as i64),
    ) else {
        return Value::empty();
    };
    let dt = serial_to_datetime(serial);
    shift_months(dt, n)
        .map(|d| Value::int(datetime_to_serial(&d) as i64))
        .unwrap_or_else(|| Value::error(ExcelError::Num))
}

pub fn eomonth(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let (Some(serial), Some(n)) = (
        args.first().map(|v| v.as_scalar().as_f64_or_zero()),
        args.get(1).map(|v| v.as_scalar().as_f64_or_zero() as i64),
    ) else {
        return Value::empty();
    };
    let dt = serial_to_datetime(serial);
    let Some(shifted) = shift_months(dt, n) else {
        return Value::error(ExcelError::Num);
    };
    let last_day = last_day_of(shifted.year(), shifted.month());
    let last_date = NaiveDate::from_ymd_opt(shifted.year(), shifted.month(), last_day).unwrap();
    let last_dt = last_date.and_hms_opt(0, 0, 0).unwrap();
    Value::int(datetime_to_serial(&last_dt) as i64)
}

pub fn days(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let (Some(end), Some(start)) = (
        args.first().map(|v| v.as_scalar().as_f64_or_zero()),
        args.get(1).map(|v| v.as_scalar().as_f64_or_zero()),
    ) else {
        return Value::empty();
    };
    Value::number(end - start)
}

pub fn hour(args: &[Value]) -> Value {
    with_time(args, |dt| dt.hour() as i64)
}

pub fn minute(args: &[Value]) -> Value {
    with_time(args, |dt| dt.minute() as i64)
}

pub fn second(args: &[Value]) -> Value {
    with_time(args, |dt| dt.second() as i64)
}

fn with_date(args: &[Value], f: impl Fn(chrono::NaiveDateTime) -> Value) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some(serial) = args.first().map(|v| v.as_scalar().as_f64_or_zero()) else {
        return Value::empty();
    };
    f(serial_to_datetime(serial))
}

/// Like `with_date`, but reports Excel's own `(year, month, day)` for the
/// serial rather than the real calendar date `serial_to_datetime` falls
/// back to — the only observable difference is at the phantom serial 60.
fn with_ymd(args: &[Value], f: impl Fn((i32, u32, u32)) -> Value) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some(serial) = args.first().map(|v| v.as_scalar().as_f64_or_zero()) else {
        return Value::empty();
    };
    f(serial_to_ymd(serial))
}

fn with_time(args: &[Value], f: impl Fn(chrono::NaiveDateTime) -> i64) -> Value {
    with_date(args, |dt| Value::int(f(dt)))
}

fn shift_months(dt: chrono::NaiveDateTime, n: i64) -> Option<chrono::NaiveDateTime> {
    let total = dt.year() as i64 * 12 + (dt.month() as i64 - 1) + n;
    let norm_year = total.div_euclid(12) as i32;
    let norm_month = (total.rem_euclid(12) + 1) as u32;

    let last_day_of_month = last_day_of(norm_year, norm_month);
    let day = dt.day().min(last_day_of_month);
    NaiveDate::from_ymd_opt(norm_year, norm_month, day).map(|d| d.and_hms_opt(0, 0, 0).unwrap())
}

fn last_day_of(year: i32, month: u32) -> u32 {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .unwrap()
        .pred_opt()
        .unwrap()
        .day()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_normalises_month_overflow() {
        let expected = date(&[Value::int(2021), Value::int(2), Value::int(1)]);
        let got = date(&[Value::int(2020), Value::int(14), Value::int(1)]);
        assert_eq!(got.as_scalar(), expected.as_scalar());
    }

    #[test]
    fn lotus_quirk_serial_61_is_march_1_1900() {
        let v = date(&[Value::int(1900), Value::int(3), Value::int(1)]);
        assert_eq!(v.as_scalar(), formualizer_common::CellValue::Int(61));
    }

    #[test]
    fn serial_60_reports_the_phantom_leap_day() {
        assert_eq!(year(&[Value::int(60)]).as_scalar(), formualizer_common::CellValue::Int(1900));
        assert_eq!(month(&[Value::int(60)]).as_scalar(), formualizer_common::CellValue::Int(2));
        assert_eq!(day(&[Value::int(60)]).as_scalar(), formualizer_common::CellValue::Int(29));
    }
}
