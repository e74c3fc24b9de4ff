//! Math builtins. Grounded on `wolfxl.calc._functions._builtin_sum` /
//! `_builtin_round` and friends, retyped onto `CellValue`.

use formualizer_common::{CellValue, ExcelError};

use crate::args::{coerce_numeric, first_error, Value};

/// Skips text, empty cells, and errors anywhere in its operands, same as
/// `coerce_numeric` already does for `COUNT`/`COUNTA` — an error in one
/// cell of a summed range must not blank out the whole total.
pub fn sum(args: &[Value]) -> Value {
    let total: f64 = coerce_numeric(args).into_iter().sum();
    numeric_result(total, all_int(args))
}

pub fn abs(args: &[Value]) -> Value {
    unary(args, |n| n.abs())
}

/// Open question, decided: half-away-from-zero, matching the common
/// spreadsheet convention (`ROUND(2.5, 0) == 3`, `ROUND(-2.5, 0) == -3`).
pub fn round(args: &[Value]) -> Value {
    round_with(args, |n, factor| (n * factor).round() / factor)
}

pub fn roundup(args: &[Value]) -> Value {
    round_with(args, |n, factor| {
        if n >= 0.0 {
            (n * factor).ceil() / factor
        } else {
            (n * factor).floor() / factor
        }
    })
}

pub fn rounddown(args: &[Value]) -> Value {
    round_with(args, |n, factor| {
        if n >= 0.0 {
            (n * factor).floor() / factor
        } else {
            (n * factor).ceil() / factor
        }
    })
}

fn round_with(args: &[Value], f: impl Fn(f64, f64) -> f64) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some(n) = args.first().map(|v| v.as_scalar().as_f64_or_zero()) else {
        return Value::empty();
    };
    let digits = args.get(1).map(|v| v.as_scalar().as_f64_or_zero() as i32).unwrap_or(0);
    let factor = 10f64.powi(digits);
    Value::number(f(n, factor))
}

pub fn int(args: &[Value]) -> Value {
    unary(args, |n| n.floor())
}

pub fn modulo(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let (Some(x), Some(y)) = (
        args.first().map(|v| v.as_scalar().as_f64_or_zero()),
        args.get(1).map(|v| v.as_scalar().as_f64_or_zero()),
    ) else {
        return Value::empty();
    };
    if y == 0.0 {
        return Value::error(ExcelError::Div);
    }
    Value::number(x - y * (x / y).floor())
}

pub fn power(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let (Some(base), Some(exp)) = (
        args.first().map(|v| v.as_scalar().as_f64_or_zero()),
        args.get(1).map(|v| v.as_scalar().as_f64_or_zero()),
    ) else {
        return Value::empty();
    };
    if base < 0.0 && exp.fract() != 0.0 {
        return Value::error(ExcelError::Num);
    }
    Value::number(base.powf(exp))
}

pub fn sqrt(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some(n) = args.first().map(|v| v.as_scalar().as_f64_or_zero()) else {
        return Value::empty();
    };
    if n < 0.0 {
        return Value::error(ExcelError::Num);
    }
    Value::number(n.sqrt())
}

pub fn sign(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some(n) = args.first().map(|v| v.as_scalar().as_f64_or_zero()) else {
        return Value::empty();
    };
    Value::int(if n > 0.0 {
        1
    } else if n < 0.0 {
        -1
    } else {
        0
    })
}

fn unary(args: &[Value], f: impl Fn(f64) -> f64) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some(v) = args.first() else {
        return Value::empty();
    };
    let was_int = matches!(v.as_scalar(), CellValue::Int(_));
    let n = f(v.as_scalar().as_f64_or_zero());
    numeric_result(n, was_int)
}

fn all_int(args: &[Value]) -> bool {
    args.iter().all(|v| match v {
        Value::Scalar(CellValue::Int(_)) | Value::Scalar(CellValue::Empty) => true,
        Value::Range(r) => r.iter().all(|c| matches!(c, CellValue::Int(_) | CellValue::Empty)),
        _ => false,
    })
}

fn numeric_result(n: f64, prefer_int: bool) -> Value {
    if prefer_int && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::int(n as i64)
    } else {
        Value::number(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_preserves_integer_identity() {
        let args = vec![Value::int(2), Value::int(3)];
        assert_eq!(sum(&args).as_scalar(), CellValue::Int(5));
    }

    #[test]
    fn sum_skips_errors_in_a_range_instead_of_propagating() {
        use formualizer_common::RangeValue;
        let range = Value::Range(RangeValue::new(
            3,
            1,
            vec![CellValue::Error(ExcelError::Na), CellValue::Int(5), CellValue::Int(10)],
        ));
        assert_eq!(sum(&[range]).as_scalar(), CellValue::Int(15));
    }

    #[test]
    fn round_half_away_from_zero() {
        assert_eq!(round(&[Value::number(2.5), Value::int(0)]).as_scalar(), CellValue::Number(3.0));
        assert_eq!(round(&[Value::number(-2.5), Value::int(0)]).as_scalar(), CellValue::Number(-3.0));
    }

    #[test]
    fn power_negative_base_fractional_exponent_is_num_error() {
        let v = power(&[Value::number(-4.0), Value::number(0.5)]);
        assert_eq!(v.as_scalar(), CellValue::Error(ExcelError::Num));
    }

    #[test]
    fn mod_takes_sign_of_divisor() {
        assert_eq!(modulo(&[Value::int(-7), Value::int(3)]).as_scalar(), CellValue::Number(2.0));
    }

    #[test]
    fn sqrt_negative_is_num_error() {
        assert_eq!(sqrt(&[Value::number(-1.0)]).as_scalar(), CellValue::Error(ExcelError::Num));
    }
}
