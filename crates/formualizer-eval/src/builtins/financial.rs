//! Financial builtins. Grounded on `wolfxl.calc._functions._builtin_npv`/
//! `_irr` — standard annuity formulas for `PV`/`FV`/`PMT`, Newton-Raphson
//! with bisection fallback for `IRR`.

use formualizer_common::ExcelError;

use crate::args::{coerce_numeric, first_error, Value};

fn arg_f64(args: &[Value], idx: usize, default: f64) -> f64 {
    args.get(idx).map(|v| v.as_scalar().as_f64_or_zero()).unwrap_or(default)
}

pub fn pv(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let rate = arg_f64(args, 0, 0.0);
    let nper = arg_f64(args, 1, 0.0);
    let pmt = arg_f64(args, 2, 0.0);
    let fv = arg_f64(args, 3, 0.0);
    let kind = arg_f64(args, 4, 0.0);

    let result = if rate == 0.0 {
        -(fv + pmt * nper)
    } else {
        let growth = (1.0 + rate).powf(nper);
        -(fv + pmt * (1.0 + rate * kind) * (growth - 1.0) / rate) / growth
    };
    Value::number(result)
}

pub fn fv(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let rate = arg_f64(args, 0, 0.0);
    let nper = arg_f64(args, 1, 0.0);
    let pmt = arg_f64(args, 2, 0.0);
    let pv_arg = arg_f64(args, 3, 0.0);
    let kind = arg_f64(args, 4, 0.0);

    let result = if rate == 0.0 {
        -(pv_arg + pmt * nper)
    } else {
        let growth = (1.0 + rate).powf(nper);
        -(pv_arg * growth + pmt * (1.0 + rate * kind) * (growth - 1.0) / rate)
    };
    Value::number(result)
}

pub fn pmt(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let rate = arg_f64(args, 0, 0.0);
    let nper = arg_f64(args, 1, 0.0);
    let pv_arg = arg_f64(args, 2, 0.0);
    let fv_arg = arg_f64(args, 3, 0.0);
    let kind = arg_f64(args, 4, 0.0);

    let result = if rate == 0.0 {
        -(pv_arg + fv_arg) / nper
    } else {
        let growth = (1.0 + rate).powf(nper);
        -(fv_arg + pv_arg * growth) * rate / ((1.0 + rate * kind) * (growth - 1.0))
    };
    Value::number(result)
}

/// `NPV(rate, v1, …)` — period indexing starts at 1 (first cash flow
/// discounted once), matching the source rather than the zero-indexed
/// textbook definition.
pub fn npv(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some(rate) = args.first().map(|v| v.as_scalar().as_f64_or_zero()) else {
        return Value::empty();
    };
    let flows = coerce_numeric(&args[1..]);
    let total: f64 = flows
        .iter()
        .enumerate()
        .map(|(i, cf)| cf / (1.0 + rate).powi(i as i32 + 1))
        .sum();
    Value::number(total)
}

fn npv_of(rate: f64, flows: &[f64]) -> f64 {
    flows
        .iter()
        .enumerate()
        .map(|(i, cf)| cf / (1.0 + rate).powi(i as i32))
        .sum()
}

/// `IRR(values, [guess])` — Newton-Raphson up to 100 iterations at
/// tolerance `1e-10`, falling back to bisection over `[-0.999, 10.0]`
/// when Newton fails to converge. No sign change in the cash flows
/// across that interval is `#NUM!`.
pub fn irr(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some(flows_arg) = args.first() else {
        return Value::empty();
    };
    let flows = flows_arg.flatten();
    let flows: Vec<f64> = flows.iter().map(|v| v.as_f64_or_zero()).collect();
    if flows.len() < 2 {
        return Value::error(ExcelError::Num);
    }
    let guess = args.get(1).map(|v| v.as_scalar().as_f64_or_zero()).unwrap_or(0.1);

    if let Some(rate) = newton_irr(&flows, guess) {
        return Value::number(rate);
    }
    match bisection_irr(&flows) {
        Some(rate) => Value::number(rate),
        None => Value::error(ExcelError::Num),
    }
}

fn newton_irr(flows: &[f64], guess: f64) -> Option<f64> {
    let mut rate = guess;
    for _ in 0..100 {
        let f = npv_of(rate, flows);
        let derivative: f64 = flows
            .iter()
            .enumerate()
            .map(|(i, cf)| -(i as f64) * cf / (1.0 + rate).powi(i as i32 + 1))
            .sum();
        if derivative.abs() < 1e-14 {
            return None;
        }
        let next = rate - f / derivative;
        if (next - rate).abs() < 1e-10 {
            return Some(next);
        }
        rate = next;
        if !rate.is_finite() || rate <= -1.0 {
            return None;
        }
    }
    None
}

fn bisection_irr(flows: &[f64]) -> Option<f64> {
    let mut lo = -0.999_f64;
    let mut hi = 10.0_f64;
    let mut f_lo = npv_of(lo, flows);
    let f_hi = npv_of(hi, flows);
    if f_lo.signum() == f_hi.signum() {
        return None;
    }
    for _ in 0..200 {
        let mid = (lo + hi) / 2.0;
        let f_mid = npv_of(mid, flows);
        if f_mid.abs() < 1e-10 {
            return Some(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    Some((lo + hi) / 2.0)
}

pub fn sln(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let cost = arg_f64(args, 0, 0.0);
    let salvage = arg_f64(args, 1, 0.0);
    let life = arg_f64(args, 2, 0.0);
    if life == 0.0 {
        return Value::error(ExcelError::Div);
    }
    Value::number((cost - salvage) / life)
}

/// `DB(cost, salvage, life, period, [month])` — fixed-declining-balance
/// depreciation with a partial first year of `month` months.
pub fn db(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let cost = arg_f64(args, 0, 0.0);
    let salvage = arg_f64(args, 1, 0.0);
    let life = arg_f64(args, 2, 0.0);
    let period = arg_f64(args, 3, 0.0) as i64;
    let month = arg_f64(args, 4, 12.0);

    if cost == 0.0 || life <= 0.0 {
        return Value::error(ExcelError::Num);
    }
    let rate = ((1.0 - (salvage / cost).powf(1.0 / life)) * 1000.0).round() / 1000.0;

    let mut total_depreciation = 0.0;
    let mut depreciation = 0.0;
    for p in 1..=period {
        depreciation = if p == 1 {
            cost * rate * (month / 12.0)
        } else if p as f64 == life + 1.0 {
            (cost - total_depreciation) * rate * ((12.0 - month) / 12.0)
        } else {
            (cost - total_depreciation) * rate
        };
        total_depreciation += depreciation;
    }
    Value::number(depreciation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irr_matches_expected_rate_within_tolerance() {
        let flows = vec![
            Value::int(-10000),
            Value::int(3000),
            Value::int(4200),
            Value::int(6800),
        ];
        let v = irr(&[Value::Range(formualizer_common::RangeValue::new(
            4,
            1,
            flows.iter().map(|v| v.as_scalar()).collect(),
        ))]);
        let rate = v.as_scalar().as_f64_or_zero();
        assert!((rate - 0.1634).abs() < 1e-3, "rate was {rate}");
    }

    #[test]
    fn sln_straight_line() {
        assert_eq!(
            sln(&[Value::number(10000.0), Value::number(1000.0), Value::number(5.0)]).as_scalar(),
            formualizer_common::CellValue::Number(1800.0)
        );
    }
}
