//! Aggregation and conditional-aggregation builtins. The unconditional
//! forms are grounded on `wolfxl.calc._functions._builtin_sum`/`_min`/
//! `_max`; the `*IF`/`*IFS` family reuses the criteria engine in
//! `builtins::conditional`.

use formualizer_common::{CellValue, ExcelError};

use crate::args::{coerce_numeric, Value};
use crate::builtins::conditional::{matches, parse_criterion};

/// Skips text, empty cells, and errors anywhere in its operands, same as
/// `count`/`counta` below — an error in one cell of the range must not
/// blank out the whole average.
pub fn average(args: &[Value]) -> Value {
    let nums = coerce_numeric(args);
    if nums.is_empty() {
        return Value::error(ExcelError::Div);
    }
    Value::number(nums.iter().sum::<f64>() / nums.len() as f64)
}

pub fn count(args: &[Value]) -> Value {
    let n = args
        .iter()
        .flat_map(|a| a.flatten())
        .filter(|v| v.is_numeric())
        .count();
    Value::int(n as i64)
}

pub fn counta(args: &[Value]) -> Value {
    let n = args
        .iter()
        .flat_map(|a| a.flatten())
        .filter(|v| !v.is_empty())
        .count();
    Value::int(n as i64)
}

pub fn min(args: &[Value]) -> Value {
    let nums = coerce_numeric(args);
    let m = nums.into_iter().fold(None, |acc: Option<f64>, n| {
        Some(acc.map_or(n, |a| a.min(n)))
    });
    Value::number(m.unwrap_or(0.0))
}

pub fn max(args: &[Value]) -> Value {
    let nums = coerce_numeric(args);
    let m = nums.into_iter().fold(None, |acc: Option<f64>, n| {
        Some(acc.map_or(n, |a| a.max(n)))
    });
    Value::number(m.unwrap_or(0.0))
}

/// `SUMIF(range, criterion, [sum_range])` — `sum_range` defaults to
/// `range` when omitted.
pub fn sumif(args: &[Value]) -> Value {
    let Some(range) = args.first() else {
        return Value::empty();
    };
    let Some(criterion_val) = args.get(1) else {
        return Value::empty();
    };
    let sum_range = args.get(2).unwrap_or(range);

    let crit = parse_criterion(&criterion_val.as_scalar());
    let cells = range.flatten();
    let sum_cells = sum_range.flatten();
    let mut total = 0.0;
    for (i, c) in cells.iter().enumerate() {
        if matches(&crit, c) {
            if let Some(v) = sum_cells.get(i) {
                total += v.as_f64_or_zero();
            }
        }
    }
    Value::number(total)
}

pub fn countif(args: &[Value]) -> Value {
    let Some(range) = args.first() else {
        return Value::empty();
    };
    let Some(criterion_val) = args.get(1) else {
        return Value::empty();
    };
    let crit = parse_criterion(&criterion_val.as_scalar());
    let n = range.flatten().iter().filter(|c| matches(&crit, c)).count();
    Value::int(n as i64)
}

pub fn averageif(args: &[Value]) -> Value {
    let Some(range) = args.first() else {
        return Value::empty();
    };
    let Some(criterion_val) = args.get(1) else {
        return Value::empty();
    };
    let avg_range = args.get(2).unwrap_or(range);
    let crit = parse_criterion(&criterion_val.as_scalar());

    let cells = range.flatten();
    let avg_cells = avg_range.flatten();
    let matched: Vec<f64> = cells
        .iter()
        .enumerate()
        .filter(|(_, c)| matches(&crit, c))
        .filter_map(|(i, _)| avg_cells.get(i).map(|v| v.as_f64_or_zero()))
        .collect();
    if matched.is_empty() {
        return Value::error(ExcelError::Div);
    }
    Value::number(matched.iter().sum::<f64>() / matched.len() as f64)
}

/// Shared engine for `SUMIFS`/`COUNTIFS`/`AVERAGEIFS`/`MINIFS`/`MAXIFS`:
/// first arg is the value range (absent for `COUNTIFS`), followed by
/// `(range, criterion)` pairs, all ANDed.
fn matching_indices(pairs: &[Value]) -> Vec<usize> {
    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return Vec::new();
    }
    let n = pairs[0].flatten().len();
    let ranges: Vec<Vec<CellValue>> = pairs.chunks(2).map(|c| c[0].flatten()).collect();
    let criteria: Vec<_> = pairs
        .chunks(2)
        .map(|c| parse_criterion(&c[1].as_scalar()))
        .collect();

    (0..n)
        .filter(|&i| {
            ranges
                .iter()
                .zip(criteria.iter())
                .all(|(range, crit)| range.get(i).map(|c| matches(crit, c)).unwrap_or(false))
        })
        .collect()
}

pub fn sumifs(args: &[Value]) -> Value {
    let Some((sum_range, pairs)) = args.split_first() else {
        return Value::empty();
    };
    let sum_cells = sum_range.flatten();
    let idx = matching_indices(pairs);
    let total: f64 = idx.iter().filter_map(|&i| sum_cells.get(i)).map(|c| c.as_f64_or_zero()).sum();
    Value::number(total)
}

pub fn countifs(args: &[Value]) -> Value {
    Value::int(matching_indices(args).len() as i64)
}

pub fn averageifs(args: &[Value]) -> Value {
    let Some((avg_range, pairs)) = args.split_first() else {
        return Value::empty();
    };
    let avg_cells = avg_range.flatten();
    let idx = matching_indices(pairs);
    if idx.is_empty() {
        return Value::error(ExcelError::Div);
    }
    let vals: Vec<f64> = idx.iter().filter_map(|&i| avg_cells.get(i)).map(|c| c.as_f64_or_zero()).collect();
    Value::number(vals.iter().sum::<f64>() / vals.len() as f64)
}

pub fn minifs(args: &[Value]) -> Value {
    let Some((range, pairs)) = args.split_first() else {
        return Value::empty();
    };
    let cells = range.flatten();
    let idx = matching_indices(pairs);
    let m = idx
        .iter()
        .filter_map(|&i| cells.get(i))
        .map(|c| c.as_f64_or_zero())
        .fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |a| a.min(n))));
    Value::number(m.unwrap_or(0.0))
}

pub fn maxifs(args: &[Value]) -> Value {
    let Some((range, pairs)) = args.split_first() else {
        return Value::empty();
    };
    let cells = range.flatten();
    let idx = matching_indices(pairs);
    let m = idx
        .iter()
        .filter_map(|&i| cells.get(i))
        .map(|c| c.as_f64_or_zero())
        .fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |a| a.max(n))));
    Value::number(m.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use formualizer_common::RangeValue;

    fn range(vals: Vec<CellValue>) -> Value {
        Value::Range(RangeValue::new(vals.len(), 1, vals))
    }

    #[test]
    fn average_of_empty_is_div_error() {
        assert_eq!(average(&[]).as_scalar(), CellValue::Error(ExcelError::Div));
    }

    #[test]
    fn min_max_of_empty_is_zero() {
        assert_eq!(min(&[]).as_scalar(), CellValue::Number(0.0));
        assert_eq!(max(&[]).as_scalar(), CellValue::Number(0.0));
    }

    #[test]
    fn aggregates_skip_errors_wherever_they_fall_in_a_range() {
        let vals = range(vec![
            CellValue::Error(ExcelError::Na),
            CellValue::Int(2),
            CellValue::Int(4),
            CellValue::Int(6),
        ]);
        assert_eq!(average(&[vals.clone()]).as_scalar(), CellValue::Number(4.0));
        assert_eq!(min(&[vals.clone()]).as_scalar(), CellValue::Number(2.0));
        assert_eq!(max(&[vals]).as_scalar(), CellValue::Number(6.0));
    }

    #[test]
    fn sumif_sums_matching_rows() {
        let labels = range(vec![
            CellValue::Text("a".into()),
            CellValue::Text("b".into()),
            CellValue::Text("a".into()),
        ]);
        let amounts = range(vec![CellValue::Int(10), CellValue::Int(20), CellValue::Int(5)]);
        let result = sumif(&[labels, Value::text("a"), amounts]);
        assert_eq!(result.as_scalar(), CellValue::Number(15.0));
    }

    #[test]
    fn countifs_ands_predicates() {
        let a = range(vec![CellValue::Int(1), CellValue::Int(1), CellValue::Int(2)]);
        let b = range(vec![CellValue::Int(5), CellValue::Int(9), CellValue::Int(5)]);
        let result = countifs(&[a, Value::int(1), b, Value::int(5)]);
        assert_eq!(result.as_scalar(), CellValue::Int(1));
    }
}
