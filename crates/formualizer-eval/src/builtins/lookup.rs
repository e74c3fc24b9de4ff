//! Lookup builtins. `VLOOKUP`/`HLOOKUP`/`INDEX`/`MATCH`/`CHOOSE`/
//! `XLOOKUP` are grounded on `wolfxl.calc._functions._builtin_vlookup`/
//! `_match`; `OFFSET` is the raw-args case the registry's `Callable::Raw`
//! variant exists for (it needs the unresolved reference token, not its
//! resolved value).

use formualizer_common::{CellValue, ExcelError, RangeValue};

use crate::args::{coerce_text, first_error, Value};
use crate::interpreter::Interpreter;

pub fn index(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some(array) = args.first() else {
        return Value::empty();
    };
    let range = match array {
        Value::Range(r) => r.clone(),
        Value::Scalar(v) => RangeValue::single(v.clone()),
    };
    let row_arg = args.get(1).map(|v| v.as_scalar().as_f64_or_zero() as i64);
    let col_arg = args.get(2).map(|v| v.as_scalar().as_f64_or_zero() as i64);

    // A single numeric arg against a 1-row array selects a column.
    if range.n_rows == 1 && col_arg.is_none() {
        let Some(c) = row_arg else {
            return Value::empty();
        };
        if c < 1 || c as usize > range.n_cols {
            return Value::error(ExcelError::Ref);
        }
        return Value::Scalar(range.get(1, c as usize));
    }

    let row = row_arg.unwrap_or(1);
    let col = col_arg.unwrap_or(1);
    if row < 1 || col < 1 || row as usize > range.n_rows || col as usize > range.n_cols {
        return Value::error(ExcelError::Ref);
    }
    Value::Scalar(range.get(row as usize, col as usize))
}

#[derive(Clone, Copy)]
enum MatchType {
    Exact,
    LargestLte,
    SmallestGte,
}

fn match_type_of(n: f64) -> MatchType {
    if n < 0.0 {
        MatchType::SmallestGte
    } else if n > 0.0 {
        MatchType::LargestLte
    } else {
        MatchType::Exact
    }
}

pub fn match_fn(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some(lookup) = args.first() else {
        return Value::empty();
    };
    let Some(array) = args.get(1) else {
        return Value::empty();
    };
    let match_type = args
        .get(2)
        .map(|v| match_type_of(v.as_scalar().as_f64_or_zero()))
        .unwrap_or(MatchType::LargestLte);

    let cells = array.flatten();
    match find_match(&lookup.as_scalar(), &cells, match_type) {
        Some(idx) => Value::int((idx + 1) as i64),
        None => Value::error(ExcelError::Na),
    }
}

fn find_match(lookup: &CellValue, cells: &[CellValue], match_type: MatchType) -> Option<usize> {
    match match_type {
        MatchType::Exact => cells.iter().position(|c| cell_eq(lookup, c)),
        MatchType::LargestLte => {
            let mut best: Option<(usize, CellValue)> = None;
            for (i, c) in cells.iter().enumerate() {
                if cell_le(c, lookup) {
                    best = Some((i, c.clone()));
                } else {
                    break;
                }
            }
            best.map(|(i, _)| i)
        }
        MatchType::SmallestGte => {
            let mut best: Option<usize> = None;
            for (i, c) in cells.iter().enumerate() {
                if cell_ge(c, lookup) {
                    best = Some(i);
                } else {
                    break;
                }
            }
            best
        }
    }
}

fn cell_eq(a: &CellValue, b: &CellValue) -> bool {
    if a.is_numeric() && b.is_numeric() {
        return a.as_f64_or_zero() == b.as_f64_or_zero();
    }
    coerce_text(a).to_ascii_lowercase() == coerce_text(b).to_ascii_lowercase()
}

fn cell_le(a: &CellValue, b: &CellValue) -> bool {
    if a.is_numeric() && b.is_numeric() {
        return a.as_f64_or_zero() <= b.as_f64_or_zero();
    }
    coerce_text(a).to_ascii_lowercase() <= coerce_text(b).to_ascii_lowercase()
}

fn cell_ge(a: &CellValue, b: &CellValue) -> bool {
    if a.is_numeric() && b.is_numeric() {
        return a.as_f64_or_zero() >= b.as_f64_or_zero();
    }
    coerce_text(a).to_ascii_lowercase() >= coerce_text(b).to_ascii_lowercase()
}

fn lookup_table(args: &[Value]) -> Option<(CellValue, RangeValue, i64, bool)> {
    let lookup = args.first()?.as_scalar();
    let table = match args.get(1)? {
        Value::Range(r) => r.clone(),
        Value::Scalar(v) => RangeValue::single(v.clone()),
    };
    let index = args.get(2)?.as_scalar().as_f64_or_zero() as i64;
    let exact = args.get(3).map(|v| !v.as_scalar().is_truthy()).unwrap_or(false);
    Some((lookup, table, index, exact))
}

pub fn vlookup(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some((lookup, table, col_index, exact)) = lookup_table(args) else {
        return Value::empty();
    };
    if col_index < 1 || col_index as usize > table.n_cols {
        return Value::error(ExcelError::Ref);
    }
    let first_col = table.column(1);
    let match_type = if exact { MatchType::Exact } else { MatchType::LargestLte };
    match find_match(&lookup, &first_col, match_type) {
        Some(idx) => Value::Scalar(table.get(idx + 1, col_index as usize)),
        None => Value::error(ExcelError::Na),
    }
}

pub fn hlookup(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some((lookup, table, row_index, exact)) = lookup_table(args) else {
        return Value::empty();
    };
    if row_index < 1 || row_index as usize > table.n_rows {
        return Value::error(ExcelError::Ref);
    }
    let first_row = table.row(1);
    let match_type = if exact { MatchType::Exact } else { MatchType::LargestLte };
    match find_match(&lookup, &first_row, match_type) {
        Some(idx) => Value::Scalar(table.get(row_index as usize, idx + 1)),
        None => Value::error(ExcelError::Na),
    }
}

pub fn choose(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some(idx) = args.first().map(|v| v.as_scalar().as_f64_or_zero() as i64) else {
        return Value::empty();
    };
    if idx < 1 || idx as usize > args.len() - 1 {
        return Value::error(ExcelError::Value);
    }
    args.get(idx as usize).cloned().unwrap_or_else(|| Value::error(ExcelError::Value))
}

/// `XLOOKUP(lookup, lookup_array, return_array, [if_not_found], [match_mode], [search_mode])`.
pub fn xlookup(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let (Some(lookup), Some(lookup_array), Some(return_array)) =
        (args.first(), args.get(1), args.get(2))
    else {
        return Value::empty();
    };
    let not_found = args.get(3).cloned().unwrap_or_else(|| Value::error(ExcelError::Na));
    let match_mode = args.get(4).map(|v| v.as_scalar().as_f64_or_zero() as i64).unwrap_or(0);
    let search_mode = args.get(5).map(|v| v.as_scalar().as_f64_or_zero() as i64).unwrap_or(1);

    let lookup_cells = lookup_array.flatten();
    let return_cells = return_array.flatten();
    let lookup_val = lookup.as_scalar();

    let idx = if match_mode == 2 {
        let pattern = coerce_text(&lookup_val).to_ascii_lowercase();
        let mut indices: Box<dyn Iterator<Item = usize>> = if search_mode == -1 {
            Box::new((0..lookup_cells.len()).rev())
        } else {
            Box::new(0..lookup_cells.len())
        };
        indices.find(|&i| {
            crate::builtins::conditional::matches(
                &crate::builtins::conditional::parse_criterion(&CellValue::Text(pattern.clone())),
                &lookup_cells[i],
            )
        })
    } else {
        let match_type = match match_mode {
            -1 => MatchType::LargestLte,
            1 => MatchType::SmallestGte,
            _ => MatchType::Exact,
        };
        if search_mode == -1 {
            let mut reversed = lookup_cells.clone();
            reversed.reverse();
            find_match(&lookup_val, &reversed, match_type).map(|i| lookup_cells.len() - 1 - i)
        } else {
            find_match(&lookup_val, &lookup_cells, match_type)
        }
    };

    match idx {
        Some(i) => return_cells.get(i).cloned().map(Value::Scalar).unwrap_or_else(|| not_found.clone()),
        None => not_found,
    }
}

/// `OFFSET(ref, rows, cols, [height], [width])` — raw-args: `ref_str`
/// is the unresolved reference token, not its value.
pub fn offset(raw_args: &[String], interp: &Interpreter, sheet: &str) -> Value {
    let Some(ref_str) = raw_args.first() else {
        return Value::empty();
    };
    let eval_num = |idx: usize, default: i64| -> i64 {
        raw_args
            .get(idx)
            .map(|s| interp.eval_expr(s, sheet).as_scalar().as_f64_or_zero() as i64)
            .unwrap_or(default)
    };
    let rows = eval_num(1, 0);
    let cols = eval_num(2, 0);
    let height = eval_num(3, 1).max(1);
    let width = eval_num(4, 1).max(1);

    let clean = ref_str.trim().replace('$', "");
    let (ref_sheet, cell_part) = clean.split_once('!').map(|(s, c)| (s.trim_matches('\'').to_string(), c.to_string())).unwrap_or((sheet.to_string(), clean.clone()));
    let base = cell_part.split(':').next().unwrap_or(&cell_part);
    let Ok((base_row, base_col)) = formualizer_common::reference::a1_to_rowcol(&base.to_ascii_uppercase()) else {
        return Value::error(ExcelError::Ref);
    };

    let new_row = base_row as i64 + rows;
    let new_col = base_col as i64 + cols;
    if new_row < 1 || new_col < 1 {
        return Value::error(ExcelError::Ref);
    }

    if height == 1 && width == 1 {
        let a1 = formualizer_common::reference::rowcol_to_a1(new_row as u32, new_col as u32);
        let canonical = format!("{ref_sheet}!{a1}");
        return Value::Scalar(interp.store.get(&canonical).cloned().unwrap_or(CellValue::Empty));
    }

    let end_row = new_row + height - 1;
    let end_col = new_col + width - 1;
    let start_a1 = formualizer_common::reference::rowcol_to_a1(new_row as u32, new_col as u32);
    let end_a1 = formualizer_common::reference::rowcol_to_a1(end_row as u32, end_col as u32);
    let range_ref = format!("{ref_sheet}!{start_a1}:{end_a1}");
    Value::Range(interp.resolve_range(&range_ref, sheet))
}

#[cfg(test)]
mod tests {
    use super::*;
    use formualizer_common::RangeValue;

    fn table() -> Value {
        Value::Range(RangeValue::new(
            3,
            2,
            vec![
                CellValue::Text("Revenue".into()),
                CellValue::Int(1000),
                CellValue::Text("COGS".into()),
                CellValue::Int(600),
                CellValue::Text("OpEx".into()),
                CellValue::Int(200),
            ],
        ))
    }

    #[test]
    fn vlookup_exact_case_insensitive() {
        let v = vlookup(&[Value::text("cogs"), table(), Value::int(2), Value::boolean(false)]);
        assert_eq!(v.as_scalar(), CellValue::Int(600));
    }

    #[test]
    fn xlookup_next_smaller() {
        let lookup = Value::Range(RangeValue::new(1, 5, vec![10, 20, 30, 40, 50].into_iter().map(CellValue::Int).collect()));
        let ret = Value::Range(RangeValue::new(
            1,
            5,
            vec!["a", "b", "c", "d", "e"].into_iter().map(|s| CellValue::Text(s.into())).collect(),
        ));
        let v = xlookup(&[Value::number(35.0), lookup, ret, Value::text("nope"), Value::int(-1)]);
        assert_eq!(v.as_scalar(), CellValue::Text("c".into()));
    }

    #[test]
    fn choose_out_of_range_is_value_error() {
        let v = choose(&[Value::int(5), Value::int(1), Value::int(2)]);
        assert_eq!(v.as_scalar(), CellValue::Error(ExcelError::Value));
    }
}
