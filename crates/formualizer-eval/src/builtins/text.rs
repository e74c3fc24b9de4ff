//! Text builtins. Grounded on `wolfxl.calc._functions._builtin_left`/
//! `_mid`/`_substitute`.

use formualizer_common::{CellValue, ExcelError};

use crate::args::{coerce_text, first_error, Value};

fn text_of(v: &Value) -> String {
    coerce_text(&v.as_scalar())
}

pub fn left(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some(s) = args.first().map(text_of) else {
        return Value::empty();
    };
    let n = args.get(1).map(|v| v.as_scalar().as_f64_or_zero() as usize).unwrap_or(1);
    Value::text(s.chars().take(n).collect::<String>())
}

pub fn right(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some(s) = args.first().map(text_of) else {
        return Value::empty();
    };
    let n = args.get(1).map(|v| v.as_scalar().as_f64_or_zero() as usize).unwrap_or(1);
    let chars: Vec<char> = s.chars().collect();
    let start = chars.len().saturating_sub(n);
    Value::text(chars[start..].iter().collect::<String>())
}

/// `MID(text, start, length)`, 1-based; `start < 1` or a negative
/// length is `#VALUE!`.
pub fn mid(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let (Some(s), Some(start_f), Some(len_f)) = (
        args.first().map(text_of),
        args.get(1).map(|v| v.as_scalar().as_f64_or_zero()),
        args.get(2).map(|v| v.as_scalar().as_f64_or_zero()),
    ) else {
        return Value::empty();
    };
    if start_f < 1.0 || len_f < 0.0 {
        return Value::error(ExcelError::Value);
    }
    let start = (start_f as usize).saturating_sub(1);
    let len = len_f as usize;
    let chars: Vec<char> = s.chars().collect();
    if start >= chars.len() {
        return Value::text(String::new());
    }
    let end = (start + len).min(chars.len());
    Value::text(chars[start..end].iter().collect::<String>())
}

pub fn len(args: &[Value]) -> Value {
    let Some(s) = args.first().map(text_of) else {
        return Value::empty();
    };
    Value::int(s.chars().count() as i64)
}

pub fn concatenate(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    Value::text(args.iter().map(text_of).collect::<String>())
}

pub fn upper(args: &[Value]) -> Value {
    args.first().map(text_of).map(|s| Value::text(s.to_uppercase())).unwrap_or_else(Value::empty)
}

pub fn lower(args: &[Value]) -> Value {
    args.first().map(text_of).map(|s| Value::text(s.to_lowercase())).unwrap_or_else(Value::empty)
}

/// Collapses internal whitespace runs to a single space and strips ends.
pub fn trim(args: &[Value]) -> Value {
    let Some(s) = args.first().map(text_of) else {
        return Value::empty();
    };
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    Value::text(collapsed)
}

/// `SUBSTITUTE(text, old, new, [nth])` — replaces every occurrence by
/// default, or only the `nth` when given.
pub fn substitute(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let (Some(text), Some(old), Some(new)) = (
        args.first().map(text_of),
        args.get(1).map(text_of),
        args.get(2).map(text_of),
    ) else {
        return Value::empty();
    };
    if old.is_empty() {
        return Value::text(text);
    }

    match args.get(3).map(|v| v.as_scalar().as_f64_or_zero() as usize) {
        None => Value::text(text.replace(&old, &new)),
        Some(nth) if nth >= 1 => {
            let mut result = String::new();
            let mut remainder = text.as_str();
            let mut count = 0usize;
            loop {
                match remainder.find(&old) {
                    Some(pos) => {
                        count += 1;
                        result.push_str(&remainder[..pos]);
                        if count == nth {
                            result.push_str(&new);
                        } else {
                            result.push_str(&old);
                        }
                        remainder = &remainder[pos + old.len()..];
                    }
                    None => {
                        result.push_str(remainder);
                        break;
                    }
                }
            }
            Value::text(result)
        }
        Some(_) => Value::text(text),
    }
}

pub fn exact(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let (Some(a), Some(b)) = (args.first().map(text_of), args.get(1).map(text_of)) else {
        return Value::empty();
    };
    Value::boolean(a == b)
}

/// Case-sensitive, 1-based; miss is `#VALUE!`.
pub fn find(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let (Some(needle), Some(haystack)) = (args.first().map(text_of), args.get(1).map(text_of)) else {
        return Value::empty();
    };
    let start = args.get(2).map(|v| v.as_scalar().as_f64_or_zero() as usize).unwrap_or(1);
    let chars: Vec<char> = haystack.chars().collect();
    if start < 1 || start > chars.len() + 1 {
        return Value::error(ExcelError::Value);
    }
    let search_from: String = chars[start - 1..].iter().collect();
    match search_from.find(&needle) {
        Some(byte_pos) => {
            let char_offset = search_from[..byte_pos].chars().count();
            Value::int((start + char_offset) as i64)
        }
        None => Value::error(ExcelError::Value),
    }
}

pub fn rept(args: &[Value]) -> Value {
    if let Some(e) = first_error(args) {
        return Value::error(e);
    }
    let Some(s) = args.first().map(text_of) else {
        return Value::empty();
    };
    let n = args.get(1).map(|v| v.as_scalar().as_f64_or_zero() as usize).unwrap_or(0);
    Value::text(s.repeat(n))
}

/// Fixed catalog of `TEXT` patterns; unrecognised patterns fall back to
/// the value's plain string rendering.
pub fn text(args: &[Value]) -> Value {
    let Some(v) = args.first() else {
        return Value::empty();
    };
    let Some(pattern) = args.get(1).map(text_of) else {
        return Value::text(text_of(v));
    };
    let n = v.as_scalar().as_f64_or_zero();

    let rendered = match pattern.as_str() {
        "0%" => format!("{}%", (n * 100.0).round() as i64),
        "0.00%" => format!("{:.2}%", n * 100.0),
        "#,##0" => format_thousands(n, 0),
        "#,##0.00" => format_thousands(n, 2),
        "$#,##0.00" => format!("${}", format_thousands(n, 2)),
        "0.00E+00" => format!("{:.2E}", n),
        _ => return Value::text(text_of(v)),
    };
    Value::text(rendered)
}

fn format_thousands(n: f64, decimals: usize) -> String {
    let formatted = format!("{n:.decimals$}");
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), ""));
    let negative = int_part.starts_with('-');
    let digits = int_part.trim_start_matches('-');
    let mut grouped = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();
    let sign = if negative { "-" } else { "" };
    if decimals > 0 {
        format!("{sign}{grouped}.{frac_part}")
    } else {
        format!("{sign}{grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mid_with_start_less_than_one_is_value_error() {
        let v = mid(&[Value::text("hello"), Value::int(0), Value::int(2)]);
        assert_eq!(v.as_scalar(), CellValue::Error(ExcelError::Value));
    }

    #[test]
    fn substitute_replaces_nth_occurrence_only() {
        let v = substitute(&[
            Value::text("a-a-a"),
            Value::text("a"),
            Value::text("b"),
            Value::int(2),
        ]);
        assert_eq!(v.as_scalar(), CellValue::Text("a-b-a".into()));
    }

    #[test]
    fn trim_collapses_internal_whitespace() {
        assert_eq!(trim(&[Value::text("  a   b  ")]).as_scalar(), CellValue::Text("a b".into()));
    }

    #[test]
    fn find_is_case_sensitive_and_one_based() {
        assert_eq!(find(&[Value::text("a"), Value::text("banana")]).as_scalar(), CellValue::Int(2));
        assert_eq!(
            find(&[Value::text("A"), Value::text("banana")]).as_scalar(),
            CellValue::Error(ExcelError::Value)
        );
    }
}
