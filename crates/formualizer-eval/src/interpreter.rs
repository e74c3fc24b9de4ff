//! Recursive-descent expression evaluator.
//!
//! Grounded directly on `wolfxl.calc._evaluator`'s `_eval_expr` /
//! `_find_top_level_split` / `_find_matching_paren` / `_match_function_call`
//! algorithm: a precedence-ordered rightmost scan (comparison, then
//! additive, then multiplicative) at paren depth 0, retyped from Python's
//! dynamic values onto `CellValue`/`Value`. Extended beyond the source
//! with named-range resolution and the raw-args calling convention
//! `OFFSET` needs.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use formualizer_common::{CellValue, ExcelError, RangeValue};
use formualizer_parse::expand_range;

use crate::args::Value;
use crate::registry::{Callable, FunctionRegistry};

pub struct Interpreter<'a> {
    pub store: &'a HashMap<String, CellValue>,
    pub named_ranges: &'a HashMap<String, String>,
    pub registry: &'a FunctionRegistry,
    pub default_sheet: &'a str,
    pub now: NaiveDateTime,
}

const MAX_NAME_HOPS: usize = 16;

impl<'a> Interpreter<'a> {
    pub fn new(
        store: &'a HashMap<String, CellValue>,
        named_ranges: &'a HashMap<String, String>,
        registry: &'a FunctionRegistry,
        default_sheet: &'a str,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            store,
            named_ranges,
            registry,
            default_sheet,
            now,
        }
    }

    /// Evaluate a formula cell's text (including the leading `=`).
    /// Never fails outward: an unevaluable expression degrades to
    /// `CellValue::Empty` and the caller proceeds (see `EngineError`
    /// vs. the cannot-evaluate path).
    pub fn eval_formula(&self, cell_ref: &str, formula: &str) -> CellValue {
        let body = formula.trim();
        let body = body.strip_prefix('=').unwrap_or(body).trim();
        let sheet = sheet_from_ref(cell_ref, self.default_sheet);
        let result = self.eval_expr(body, &sheet);
        match result {
            Value::Scalar(v) => v,
            Value::Range(r) => r.get(1, 1),
        }
    }

    pub fn eval_expr(&self, expr: &str, sheet: &str) -> Value {
        let expr = expr.trim();
        if expr.is_empty() {
            return Value::empty();
        }

        // 1. Binary/comparison split at top level.
        if let Some((left_str, op, right_str)) = find_top_level_split(expr) {
            let left = self.eval_expr(&left_str, sheet);
            let right = self.eval_expr(&right_str, sheet);
            return if matches!(op.as_str(), "+" | "-" | "*" | "/" | "&") {
                binary_op(&left, &op, &right)
            } else {
                Value::Scalar(CellValue::Boolean(compare(&left, &right, &op)))
            };
        }

        // 2. Parenthesized sub-expression.
        if let Some(rest) = expr.strip_prefix('(') {
            if let Some(close) = find_matching_paren(expr, 0) {
                if close == char_len(expr) - 1 {
                    let _ = rest;
                    return self.eval_expr(&slice_chars(expr, 1, close), sheet);
                }
            }
        }

        // 3. Function call.
        if let Some((name, args_str)) = match_function_call(expr) {
            return self.eval_function(&name.to_ascii_uppercase(), &args_str, sheet);
        }

        // 4. Unary +/-.
        if let Some(rest) = expr.strip_prefix('-') {
            let v = self.eval_expr(rest, sheet);
            return match v.as_scalar() {
                CellValue::Int(i) => Value::int(-i),
                CellValue::Number(n) => Value::number(-n),
                other => Value::Scalar(other),
            };
        }
        if let Some(rest) = expr.strip_prefix('+') {
            return self.eval_expr(rest, sheet);
        }

        // 5. Numeric literal (integer preserved when the source has no
        //    decimal point, matching the spec's integer-identity rule).
        if let Some(v) = parse_numeric_literal(expr) {
            return v;
        }

        // 6. String literal; doubled `""` is an escaped quote.
        if expr.len() >= 2 && expr.starts_with('"') && expr.ends_with('"') {
            let inner = &expr[1..expr.len() - 1];
            return Value::text(inner.replace("\"\"", "\""));
        }

        // 7. Boolean literal.
        let upper = expr.to_ascii_uppercase();
        if upper == "TRUE" {
            return Value::boolean(true);
        }
        if upper == "FALSE" {
            return Value::boolean(false);
        }

        // 8. Named range.
        if let Some(v) = self.resolve_named_range(expr, sheet, 0) {
            return v;
        }

        // 9. Cell reference.
        Value::Scalar(self.resolve_cell_ref(expr, sheet))
    }

    fn resolve_cell_ref(&self, expr: &str, sheet: &str) -> CellValue {
        let canonical = canonical_cell_ref(expr, sheet);
        self.store.get(&canonical).cloned().unwrap_or(CellValue::Empty)
    }

    pub fn resolve_range(&self, arg: &str, sheet: &str) -> RangeValue {
        let clean = arg.trim().replace('$', "");
        let range_ref = if clean.contains('!') {
            let (s, rest) = clean.split_once('!').unwrap();
            format!("{}!{}", s.trim_matches('\''), rest.to_ascii_uppercase())
        } else {
            format!("{sheet}!{}", clean.to_ascii_uppercase())
        };

        let (bounds, _) = range_ref.split_once('!').unwrap();
        let _ = bounds;
        let cells = expand_range(&range_ref).unwrap_or_default();
        let (n_rows, n_cols) = range_shape(&range_ref);
        let values: Vec<CellValue> = cells
            .iter()
            .map(|c| self.store.get(c).cloned().unwrap_or(CellValue::Empty))
            .collect();
        RangeValue::new(n_rows, n_cols, values)
    }

    fn resolve_named_range(&self, name: &str, sheet: &str, hops: usize) -> Option<Value> {
        if hops > MAX_NAME_HOPS {
            return Some(Value::error(ExcelError::Name));
        }
        let key = name.trim().to_ascii_uppercase();
        let refers_to = self.named_ranges.get(&key)?;

        if refers_to.contains(':') {
            Some(Value::Range(self.resolve_range(refers_to, sheet)))
        } else if self.named_ranges.contains_key(&refers_to.to_ascii_uppercase())
            && !refers_to.contains('!')
        {
            self.resolve_named_range(refers_to, sheet, hops + 1)
        } else {
            Some(Value::Scalar(self.resolve_cell_ref(refers_to, sheet)))
        }
    }

    fn eval_function(&self, name: &str, args_str: &str, sheet: &str) -> Value {
        let raw_args = split_top_level_args(args_str);

        let Some(callable) = self.registry.get(name) else {
            log::debug!("unsupported function: {name}");
            return Value::empty();
        };

        match callable {
            Callable::Raw(f) => f(&raw_args, self, sheet),
            Callable::Normal(f) => {
                let args: Vec<Value> = raw_args
                    .iter()
                    .map(|a| self.resolve_arg(a, sheet))
                    .collect();
                f(&args)
            }
        }
    }

    fn resolve_arg(&self, arg: &str, sheet: &str) -> Value {
        let arg = arg.trim();
        if arg.is_empty() {
            return Value::empty();
        }
        if has_top_level_colon(arg) && !arg.starts_with('"') {
            return Value::Range(self.resolve_range(arg, sheet));
        }
        self.eval_expr(arg, sheet)
    }
}

/// `"Sheet!A1"` -> `"Sheet"`; falls back to `default_sheet` for a bare
/// `"A1"` cell reference (cells in the value store are always stored
/// sheet-qualified by `load`, but a defensive default avoids a panic on
/// malformed input).
fn sheet_from_ref<'a>(cell_ref: &'a str, default_sheet: &'a str) -> String {
    cell_ref
        .rsplit_once('!')
        .map(|(s, _)| s.to_string())
        .unwrap_or_else(|| default_sheet.to_string())
}

fn canonical_cell_ref(expr: &str, sheet: &str) -> String {
    let clean = expr.trim().replace('$', "");
    if let Some((s, rest)) = clean.split_once('!') {
        format!("{}!{}", s.trim_matches('\''), rest.to_ascii_uppercase())
    } else {
        format!("{sheet}!{}", clean.to_ascii_uppercase())
    }
}

fn range_shape(range_ref: &str) -> (usize, usize) {
    let (_, cell_part) = range_ref.split_once('!').unwrap_or(("", range_ref));
    let Some((start, end)) = cell_part.split_once(':') else {
        return (1, 1);
    };
    let (Ok((r1, c1)), Ok((r2, c2))) = (
        formualizer_common::reference::a1_to_rowcol(start),
        formualizer_common::reference::a1_to_rowcol(end),
    ) else {
        return (1, 1);
    };
    let rows = (r1.max(r2) - r1.min(r2) + 1) as usize;
    let cols = (c1.max(c2) - c1.min(c2) + 1) as usize;
    (rows, cols)
}

fn parse_numeric_literal(expr: &str) -> Option<Value> {
    if expr.chars().all(|c| c.is_ascii_digit()) && !expr.is_empty() {
        return expr.parse::<i64>().ok().map(Value::int);
    }
    if is_numeric_text(expr) {
        return expr.parse::<f64>().ok().map(Value::number);
    }
    None
}

fn is_numeric_text(s: &str) -> bool {
    !s.is_empty() && s.parse::<f64>().is_ok()
}

/// Index of the `)` matching the `(` at `expr`'s `start` char index, or
/// `None`. String-literal aware.
fn find_matching_paren(expr: &str, start: usize) -> Option<usize> {
    let chars: Vec<char> = expr.chars().collect();
    let mut depth = 1i32;
    let mut i = start + 1;
    let mut in_string = false;
    while i < chars.len() {
        let ch = chars[i];
        if ch == '"' {
            in_string = !in_string;
        } else if !in_string {
            if ch == '(' {
                depth += 1;
            } else if ch == ')' {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

/// If `expr` is exactly `FUNC(balanced_args)`, return `(name, args)`.
fn match_function_call(expr: &str) -> Option<(String, String)> {
    let stripped = expr.trim();
    let chars: Vec<char> = stripped.chars().collect();
    let mut i = 0;
    if i >= chars.len() || !(chars[i].is_ascii_alphabetic()) {
        return None;
    }
    let name_start = i;
    while i < chars.len()
        && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
    {
        i += 1;
    }
    let name_end = i;
    while i < chars.len() && chars[i] == ' ' {
        i += 1;
    }
    if i >= chars.len() || chars[i] != '(' {
        return None;
    }
    let open_idx = i;
    let close_idx = find_matching_paren(stripped, open_idx)?;
    if close_idx == chars.len() - 1 {
        let name: String = chars[name_start..name_end].iter().collect();
        let args: String = chars[open_idx + 1..close_idx].iter().collect();
        Some((name, args))
    } else {
        None
    }
}

/// `true` when `expr` contains `:` at paren depth 0 (a range reference).
fn has_top_level_colon(expr: &str) -> bool {
    let mut depth = 0i32;
    for ch in expr.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ':' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Split a function's argument string at top-level commas, outside
/// parens and string literals. Doubled `""` stays part of its literal.
fn split_top_level_args(args_str: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut current = String::new();
    let mut chars = args_str.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                current.push(ch);
                if in_string && chars.peek() == Some(&'"') {
                    current.push(chars.next().unwrap());
                } else {
                    in_string = !in_string;
                }
            }
            '(' if !in_string => {
                depth += 1;
                current.push(ch);
            }
            ')' if !in_string => {
                depth -= 1;
                current.push(ch);
            }
            ',' if !in_string && depth == 0 => {
                args.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    args
}

/// Rightmost lowest-precedence binary operator at paren depth 0,
/// scanned comparison -> additive -> multiplicative. Right-to-left scan
/// yields left-to-right associativity once recursion re-assembles the
/// tree.
fn find_top_level_split(expr: &str) -> Option<(String, String, String)> {
    let chars: Vec<char> = expr.chars().collect();
    let len = chars.len();

    for pass in ["cmp", "add", "mul"] {
        let mut depth = 0i32;
        let mut in_string = false;
        let mut i = len as isize - 1;

        while i > 0 {
            let idx = i as usize;
            let ch = chars[idx];

            if ch == '"' {
                in_string = !in_string;
                i -= 1;
                continue;
            }
            if in_string {
                i -= 1;
                continue;
            }
            if ch == ')' {
                depth += 1;
                i -= 1;
                continue;
            }
            if ch == '(' {
                depth -= 1;
                i -= 1;
                continue;
            }
            if depth != 0 {
                i -= 1;
                continue;
            }

            let mut matched: Option<(usize, &str)> = None;

            match pass {
                "cmp" => {
                    if idx >= 1 {
                        let two: String = chars[idx - 1..=idx].iter().collect();
                        if [">=", "<=", "<>"].contains(&two.as_str()) {
                            matched = Some((idx - 1, match two.as_str() {
                                ">=" => ">=",
                                "<=" => "<=",
                                _ => "<>",
                            }));
                        }
                    }
                    if matched.is_none() && (ch == '>' || ch == '<') {
                        matched = Some((idx, if ch == '>' { ">" } else { "<" }));
                    }
                    if matched.is_none()
                        && ch == '='
                        && !(idx >= 1 && matches!(chars[idx - 1], '>' | '<' | '!'))
                    {
                        matched = Some((idx, "="));
                    }
                }
                "add" => {
                    if ch == '+' || ch == '-' {
                        matched = Some((idx, if ch == '+' { "+" } else { "-" }));
                    } else if ch == '&' {
                        matched = Some((idx, "&"));
                    }
                }
                "mul" => {
                    if ch == '*' || ch == '/' {
                        matched = Some((idx, if ch == '*' { "*" } else { "/" }));
                    }
                }
                _ => unreachable!(),
            }

            if let Some((op_start, op)) = matched {
                if op_start == 0 {
                    i -= 1;
                    continue;
                }
                // Scientific-notation exponent: skip a +/- preceded by
                // e/E that is itself preceded by a digit.
                if (op == "+" || op == "-")
                    && op_start >= 1
                    && matches!(chars[op_start - 1], 'e' | 'E')
                    && op_start >= 2
                    && chars[op_start - 2].is_ascii_digit()
                {
                    i -= 1;
                    continue;
                }

                let mut j = op_start as isize - 1;
                while j >= 0 && chars[j as usize] == ' ' {
                    j -= 1;
                }
                let is_unary = j < 0
                    || matches!(
                        chars[j as usize],
                        '(' | ',' | '+' | '-' | '*' | '/' | '>' | '<' | '=' | '&'
                    );
                if is_unary {
                    i -= 1;
                    continue;
                }

                let left: String = chars[..op_start].iter().collect::<String>().trim().to_string();
                let right: String = chars[op_start + op.len()..]
                    .iter()
                    .collect::<String>()
                    .trim()
                    .to_string();
                if !left.is_empty() && !right.is_empty() {
                    return Some((left, op.to_string(), right));
                }
            }

            i -= 1;
        }
    }

    None
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn slice_chars(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

/// `+`, `-`, `*`, `/`, `&` with error-propagation and non-numeric-to-
/// empty coercion per the binary-op semantics in the spec.
fn binary_op(left: &Value, op: &str, right: &Value) -> Value {
    if let Some(e) = left.as_error() {
        return Value::error(e);
    }
    if let Some(e) = right.as_error() {
        return Value::error(e);
    }

    if op == "&" {
        let l = crate::args::coerce_text(&left.as_scalar());
        let r = crate::args::coerce_text(&right.as_scalar());
        return Value::text(format!("{l}{r}"));
    }

    let (Some(l), Some(r)) = (numeric_of(left), numeric_of(right)) else {
        return Value::empty();
    };

    match op {
        "+" => numeric_result(l + r, left, right),
        "-" => numeric_result(l - r, left, right),
        "*" => numeric_result(l * r, left, right),
        "/" => {
            if r == 0.0 {
                Value::error(ExcelError::Div)
            } else {
                Value::number(l / r)
            }
        }
        _ => Value::empty(),
    }
}

fn numeric_of(v: &Value) -> Option<f64> {
    v.as_scalar().as_f64()
}

/// Preserve integer identity when both operands were integers, matching
/// the spec's "42 == 42 holding when read back" requirement.
fn numeric_result(result: f64, left: &Value, right: &Value) -> Value {
    let both_int = matches!(left.as_scalar(), CellValue::Int(_))
        && matches!(right.as_scalar(), CellValue::Int(_));
    if both_int && result.fract() == 0.0 && result.abs() < i64::MAX as f64 {
        Value::int(result as i64)
    } else {
        Value::number(result)
    }
}

/// Comparison with numeric coercion, falling back to case-insensitive
/// lexicographic string comparison.
fn compare(left: &Value, right: &Value, op: &str) -> bool {
    if let (Some(l), Some(r)) = (numeric_of(left), numeric_of(right)) {
        return match op {
            ">" => l > r,
            "<" => l < r,
            ">=" => l >= r,
            "<=" => l <= r,
            "=" => l == r,
            "<>" => l != r,
            _ => false,
        };
    }
    let l = crate::args::coerce_text(&left.as_scalar()).to_ascii_lowercase();
    let r = crate::args::coerce_text(&right.as_scalar()).to_ascii_lowercase();
    match op {
        ">" => l > r,
        "<" => l < r,
        ">=" => l >= r,
        "<=" => l <= r,
        "=" => l == r,
        "<>" => l != r,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FunctionRegistry;

    fn store(pairs: &[(&str, CellValue)]) -> HashMap<String, CellValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn operator_precedence() {
        let s = store(&[
            ("Sheet1!A1", CellValue::Int(2)),
            ("Sheet1!A2", CellValue::Int(3)),
            ("Sheet1!A3", CellValue::Int(4)),
        ]);
        let names = HashMap::new();
        let reg = FunctionRegistry::new();
        let now = chrono::Local::now().naive_local();
        let interp = Interpreter::new(&s, &names, &reg, "Sheet1", now);
        assert_eq!(interp.eval_expr("A1+A2*A3", "Sheet1").as_scalar(), CellValue::Int(14));
        assert_eq!(
            interp.eval_expr("(A1+A2)*A3", "Sheet1").as_scalar(),
            CellValue::Int(20)
        );
    }

    #[test]
    fn division_by_zero_is_div_error() {
        let s = HashMap::new();
        let names = HashMap::new();
        let reg = FunctionRegistry::new();
        let now = chrono::Local::now().naive_local();
        let interp = Interpreter::new(&s, &names, &reg, "Sheet1", now);
        assert_eq!(interp.eval_expr("1/0", "Sheet1").as_scalar(), CellValue::Error(ExcelError::Div));
    }

    #[test]
    fn string_concatenation() {
        let s = HashMap::new();
        let names = HashMap::new();
        let reg = FunctionRegistry::new();
        let now = chrono::Local::now().naive_local();
        let interp = Interpreter::new(&s, &names, &reg, "Sheet1", now);
        assert_eq!(
            interp.eval_expr(r#""foo"&"bar""#, "Sheet1").as_scalar(),
            CellValue::Text("foobar".into())
        );
    }
}
