//! Logical builtins. Grounded on `wolfxl.calc._functions._builtin_if` and
//! the truthy-coercion rule already implemented by `CellValue::is_truthy`.

use formualizer_common::CellValue;

use crate::args::Value;

pub fn if_fn(args: &[Value]) -> Value {
    let Some(cond) = args.first() else {
        return Value::empty();
    };
    if let Some(e) = cond.as_error() {
        return Value::error(e);
    }
    let truthy = is_truthy(cond);
    if truthy {
        args.get(1).cloned().unwrap_or_else(Value::empty)
    } else {
        args.get(2).cloned().unwrap_or_else(|| Value::boolean(false))
    }
}

pub fn and(args: &[Value]) -> Value {
    if let Some(e) = args.iter().find_map(|v| v.as_error()) {
        return Value::error(e);
    }
    Value::boolean(args.iter().all(is_truthy))
}

pub fn or(args: &[Value]) -> Value {
    if let Some(e) = args.iter().find_map(|v| v.as_error()) {
        return Value::error(e);
    }
    Value::boolean(args.iter().any(is_truthy))
}

pub fn not(args: &[Value]) -> Value {
    let Some(v) = args.first() else {
        return Value::empty();
    };
    if let Some(e) = v.as_error() {
        return Value::error(e);
    }
    Value::boolean(!is_truthy(v))
}

/// Returns `fallback` when the first operand is an error singleton or a
/// string beginning with `#` — the source's loose wire-format check.
pub fn iferror(args: &[Value]) -> Value {
    let Some(first) = args.first() else {
        return Value::empty();
    };
    let looks_like_error = first.is_error()
        || matches!(first.as_scalar(), CellValue::Text(ref s) if s.starts_with('#'));
    if looks_like_error {
        args.get(1).cloned().unwrap_or_else(Value::empty)
    } else {
        first.clone()
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Scalar(cv) => cv.is_truthy(),
        Value::Range(r) => !r.flatten().is_empty() && r.flatten().iter().any(|c| c.is_truthy()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn if_picks_branch_by_truthiness() {
        assert_eq!(
            if_fn(&[Value::int(1), Value::text("yes"), Value::text("no")]).as_scalar(),
            CellValue::Text("yes".into())
        );
        assert_eq!(
            if_fn(&[Value::int(0), Value::text("yes"), Value::text("no")]).as_scalar(),
            CellValue::Text("no".into())
        );
    }

    #[test]
    fn if_missing_false_branch_is_false() {
        assert_eq!(if_fn(&[Value::int(0), Value::text("yes")]).as_scalar(), CellValue::Boolean(false));
    }

    #[test]
    fn iferror_catches_hash_prefixed_strings() {
        let v = iferror(&[Value::text("#REF!"), Value::text("fallback")]);
        assert_eq!(v.as_scalar(), CellValue::Text("fallback".into()));
    }
}
