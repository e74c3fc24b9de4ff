//! The criterion-matching engine shared by `SUMIF`/`COUNTIF`/`AVERAGEIF`
//! and the `*IFS` family.
//!
//! Grounded on the teacher's `args.rs::parse_criteria` prefix-operator
//! pattern, retargeted at `CellValue` and extended with the wildcard
//! branch the criteria table in the functions reference calls for.

use formualizer_common::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Gt,
    Lt,
    Ge,
    Le,
    Ne,
    Eq,
}

#[derive(Debug, Clone)]
enum Operand {
    Num(f64),
    Text(String),
}

#[derive(Debug, Clone)]
pub enum Criterion {
    NumEq(f64),
    TextEq(String),
    Cmp(CmpOp, Operand),
    Wildcard(String),
}

/// Parse a resolved criterion argument into a matchable `Criterion`.
pub fn parse_criterion(v: &CellValue) -> Criterion {
    match v {
        CellValue::Int(i) => Criterion::NumEq(*i as f64),
        CellValue::Number(n) => Criterion::NumEq(*n),
        CellValue::Boolean(b) => Criterion::NumEq(if *b { 1.0 } else { 0.0 }),
        CellValue::Text(s) => parse_text_criterion(s),
        _ => Criterion::TextEq(String::new()),
    }
}

fn parse_text_criterion(raw: &str) -> Criterion {
    for (prefix, op) in [
        (">=", CmpOp::Ge),
        ("<=", CmpOp::Le),
        ("<>", CmpOp::Ne),
        (">", CmpOp::Gt),
        ("<", CmpOp::Lt),
        ("=", CmpOp::Eq),
    ] {
        if let Some(rest) = raw.strip_prefix(prefix) {
            let operand = if let Ok(n) = rest.parse::<f64>() {
                Operand::Num(n)
            } else {
                Operand::Text(rest.to_ascii_lowercase())
            };
            return Criterion::Cmp(op, operand);
        }
    }

    if raw.contains('*') || raw.contains('?') {
        return Criterion::Wildcard(raw.to_ascii_lowercase());
    }

    Criterion::TextEq(raw.to_ascii_lowercase())
}

/// Does `cell` satisfy `criterion`?
pub fn matches(criterion: &Criterion, cell: &CellValue) -> bool {
    match criterion {
        Criterion::NumEq(target) => cell.is_numeric() && cell.as_f64_or_zero() == *target,
        Criterion::TextEq(target) => coerce_lower(cell) == *target,
        Criterion::Wildcard(pattern) => wildcard_match(pattern, &coerce_lower(cell)),
        Criterion::Cmp(op, operand) => match operand {
            Operand::Num(n) => {
                if !cell.is_numeric() {
                    return false;
                }
                compare_num(*op, cell.as_f64_or_zero(), *n)
            }
            Operand::Text(s) => compare_text(*op, &coerce_lower(cell), s),
        },
    }
}

fn coerce_lower(v: &CellValue) -> String {
    crate::args::coerce_text(v).to_ascii_lowercase()
}

fn compare_num(op: CmpOp, a: f64, b: f64) -> bool {
    match op {
        CmpOp::Gt => a > b,
        CmpOp::Lt => a < b,
        CmpOp::Ge => a >= b,
        CmpOp::Le => a <= b,
        CmpOp::Ne => a != b,
        CmpOp::Eq => a == b,
    }
}

fn compare_text(op: CmpOp, a: &str, b: &str) -> bool {
    match op {
        CmpOp::Gt => a > b,
        CmpOp::Lt => a < b,
        CmpOp::Ge => a >= b,
        CmpOp::Le => a <= b,
        CmpOp::Ne => a != b,
        CmpOp::Eq => a == b,
    }
}

/// Classic backtracking glob match: `*` runs of any length, `?` exactly
/// one character. Both `pattern` and `text` are expected lower-cased.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let (mut star_idx, mut star_match) = (None, 0usize);

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star_idx = Some(pi);
            star_match = ti;
            pi += 1;
        } else if let Some(si) = star_idx {
            pi = si + 1;
            star_match += 1;
            ti = star_match;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_equality_criterion() {
        let c = parse_criterion(&CellValue::Int(5));
        assert!(matches(&c, &CellValue::Number(5.0)));
        assert!(!matches(&c, &CellValue::Number(6.0)));
    }

    #[test]
    fn prefix_comparison_criterion() {
        let c = parse_criterion(&CellValue::Text(">=10".into()));
        assert!(matches(&c, &CellValue::Int(10)));
        assert!(matches(&c, &CellValue::Int(20)));
        assert!(!matches(&c, &CellValue::Int(9)));
    }

    #[test]
    fn wildcard_criterion() {
        let c = parse_criterion(&CellValue::Text("Rev*".into()));
        assert!(matches(&c, &CellValue::Text("Revenue".into())));
        assert!(!matches(&c, &CellValue::Text("Cost".into())));
    }

    #[test]
    fn case_insensitive_text_equality() {
        let c = parse_criterion(&CellValue::Text("COGS".into()));
        assert!(matches(&c, &CellValue::Text("cogs".into())));
    }
}
