//! Regex-based reference, range, and function-name extraction.
//!
//! Grounded directly on `wolfxl.calc._parser`'s regex approach: strip
//! string literals first so quoted text never yields spurious matches,
//! then scan for ranges before singles so that a single-ref match whose
//! span falls inside an already-matched range is excluded — a cell
//! reference that's part of `A1:B5` should not also be reported as a
//! standalone reference to `A1`.

use once_cell::sync::Lazy;
use regex::Regex;

use formualizer_common::reference::{a1_to_rowcol, rowcol_to_a1};

const SHEET_PREFIX: &str = r"(?:'([^']+)'!|([A-Za-z0-9_]+)!)";
const CELL_REF: &str = r"\$?([A-Za-z]{1,3})\$?(\d+)";

static STRING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""[^"]*""#).unwrap());

static SINGLE_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("(?:{SHEET_PREFIX})?{CELL_REF}")).unwrap());

static RANGE_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?:{SHEET_PREFIX})?{CELL_REF}\s*:\s*{CELL_REF}")).unwrap()
});

static FUNC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z][A-Za-z0-9_.]+)\s*\(").unwrap());

fn strip_strings(formula: &str) -> String {
    STRING_RE.replace_all(formula, "").into_owned()
}

/// Extract all single cell references from a formula as canonical
/// `"Sheet!A1"` strings (no `$`, unquoted). Does not include references
/// that are part of a range — use [`parse_range_references`] for those.
pub fn parse_references(formula: &str, current_sheet: &str) -> Vec<String> {
    let clean = strip_strings(formula);
    let mut refs = Vec::new();
    let mut seen = std::collections::HashSet::new();

    let range_spans: Vec<(usize, usize)> = RANGE_REF_RE
        .find_iter(&clean)
        .map(|m| (m.start(), m.end()))
        .collect();

    for caps in SINGLE_REF_RE.captures_iter(&clean) {
        let whole = caps.get(0).unwrap();
        let pos = whole.start();
        if range_spans.iter().any(|&(s, e)| s <= pos && pos < e) {
            continue;
        }

        let sheet = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or(current_sheet);
        let col = caps.get(3).unwrap().as_str().to_ascii_uppercase();
        let row = caps.get(4).unwrap().as_str();
        let canonical = format!("{sheet}!{col}{row}");
        if seen.insert(canonical.clone()) {
            refs.push(canonical);
        }
    }

    refs
}

/// Extract all range references from a formula as canonical
/// `"Sheet!A1:B5"` strings.
pub fn parse_range_references(formula: &str, current_sheet: &str) -> Vec<String> {
    let clean = strip_strings(formula);
    let mut ranges = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for caps in RANGE_REF_RE.captures_iter(&clean) {
        let sheet = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or(current_sheet);
        let start_col = caps.get(3).unwrap().as_str().to_ascii_uppercase();
        let start_row = caps.get(4).unwrap().as_str();
        let end_col = caps.get(5).unwrap().as_str().to_ascii_uppercase();
        let end_row = caps.get(6).unwrap().as_str();
        let canonical = format!("{sheet}!{start_col}{start_row}:{end_col}{end_row}");
        if seen.insert(canonical.clone()) {
            ranges.push(canonical);
        }
    }

    ranges
}

/// Extract all function names invoked in a formula, upper-cased, in
/// first-seen order.
pub fn parse_functions(formula: &str) -> Vec<String> {
    let clean = strip_strings(formula);
    let mut funcs = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for caps in FUNC_RE.captures_iter(&clean) {
        let name = caps.get(1).unwrap().as_str().to_ascii_uppercase();
        if seen.insert(name.clone()) {
            funcs.push(name);
        }
    }
    funcs
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeExpandError(pub String);

impl std::fmt::Display for RangeExpandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid range: {}", self.0)
    }
}

impl std::error::Error for RangeExpandError {}

/// Expand a range like `"A1:A5"` (with or without a sheet prefix) into
/// individual cell refs, in the same sheet-prefixed-or-not form as the
/// input, ordered row-major.
pub fn expand_range(range_ref: &str) -> Result<Vec<String>, RangeExpandError> {
    let (sheet, ref_part) = match range_ref.rsplit_once('!') {
        Some((sheet, rest)) => (Some(sheet.trim_matches('\'')), rest),
        None => (None, range_ref),
    };

    let parts: Vec<&str> = ref_part.split(':').collect();
    if parts.len() != 2 {
        return Err(RangeExpandError(range_ref.to_string()));
    }

    let (start_row, start_col) = a1_to_rowcol(parts[0])
        .map_err(|_| RangeExpandError(range_ref.to_string()))?;
    let (end_row, end_col) = a1_to_rowcol(parts[1])
        .map_err(|_| RangeExpandError(range_ref.to_string()))?;

    let (r_min, r_max) = (start_row.min(end_row), start_row.max(end_row));
    let (c_min, c_max) = (start_col.min(end_col), start_col.max(end_col));

    let mut cells = Vec::new();
    for r in r_min..=r_max {
        for c in c_min..=c_max {
            let a1 = rowcol_to_a1(r, c);
            match sheet {
                Some(sheet) => cells.push(format!("{sheet}!{a1}")),
                None => cells.push(a1),
            }
        }
    }
    Ok(cells)
}

/// All cell references in a formula — singles plus range-expanded —
/// deduplicated in first-seen order.
pub fn all_references(formula: &str, current_sheet: &str) -> Vec<String> {
    let mut refs = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for r in parse_references(formula, current_sheet) {
        if seen.insert(r.clone()) {
            refs.push(r);
        }
    }

    for range in parse_range_references(formula, current_sheet) {
        if let Ok(expanded) = expand_range(&range) {
            for r in expanded {
                if seen.insert(r.clone()) {
                    refs.push(r);
                }
            }
        }
    }

    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_refs_exclude_those_inside_ranges() {
        let refs = parse_references("=A1+SUM(B1:B3)+C1", "Sheet1");
        assert_eq!(refs, vec!["Sheet1!A1", "Sheet1!C1"]);
    }

    #[test]
    fn range_refs_use_sheet_prefix() {
        let ranges = parse_range_references("=SUM('My Sheet'!A1:A5)", "Sheet1");
        assert_eq!(ranges, vec!["My Sheet!A1:A5"]);
    }

    #[test]
    fn refs_inside_string_literals_are_ignored() {
        let refs = parse_references(r#"=IF(A1="B2","yes","no")"#, "Sheet1");
        assert_eq!(refs, vec!["Sheet1!A1"]);
    }

    #[test]
    fn function_names_are_deduplicated_and_upper_cased() {
        let funcs = parse_functions("=sum(A1:A2)+SUM(B1:B2)+vlookup(A1,B:C,2,FALSE)");
        assert_eq!(funcs, vec!["SUM", "VLOOKUP"]);
    }

    #[test]
    fn expand_range_is_row_major_with_sheet_prefix() {
        let cells = expand_range("Sheet1!A1:B2").unwrap();
        assert_eq!(cells, vec!["Sheet1!A1", "Sheet1!B1", "Sheet1!A2", "Sheet1!B2"]);
    }

    #[test]
    fn all_references_combines_singles_and_expanded_ranges() {
        let refs = all_references("=A1+SUM(B1:B2)", "Sheet1");
        assert_eq!(
            refs,
            vec!["Sheet1!A1", "Sheet1!B1", "Sheet1!B2"]
        );
    }
}
