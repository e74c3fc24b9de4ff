//! Range addressing and the 2-D value container formulas operate over.

use crate::CellValue;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A validated, 1-based rectangular range on a single sheet.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RangeAddress {
    pub sheet: String,
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl RangeAddress {
    pub fn new(
        sheet: impl Into<String>,
        start_row: u32,
        start_col: u32,
        end_row: u32,
        end_col: u32,
    ) -> Result<Self, &'static str> {
        if start_row == 0 || start_col == 0 || end_row == 0 || end_col == 0 {
            return Err("Row and column indices must be 1-based");
        }
        if start_row > end_row || start_col > end_col {
            return Err("Range must be ordered: start <= end");
        }
        Ok(Self {
            sheet: sheet.into(),
            start_row,
            start_col,
            end_row,
            end_col,
        })
    }

    pub fn width(&self) -> u32 {
        self.end_col - self.start_col + 1
    }

    pub fn height(&self) -> u32 {
        self.end_row - self.start_row + 1
    }
}

/// A materialized range of values, row-major.
///
/// `values` may be shorter than `n_rows * n_cols` — lookups past the end
/// read as `CellValue::Empty` rather than panicking, so a range spanning
/// unloaded cells degrades gracefully instead of erroring.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct RangeValue {
    pub n_rows: usize,
    pub n_cols: usize,
    pub values: Vec<CellValue>,
}

impl RangeValue {
    pub fn new(n_rows: usize, n_cols: usize, values: Vec<CellValue>) -> Self {
        Self {
            n_rows,
            n_cols,
            values,
        }
    }

    pub fn single(value: CellValue) -> Self {
        Self {
            n_rows: 1,
            n_cols: 1,
            values: vec![value],
        }
    }

    /// Fetch the cell at 1-based `(row, col)` within the range.
    pub fn get(&self, row: usize, col: usize) -> CellValue {
        if row == 0 || col == 0 || row > self.n_rows || col > self.n_cols {
            return CellValue::Empty;
        }
        let idx = (row - 1) * self.n_cols + (col - 1);
        self.values.get(idx).cloned().unwrap_or(CellValue::Empty)
    }

    /// The 1-based row, padded with `Empty` out to `n_cols`.
    pub fn row(&self, row: usize) -> Vec<CellValue> {
        (1..=self.n_cols).map(|c| self.get(row, c)).collect()
    }

    /// The 1-based column, padded with `Empty` out to `n_rows`.
    pub fn column(&self, col: usize) -> Vec<CellValue> {
        (1..=self.n_rows).map(|r| self.get(r, col)).collect()
    }

    /// Row-major iteration over every cell in the range.
    pub fn iter(&self) -> impl Iterator<Item = CellValue> + '_ {
        (1..=self.n_rows)
            .flat_map(move |r| (1..=self.n_cols).map(move |c| (r, c)))
            .map(move |(r, c)| self.get(r, c))
    }

    /// All values flattened row-major into a single `Vec`.
    pub fn flatten(&self) -> Vec<CellValue> {
        self.iter().collect()
    }

    pub fn is_single_cell(&self) -> bool {
        self.n_rows == 1 && self.n_cols == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_is_1_based_and_tolerant_of_short_backing_vec() {
        let r = RangeValue::new(2, 2, vec![CellValue::Int(1), CellValue::Int(2)]);
        assert_eq!(r.get(1, 1), CellValue::Int(1));
        assert_eq!(r.get(1, 2), CellValue::Int(2));
        assert_eq!(r.get(2, 1), CellValue::Empty);
        assert_eq!(r.get(0, 1), CellValue::Empty);
        assert_eq!(r.get(3, 1), CellValue::Empty);
    }

    #[test]
    fn flatten_is_row_major() {
        let r = RangeValue::new(
            2,
            2,
            vec![
                CellValue::Int(1),
                CellValue::Int(2),
                CellValue::Int(3),
                CellValue::Int(4),
            ],
        );
        assert_eq!(
            r.flatten(),
            vec![
                CellValue::Int(1),
                CellValue::Int(2),
                CellValue::Int(3),
                CellValue::Int(4)
            ]
        );
        assert_eq!(r.row(2), vec![CellValue::Int(3), CellValue::Int(4)]);
        assert_eq!(r.column(2), vec![CellValue::Int(2), CellValue::Int(4)]);
    }
}
