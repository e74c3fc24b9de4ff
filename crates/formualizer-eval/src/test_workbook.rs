//! An in-memory `WorkbookView` double for tests, grounded on the
//! `WorkbookView` contract in `traits.rs` rather than any teacher file —
//! there is no I/O layer to imitate in this rebuilt engine, only the
//! boundary it consumes.

use std::collections::HashMap;

use crate::traits::{RawCellValue, SheetCells, WorkbookView};

#[derive(Default)]
pub struct TestWorkbook {
    sheets: Vec<String>,
    cells: HashMap<String, Vec<(u32, u32, RawCellValue)>>,
    defined_names: Vec<(String, String)>,
}

impl TestWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell by its A1 address within `sheet`.
    pub fn set(&mut self, sheet: &str, a1: &str, value: RawCellValue) {
        let (row, col) = formualizer_common::reference::a1_to_rowcol(a1)
            .expect("test cell address must be valid A1 notation");
        if !self.sheets.iter().any(|s| s == sheet) {
            self.sheets.push(sheet.to_string());
        }
        self.cells.entry(sheet.to_string()).or_default().push((row, col, value));
    }

    pub fn define_name(&mut self, name: &str, refers_to: &str) {
        self.defined_names.push((name.to_string(), refers_to.to_string()));
    }
}

impl WorkbookView for TestWorkbook {
    fn sheets(&self) -> Vec<SheetCells<'_>> {
        self.sheets
            .iter()
            .map(|name| SheetCells {
                name,
                cells: self.cells.get(name).cloned().unwrap_or_default(),
            })
            .collect()
    }

    fn defined_names(&self) -> Vec<(String, String)> {
        self.defined_names.clone()
    }
}
