//! The workbook evaluator: orchestrates `load -> topo-sort -> evaluate`,
//! and the snapshot/diff/report cycle for `recalculate`. Grounded
//! directly on `wolfxl.calc._evaluator.WorkbookEvaluator`.

use std::collections::{HashMap, HashSet};

use formualizer_common::CellValue;

use crate::error::EngineError;
use crate::graph::DependencyGraph;
use crate::interpreter::Interpreter;
use crate::registry::FunctionRegistry;
use crate::traits::{Clock, RawCellValue, SystemClock, WorkbookView};

pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// One changed formula cell from a `recalculate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct CellDelta {
    pub cell_ref: String,
    pub old_value: Option<CellValue>,
    pub new_value: CellValue,
    pub formula_text: String,
}

#[derive(Debug, Clone, Default)]
pub struct RecalcResult {
    pub perturbations: HashMap<String, f64>,
    pub deltas: Vec<CellDelta>,
    pub total_formula_cells: usize,
    pub propagated_cells: usize,
    pub max_chain_depth: usize,
}

impl RecalcResult {
    /// `propagated / total`, or `0` when there are no formula cells.
    pub fn propagation_ratio(&self) -> f64 {
        if self.total_formula_cells == 0 {
            0.0
        } else {
            self.propagated_cells as f64 / self.total_formula_cells as f64
        }
    }
}

pub struct WorkbookEvaluator {
    store: HashMap<String, CellValue>,
    graph: DependencyGraph,
    registry: FunctionRegistry,
    named_ranges: HashMap<String, String>,
    /// The sheet assumed for a bare (unqualified) cell reference.
    /// Open question from the design notes, resolved here: the caller
    /// supplies it explicitly rather than the engine guessing `Sheet1`.
    default_sheet: String,
    clock: Box<dyn Clock>,
    loaded: bool,
}

impl WorkbookEvaluator {
    pub fn new(default_sheet: impl Into<String>) -> Self {
        Self::with_clock(default_sheet, Box::new(SystemClock))
    }

    pub fn with_clock(default_sheet: impl Into<String>, clock: Box<dyn Clock>) -> Self {
        Self {
            store: HashMap::new(),
            graph: DependencyGraph::new(),
            registry: FunctionRegistry::new(),
            named_ranges: HashMap::new(),
            default_sheet: default_sheet.into(),
            clock,
            loaded: false,
        }
    }

    pub fn register_function(&mut self, name: &str, callable: crate::registry::Callable) {
        self.registry.register(name, callable);
    }

    pub fn default_sheet(&self) -> &str {
        &self.default_sheet
    }

    pub fn load(&mut self, view: &dyn WorkbookView) {
        self.store.clear();
        self.graph = DependencyGraph::new();
        self.named_ranges.clear();

        for (name, refers_to) in view.defined_names() {
            self.named_ranges.insert(name.to_ascii_uppercase(), refers_to);
        }

        for sheet in view.sheets() {
            for (row, col, raw) in sheet.cells {
                let a1 = formualizer_common::reference::rowcol_to_a1(row, col);
                let canonical = format!("{}!{a1}", sheet.name);

                match raw {
                    RawCellValue::Formula(text) => {
                        self.graph.add_formula(&canonical, &text, sheet.name);
                        self.store.insert(canonical, CellValue::Formula(text));
                    }
                    other => {
                        self.store.insert(canonical, literal_of(other));
                    }
                }
            }
        }

        self.loaded = true;
    }

    pub fn calculate(&mut self) -> Result<HashMap<String, CellValue>, EngineError> {
        if !self.loaded {
            return Err(EngineError::NotLoaded);
        }
        let order = self.graph.topological_order()?;
        self.evaluate_cells(&order);

        Ok(order
            .into_iter()
            .map(|c| {
                let v = self.store.get(&c).cloned().unwrap_or(CellValue::Empty);
                (c, v)
            })
            .collect())
    }

    pub fn recalculate(
        &mut self,
        perturbations: HashMap<String, f64>,
        tolerance: f64,
    ) -> Result<RecalcResult, EngineError> {
        if !self.loaded {
            return Err(EngineError::NotLoaded);
        }

        let formula_cells: Vec<String> = self.graph.formulas.keys().cloned().collect();
        let old: HashMap<String, Option<CellValue>> = formula_cells
            .iter()
            .map(|c| (c.clone(), self.store.get(c).cloned()))
            .collect();

        for (cell_ref, value) in &perturbations {
            self.store.insert(cell_ref.clone(), CellValue::Number(*value));
        }

        let changed: HashSet<String> = perturbations.keys().cloned().collect();
        let affected = self.graph.affected_cells(&changed)?;
        self.evaluate_cells(&affected);

        let mut deltas = Vec::new();
        for cell in &affected {
            let old_value = old.get(cell).cloned().flatten();
            let new_value = self.store.get(cell).cloned().unwrap_or(CellValue::Empty);
            if values_differ(old_value.as_ref(), &new_value, tolerance) {
                let formula_text = self.graph.formulas.get(cell).cloned().unwrap_or_default();
                deltas.push(CellDelta {
                    cell_ref: cell.clone(),
                    old_value,
                    new_value,
                    formula_text,
                });
            }
        }

        Ok(RecalcResult {
            max_chain_depth: self.graph.max_depth(&changed),
            total_formula_cells: self.graph.formulas.len(),
            propagated_cells: deltas.len(),
            deltas,
            perturbations,
        })
    }

    fn evaluate_cells(&mut self, cells: &[String]) {
        let now = self.clock.now();
        for cell_ref in cells {
            let Some(formula) = self.graph.formulas.get(cell_ref).cloned() else {
                continue;
            };
            let result = {
                let interp = Interpreter::new(
                    &self.store,
                    &self.named_ranges,
                    &self.registry,
                    &self.default_sheet,
                    now,
                );
                interp.eval_formula(cell_ref, &formula)
            };
            self.store.insert(cell_ref.clone(), result);
        }
    }
}

impl Default for WorkbookEvaluator {
    /// Falls back to `"Sheet1"` for ergonomic parity with the reference
    /// implementation; callers with a real default sheet should use
    /// `new` instead of relying on this silently.
    fn default() -> Self {
        Self::new("Sheet1")
    }
}

fn literal_of(raw: RawCellValue) -> CellValue {
    match raw {
        RawCellValue::Empty => CellValue::Empty,
        RawCellValue::Int(i) => CellValue::Int(i),
        RawCellValue::Number(n) => CellValue::Number(n),
        RawCellValue::Text(s) => CellValue::Text(s),
        RawCellValue::Boolean(b) => CellValue::Boolean(b),
        RawCellValue::ErrorCode(code) => formualizer_common::ExcelError::parse(&code)
            .map(CellValue::Error)
            .unwrap_or(CellValue::Text(code)),
        RawCellValue::Formula(text) => CellValue::Formula(text),
    }
}

/// `None == None` is equal; exactly one `None` differs; both numeric
/// compares within `tolerance`; otherwise falls back to value equality.
fn values_differ(old: Option<&CellValue>, new: &CellValue, tolerance: f64) -> bool {
    match old {
        None => true,
        Some(old) => match (old.as_f64(), new.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() > tolerance,
            _ => old != new,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_workbook::TestWorkbook;

    #[test]
    fn sum_chain_recalculates_transitively() {
        let mut wb = TestWorkbook::new();
        wb.set("Sheet1", "A1", RawCellValue::Int(10));
        wb.set("Sheet1", "A2", RawCellValue::Int(20));
        wb.set("Sheet1", "A3", RawCellValue::Formula("=SUM(A1:A2)".into()));
        wb.set("Sheet1", "A4", RawCellValue::Formula("=A3*2".into()));

        let mut engine = WorkbookEvaluator::new("Sheet1");
        engine.load(&wb);
        let results = engine.calculate().unwrap();
        assert_eq!(results["Sheet1!A3"], CellValue::Int(30));
        assert_eq!(results["Sheet1!A4"], CellValue::Int(60));

        let perturbation: HashMap<String, f64> =
            [("Sheet1!A1".to_string(), 15.0)].into_iter().collect();
        let recalc = engine.recalculate(perturbation, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(recalc.deltas.len(), 2);
        assert_eq!(recalc.total_formula_cells, 2);
        assert_eq!(recalc.propagated_cells, 2);
        assert_eq!(recalc.max_chain_depth, 2);
    }

    #[test]
    fn hardcoded_values_do_not_propagate() {
        let mut wb = TestWorkbook::new();
        wb.set("Sheet1", "A1", RawCellValue::Int(10));
        wb.set("Sheet1", "A2", RawCellValue::Int(20));
        wb.set("Sheet1", "A3", RawCellValue::Int(30));
        wb.set("Sheet1", "A4", RawCellValue::Int(60));

        let mut engine = WorkbookEvaluator::new("Sheet1");
        engine.load(&wb);
        engine.calculate().unwrap();

        let perturbation: HashMap<String, f64> =
            [("Sheet1!A1".to_string(), 15.0)].into_iter().collect();
        let recalc = engine.recalculate(perturbation, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(recalc.deltas.len(), 0);
        assert_eq!(recalc.propagation_ratio(), 0.0);
    }

    #[test]
    fn circular_reference_fails_calculate() {
        let mut wb = TestWorkbook::new();
        wb.set("Sheet1", "A1", RawCellValue::Formula("=B1+1".into()));
        wb.set("Sheet1", "B1", RawCellValue::Formula("=A1+1".into()));

        let mut engine = WorkbookEvaluator::new("Sheet1");
        engine.load(&wb);
        assert!(matches!(engine.calculate(), Err(EngineError::CircularReference(_))));
    }

    #[test]
    fn calculate_before_load_is_not_loaded() {
        let mut engine = WorkbookEvaluator::new("Sheet1");
        assert!(matches!(engine.calculate(), Err(EngineError::NotLoaded)));
    }
}
