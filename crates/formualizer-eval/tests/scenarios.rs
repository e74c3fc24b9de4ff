//! End-to-end scenarios exercising the whole evaluator stack through
//! `WorkbookEvaluator::load`/`calculate`/`recalculate`.

use std::collections::HashMap;

use formualizer_common::CellValue;
use formualizer_eval::test_workbook::TestWorkbook;
use formualizer_eval::{EngineError, RawCellValue, WorkbookEvaluator, DEFAULT_TOLERANCE};

fn engine() -> WorkbookEvaluator {
    WorkbookEvaluator::new("Sheet1")
}

#[test]
fn operator_precedence() {
    let mut wb = TestWorkbook::new();
    wb.set("Sheet1", "A1", RawCellValue::Int(2));
    wb.set("Sheet1", "A2", RawCellValue::Int(3));
    wb.set("Sheet1", "A3", RawCellValue::Int(4));
    wb.set("Sheet1", "B1", RawCellValue::Formula("=A1+A2*A3".into()));
    wb.set("Sheet1", "B2", RawCellValue::Formula("=(A1+A2)*A3".into()));

    let mut eng = engine();
    eng.load(&wb);
    let results = eng.calculate().unwrap();
    assert_eq!(results["Sheet1!B1"], CellValue::Int(14));
    assert_eq!(results["Sheet1!B2"], CellValue::Int(20));
}

#[test]
fn nested_functions_with_if() {
    let mut wb = TestWorkbook::new();
    wb.set("Sheet1", "A1", RawCellValue::Int(10));
    wb.set("Sheet1", "A2", RawCellValue::Int(20));
    wb.set("Sheet1", "A3", RawCellValue::Int(30));
    wb.set("Sheet1", "A4", RawCellValue::Int(1));
    wb.set(
        "Sheet1",
        "B1",
        RawCellValue::Formula("=ROUND(SUM(A1:A3)*IF(A4>0,1.1,1.0),2)".into()),
    );

    let mut eng = engine();
    eng.load(&wb);
    let results = eng.calculate().unwrap();
    assert_eq!(results["Sheet1!B1"], CellValue::Number(66.0));
}

#[test]
fn vlookup_exact_case_insensitive() {
    let mut wb = TestWorkbook::new();
    wb.set("Sheet1", "A1", RawCellValue::Text("Revenue".into()));
    wb.set("Sheet1", "B1", RawCellValue::Int(1000));
    wb.set("Sheet1", "A2", RawCellValue::Text("COGS".into()));
    wb.set("Sheet1", "B2", RawCellValue::Int(600));
    wb.set("Sheet1", "A3", RawCellValue::Text("OpEx".into()));
    wb.set("Sheet1", "B3", RawCellValue::Int(200));
    wb.set(
        "Sheet1",
        "C1",
        RawCellValue::Formula(r#"=VLOOKUP("cogs",A1:B3,2,FALSE)"#.into()),
    );

    let mut eng = engine();
    eng.load(&wb);
    let results = eng.calculate().unwrap();
    assert_eq!(results["Sheet1!C1"], CellValue::Int(600));
}

#[test]
fn xlookup_next_smaller() {
    let mut wb = TestWorkbook::new();
    for (i, v) in [10, 20, 30, 40, 50].into_iter().enumerate() {
        wb.set("Sheet1", &format!("A{}", i + 1), RawCellValue::Int(v));
    }
    for (i, v) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
        wb.set("Sheet1", &format!("B{}", i + 1), RawCellValue::Text(v.into()));
    }
    wb.set(
        "Sheet1",
        "C1",
        RawCellValue::Formula(r#"=XLOOKUP(35,A1:A5,B1:B5,"nope",-1)"#.into()),
    );

    let mut eng = engine();
    eng.load(&wb);
    let results = eng.calculate().unwrap();
    assert_eq!(results["Sheet1!C1"], CellValue::Text("c".into()));
}

#[test]
fn lotus_quirk_date_serial() {
    let mut wb = TestWorkbook::new();
    wb.set("Sheet1", "A1", RawCellValue::Formula("=DATE(1900,3,1)".into()));

    let mut eng = engine();
    eng.load(&wb);
    let results = eng.calculate().unwrap();
    assert_eq!(results["Sheet1!A1"], CellValue::Int(61));
}

#[test]
fn irr_and_npv_roundtrip() {
    let mut wb = TestWorkbook::new();
    wb.set("Sheet1", "A1", RawCellValue::Int(-10000));
    wb.set("Sheet1", "A2", RawCellValue::Int(3000));
    wb.set("Sheet1", "A3", RawCellValue::Int(4200));
    wb.set("Sheet1", "A4", RawCellValue::Int(6800));
    wb.set("Sheet1", "B1", RawCellValue::Formula("=IRR(A1:A4)".into()));
    wb.set("Sheet1", "B2", RawCellValue::Formula("=NPV(B1,A2:A4)+A1".into()));

    let mut eng = engine();
    eng.load(&wb);
    let results = eng.calculate().unwrap();
    let CellValue::Number(rate) = results["Sheet1!B1"] else {
        panic!("expected a numeric IRR");
    };
    assert!((rate - 0.1634).abs() < 1e-3, "rate was {rate}");
    let CellValue::Number(npv) = results["Sheet1!B2"] else {
        panic!("expected a numeric NPV check");
    };
    assert!(npv.abs() < 1e-2, "npv residual was {npv}");
}

#[test]
fn circular_reference_is_reported() {
    let mut wb = TestWorkbook::new();
    wb.set("Sheet1", "A1", RawCellValue::Formula("=B1+1".into()));
    wb.set("Sheet1", "B1", RawCellValue::Formula("=A1+1".into()));

    let mut eng = engine();
    eng.load(&wb);
    assert!(matches!(eng.calculate(), Err(EngineError::CircularReference(_))));
}

#[test]
fn recalculate_propagates_through_the_affected_subgraph_only() {
    let mut wb = TestWorkbook::new();
    wb.set("Sheet1", "A1", RawCellValue::Int(10));
    wb.set("Sheet1", "A2", RawCellValue::Int(20));
    wb.set("Sheet1", "A3", RawCellValue::Formula("=SUM(A1:A2)".into()));
    wb.set("Sheet1", "A4", RawCellValue::Formula("=A3*2".into()));

    let mut eng = engine();
    eng.load(&wb);
    eng.calculate().unwrap();

    let perturbation: HashMap<String, f64> = [("Sheet1!A1".to_string(), 15.0)].into_iter().collect();
    let recalc = eng.recalculate(perturbation, DEFAULT_TOLERANCE).unwrap();
    assert_eq!(recalc.propagated_cells, 2);
    assert_eq!(recalc.total_formula_cells, 2);
    assert_eq!(recalc.max_chain_depth, 2);

    let a3 = recalc.deltas.iter().find(|d| d.cell_ref == "Sheet1!A3").unwrap();
    assert_eq!(a3.new_value, CellValue::Int(35));
    let a4 = recalc.deltas.iter().find(|d| d.cell_ref == "Sheet1!A4").unwrap();
    assert_eq!(a4.new_value, CellValue::Int(70));
}

#[test]
fn named_range_resolves_to_range_value() {
    let mut wb = TestWorkbook::new();
    wb.set("Sheet1", "A1", RawCellValue::Int(1));
    wb.set("Sheet1", "A2", RawCellValue::Int(2));
    wb.set("Sheet1", "A3", RawCellValue::Int(3));
    wb.set("Sheet1", "B1", RawCellValue::Formula("=SUM(MyRange)".into()));
    wb.define_name("MyRange", "Sheet1!A1:A3");

    let mut eng = engine();
    eng.load(&wb);
    let results = eng.calculate().unwrap();
    assert_eq!(results["Sheet1!B1"], CellValue::Int(6));
}

#[test]
fn determinism_across_repeated_calculate_calls() {
    let mut wb = TestWorkbook::new();
    wb.set("Sheet1", "A1", RawCellValue::Int(10));
    wb.set("Sheet1", "A2", RawCellValue::Int(20));
    wb.set("Sheet1", "A3", RawCellValue::Formula("=SUM(A1:A2)".into()));

    let mut eng = engine();
    eng.load(&wb);
    let first = eng.calculate().unwrap();
    let second = eng.calculate().unwrap();
    assert_eq!(first, second);
}
