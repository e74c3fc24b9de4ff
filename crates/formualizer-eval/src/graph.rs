//! Dependency graph over canonical cell references.
//!
//! Grounded directly on `wolfxl.calc._graph.DependencyGraph`: parallel
//! forward/reverse edge maps plus a formula-text map, Kahn's algorithm
//! restricted to formula cells, and BFS-over-reverse-edges for
//! `affected_cells`/`max_depth`. Iteration order is stabilized with
//! sorted `Vec`s at every point that feeds observable output, so two
//! `topological_order()` calls on an unchanged graph agree exactly.

use std::collections::{HashMap, HashSet, VecDeque};

use formualizer_parse::all_references;

use crate::error::EngineError;

#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// cell -> set of cells it reads from.
    dependencies: HashMap<String, HashSet<String>>,
    /// cell -> set of cells that read from it.
    dependents: HashMap<String, HashSet<String>>,
    /// cell -> formula text (including leading `=`).
    pub formulas: HashMap<String, String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a formula cell and its dependencies, parsed via
    /// `all_references` against `current_sheet`.
    pub fn add_formula(&mut self, cell_ref: &str, formula: &str, current_sheet: &str) {
        self.formulas.insert(cell_ref.to_string(), formula.to_string());
        let refs = all_references(formula, current_sheet);

        let dep_set: HashSet<String> = refs.iter().cloned().collect();
        self.dependencies.insert(cell_ref.to_string(), dep_set);

        for r in refs {
            self.dependents
                .entry(r)
                .or_default()
                .insert(cell_ref.to_string());
        }
    }

    /// Kahn's algorithm restricted to formula cells; in-degree counts
    /// only dependencies that are themselves formula cells (literal
    /// cells are roots, never emitted). The zero-in-degree frontier is
    /// sorted before each round so output order is deterministic.
    pub fn topological_order(&self) -> Result<Vec<String>, EngineError> {
        let formula_cells: HashSet<&String> = self.formulas.keys().collect();
        if formula_cells.is_empty() {
            return Ok(Vec::new());
        }

        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        for cell in &formula_cells {
            let deps = self.dependencies.get(*cell);
            let count = deps
                .map(|d| d.iter().filter(|r| self.formulas.contains_key(*r)).count())
                .unwrap_or(0);
            in_degree.insert(cell.as_str(), count);
        }

        let mut frontier: Vec<&str> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&c, _)| c)
            .collect();
        frontier.sort_unstable();
        let mut queue: VecDeque<&str> = frontier.into_iter().collect();

        let mut order: Vec<String> = Vec::with_capacity(formula_cells.len());
        while let Some(cell) = queue.pop_front() {
            order.push(cell.to_string());

            let mut newly_ready: Vec<&str> = Vec::new();
            if let Some(deps) = self.dependents.get(cell) {
                for dep in deps {
                    if let Some(deg) = in_degree.get_mut(dep.as_str()) {
                        *deg -= 1;
                        if *deg == 0 {
                            newly_ready.push(dep.as_str());
                        }
                    }
                }
            }
            newly_ready.sort_unstable();
            for c in newly_ready {
                queue.push_back(c);
            }
        }

        if order.len() != formula_cells.len() {
            let produced: HashSet<&str> = order.iter().map(|s| s.as_str()).collect();
            let mut missing: Vec<String> = formula_cells
                .into_iter()
                .filter(|c| !produced.contains(c.as_str()))
                .cloned()
                .collect();
            missing.sort_unstable();
            return Err(EngineError::CircularReference(missing));
        }

        Ok(order)
    }

    /// BFS over reverse edges from `changed_cells`, restricted to
    /// formula cells, returned in topological order.
    pub fn affected_cells(&self, changed_cells: &HashSet<String>) -> Result<Vec<String>, EngineError> {
        let mut affected: HashSet<String> = HashSet::new();
        let mut visited: HashSet<String> = changed_cells.clone();
        let mut queue: VecDeque<String> = changed_cells.iter().cloned().collect();

        while let Some(cell) = queue.pop_front() {
            if let Some(deps) = self.dependents.get(&cell) {
                let mut next: Vec<&String> = deps.iter().collect();
                next.sort_unstable();
                for dep in next {
                    if !visited.contains(dep) {
                        visited.insert(dep.clone());
                        queue.push_back(dep.clone());
                        if self.formulas.contains_key(dep) {
                            affected.insert(dep.clone());
                        }
                    }
                }
            }
        }

        let full_order = self.topological_order()?;
        Ok(full_order.into_iter().filter(|c| affected.contains(c)).collect())
    }

    /// Longest dependency chain from `roots` through formula cells.
    pub fn max_depth(&self, roots: &HashSet<String>) -> usize {
        if roots.is_empty() {
            return 0;
        }

        let mut depth: HashMap<String, usize> = roots.iter().map(|r| (r.clone(), 0)).collect();
        let mut queue: VecDeque<String> = roots.iter().cloned().collect();
        let mut max_d = 0usize;

        while let Some(cell) = queue.pop_front() {
            let current_depth = depth[&cell];
            if let Some(deps) = self.dependents.get(&cell) {
                for dep in deps {
                    if self.formulas.contains_key(dep) {
                        let new_depth = current_depth + 1;
                        let improve = match depth.get(dep) {
                            Some(&d) => new_depth > d,
                            None => true,
                        };
                        if improve {
                            depth.insert(dep.clone(), new_depth);
                            max_d = max_d.max(new_depth);
                            queue.push_back(dep.clone());
                        }
                    }
                }
            }
        }

        max_d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topo_order_respects_dependencies() {
        let mut g = DependencyGraph::new();
        g.add_formula("Sheet1!A3", "=SUM(A1:A2)", "Sheet1");
        g.add_formula("Sheet1!A4", "=A3*2", "Sheet1");
        let order = g.topological_order().unwrap();
        assert_eq!(order, vec!["Sheet1!A3", "Sheet1!A4"]);
    }

    #[test]
    fn cycle_is_detected() {
        let mut g = DependencyGraph::new();
        g.add_formula("Sheet1!A1", "=B1+1", "Sheet1");
        g.add_formula("Sheet1!B1", "=A1+1", "Sheet1");
        let err = g.topological_order().unwrap_err();
        match err {
            EngineError::CircularReference(mut cells) => {
                cells.sort();
                assert_eq!(cells, vec!["Sheet1!A1", "Sheet1!B1"]);
            }
            _ => panic!("expected CircularReference"),
        }
    }

    #[test]
    fn affected_cells_is_subset_of_formula_cells_in_topo_order() {
        let mut g = DependencyGraph::new();
        g.add_formula("Sheet1!A3", "=SUM(A1:A2)", "Sheet1");
        g.add_formula("Sheet1!A4", "=A3*2", "Sheet1");
        let changed: HashSet<String> = ["Sheet1!A1".to_string()].into_iter().collect();
        let affected = g.affected_cells(&changed).unwrap();
        assert_eq!(affected, vec!["Sheet1!A3", "Sheet1!A4"]);
        assert_eq!(g.max_depth(&changed), 2);
    }
}
