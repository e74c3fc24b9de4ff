//! The function registry: a case-insensitive map from function name to
//! callable, preloaded with the builtin catalog at evaluator
//! construction. No process-global state — each `WorkbookEvaluator` owns
//! its own registry instance, per the raw-args design note: `OFFSET`
//! needs the unresolved reference token rather than its resolved value,
//! so it is modeled as a second callable kind instead of a hidden
//! attribute on the function.

use std::collections::HashMap;

use crate::args::Value;
use crate::interpreter::Interpreter;

pub type NormalFn = fn(&[Value]) -> Value;
pub type RawFn = fn(&[String], &Interpreter, &str) -> Value;

#[derive(Clone, Copy)]
pub enum Callable {
    Normal(NormalFn),
    Raw(RawFn),
}

pub struct FunctionRegistry {
    functions: HashMap<String, Callable>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            functions: HashMap::new(),
        };
        crate::builtins::register_all(&mut reg);
        reg
    }

    pub fn register(&mut self, name: &str, callable: Callable) {
        self.functions.insert(name.to_ascii_uppercase(), callable);
    }

    pub fn get(&self, name: &str) -> Option<Callable> {
        self.functions.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn has(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_ascii_uppercase())
    }

    pub fn supported_functions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
