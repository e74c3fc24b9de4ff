//! Engine control errors — the category that aborts the current top-level
//! call, as opposed to the in-band `ExcelError` values that flow through
//! formula results.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("load() must be called before calculate()/recalculate()")]
    NotLoaded,

    #[error("circular reference detected involving: {0:?}")]
    CircularReference(Vec<String>),

    #[error("invalid reference: {0}")]
    InvalidReference(String),
}
