//! Engine errors shared across every wallet operation.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("{0} not found: id {1}")]
    NotFound(&'static str, u64),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("insufficient balance: {requested:.0} requested, {available:.0} available")]
    InsufficientBalance { requested: f64, available: f64 },
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }
}
