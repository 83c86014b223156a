// src/error.rs

//! Engine error model.

use thiserror::Error;

use crate::model::item::ItemId;

/// Result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures the quantitative core reports instead of silently clamping.
///
/// Zero demand, zero budget and empty capacity are valid business states and
/// never show up here; they produce neutral results.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A probability or confidence level outside the open interval (0, 1).
    #[error("probability must lie strictly between 0 and 1, got {0}")]
    InvalidProbability(f64),

    /// An input record failed boundary validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An item id was not present in the lookup table.
    #[error("unknown item id {0}")]
    UnknownItem(ItemId),

    /// A sampling distribution could not be constructed.
    #[error("invalid distribution: {0}")]
    Distribution(String),

    /// Writing a report failed.
    #[error("report output failed: {0}")]
    Report(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn distribution(msg: impl Into<String>) -> Self {
        Self::Distribution(msg.into())
    }

    pub fn report(msg: impl Into<String>) -> Self {
        Self::Report(msg.into())
    }
}

impl From<csv::Error> for EngineError {
    fn from(err: csv::Error) -> Self {
        Self::Report(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Report(err.to_string())
    }
}
