//! Outcome of one dispatch to the processor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a dispatch did not succeed. Both kinds go through the same retry path.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingError {
    /// No outcome arrived before the processing deadline.
    #[error("Processing timeout exceeded")]
    Timeout,

    /// The processor reported an error.
    #[error("{0}")]
    Failure(String),
}

impl ProcessingError {
    pub fn failure(reason: impl Into<String>) -> Self {
        ProcessingError::Failure(reason.into())
    }
}

/// Success carries an optional response payload.
pub type Outcome = Result<Option<serde_json::Value>, ProcessingError>;
