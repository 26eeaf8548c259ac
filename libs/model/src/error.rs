//! Error types for attendance data parsing.

use thiserror::Error;

/// Errors that can occur when reading attendance data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The status string is neither `present` nor `absent`.
    #[error("invalid attendance status: '{0}'")]
    InvalidStatus(String),

    /// An attendance entry did not have the expected shape.
    #[error("malformed attendance entry: {0}")]
    MalformedEntry(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::MalformedEntry(err.to_string())
    }
}
