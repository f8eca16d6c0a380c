//! Report sink errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Report serialization failed: {0}")]
    Serialization(String),

    #[error("Report rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialization(err.to_string())
    }
}
