//! Reasoning service errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("Reasoning service unavailable: {0}")]
    Unavailable(String),

    #[error("Reasoning request failed: {0}")]
    Request(String),

    #[error("Invalid reasoning response: {0}")]
    InvalidResponse(String),
}
