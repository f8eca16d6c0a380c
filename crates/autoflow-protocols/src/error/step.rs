//! Step execution errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepError {
    #[error("Step failed: {0}")]
    Failed(String),

    #[error("Invalid step input: {0}")]
    InvalidInput(String),

    #[error("Step dependency unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StepError {
    /// Shorthand for [`StepError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        StepError::Failed(message.into())
    }
}
