//! Resource probe errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Resource probing unsupported: {0}")]
    Unsupported(String),

    #[error("Failed to read resource usage: {0}")]
    ReadFailed(String),
}
