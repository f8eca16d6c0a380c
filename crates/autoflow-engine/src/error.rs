//! Engine errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Step executor already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Step executor not registered: {0}")]
    NotRegistered(String),
}
