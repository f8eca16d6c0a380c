//! Coordinator error types.

use thiserror::Error;

use autoflow_monitor::MonitorError;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Monitoring error: {0}")]
    Monitor(#[from] MonitorError),
}
