//! Scheduler error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid cron expression '{expr}': {message}")]
    InvalidCron { expr: String, message: String },

    #[error("Missing schedule field: {0}")]
    MissingField(String),

    #[error("Interval of {interval_ms}ms is below the minimum of {min_ms}ms")]
    IntervalTooSmall { interval_ms: u64, min_ms: u64 },

    #[error("Scheduled execution failed: {0}")]
    ExecutionFailed(String),
}
