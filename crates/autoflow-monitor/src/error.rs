//! Monitor errors.

use thiserror::Error;

/// Monitor error types.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No monitoring data exists for the workflow.
    #[error("Workflow is not monitored: {0}")]
    NotMonitored(String),

    /// Monitoring loops are already running for the workflow.
    #[error("Workflow is already monitored: {0}")]
    AlreadyMonitoring(String),

    /// Alert delivery failed.
    #[error("Alert delivery via {channel} failed: {message}")]
    AlertDelivery { channel: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_error_display() {
        let err = MonitorError::NotMonitored("wf-1".to_string());
        assert_eq!(err.to_string(), "Workflow is not monitored: wf-1");

        let err = MonitorError::AlertDelivery {
            channel: "webhook".to_string(),
            message: "timeout".to_string(),
        };
        assert!(err.to_string().contains("webhook"));
        assert!(err.to_string().contains("timeout"));
    }
}
