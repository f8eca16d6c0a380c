//! Alert types and the alert channel trait.

#[cfg(test)]
#[path = "alerts_tests.rs"]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::MonitorError;

/// Alert severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "INFO"),
            AlertSeverity::Warning => write!(f, "WARNING"),
            AlertSeverity::Error => write!(f, "ERROR"),
        }
    }
}

/// Threshold that raised an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighMemoryUsage,
    HighCpuUsage,
    LongExecution,
    HighErrorCount,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::HighMemoryUsage => "high_memory_usage",
            AlertKind::HighCpuUsage => "high_cpu_usage",
            AlertKind::LongExecution => "long_execution",
            AlertKind::HighErrorCount => "high_error_count",
        }
    }

    pub fn severity(&self) -> AlertSeverity {
        match self {
            AlertKind::HighMemoryUsage | AlertKind::HighCpuUsage => AlertSeverity::Warning,
            AlertKind::LongExecution => AlertSeverity::Info,
            AlertKind::HighErrorCount => AlertSeverity::Error,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AlertKind::HighMemoryUsage => "High memory usage detected",
            AlertKind::HighCpuUsage => "High CPU usage detected",
            AlertKind::LongExecution => "Workflow execution taking longer than expected",
            AlertKind::HighErrorCount => "High error count detected",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raised alert. Only the acknowledgement fields ever change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub workflow_id: String,
    pub kind: AlertKind,
    pub message: String,
    pub severity: AlertSeverity,
    pub created_at: DateTime<Utc>,
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Create an alert for `kind` with its default message and severity.
    pub fn new(workflow_id: impl Into<String>, kind: AlertKind, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            kind,
            message: kind.message().to_string(),
            severity: kind.severity(),
            created_at,
            acknowledged: false,
            acknowledged_at: None,
        }
    }

    /// Mark acknowledged. Returns false if it already was.
    pub fn acknowledge(&mut self, at: DateTime<Utc>) -> bool {
        if self.acknowledged {
            return false;
        }
        self.acknowledged = true;
        self.acknowledged_at = Some(at);
        true
    }

    /// Format for text output.
    pub fn format_text(&self) -> String {
        format!(
            "[{}] {} - {} ({}): {}",
            self.severity,
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.kind,
            self.workflow_id,
            self.message
        )
    }
}

/// Alert channel trait.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Channel name.
    fn name(&self) -> &str;

    /// Send an alert.
    async fn send(&self, alert: &Alert) -> Result<(), MonitorError>;
}

/// Log channel (writes to tracing).
pub struct LogChannel;

#[async_trait]
impl AlertChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, alert: &Alert) -> Result<(), MonitorError> {
        match alert.severity {
            AlertSeverity::Info => info!(
                workflow_id = %alert.workflow_id,
                alert_id = %alert.id,
                "[ALERT] {}: {}", alert.kind, alert.message
            ),
            AlertSeverity::Warning => warn!(
                workflow_id = %alert.workflow_id,
                alert_id = %alert.id,
                "[ALERT] {}: {}", alert.kind, alert.message
            ),
            AlertSeverity::Error => error!(
                workflow_id = %alert.workflow_id,
                alert_id = %alert.id,
                "[ALERT] {}: {}", alert.kind, alert.message
            ),
        }
        Ok(())
    }
}
