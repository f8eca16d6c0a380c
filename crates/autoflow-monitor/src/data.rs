//! Per-workflow monitoring records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use autoflow_protocols::ResourceReading;

use crate::alerts::Alert;

/// One resource observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSample {
    pub timestamp: DateTime<Utc>,
    pub memory_mb: f64,
    pub cpu_percent: f64,
}

impl MonitoringSample {
    pub fn new(timestamp: DateTime<Utc>, reading: &ResourceReading) -> Self {
        Self {
            timestamp,
            memory_mb: reading.memory_mb,
            cpu_percent: reading.cpu_percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub workflow_id: String,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl LogEntry {
    pub fn new(
        workflow_id: impl Into<String>,
        level: LogLevel,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            level,
            message: message.into(),
            timestamp,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Monitoring state. Cancelled workflows are reported as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitoringStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for MonitoringStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MonitoringStatus::Running => "running",
            MonitoringStatus::Completed => "completed",
            MonitoringStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Mean and peak usage over the full sample series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceAggregates {
    pub sample_count: usize,
    pub average_memory_mb: f64,
    pub max_memory_mb: f64,
    pub average_cpu_percent: f64,
    pub max_cpu_percent: f64,
}

impl ResourceAggregates {
    pub fn from_samples(samples: &[MonitoringSample]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let n = samples.len() as f64;
        Self {
            sample_count: samples.len(),
            average_memory_mb: samples.iter().map(|s| s.memory_mb).sum::<f64>() / n,
            max_memory_mb: samples.iter().map(|s| s.memory_mb).fold(f64::MIN, f64::max),
            average_cpu_percent: samples.iter().map(|s| s.cpu_percent).sum::<f64>() / n,
            max_cpu_percent: samples.iter().map(|s| s.cpu_percent).fold(f64::MIN, f64::max),
        }
    }
}

/// Everything the monitor knows about one workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowMonitoringData {
    pub workflow_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: MonitoringStatus,
    pub samples: Vec<MonitoringSample>,
    pub alerts: Vec<Alert>,
    pub logs: Vec<LogEntry>,
    /// Errors reported through `record_error`.
    pub recorded_errors: u32,
    /// Warnings reported through `record_warning`.
    pub recorded_warnings: u32,
    /// Failed steps last observed on the workflow.
    pub step_errors: u32,
    /// Degraded steps last observed on the workflow.
    pub step_warnings: u32,
    /// Computed once at finalization.
    pub aggregates: Option<ResourceAggregates>,
}

impl WorkflowMonitoringData {
    pub fn new(workflow_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            started_at,
            ended_at: None,
            status: MonitoringStatus::Running,
            samples: Vec::new(),
            alerts: Vec::new(),
            logs: Vec::new(),
            recorded_errors: 0,
            recorded_warnings: 0,
            step_errors: 0,
            step_warnings: 0,
            aggregates: None,
        }
    }

    pub fn error_count(&self) -> u32 {
        self.recorded_errors + self.step_errors
    }

    pub fn warning_count(&self) -> u32 {
        self.recorded_warnings + self.step_warnings
    }

    pub fn is_finalized(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Time monitored so far, or in total once finalized.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let end = self.ended_at.unwrap_or(now);
        (end - self.started_at).max(Duration::zero())
    }

    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        self.elapsed(now).num_milliseconds().max(0) as u64
    }

    pub fn latest_sample(&self) -> Option<&MonitoringSample> {
        self.samples.last()
    }

    pub(crate) fn log(&mut self, level: LogLevel, message: impl Into<String>, at: DateTime<Utc>) {
        let entry = LogEntry::new(self.workflow_id.clone(), level, message, at);
        self.logs.push(entry);
    }

    /// Drop the oldest log entries beyond `limit` (0 keeps everything).
    pub(crate) fn trim_logs(&mut self, limit: usize) {
        if limit > 0 && self.logs.len() > limit {
            let excess = self.logs.len() - limit;
            self.logs.drain(..excess);
        }
    }
}
