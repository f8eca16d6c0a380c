//! Configuration schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub reports: ReportsConfig,

    #[serde(default)]
    pub reasoning: ReasoningConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Workflow engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Steps whose failure aborts the rest of the run.
    #[serde(default = "default_critical_steps")]
    pub critical_steps: Vec<String>,

    /// Maximum finished workflows retained in history (0 = unbounded).
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            critical_steps: default_critical_steps(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_critical_steps() -> Vec<String> {
    vec![
        "goal-analysis".to_string(),
        "project-generation".to_string(),
        "final-validation".to_string(),
    ]
}

fn default_history_limit() -> usize {
    1000
}

/// Workflow monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Resource sampling cadence.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    /// Cadence of the terminal-status check.
    #[serde(default = "default_completion_check_interval_ms")]
    pub completion_check_interval_ms: u64,

    #[serde(default = "default_memory_ceiling_mb")]
    pub memory_ceiling_mb: f64,

    #[serde(default = "default_cpu_ceiling_percent")]
    pub cpu_ceiling_percent: f64,

    #[serde(default = "default_duration_ceiling_secs")]
    pub duration_ceiling_secs: u64,

    #[serde(default = "default_error_count_ceiling")]
    pub error_count_ceiling: u32,

    /// Number of most recent log entries included in a monitoring report.
    #[serde(default = "default_report_log_limit")]
    pub report_log_limit: usize,

    /// Log entries retained per workflow (0 = unbounded).
    #[serde(default = "default_log_retention")]
    pub log_retention: usize,

    /// Finalized workflows retained, oldest evicted first (0 = unbounded).
    #[serde(default = "default_monitor_history_limit")]
    pub history_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            completion_check_interval_ms: default_completion_check_interval_ms(),
            memory_ceiling_mb: default_memory_ceiling_mb(),
            cpu_ceiling_percent: default_cpu_ceiling_percent(),
            duration_ceiling_secs: default_duration_ceiling_secs(),
            error_count_ceiling: default_error_count_ceiling(),
            report_log_limit: default_report_log_limit(),
            log_retention: default_log_retention(),
            history_limit: default_monitor_history_limit(),
        }
    }
}

impl MonitorConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn completion_check_interval(&self) -> Duration {
        Duration::from_millis(self.completion_check_interval_ms)
    }

    pub fn duration_ceiling(&self) -> Duration {
        Duration::from_secs(self.duration_ceiling_secs)
    }
}

fn default_sample_interval_ms() -> u64 {
    1000
}

fn default_completion_check_interval_ms() -> u64 {
    1000
}

fn default_memory_ceiling_mb() -> f64 {
    1000.0
}

fn default_cpu_ceiling_percent() -> f64 {
    90.0
}

fn default_duration_ceiling_secs() -> u64 {
    300
}

fn default_error_count_ceiling() -> u32 {
    5
}

fn default_report_log_limit() -> usize {
    100
}

fn default_log_retention() -> usize {
    1000
}

fn default_monitor_history_limit() -> usize {
    1000
}

/// Workflow scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Smallest accepted interval for interval schedules.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Capacity of the fire-event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_min_interval_ms() -> u64 {
    1000
}

fn default_event_capacity() -> usize {
    64
}

/// Orchestration coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Memory level that maps to zero efficiency.
    #[serde(default = "default_memory_reference_mb")]
    pub memory_reference_mb: f64,

    /// CPU level that maps to zero efficiency.
    #[serde(default = "default_cpu_reference_percent")]
    pub cpu_reference_percent: f64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            memory_reference_mb: default_memory_reference_mb(),
            cpu_reference_percent: default_cpu_reference_percent(),
        }
    }
}

fn default_memory_reference_mb() -> f64 {
    1000.0
}

fn default_cpu_reference_percent() -> f64 {
    100.0
}

/// Report sink configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Directory for JSON reports. Reports stay in memory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

/// Reasoning service configuration (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default = "default_reasoning_base_url")]
    pub base_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_reasoning_model")]
    pub model: String,

    #[serde(default = "default_reasoning_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: default_reasoning_base_url(),
            api_key: None,
            model: default_reasoning_model(),
            timeout_seconds: default_reasoning_timeout(),
        }
    }
}

fn default_reasoning_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_reasoning_model() -> String {
    "gpt-4o".to_string()
}

fn default_reasoning_timeout() -> u64 {
    60
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files. Console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.critical_steps.len(), 3);
        assert_eq!(config.monitor.sample_interval_ms, 1000);
        assert_eq!(config.monitor.memory_ceiling_mb, 1000.0);
        assert_eq!(config.monitor.cpu_ceiling_percent, 90.0);
        assert_eq!(config.monitor.duration_ceiling_secs, 300);
        assert_eq!(config.monitor.error_count_ceiling, 5);
        assert_eq!(config.scheduler.min_interval_ms, 1000);
        assert!(config.reports.directory.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_monitor_durations() {
        let config = MonitorConfig::default();
        assert_eq!(config.sample_interval(), Duration::from_secs(1));
        assert_eq!(config.completion_check_interval(), Duration::from_secs(1));
        assert_eq!(config.duration_ceiling(), Duration::from_secs(300));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.engine.critical_steps, config.engine.critical_steps);
        assert_eq!(parsed.reasoning.model, "gpt-4o");
    }
}
