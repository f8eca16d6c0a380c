//! Static threshold checks.

use chrono::Duration;

use autoflow_config::MonitorConfig;
use autoflow_protocols::ResourceReading;

use crate::alerts::AlertKind;

#[derive(Debug, Clone)]
pub struct Thresholds {
    pub memory_ceiling_mb: f64,
    pub cpu_ceiling_percent: f64,
    pub duration_ceiling: Duration,
    pub error_count_ceiling: u32,
}

impl Thresholds {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            memory_ceiling_mb: config.memory_ceiling_mb,
            cpu_ceiling_percent: config.cpu_ceiling_percent,
            duration_ceiling: Duration::seconds(config.duration_ceiling_secs as i64),
            error_count_ceiling: config.error_count_ceiling,
        }
    }

    /// Every threshold breached by this tick. All comparisons are strict.
    pub fn check(
        &self,
        reading: &ResourceReading,
        elapsed: Duration,
        error_count: u32,
    ) -> Vec<AlertKind> {
        let mut breached = Vec::new();
        if reading.memory_mb > self.memory_ceiling_mb {
            breached.push(AlertKind::HighMemoryUsage);
        }
        if reading.cpu_percent > self.cpu_ceiling_percent {
            breached.push(AlertKind::HighCpuUsage);
        }
        if elapsed > self.duration_ceiling {
            breached.push(AlertKind::LongExecution);
        }
        if error_count > self.error_count_ceiling {
            breached.push(AlertKind::HighErrorCount);
        }
        breached
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from_config(&MonitorConfig::default())
    }
}
