//! Read-only projections over monitoring data.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::Alert;
use crate::data::{MonitoringStatus, WorkflowMonitoringData};

/// Relative change within this band is reported as stable.
const STABLE_BAND: f64 = 0.05;

/// How many unacknowledged alerts the dashboard shows.
const DASHBOARD_ALERT_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub workflow_id: String,
    pub status: MonitoringStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
    pub memory_mb: f64,
    pub cpu_percent: f64,
    pub error_count: u32,
    pub warning_count: u32,
    pub sample_count: usize,
}

impl MonitorStatus {
    pub(crate) fn from_data(data: &WorkflowMonitoringData, now: DateTime<Utc>) -> Self {
        let latest = data.latest_sample();
        Self {
            workflow_id: data.workflow_id.clone(),
            status: data.status,
            started_at: data.started_at,
            ended_at: data.ended_at,
            elapsed_ms: data.elapsed_ms(now),
            memory_mb: latest.map(|s| s.memory_mb).unwrap_or(0.0),
            cpu_percent: latest.map(|s| s.cpu_percent).unwrap_or(0.0),
            error_count: data.error_count(),
            warning_count: data.warning_count(),
            sample_count: data.samples.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealTimeMetrics {
    pub workflow_id: String,
    pub timestamp: DateTime<Utc>,
    pub memory_mb: f64,
    pub cpu_percent: f64,
    pub elapsed_ms: u64,
    pub error_count: u32,
    pub warning_count: u32,
    pub status: MonitoringStatus,
}

impl RealTimeMetrics {
    pub(crate) fn from_data(data: &WorkflowMonitoringData, now: DateTime<Utc>) -> Self {
        let latest = data.latest_sample();
        Self {
            workflow_id: data.workflow_id.clone(),
            timestamp: now,
            memory_mb: latest.map(|s| s.memory_mb).unwrap_or(0.0),
            cpu_percent: latest.map(|s| s.cpu_percent).unwrap_or(0.0),
            elapsed_ms: data.elapsed_ms(now),
            error_count: data.error_count(),
            warning_count: data.warning_count(),
            status: data.status,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub memory_mb: f64,
    pub cpu_percent: f64,
}

impl ResourceUsage {
    /// Mean over every sample of every workflow.
    fn across<'a>(all: impl Iterator<Item = &'a WorkflowMonitoringData>) -> Self {
        let mut count = 0usize;
        let mut memory = 0.0;
        let mut cpu = 0.0;
        for sample in all.flat_map(|d| d.samples.iter()) {
            count += 1;
            memory += sample.memory_mb;
            cpu += sample.cpu_percent;
        }
        if count == 0 {
            return Self::default();
        }
        Self {
            memory_mb: memory / count as f64,
            cpu_percent: cpu / count as f64,
        }
    }
}

/// Aggregate across all tracked workflows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallMetrics {
    pub total_workflows: usize,
    pub active_workflows: usize,
    pub successful_workflows: usize,
    pub failed_workflows: usize,
    pub average_duration_ms: f64,
    /// Successful workflows over all tracked workflows.
    pub average_success_rate: f64,
    pub resource_usage: ResourceUsage,
}

impl OverallMetrics {
    pub(crate) fn compute(all: &[&WorkflowMonitoringData], now: DateTime<Utc>) -> Self {
        let total = all.len();
        let successful = count_status(all, MonitoringStatus::Completed);
        let failed = count_status(all, MonitoringStatus::Failed);
        let (average_duration_ms, average_success_rate) = if total == 0 {
            (0.0, 0.0)
        } else {
            let durations: u64 = all.iter().map(|d| d.elapsed_ms(now)).sum();
            (
                durations as f64 / total as f64,
                successful as f64 / total as f64,
            )
        };

        Self {
            total_workflows: total,
            active_workflows: count_status(all, MonitoringStatus::Running),
            successful_workflows: successful,
            failed_workflows: failed,
            average_duration_ms,
            average_success_rate,
            resource_usage: ResourceUsage::across(all.iter().copied()),
        }
    }
}

fn count_status(all: &[&WorkflowMonitoringData], status: MonitoringStatus) -> usize {
    all.iter().filter(|d| d.status == status).count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub metric: String,
    /// Mean over the whole series.
    pub current: f64,
    pub direction: TrendDirection,
    /// Relative change of the newer half against the older half.
    pub change: f64,
}

impl Trend {
    /// Compare the mean of the newer half of `series` with the older half.
    /// `series` is ordered oldest first.
    pub fn from_series(metric: impl Into<String>, series: &[f64]) -> Self {
        let current = mean(series);
        if series.len() < 2 {
            return Self {
                metric: metric.into(),
                current,
                direction: TrendDirection::Stable,
                change: 0.0,
            };
        }

        let mid = series.len() / 2;
        let older = mean(&series[..mid]);
        let newer = mean(&series[mid..]);
        let change = if older.abs() < f64::EPSILON {
            if newer.abs() < f64::EPSILON { 0.0 } else { newer.signum() }
        } else {
            (newer - older) / older.abs()
        };
        let direction = if change > STABLE_BAND {
            TrendDirection::Up
        } else if change < -STABLE_BAND {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        };

        Self {
            metric: metric.into(),
            current,
            direction,
            change,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardOverview {
    pub total_workflows: usize,
    pub active_workflows: usize,
    pub successful_workflows: usize,
    pub failed_workflows: usize,
    pub average_duration_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub workflow_id: String,
    pub status: MonitoringStatus,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub overview: DashboardOverview,
    /// Workflows started in the last 24 hours, oldest first.
    pub recent_activity: Vec<ActivityEntry>,
    /// Most recent unacknowledged alerts.
    pub alerts: Vec<Alert>,
    pub resource_usage: ResourceUsage,
    pub trends: Vec<Trend>,
}

impl DashboardSnapshot {
    pub(crate) fn compute(
        all: &[&WorkflowMonitoringData],
        alerts: &[Alert],
        now: DateTime<Utc>,
    ) -> Self {
        let mut ordered: Vec<&WorkflowMonitoringData> = all.to_vec();
        ordered.sort_by_key(|d| d.started_at);

        let overall = OverallMetrics::compute(&ordered, now);
        let since = now - Duration::hours(24);

        let recent_activity = ordered
            .iter()
            .filter(|d| d.started_at >= since)
            .map(|d| ActivityEntry {
                workflow_id: d.workflow_id.clone(),
                status: d.status,
                started_at: d.started_at,
                elapsed_ms: d.elapsed_ms(now),
            })
            .collect();

        let unacknowledged: Vec<&Alert> = alerts.iter().filter(|a| !a.acknowledged).collect();
        let skip = unacknowledged.len().saturating_sub(DASHBOARD_ALERT_LIMIT);
        let alerts = unacknowledged.into_iter().skip(skip).cloned().collect();

        let mut trends = Vec::new();
        if ordered.len() > 1 {
            let durations: Vec<f64> = ordered.iter().map(|d| d.elapsed_ms(now) as f64).collect();
            trends.push(Trend::from_series("execution_time", &durations));
        }
        if !ordered.is_empty() {
            let outcomes: Vec<f64> = ordered
                .iter()
                .filter(|d| d.status != MonitoringStatus::Running)
                .map(|d| if d.status == MonitoringStatus::Completed { 1.0 } else { 0.0 })
                .collect();
            let mut trend = Trend::from_series("success_rate", &outcomes);
            trend.current = overall.average_success_rate;
            trends.push(trend);
        }

        Self {
            generated_at: now,
            overview: DashboardOverview {
                total_workflows: overall.total_workflows,
                active_workflows: overall.active_workflows,
                successful_workflows: overall.successful_workflows,
                failed_workflows: overall.failed_workflows,
                average_duration_ms: overall.average_duration_ms,
            },
            recent_activity,
            alerts,
            resource_usage: overall.resource_usage,
            trends,
        }
    }
}
