//! Workflow monitor.
//!
//! Each monitored workflow gets two background loops sharing one
//! cancellation token: a sampler that records resource usage and runs the
//! threshold checks, and a watcher that finalizes the workflow once the
//! engine reports a terminal state. The monitor never mutates workflow
//! records; it only reads their status.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::json;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use autoflow_config::MonitorConfig;
use autoflow_engine::{ProcessProbe, WorkflowState, WorkflowStatusProvider};
use autoflow_protocols::{Clock, ReportSink, ResourceProbe, ResourceReading, SystemClock};

use crate::alert_manager::AlertManager;
use crate::alerts::{Alert, AlertChannel, AlertSeverity};
use crate::data::{
    LogEntry, LogLevel, MonitoringSample, MonitoringStatus, ResourceAggregates,
    WorkflowMonitoringData,
};
use crate::error::MonitorError;
use crate::report::{monitoring_report, report_key};
use crate::thresholds::Thresholds;
use crate::views::{DashboardSnapshot, MonitorStatus, OverallMetrics, RealTimeMetrics};

pub struct WorkflowMonitor {
    config: MonitorConfig,
    thresholds: Thresholds,
    workflows: Arc<dyn WorkflowStatusProvider>,
    sink: Arc<dyn ReportSink>,
    probe: Arc<dyn ResourceProbe>,
    clock: Arc<dyn Clock>,
    alert_manager: AlertManager,
    data: RwLock<HashMap<String, WorkflowMonitoringData>>,
    alerts: RwLock<Vec<Alert>>,
    loops: Mutex<HashMap<String, CancellationToken>>,
    shutdown: CancellationToken,
}

impl WorkflowMonitor {
    pub fn new(
        config: MonitorConfig,
        workflows: Arc<dyn WorkflowStatusProvider>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            thresholds: Thresholds::from_config(&config),
            config,
            workflows,
            sink,
            probe: Arc::new(ProcessProbe::new()),
            clock: Arc::new(SystemClock),
            alert_manager: AlertManager::new(),
            data: RwLock::new(HashMap::new()),
            alerts: RwLock::new(Vec::new()),
            loops: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn ResourceProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Add an alert channel next to the built-in log channel.
    pub fn with_alert_channel(mut self, channel: Arc<dyn AlertChannel>) -> Self {
        self.alert_manager.add_channel(channel);
        self
    }

    /// Begin monitoring a workflow.
    ///
    /// Monitoring a workflow again after it was finalized (e.g. after a
    /// restart) replaces the earlier data.
    pub fn start_monitoring(self: &Arc<Self>, workflow_id: &str) -> Result<(), MonitorError> {
        let now = self.clock.now();
        {
            let mut data = self.data.write();
            if data.get(workflow_id).is_some_and(|d| !d.is_finalized()) {
                return Err(MonitorError::AlreadyMonitoring(workflow_id.to_string()));
            }
            let mut entry = WorkflowMonitoringData::new(workflow_id, now);
            entry.log(LogLevel::Info, "Monitoring started", now);
            data.insert(workflow_id.to_string(), entry);
        }

        let token = self.shutdown.child_token();
        self.loops
            .lock()
            .insert(workflow_id.to_string(), token.clone());

        self.spawn_sampler(workflow_id.to_string(), token.clone());
        self.spawn_watcher(workflow_id.to_string(), token);

        info!(
            workflow_id = %workflow_id,
            sample_interval_ms = self.config.sample_interval_ms,
            "Workflow monitoring started"
        );
        Ok(())
    }

    fn spawn_sampler(self: &Arc<Self>, workflow_id: String, token: CancellationToken) {
        let this = self.clone();
        let period = nonzero(self.config.sample_interval());

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => this.sample_tick(&workflow_id).await,
                }
            }
            debug!(workflow_id = %workflow_id, "Sampler stopped");
        });
    }

    fn spawn_watcher(self: &Arc<Self>, workflow_id: String, token: CancellationToken) {
        let this = self.clone();
        let period = nonzero(self.config.completion_check_interval());

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if this.observe_completion(&workflow_id).await {
                            break;
                        }
                    }
                }
            }
            debug!(workflow_id = %workflow_id, "Completion watcher stopped");
        });
    }

    async fn sample_tick(&self, workflow_id: &str) {
        match self.probe.sample() {
            Ok(reading) => {
                if let Err(e) = self.record_sample(workflow_id, reading).await {
                    debug!(workflow_id = %workflow_id, error = %e, "Sample dropped");
                }
            }
            Err(e) => {
                warn!(workflow_id = %workflow_id, error = %e, "Resource sampling failed, skipping tick");
                let now = self.clock.now();
                if let Some(entry) = self.data.write().get_mut(workflow_id) {
                    entry.log(LogLevel::Warning, format!("Resource sampling failed: {}", e), now);
                }
            }
        }
    }

    /// Append one sample, run the threshold checks and dispatch any alerts.
    ///
    /// Returns the alerts raised by this sample. Samples arriving after
    /// finalization are ignored.
    pub async fn record_sample(
        &self,
        workflow_id: &str,
        reading: ResourceReading,
    ) -> Result<Vec<Alert>, MonitorError> {
        let status = self.workflows.workflow_status(workflow_id);
        let now = self.clock.now();

        let raised = {
            let mut data = self.data.write();
            let entry = data
                .get_mut(workflow_id)
                .ok_or_else(|| MonitorError::NotMonitored(workflow_id.to_string()))?;
            if entry.is_finalized() {
                return Ok(Vec::new());
            }

            if let Some(status) = &status {
                entry.step_errors = status.failed_steps as u32;
                entry.step_warnings = status.degraded_steps as u32;
            }
            entry.samples.push(MonitoringSample::new(now, &reading));

            let elapsed = entry.elapsed(now);
            let raised: Vec<Alert> = self
                .thresholds
                .check(&reading, elapsed, entry.error_count())
                .into_iter()
                .map(|kind| Alert::new(workflow_id, kind, now))
                .collect();

            for alert in &raised {
                let level = match alert.severity {
                    AlertSeverity::Info => LogLevel::Info,
                    AlertSeverity::Warning => LogLevel::Warning,
                    AlertSeverity::Error => LogLevel::Error,
                };
                entry.log(level, format!("Alert {}: {}", alert.kind, alert.message), now);
                entry.alerts.push(alert.clone());
            }

            let running = LogEntry::new(
                workflow_id,
                LogLevel::Info,
                format!("Workflow {} is running", workflow_id),
                now,
            )
            .with_metadata(json!({
                "elapsedMs": entry.elapsed_ms(now),
                "memoryMb": reading.memory_mb,
                "cpuPercent": reading.cpu_percent,
                "errorCount": entry.error_count(),
                "warningCount": entry.warning_count(),
            }));
            entry.logs.push(running);
            entry.trim_logs(self.config.log_retention);

            raised
        };

        if !raised.is_empty() {
            self.alerts.write().extend(raised.iter().cloned());
            for alert in &raised {
                self.alert_manager.send(alert).await;
            }
        }

        Ok(raised)
    }

    /// Finalize the workflow if the engine reports it terminal.
    ///
    /// Returns true once the workflow is terminal; finalization itself
    /// happens only on the first such call.
    pub async fn observe_completion(&self, workflow_id: &str) -> bool {
        let Some(status) = self.workflows.workflow_status(workflow_id) else {
            return false;
        };
        if !status.status.is_terminal() {
            return false;
        }

        let outcome = match status.status {
            WorkflowState::Completed => MonitoringStatus::Completed,
            _ => MonitoringStatus::Failed,
        };
        self.finalize(
            workflow_id,
            outcome,
            Some((status.failed_steps as u32, status.degraded_steps as u32)),
        )
        .await;
        true
    }

    /// Stop the loops and finalize now. Returns false if the workflow is
    /// not monitored or already finalized.
    pub async fn stop_monitoring(&self, workflow_id: &str) -> bool {
        let status = self.workflows.workflow_status(workflow_id);
        let outcome = match status.as_ref().map(|s| s.status) {
            Some(WorkflowState::Completed) => MonitoringStatus::Completed,
            _ => MonitoringStatus::Failed,
        };
        let counts = status.map(|s| (s.failed_steps as u32, s.degraded_steps as u32));
        self.finalize(workflow_id, outcome, counts).await
    }

    async fn finalize(
        &self,
        workflow_id: &str,
        outcome: MonitoringStatus,
        step_counts: Option<(u32, u32)>,
    ) -> bool {
        let now = self.clock.now();

        let report = {
            let mut data = self.data.write();
            let Some(entry) = data.get_mut(workflow_id) else {
                return false;
            };
            if entry.is_finalized() {
                return false;
            }

            if let Some((errors, warnings)) = step_counts {
                entry.step_errors = errors;
                entry.step_warnings = warnings;
            }
            entry.ended_at = Some(now);
            entry.status = outcome;
            entry.aggregates = Some(ResourceAggregates::from_samples(&entry.samples));
            entry.log(
                LogLevel::Info,
                format!("Monitoring finalized with status {}", outcome),
                now,
            );
            entry.trim_logs(self.config.log_retention);
            let report = monitoring_report(entry, self.config.report_log_limit, now);

            let evicted = evict_finalized(&mut data, self.config.history_limit);
            if !evicted.is_empty() {
                self.alerts
                    .write()
                    .retain(|a| !evicted.contains(&a.workflow_id));
                debug!(evicted = evicted.len(), "Evicted finalized monitoring data");
            }
            report
        };

        if let Some(token) = self.loops.lock().remove(workflow_id) {
            token.cancel();
        }

        let key = report_key(workflow_id);
        if let Err(e) = self.sink.write(&key, &report).await {
            warn!(
                workflow_id = %workflow_id,
                sink = self.sink.name(),
                error = %e,
                "Failed to write monitoring report"
            );
        }

        info!(workflow_id = %workflow_id, status = %outcome, "Workflow monitoring finalized");
        true
    }

    /// Count an error against the workflow. Returns false if not monitored.
    pub fn record_error(&self, workflow_id: &str, message: &str) -> bool {
        self.record_issue(workflow_id, LogLevel::Error, message)
    }

    /// Count a warning against the workflow. Returns false if not monitored.
    pub fn record_warning(&self, workflow_id: &str, message: &str) -> bool {
        self.record_issue(workflow_id, LogLevel::Warning, message)
    }

    fn record_issue(&self, workflow_id: &str, level: LogLevel, message: &str) -> bool {
        let now = self.clock.now();
        let mut data = self.data.write();
        let Some(entry) = data.get_mut(workflow_id) else {
            return false;
        };
        match level {
            LogLevel::Error => entry.recorded_errors += 1,
            _ => entry.recorded_warnings += 1,
        }
        entry.log(level, message, now);
        entry.trim_logs(self.config.log_retention);
        true
    }

    pub fn status(&self, workflow_id: &str) -> Option<MonitorStatus> {
        let now = self.clock.now();
        self.data
            .read()
            .get(workflow_id)
            .map(|d| MonitorStatus::from_data(d, now))
    }

    pub fn real_time_metrics(&self, workflow_id: &str) -> Option<RealTimeMetrics> {
        let now = self.clock.now();
        self.data
            .read()
            .get(workflow_id)
            .map(|d| RealTimeMetrics::from_data(d, now))
    }

    /// Alerts for one workflow, or all alerts, in creation order.
    pub fn alerts(&self, workflow_id: Option<&str>) -> Vec<Alert> {
        let alerts = self.alerts.read();
        match workflow_id {
            Some(id) => alerts.iter().filter(|a| a.workflow_id == id).cloned().collect(),
            None => alerts.clone(),
        }
    }

    /// Acknowledge an alert. True on the first call, false if it was
    /// already acknowledged or does not exist.
    pub fn acknowledge_alert(&self, alert_id: &str) -> bool {
        let now = self.clock.now();
        let workflow_id = {
            let mut alerts = self.alerts.write();
            let Some(alert) = alerts.iter_mut().find(|a| a.id == alert_id) else {
                return false;
            };
            if !alert.acknowledge(now) {
                return false;
            }
            alert.workflow_id.clone()
        };

        if let Some(entry) = self.data.write().get_mut(&workflow_id) {
            if let Some(alert) = entry.alerts.iter_mut().find(|a| a.id == alert_id) {
                alert.acknowledge(now);
            }
        }

        info!(alert_id = %alert_id, workflow_id = %workflow_id, "Alert acknowledged");
        true
    }

    /// The most recent `limit` log entries, oldest first.
    pub fn logs(&self, workflow_id: &str, limit: usize) -> Vec<LogEntry> {
        let data = self.data.read();
        let Some(entry) = data.get(workflow_id) else {
            return Vec::new();
        };
        let skip = entry.logs.len().saturating_sub(limit);
        entry.logs.iter().skip(skip).cloned().collect()
    }

    pub fn overall_metrics(&self) -> OverallMetrics {
        let now = self.clock.now();
        let data = self.data.read();
        let all: Vec<&WorkflowMonitoringData> = data.values().collect();
        OverallMetrics::compute(&all, now)
    }

    pub fn dashboard_snapshot(&self) -> DashboardSnapshot {
        let now = self.clock.now();
        let data = self.data.read();
        let all: Vec<&WorkflowMonitoringData> = data.values().collect();
        let alerts = self.alerts.read();
        DashboardSnapshot::compute(&all, &alerts, now)
    }

    /// Full copy of the monitoring data for a workflow.
    pub fn monitoring_data(&self, workflow_id: &str) -> Option<WorkflowMonitoringData> {
        self.data.read().get(workflow_id).cloned()
    }

    /// Whether the background loops are running for the workflow.
    pub fn is_monitoring(&self, workflow_id: &str) -> bool {
        self.loops.lock().contains_key(workflow_id)
    }

    /// Stop every background loop. Data stays queryable.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.loops.lock().clear();
        info!("Workflow monitor shut down");
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }
}

/// Remove the oldest finalized entries beyond `limit`. Returns their ids.
fn evict_finalized(data: &mut HashMap<String, WorkflowMonitoringData>, limit: usize) -> Vec<String> {
    if limit == 0 {
        return Vec::new();
    }
    let mut finalized: Vec<(String, chrono::DateTime<chrono::Utc>)> = data
        .values()
        .filter_map(|d| d.ended_at.map(|ended| (d.workflow_id.clone(), ended)))
        .collect();
    if finalized.len() <= limit {
        return Vec::new();
    }

    finalized.sort_by(|a, b| a.1.cmp(&b.1));
    let excess = finalized.len() - limit;
    finalized
        .into_iter()
        .take(excess)
        .map(|(id, _)| {
            data.remove(&id);
            id
        })
        .collect()
}

fn nonzero(period: Duration) -> Duration {
    if period.is_zero() {
        Duration::from_millis(1)
    } else {
        period
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
