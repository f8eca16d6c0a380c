//! # AutoFlow Monitor
//!
//! Observes running workflows: samples resource usage on a fixed cadence,
//! raises alerts when thresholds are breached, keeps per-workflow logs and
//! emits a monitoring report once the workflow reaches a terminal state.
//!
//! Cross-workflow views ([`OverallMetrics`], [`DashboardSnapshot`]) are
//! derived on demand from the tracked data.

mod alert_manager;
mod alerts;
mod data;
mod error;
mod monitor;
mod report;
mod thresholds;
mod views;

pub use alert_manager::AlertManager;
pub use alerts::{Alert, AlertChannel, AlertKind, AlertSeverity, LogChannel};
pub use data::{
    LogEntry, LogLevel, MonitoringSample, MonitoringStatus, ResourceAggregates,
    WorkflowMonitoringData,
};
pub use error::MonitorError;
pub use monitor::WorkflowMonitor;
pub use report::{monitoring_report, report_key};
pub use thresholds::Thresholds;
pub use views::{
    ActivityEntry, DashboardOverview, DashboardSnapshot, MonitorStatus, OverallMetrics,
    RealTimeMetrics, ResourceUsage, Trend, TrendDirection,
};
