//! Orchestration coordinator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use autoflow_config::CoordinatorConfig;
use autoflow_engine::{Workflow, WorkflowEngine, WorkflowExecutionResult, WorkflowStep};
use autoflow_monitor::{
    Alert, LogEntry, MonitorStatus, OverallMetrics, RealTimeMetrics, ResourceAggregates,
    WorkflowMonitor,
};
use autoflow_protocols::{Goal, ReportSink};

use crate::analysis::{AnalysisResult, Analyzer, HealthStatus, ResourceSnapshot};
use crate::error::CoordinatorError;
use crate::pipeline::default_steps;
use crate::recommendation::{Priority, Recommendation, recommend};

const SNAPSHOT_LOG_LIMIT: usize = 100;

/// Sink key for an orchestration report.
pub fn report_key(workflow_id: &str) -> String {
    format!("orchestration-report-{}", workflow_id)
}

/// What the monitor recorded for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSnapshot {
    pub status: Option<MonitorStatus>,
    pub metrics: Option<RealTimeMetrics>,
    pub alerts: Vec<Alert>,
    pub logs: Vec<LogEntry>,
    pub aggregates: Option<ResourceAggregates>,
    pub overall: OverallMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationSummary {
    pub overall_success: bool,
    pub success_rate: f64,
    pub duration_ms: u64,
    pub resource_efficiency: f64,
    pub stability_score: f64,
    pub recommendations_count: usize,
    pub high_priority_recommendations: usize,
    pub health: HealthStatus,
}

impl OrchestrationSummary {
    fn new(analysis: &AnalysisResult, recommendations: &[Recommendation]) -> Self {
        Self {
            overall_success: analysis.execution.success,
            success_rate: analysis.execution.success_rate,
            duration_ms: analysis.execution.duration_ms,
            resource_efficiency: analysis.performance.resource_efficiency,
            stability_score: analysis.quality.stability_score,
            recommendations_count: recommendations.len(),
            high_priority_recommendations: recommendations
                .iter()
                .filter(|r| r.priority == Priority::High)
                .count(),
            health: analysis.health(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    /// The workflow record as it stood when the run ended.
    pub workflow: Workflow,
    pub execution: WorkflowExecutionResult,
    pub monitoring: MonitoringSnapshot,
    pub analysis: AnalysisResult,
    pub recommendations: Vec<Recommendation>,
    pub summary: OrchestrationSummary,
    /// Sink key the report was written under.
    pub report_key: String,
}

/// Runs a goal end to end: engine execution under monitoring, then
/// analysis, recommendations and a report.
pub struct OrchestrationCoordinator {
    engine: Arc<WorkflowEngine>,
    monitor: Arc<WorkflowMonitor>,
    sink: Arc<dyn ReportSink>,
    analyzer: Analyzer,
}

impl OrchestrationCoordinator {
    pub fn new(
        engine: Arc<WorkflowEngine>,
        monitor: Arc<WorkflowMonitor>,
        sink: Arc<dyn ReportSink>,
        config: &CoordinatorConfig,
    ) -> Self {
        Self {
            engine,
            monitor,
            sink,
            analyzer: Analyzer::new(config),
        }
    }

    pub fn engine(&self) -> &Arc<WorkflowEngine> {
        &self.engine
    }

    pub fn monitor(&self) -> &Arc<WorkflowMonitor> {
        &self.monitor
    }

    /// Run `goal` through the default pipeline.
    pub async fn run(&self, goal: Goal) -> Result<OrchestrationResult, CoordinatorError> {
        self.run_with_steps(goal, default_steps()).await
    }

    pub async fn run_with_steps(
        &self,
        goal: Goal,
        steps: Vec<WorkflowStep>,
    ) -> Result<OrchestrationResult, CoordinatorError> {
        let workflow = self.engine.create_workflow(goal, steps);
        let workflow_id = workflow.id.clone();
        info!(workflow_id = %workflow_id, steps = workflow.steps.len(), "Orchestration started");

        self.monitor.start_monitoring(&workflow_id)?;
        let execution = self.engine.execute(workflow.clone()).await;

        // The watcher may not have ticked yet; finalize now.
        if !self.monitor.observe_completion(&workflow_id).await {
            self.monitor.stop_monitoring(&workflow_id).await;
        }

        let monitoring = self.snapshot(&workflow_id);
        let resources = ResourceSnapshot::from_sources(monitoring.aggregates.as_ref(), &execution);
        let analysis = self
            .analyzer
            .analyze(&execution, &resources, monitoring.alerts.len());
        let recommendations = recommend(&analysis);
        let summary = OrchestrationSummary::new(&analysis, &recommendations);

        let workflow = self.engine.get_workflow(&workflow_id).unwrap_or(workflow);
        let key = report_key(&workflow_id);
        let result = OrchestrationResult {
            workflow,
            execution,
            monitoring,
            analysis,
            recommendations,
            summary,
            report_key: key.clone(),
        };

        let report = json!({
            "summary": result.summary,
            "workflow": result.workflow,
            "executionResult": result.execution,
            "monitoringResult": result.monitoring,
            "analysisResult": result.analysis,
            "recommendations": result.recommendations,
            "generatedAt": self.engine.clock().now().to_rfc3339(),
        });
        if let Err(e) = self.sink.write(&key, &report).await {
            warn!(
                workflow_id = %workflow_id,
                sink = self.sink.name(),
                error = %e,
                "Failed to write orchestration report"
            );
        }

        info!(
            workflow_id = %workflow_id,
            success = result.summary.overall_success,
            health = %result.summary.health,
            recommendations = result.summary.recommendations_count,
            "Orchestration finished"
        );
        Ok(result)
    }

    fn snapshot(&self, workflow_id: &str) -> MonitoringSnapshot {
        MonitoringSnapshot {
            status: self.monitor.status(workflow_id),
            metrics: self.monitor.real_time_metrics(workflow_id),
            alerts: self.monitor.alerts(Some(workflow_id)),
            logs: self.monitor.logs(workflow_id, SNAPSHOT_LOG_LIMIT),
            aggregates: self
                .monitor
                .monitoring_data(workflow_id)
                .and_then(|d| d.aggregates),
            overall: self.monitor.overall_metrics(),
        }
    }
}
