//! End-to-end orchestration runs across engine, monitor and coordinator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use autoflow_config::{CoordinatorConfig, EngineConfig, MonitorConfig};
use autoflow_coordinator::{
    Bottleneck, DEFAULT_PIPELINE, HealthStatus, OrchestrationCoordinator, RecommendationKind,
    report_key,
};
use autoflow_engine::{
    FixedProbe, StepOutcome, StepRegistry, StepState, WorkflowEngine, WorkflowState, WorkflowStep,
};
use autoflow_monitor::{MonitoringStatus, WorkflowMonitor};
use autoflow_protocols::{
    Goal, ReportSink, SinkError, StepContext, StepError, StepExecutor, StepOutput,
};
use autoflow_reports::MemoryReportSink;

struct ScriptedStep {
    name: String,
    fail: bool,
    delay: Option<Duration>,
}

impl ScriptedStep {
    fn ok(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: false,
            delay: None,
        })
    }

    fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: true,
            delay: None,
        })
    }

    fn slow(name: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: false,
            delay: Some(delay),
        })
    }
}

#[async_trait]
impl StepExecutor for ScriptedStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, StepError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(StepError::failed(format!("{} broke", self.name)));
        }
        Ok(StepOutput::new(json!({ "step": ctx.step_name, "goal": ctx.goal.description })))
    }
}

struct RejectingSink;

#[async_trait]
impl ReportSink for RejectingSink {
    fn name(&self) -> &str {
        "rejecting"
    }

    async fn write(&self, _key: &str, _payload: &serde_json::Value) -> Result<(), SinkError> {
        Err(SinkError::Rejected("read-only".to_string()))
    }
}

fn coordinator(
    engine_config: &EngineConfig,
    registry: StepRegistry,
    monitor_probe: FixedProbe,
    sink: Arc<dyn ReportSink>,
) -> OrchestrationCoordinator {
    let engine = Arc::new(
        WorkflowEngine::new(Arc::new(registry), engine_config)
            .with_probe(Arc::new(FixedProbe::new(200.0, 20.0))),
    );
    let monitor = Arc::new(
        WorkflowMonitor::new(MonitorConfig::default(), engine.clone(), sink.clone())
            .with_probe(Arc::new(monitor_probe)),
    );
    OrchestrationCoordinator::new(engine, monitor, sink, &CoordinatorConfig::default())
}

fn pipeline_registry() -> StepRegistry {
    let registry = StepRegistry::default();
    for (name, _) in DEFAULT_PIPELINE {
        registry.register(ScriptedStep::ok(name)).unwrap();
    }
    registry
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn test_default_pipeline_succeeds() {
    let sink = Arc::new(MemoryReportSink::new());
    let coordinator = coordinator(
        &EngineConfig::default(),
        pipeline_registry(),
        FixedProbe::new(200.0, 20.0),
        sink.clone(),
    );

    let result = coordinator.run(Goal::new("Build a todo app")).await.unwrap();
    let id = result.workflow.id.clone();

    assert_eq!(result.execution.status, WorkflowState::Completed);
    assert_eq!(result.execution.metrics.total_steps, 8);
    assert_eq!(result.execution.metrics.completed_steps, 8);
    assert_eq!(result.workflow.status, WorkflowState::Completed);

    assert!(result.summary.overall_success);
    assert!(close(result.summary.success_rate, 1.0));
    assert!(close(result.summary.resource_efficiency, 0.8));
    assert!(close(result.summary.stability_score, 1.0));
    assert_eq!(result.summary.health, HealthStatus::Excellent);
    assert!(result.recommendations.is_empty());
    assert_eq!(result.analysis.insights.len(), 2);

    let status = result.monitoring.status.as_ref().unwrap();
    assert_eq!(status.status, MonitoringStatus::Completed);
    assert!(status.ended_at.is_some());
    assert!(!coordinator.monitor().is_monitoring(&id));

    assert_eq!(result.report_key, report_key(&id));
    let report = sink.get(&report_key(&id)).unwrap();
    assert_eq!(report["summary"]["health"], "excellent");
    assert_eq!(report["executionResult"]["status"], "completed");
    assert!(sink.get(&format!("workflow-monitoring-{}", id)).is_some());
}

#[tokio::test]
async fn test_critical_failure_skips_remaining_steps() {
    let registry = StepRegistry::default();
    registry.register(ScriptedStep::ok("a")).unwrap();
    registry.register(ScriptedStep::failing("b")).unwrap();
    registry.register(ScriptedStep::ok("c")).unwrap();
    let engine_config = EngineConfig {
        critical_steps: vec!["b".to_string()],
        ..EngineConfig::default()
    };
    let sink = Arc::new(MemoryReportSink::new());
    let coordinator = coordinator(&engine_config, registry, FixedProbe::new(200.0, 20.0), sink);

    let steps = vec![
        WorkflowStep::new("a", "first"),
        WorkflowStep::new("b", "critical"),
        WorkflowStep::new("c", "last"),
    ];
    let result = coordinator
        .run_with_steps(Goal::new("abc"), steps)
        .await
        .unwrap();

    let outcomes: Vec<_> = result.execution.steps.iter().map(|s| s.status).collect();
    assert_eq!(
        outcomes,
        vec![StepOutcome::Completed, StepOutcome::Failed, StepOutcome::Skipped]
    );
    assert_eq!(result.execution.metrics.total_steps, 3);
    assert_eq!(result.execution.metrics.completed_steps, 1);
    assert_eq!(result.execution.metrics.failed_steps, 1);
    assert_eq!(result.execution.status, WorkflowState::Failed);
    assert_eq!(result.workflow.steps[2].status, StepState::Skipped);

    assert_eq!(
        result.monitoring.status.as_ref().unwrap().status,
        MonitoringStatus::Failed
    );
    assert_eq!(result.monitoring.status.as_ref().unwrap().error_count, 1);

    assert!(!result.summary.overall_success);
    assert_eq!(result.recommendations.len(), 1);
    assert_eq!(result.recommendations[0].kind, RecommendationKind::Execution);
    assert_eq!(result.summary.high_priority_recommendations, 1);
    assert_eq!(result.summary.health, HealthStatus::Fair);
}

#[tokio::test]
async fn test_unregistered_steps_degrade() {
    let sink = Arc::new(MemoryReportSink::new());
    let coordinator = coordinator(
        &EngineConfig::default(),
        StepRegistry::default(),
        FixedProbe::new(200.0, 20.0),
        sink,
    );

    let result = coordinator.run(Goal::new("anything")).await.unwrap();

    assert_eq!(result.execution.status, WorkflowState::Completed);
    assert!(result
        .execution
        .steps
        .iter()
        .all(|s| s.status == StepOutcome::Degraded));
    assert_eq!(result.execution.warnings.len(), 8);
    assert_eq!(result.analysis.quality.warning_count, 8);
    assert!(close(result.analysis.quality.stability_score, 0.9));
}

#[tokio::test(start_paused = true)]
async fn test_monitor_runs_alongside_execution() {
    let registry = StepRegistry::default();
    registry
        .register(ScriptedStep::slow("crunch", Duration::from_millis(2500)))
        .unwrap();
    let sink = Arc::new(MemoryReportSink::new());
    let coordinator = coordinator(
        &EngineConfig::default(),
        registry,
        FixedProbe::new(1500.0, 95.0),
        sink,
    );

    let result = coordinator
        .run_with_steps(Goal::new("heavy"), vec![WorkflowStep::new("crunch", "Heavy work")])
        .await
        .unwrap();

    assert!(result.summary.overall_success);
    assert_eq!(result.monitoring.aggregates.unwrap().sample_count, 2);
    assert_eq!(result.monitoring.alerts.len(), 4);

    let performance = &result.analysis.performance;
    assert!(close(performance.memory_mb, 1500.0));
    assert!(close(performance.resource_efficiency, 0.025));
    assert_eq!(
        performance.bottlenecks,
        vec![Bottleneck::HighMemoryUsage, Bottleneck::HighCpuUsage]
    );
    assert!(close(result.analysis.quality.stability_score, 0.2));

    let kinds: Vec<_> = result.recommendations.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![RecommendationKind::Performance, RecommendationKind::Quality]
    );
}

#[tokio::test]
async fn test_sink_failure_does_not_fail_run() {
    let coordinator = coordinator(
        &EngineConfig::default(),
        pipeline_registry(),
        FixedProbe::new(200.0, 20.0),
        Arc::new(RejectingSink),
    );

    let result = coordinator.run(Goal::new("Build a todo app")).await.unwrap();
    assert!(result.summary.overall_success);
}

#[tokio::test]
async fn test_overall_metrics_across_runs() {
    let sink = Arc::new(MemoryReportSink::new());
    let coordinator = coordinator(
        &EngineConfig::default(),
        pipeline_registry(),
        FixedProbe::new(200.0, 20.0),
        sink,
    );

    coordinator.run(Goal::new("first")).await.unwrap();
    let second = coordinator.run(Goal::new("second")).await.unwrap();

    assert_eq!(second.monitoring.overall.total_workflows, 2);
    assert_eq!(second.monitoring.overall.successful_workflows, 2);
    assert_eq!(coordinator.engine().history().len(), 2);
}
