//! Component wiring for the CLI.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use autoflow_config::Config;
use autoflow_coordinator::OrchestrationCoordinator;
use autoflow_engine::{DisabledReasoning, ProcessProbe, StepRegistry, WorkflowEngine};
use autoflow_monitor::WorkflowMonitor;
use autoflow_protocols::{ReasoningFallback, ReportSink};
use autoflow_reports::{FileReportSink, MemoryReportSink};
use autoflow_scheduler::WorkflowScheduler;

use crate::adapters::HttpReasoning;
use crate::steps::builtin_steps;

/// Monitor, scheduler and coordinator sharing one engine and report sink.
pub(crate) struct Runtime {
    pub monitor: Arc<WorkflowMonitor>,
    pub scheduler: Arc<WorkflowScheduler>,
    pub coordinator: OrchestrationCoordinator,
}

impl Runtime {
    pub(crate) async fn build(config: &Config) -> anyhow::Result<Self> {
        let registry = Arc::new(StepRegistry::new(reasoning(config)?));
        for step in builtin_steps() {
            registry.register(Arc::new(step))?;
        }
        info!(steps = ?registry.list_names(), "Registered built-in steps");

        let sink = report_sink(config).await?;
        let probe = Arc::new(ProcessProbe::new());

        let engine = Arc::new(
            WorkflowEngine::new(registry, &config.engine).with_probe(probe.clone()),
        );
        let monitor = Arc::new(
            WorkflowMonitor::new(config.monitor.clone(), engine.clone(), sink.clone())
                .with_probe(probe),
        );
        let scheduler = Arc::new(WorkflowScheduler::new(
            engine.clone(),
            sink.clone(),
            &config.scheduler,
        ));
        let coordinator =
            OrchestrationCoordinator::new(engine, monitor.clone(), sink, &config.coordinator);

        Ok(Self {
            monitor,
            scheduler,
            coordinator,
        })
    }

    pub(crate) fn shutdown(&self) {
        self.scheduler.shutdown();
        self.monitor.shutdown();
    }
}

fn reasoning(config: &Config) -> anyhow::Result<Arc<dyn ReasoningFallback>> {
    match config.reasoning.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => {
            let reasoning = HttpReasoning::new(&config.reasoning, key.to_string())
                .context("Failed to build reasoning client")?;
            info!(model = %config.reasoning.model, "Reasoning fallback enabled");
            Ok(Arc::new(reasoning))
        }
        None => {
            warn!("No reasoning API key configured, unknown steps will degrade");
            Ok(Arc::new(DisabledReasoning))
        }
    }
}

async fn report_sink(config: &Config) -> anyhow::Result<Arc<dyn ReportSink>> {
    match &config.reports.directory {
        Some(dir) => {
            let sink = FileReportSink::new(dir)
                .await
                .with_context(|| format!("Failed to open report directory {}", dir))?;
            info!(directory = %dir, "Writing reports to disk");
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(MemoryReportSink::new())),
    }
}
