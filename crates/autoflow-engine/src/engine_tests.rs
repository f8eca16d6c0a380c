    use super::*;
    use crate::probe::FixedProbe;
    use async_trait::async_trait;
    use autoflow_protocols::ManualClock;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct OkStep {
        name: &'static str,
        calls: AtomicUsize,
    }

    impl OkStep {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl autoflow_protocols::StepExecutor for OkStep {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(&self, ctx: StepContext) -> Result<StepOutput, StepError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StepOutput::new(json!({
                "step": self.name,
                "index": ctx.step_index,
                "seen": ctx.previous_outputs.len(),
            })))
        }
    }

    /// Fails until `healed` is set.
    struct FlakyStep {
        name: &'static str,
        healed: AtomicBool,
    }

    #[async_trait]
    impl autoflow_protocols::StepExecutor for FlakyStep {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(&self, _ctx: StepContext) -> Result<StepOutput, StepError> {
            if self.healed.load(Ordering::SeqCst) {
                Ok(StepOutput::new(json!({ "healed": true })))
            } else {
                Err(StepError::failed("boom"))
            }
        }
    }

    struct GatedStep {
        started: Arc<Notify>,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl autoflow_protocols::StepExecutor for GatedStep {
        fn name(&self) -> &str {
            "gated"
        }

        async fn execute(&self, _ctx: StepContext) -> Result<StepOutput, StepError> {
            self.started.notify_one();
            self.gate.notified().await;
            Ok(StepOutput::new(json!({ "late": true })))
        }
    }

    struct SlowStep {
        clock: Arc<ManualClock>,
    }

    #[async_trait]
    impl autoflow_protocols::StepExecutor for SlowStep {
        fn name(&self) -> &str {
            "slow"
        }

        async fn execute(&self, _ctx: StepContext) -> Result<StepOutput, StepError> {
            self.clock.advance(chrono::Duration::seconds(2));
            Ok(StepOutput::new(json!({})))
        }
    }

    fn config(critical: &[&str]) -> EngineConfig {
        EngineConfig {
            critical_steps: critical.iter().map(|s| s.to_string()).collect(),
            history_limit: 100,
        }
    }

    fn engine_with(registry: StepRegistry, critical: &[&str]) -> WorkflowEngine {
        WorkflowEngine::new(Arc::new(registry), &config(critical))
            .with_probe(Arc::new(FixedProbe::new(128.0, 12.5)))
    }

    fn steps(names: &[&str]) -> Vec<WorkflowStep> {
        names
            .iter()
            .map(|n| WorkflowStep::new(*n, format!("{} step", n)))
            .collect()
    }

    fn flaky(name: &'static str) -> Arc<FlakyStep> {
        Arc::new(FlakyStep {
            name,
            healed: AtomicBool::new(false),
        })
    }

    fn assert_counts_add_up(result: &WorkflowExecutionResult) {
        let m = &result.metrics;
        assert_eq!(m.completed_steps + m.failed_steps + m.skipped_steps, m.total_steps);
        assert_eq!(result.steps.len(), m.total_steps);
        assert!((0.0..=1.0).contains(&m.success_rate));
    }

    #[tokio::test]
    async fn test_all_steps_complete() {
        let registry = StepRegistry::default();
        for name in ["a", "b", "c"] {
            registry.register(OkStep::new(name)).unwrap();
        }
        let engine = engine_with(registry, &[]);

        let workflow = engine.create_workflow(Goal::new("build"), steps(&["a", "b", "c"]));
        assert_eq!(
            engine.status(&workflow.id).unwrap().status,
            WorkflowState::Pending
        );

        let result = engine.execute(workflow.clone()).await;
        assert_eq!(result.status, WorkflowState::Completed);
        assert_eq!(result.metrics.completed_steps, 3);
        assert_eq!(result.metrics.success_rate, 1.0);
        assert_eq!(result.progress_percent, 100.0);
        assert!(result.errors.is_empty());
        assert_counts_add_up(&result);

        let status = engine.status(&workflow.id).unwrap();
        assert_eq!(status.status, WorkflowState::Completed);
        assert!(status.current_step.is_none());
        assert!(engine.active_workflows().is_empty());
        assert_eq!(engine.history().len(), 1);
    }

    #[tokio::test]
    async fn test_critical_failure_skips_remaining() {
        let registry = StepRegistry::default();
        registry.register(OkStep::new("a")).unwrap();
        registry.register(flaky("b")).unwrap();
        let c = OkStep::new("c");
        registry.register(c.clone()).unwrap();
        let engine = engine_with(registry, &["b"]);

        let workflow = engine.create_workflow(Goal::new("build"), steps(&["a", "b", "c"]));
        let result = engine.execute(workflow.clone()).await;

        assert_eq!(result.status, WorkflowState::Failed);
        assert_eq!(result.step("a").unwrap().status, StepOutcome::Completed);
        assert_eq!(result.step("b").unwrap().status, StepOutcome::Failed);
        assert_eq!(result.step("c").unwrap().status, StepOutcome::Skipped);
        assert_eq!(result.metrics.total_steps, 3);
        assert_eq!(result.metrics.completed_steps, 1);
        assert_eq!(result.metrics.failed_steps, 1);
        assert_eq!(result.metrics.skipped_steps, 1);
        assert_eq!(c.calls.load(Ordering::SeqCst), 0);
        assert_counts_add_up(&result);

        let record = engine.get_workflow(&workflow.id).unwrap();
        assert_eq!(record.steps[2].status, StepState::Skipped);
        assert_eq!(record.steps[1].error.as_deref(), Some("Step failed: boom"));
    }

    #[tokio::test]
    async fn test_non_critical_failure_continues() {
        let registry = StepRegistry::default();
        registry.register(OkStep::new("a")).unwrap();
        registry.register(flaky("b")).unwrap();
        let c = OkStep::new("c");
        registry.register(c.clone()).unwrap();
        let engine = engine_with(registry, &["a"]);

        let workflow = engine.create_workflow(Goal::new("build"), steps(&["a", "b", "c"]));
        let result = engine.execute(workflow).await;

        assert_eq!(result.status, WorkflowState::Failed);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("b"));
        assert_eq!(result.step("c").unwrap().status, StepOutcome::Completed);
        assert_eq!(c.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.metrics.skipped_steps, 0);
        assert!((result.metrics.success_rate - 2.0 / 3.0).abs() < f64::EPSILON);
        assert_counts_add_up(&result);
    }

    #[tokio::test]
    async fn test_unknown_step_degrades() {
        let engine = engine_with(StepRegistry::default(), &[]);

        let workflow = engine.create_workflow(Goal::new("build"), steps(&["mystery"]));
        let result = engine.execute(workflow.clone()).await;

        assert_eq!(result.status, WorkflowState::Completed);
        assert_eq!(result.steps[0].status, StepOutcome::Degraded);
        assert_eq!(result.metrics.completed_steps, 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.errors.is_empty());

        let status = engine.status(&workflow.id).unwrap();
        assert_eq!(status.degraded_steps, 1);
    }

    #[tokio::test]
    async fn test_previous_outputs_are_passed() {
        let registry = StepRegistry::default();
        for name in ["a", "b", "c"] {
            registry.register(OkStep::new(name)).unwrap();
        }
        let engine = engine_with(registry, &[]);

        let workflow = engine.create_workflow(Goal::new("build"), steps(&["a", "b", "c"]));
        let result = engine.execute(workflow).await;

        let outputs: Vec<_> = result
            .steps
            .iter()
            .map(|s| s.output.as_ref().unwrap()["seen"].as_u64().unwrap())
            .collect();
        assert_eq!(outputs, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_resource_sample_recorded() {
        let registry = StepRegistry::default();
        registry.register(OkStep::new("a")).unwrap();
        let engine = engine_with(registry, &[]);

        let workflow = engine.create_workflow(Goal::new("build"), steps(&["a"]));
        let result = engine.execute(workflow).await;

        let sample = result.steps[0].resource_sample.unwrap();
        assert_eq!(sample.memory_mb, 128.0);
        assert_eq!(sample.cpu_percent, 12.5);
    }

    #[tokio::test]
    async fn test_durations_follow_clock() {
        let clock = Arc::new(ManualClock::default());
        let registry = StepRegistry::default();
        registry
            .register(Arc::new(SlowStep {
                clock: clock.clone(),
            }))
            .unwrap();
        let engine = engine_with(registry, &[]).with_clock(clock.clone());

        let workflow = engine.create_workflow(Goal::new("build"), steps(&["slow"]));
        let result = engine.execute(workflow).await;

        assert_eq!(result.steps[0].duration_ms, 2000);
        assert_eq!(result.metrics.duration_ms, 2000);
        assert_eq!(engine.history()[0].duration_ms, Some(2000));
    }

    #[tokio::test]
    async fn test_cancel_in_flight_step() {
        let started = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());
        let registry = StepRegistry::default();
        registry.register(OkStep::new("a")).unwrap();
        registry
            .register(Arc::new(GatedStep {
                started: started.clone(),
                gate: gate.clone(),
            }))
            .unwrap();
        let c = OkStep::new("c");
        registry.register(c.clone()).unwrap();
        let engine = Arc::new(engine_with(registry, &[]));

        let workflow = engine.create_workflow(Goal::new("build"), steps(&["a", "gated", "c"]));
        let id = workflow.id.clone();
        let runner = engine.clone();
        let handle = tokio::spawn(async move { runner.execute(workflow).await });

        started.notified().await;
        let status = engine.status(&id).unwrap();
        assert_eq!(status.status, WorkflowState::Running);
        assert_eq!(status.current_step.as_deref(), Some("gated"));

        assert!(engine.cancel(&id));
        assert_eq!(engine.status(&id).unwrap().status, WorkflowState::Cancelled);
        gate.notify_one();

        let result = handle.await.unwrap();
        assert_eq!(result.status, WorkflowState::Cancelled);
        assert_eq!(result.step("a").unwrap().status, StepOutcome::Completed);
        assert_eq!(result.step("gated").unwrap().status, StepOutcome::Skipped);
        assert_eq!(result.step("c").unwrap().status, StepOutcome::Skipped);
        assert_eq!(c.calls.load(Ordering::SeqCst), 0);
        assert_counts_add_up(&result);

        let record = engine.get_workflow(&id).unwrap();
        assert_eq!(record.status, WorkflowState::Cancelled);
        assert_eq!(record.count(StepState::Skipped), 2);
    }

    #[tokio::test]
    async fn test_cancel_before_execute() {
        let engine = engine_with(StepRegistry::default(), &[]);
        let workflow = engine.create_workflow(Goal::new("build"), steps(&["a", "b"]));

        assert!(engine.cancel(&workflow.id));
        let result = engine.execute(workflow).await;

        assert_eq!(result.status, WorkflowState::Cancelled);
        assert_eq!(result.metrics.skipped_steps, 2);
        assert_eq!(result.progress_percent, 0.0);
    }

    #[test]
    fn test_cancel_unknown() {
        let engine = engine_with(StepRegistry::default(), &[]);
        assert!(!engine.cancel("missing"));
    }

    #[tokio::test]
    async fn test_restart_from_first_failed_step() {
        let registry = StepRegistry::default();
        let a = OkStep::new("a");
        registry.register(a.clone()).unwrap();
        let b = flaky("b");
        registry.register(b.clone()).unwrap();
        registry.register(OkStep::new("c")).unwrap();
        let engine = engine_with(registry, &["b"]);

        let workflow = engine.create_workflow(Goal::new("build"), steps(&["a", "b", "c"]));
        let first = engine.execute(workflow.clone()).await;
        assert_eq!(first.status, WorkflowState::Failed);

        b.healed.store(true, Ordering::SeqCst);
        let second = engine.restart(&workflow.id).await.unwrap();

        assert_eq!(second.workflow_id, workflow.id);
        assert_eq!(second.status, WorkflowState::Completed);
        assert_eq!(second.metrics.total_steps, 2);
        assert_eq!(second.steps[0].step_name, "b");
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.history().len(), 1);
    }

    #[tokio::test]
    async fn test_restart_without_failure_runs_everything() {
        let registry = StepRegistry::default();
        let a = OkStep::new("a");
        registry.register(a.clone()).unwrap();
        let engine = engine_with(registry, &[]);

        let workflow = engine.create_workflow(Goal::new("build"), steps(&["a"]));
        engine.execute(workflow.clone()).await;
        let result = engine.restart(&workflow.id).await.unwrap();

        assert_eq!(result.status, WorkflowState::Completed);
        assert_eq!(result.metrics.total_steps, 1);
        assert_eq!(a.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_restart_unknown() {
        let engine = engine_with(StepRegistry::default(), &[]);
        assert!(engine.restart("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_restart_discards_step_from_cancelled_run() {
        let started = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());
        let registry = StepRegistry::default();
        registry.register(OkStep::new("a")).unwrap();
        registry
            .register(Arc::new(GatedStep {
                started: started.clone(),
                gate: gate.clone(),
            }))
            .unwrap();
        let c = OkStep::new("c");
        registry.register(c.clone()).unwrap();
        let engine = Arc::new(engine_with(registry, &[]));

        let workflow = engine.create_workflow(Goal::new("build"), steps(&["a", "gated", "c"]));
        let id = workflow.id.clone();
        let runner = engine.clone();
        let old = tokio::spawn(async move { runner.execute(workflow).await });

        started.notified().await;
        assert!(engine.cancel(&id));

        let restarter = engine.clone();
        let restart_id = id.clone();
        let new = tokio::spawn(async move { restarter.restart(&restart_id).await });
        started.notified().await;
        assert_eq!(engine.status(&id).unwrap().status, WorkflowState::Running);

        // Both runs are parked inside `gated`.
        gate.notify_waiters();

        let old = old.await.unwrap();
        assert_eq!(old.status, WorkflowState::Cancelled);
        assert_eq!(old.step("gated").unwrap().status, StepOutcome::Skipped);
        assert_eq!(old.step("c").unwrap().status, StepOutcome::Skipped);

        let new = new.await.unwrap().unwrap();
        assert_eq!(new.status, WorkflowState::Completed);
        assert_eq!(new.metrics.completed_steps, 3);
        assert_eq!(c.calls.load(Ordering::SeqCst), 1);

        let record = engine.get_workflow(&id).unwrap();
        assert_eq!(record.status, WorkflowState::Completed);
        assert_eq!(record.count(StepState::Completed), 3);
        assert_eq!(engine.history().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_finished_workflow_is_refused() {
        let registry = StepRegistry::default();
        let a = OkStep::new("a");
        registry.register(a.clone()).unwrap();
        let engine = engine_with(registry, &[]);

        let workflow = engine.create_workflow(Goal::new("build"), steps(&["a"]));
        let first = engine.execute(workflow.clone()).await;
        assert_eq!(first.status, WorkflowState::Completed);

        let again = engine.execute(workflow.clone()).await;
        assert_eq!(again.status, WorkflowState::Cancelled);
        assert_eq!(again.metrics.skipped_steps, 1);
        assert_eq!(again.warnings.len(), 1);
        assert!(again.warnings[0].contains("already finished"));
        assert_counts_add_up(&again);

        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        let history = engine.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, WorkflowState::Completed);
    }

    #[tokio::test]
    async fn test_execute_running_workflow_is_refused() {
        let started = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());
        let registry = StepRegistry::default();
        registry
            .register(Arc::new(GatedStep {
                started: started.clone(),
                gate: gate.clone(),
            }))
            .unwrap();
        let engine = Arc::new(engine_with(registry, &[]));

        let workflow = engine.create_workflow(Goal::new("build"), steps(&["gated"]));
        let runner = engine.clone();
        let first = tokio::spawn({
            let workflow = workflow.clone();
            async move { runner.execute(workflow).await }
        });
        started.notified().await;

        let second = engine.execute(workflow).await;
        assert_eq!(second.status, WorkflowState::Cancelled);
        assert!(second.warnings[0].contains("already running"));

        gate.notify_one();
        assert_eq!(first.await.unwrap().status, WorkflowState::Completed);
    }

    #[tokio::test]
    async fn test_empty_workflow() {
        let engine = engine_with(StepRegistry::default(), &[]);
        let workflow = engine.create_workflow(Goal::new("nothing"), Vec::new());
        let result = engine.execute(workflow).await;

        assert_eq!(result.status, WorkflowState::Completed);
        assert_eq!(result.metrics.success_rate, 1.0);
        assert_eq!(result.progress_percent, 100.0);
    }

    #[tokio::test]
    async fn test_history_limit_evicts_oldest() {
        let registry = StepRegistry::default();
        registry.register(OkStep::new("a")).unwrap();
        let engine = WorkflowEngine::new(
            Arc::new(registry),
            &EngineConfig {
                critical_steps: Vec::new(),
                history_limit: 2,
            },
        )
        .with_probe(Arc::new(FixedProbe::default()));

        let mut ids = Vec::new();
        for i in 0..3 {
            let wf = engine.create_workflow(Goal::new(format!("goal {}", i)), steps(&["a"]));
            ids.push(wf.id.clone());
            engine.execute(wf).await;
        }

        let history = engine.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, ids[1]);
        assert_eq!(history[1].goal, "goal 2");
        assert!(engine.status(&ids[0]).is_none());
    }

    #[test]
    fn test_status_unknown() {
        let engine = engine_with(StepRegistry::default(), &[]);
        assert!(engine.status("missing").is_none());
        assert!(engine.workflow_status("missing").is_none());
        assert!(engine.get_workflow("missing").is_none());
    }
