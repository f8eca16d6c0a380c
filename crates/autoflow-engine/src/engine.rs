//! Workflow execution engine.
//!
//! The engine is the single owner of workflow records. Each call to
//! [`WorkflowEngine::execute`] walks the step list in order; step executors
//! are awaited outside the state lock, and every status change is committed
//! under it, so readers never observe a half-applied step.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use autoflow_config::EngineConfig;
use autoflow_protocols::{
    Clock, Goal, ResourceProbe, ResourceReading, StepContext, StepError, StepOutput, SystemClock,
};

use crate::policy::CriticalStepPolicy;
use crate::probe::ProcessProbe;
use crate::registry::StepRegistry;
use crate::result::{ExecutionMetrics, StepExecutionResult, StepOutcome, WorkflowExecutionResult};
use crate::workflow::{
    StepState, Workflow, WorkflowHistory, WorkflowState, WorkflowStatus, WorkflowStep,
};

/// Read access to workflow status, used by observers such as the monitor.
pub trait WorkflowStatusProvider: Send + Sync {
    fn workflow_status(&self, workflow_id: &str) -> Option<WorkflowStatus>;
}

#[derive(Default)]
struct EngineState {
    active: HashMap<String, Workflow>,
    history: VecDeque<Workflow>,
    /// Token of the run that currently owns each active record.
    runs: HashMap<String, u64>,
    next_run: u64,
}

impl EngineState {
    fn archive(&mut self, workflow: Workflow, limit: usize) {
        self.history.retain(|w| w.id != workflow.id);
        self.history.push_back(workflow);
        if limit > 0 {
            while self.history.len() > limit {
                self.history.pop_front();
            }
        }
    }

    /// The active record, if `run` still owns it.
    fn owned_mut(&mut self, workflow_id: &str, run: u64) -> Option<&mut Workflow> {
        if self.runs.get(workflow_id) != Some(&run) {
            return None;
        }
        self.active.get_mut(workflow_id)
    }

    fn find(&self, workflow_id: &str) -> Option<&Workflow> {
        self.active
            .get(workflow_id)
            .or_else(|| self.history.iter().rev().find(|w| w.id == workflow_id))
    }
}

/// Bookkeeping for one run.
#[derive(Default)]
struct RunLedger {
    results: Vec<StepExecutionResult>,
    errors: Vec<String>,
    warnings: Vec<String>,
    outputs: HashMap<String, serde_json::Value>,
    last_processed: Option<usize>,
}

enum StepCommit {
    Continue,
    Abort,
    Cancelled,
}

enum RunStart {
    Started(u64),
    CancelledBeforeStart,
    AlreadyFinished(WorkflowState),
    AlreadyRunning,
}

pub struct WorkflowEngine {
    registry: Arc<StepRegistry>,
    policy: CriticalStepPolicy,
    history_limit: usize,
    probe: Arc<dyn ResourceProbe>,
    clock: Arc<dyn Clock>,
    state: RwLock<EngineState>,
}

impl WorkflowEngine {
    pub fn new(registry: Arc<StepRegistry>, config: &EngineConfig) -> Self {
        Self {
            registry,
            policy: CriticalStepPolicy::from_config(config),
            history_limit: config.history_limit,
            probe: Arc::new(ProcessProbe::new()),
            clock: Arc::new(SystemClock),
            state: RwLock::new(EngineState::default()),
        }
    }

    /// Set the probe used for per-step resource samples.
    pub fn with_probe(mut self, probe: Arc<dyn ResourceProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: CriticalStepPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<StepRegistry> {
        &self.registry
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Allocate a pending workflow and track it as active.
    pub fn create_workflow(&self, goal: Goal, steps: Vec<WorkflowStep>) -> Workflow {
        let workflow = Workflow::new(goal, steps, self.clock.now());
        info!(workflow_id = %workflow.id, steps = workflow.steps.len(), "Workflow created");
        self.state
            .write()
            .active
            .insert(workflow.id.clone(), workflow.clone());
        workflow
    }

    /// Run the workflow's steps in order.
    ///
    /// Always returns a well-formed result; step failures are reported in
    /// `errors` and in the per-step results, never as a panic or `Err`.
    pub async fn execute(&self, workflow: Workflow) -> WorkflowExecutionResult {
        let started_at = self.clock.now();
        let workflow_id = workflow.id.clone();
        let goal = workflow.goal.clone();
        let step_names: Vec<String> = workflow.steps.iter().map(|s| s.name.clone()).collect();
        let total = step_names.len();

        let token = match self.begin_run(workflow, started_at) {
            RunStart::Started(token) => token,
            refused => {
                let mut run = RunLedger {
                    results: step_names
                        .iter()
                        .map(|name| StepExecutionResult::skipped(name.as_str(), started_at))
                        .collect(),
                    ..Default::default()
                };
                match refused {
                    RunStart::AlreadyFinished(previous) => {
                        warn!(
                            workflow_id = %workflow_id,
                            status = %previous,
                            "Workflow already finished, not running it again"
                        );
                        run.warnings.push(format!(
                            "Workflow {} already finished as {}; use restart",
                            workflow_id, previous
                        ));
                    }
                    RunStart::AlreadyRunning => {
                        warn!(workflow_id = %workflow_id, "Workflow is already running");
                        run.warnings
                            .push(format!("Workflow {} is already running", workflow_id));
                    }
                    _ => {
                        info!(workflow_id = %workflow_id, "Workflow was cancelled before execution started");
                    }
                }
                let ended_at = self.clock.now();
                return self.build_result(
                    workflow_id,
                    WorkflowState::Cancelled,
                    started_at,
                    ended_at,
                    total,
                    run,
                );
            }
        };

        info!(workflow_id = %workflow_id, steps = total, "Executing workflow");

        let mut run = RunLedger::default();
        let mut cancelled = false;

        for index in 0..total {
            let Some(ctx) =
                self.begin_step(&workflow_id, token, &goal, index, total, &run.outputs)
            else {
                cancelled = true;
                break;
            };

            let executor = self.registry.resolve(&ctx.step_name);
            debug!(
                workflow_id = %workflow_id,
                step = %ctx.step_name,
                executor = executor.name(),
                "Starting step"
            );

            let step_started = self.clock.now();
            let outcome = executor.execute(ctx).await;
            let step_ended = self.clock.now();
            let sample = self.sample_resources(&workflow_id);

            match self.commit_step(
                &workflow_id,
                token,
                index,
                outcome,
                step_started,
                step_ended,
                sample,
                &mut run,
            ) {
                StepCommit::Continue => {}
                StepCommit::Abort => break,
                StepCommit::Cancelled => {
                    cancelled = true;
                    break;
                }
            }
        }

        let ended_at = self.clock.now();
        for name in step_names.iter().skip(run.results.len()) {
            run.results
                .push(StepExecutionResult::skipped(name.as_str(), ended_at));
        }

        let status = if cancelled {
            WorkflowState::Cancelled
        } else if run.errors.is_empty() {
            WorkflowState::Completed
        } else {
            WorkflowState::Failed
        };
        let status = if cancelled || self.finish_run(&workflow_id, token, status, ended_at) {
            status
        } else {
            WorkflowState::Cancelled
        };

        let result = self.build_result(workflow_id, status, started_at, ended_at, total, run);
        info!(
            workflow_id = %result.workflow_id,
            status = %result.status,
            completed = result.metrics.completed_steps,
            failed = result.metrics.failed_steps,
            skipped = result.metrics.skipped_steps,
            duration_ms = result.metrics.duration_ms,
            "Workflow finished"
        );
        result
    }

    /// Cancel an active workflow.
    ///
    /// An in-flight step is not interrupted; its result is discarded when it
    /// returns and no further step starts.
    pub fn cancel(&self, workflow_id: &str) -> bool {
        let mut state = self.state.write();
        let Some(mut workflow) = state.active.remove(workflow_id) else {
            return false;
        };
        state.runs.remove(workflow_id);

        let now = self.clock.now();
        workflow.status = WorkflowState::Cancelled;
        workflow.ended_at = Some(now);
        workflow.updated_at = now;
        workflow.skip_unfinished(now);
        state.archive(workflow, self.history_limit);

        info!(workflow_id = %workflow_id, "Workflow cancelled");
        true
    }

    /// Re-run a finished workflow from its first failed step.
    ///
    /// Steps before the first failure are dropped and treated as satisfied;
    /// without a failed step the whole list runs again. Relies on step
    /// executors being idempotent on resume.
    pub async fn restart(&self, workflow_id: &str) -> Option<WorkflowExecutionResult> {
        let mut workflow = self.take_from_history(workflow_id)?;

        let from = workflow
            .steps
            .iter()
            .position(|s| s.status == StepState::Failed)
            .unwrap_or(0);
        workflow.steps.drain(..from);
        for step in &mut workflow.steps {
            step.reset();
        }
        workflow.status = WorkflowState::Pending;
        workflow.current_step_index = 0;
        workflow.started_at = None;
        workflow.ended_at = None;

        info!(
            workflow_id = %workflow_id,
            resume_from = from,
            steps = workflow.steps.len(),
            "Restarting workflow"
        );
        Some(self.execute(workflow).await)
    }

    pub fn status(&self, workflow_id: &str) -> Option<WorkflowStatus> {
        self.state.read().find(workflow_id).map(Workflow::status_view)
    }

    /// Finished workflows, oldest first.
    pub fn history(&self) -> Vec<WorkflowHistory> {
        self.state
            .read()
            .history
            .iter()
            .map(Workflow::history_view)
            .collect()
    }

    /// Snapshot of a workflow record, active or finished.
    pub fn get_workflow(&self, workflow_id: &str) -> Option<Workflow> {
        self.state.read().find(workflow_id).cloned()
    }

    pub fn active_workflows(&self) -> Vec<WorkflowStatus> {
        self.state
            .read()
            .active
            .values()
            .map(Workflow::status_view)
            .collect()
    }

    /// Mark the workflow running and hand out the token that owns this run.
    /// Terminal records are only left through [`Self::restart`].
    fn begin_run(&self, mut workflow: Workflow, started_at: DateTime<Utc>) -> RunStart {
        let mut state = self.state.write();

        if state.runs.contains_key(&workflow.id) {
            return RunStart::AlreadyRunning;
        }
        if !state.active.contains_key(&workflow.id) {
            let finished = state
                .history
                .iter()
                .rev()
                .find(|w| w.id == workflow.id)
                .map(|w| w.status);
            match finished {
                Some(WorkflowState::Cancelled) => return RunStart::CancelledBeforeStart,
                Some(status) if status.is_terminal() => return RunStart::AlreadyFinished(status),
                _ => {}
            }
        }

        state.next_run += 1;
        let token = state.next_run;

        workflow.status = WorkflowState::Running;
        workflow.current_step_index = 0;
        workflow.started_at = Some(started_at);
        workflow.ended_at = None;
        workflow.updated_at = started_at;

        state.history.retain(|w| w.id != workflow.id);
        state.runs.insert(workflow.id.clone(), token);
        state.active.insert(workflow.id.clone(), workflow);
        RunStart::Started(token)
    }

    /// Mark step `index` in progress and build its context. `None` when the
    /// run no longer owns the workflow.
    fn begin_step(
        &self,
        workflow_id: &str,
        token: u64,
        goal: &Goal,
        index: usize,
        total: usize,
        outputs: &HashMap<String, serde_json::Value>,
    ) -> Option<StepContext> {
        let mut state = self.state.write();
        let record = state.owned_mut(workflow_id, token)?;
        let now = self.clock.now();

        record.current_step_index = index;
        record.updated_at = now;
        let step = record.steps.get_mut(index)?;
        step.status = StepState::InProgress;
        step.started_at = Some(now);

        Some(StepContext {
            workflow_id: workflow_id.to_string(),
            goal: goal.clone(),
            step_name: step.name.clone(),
            step_description: step.description.clone(),
            step_index: index,
            total_steps: total,
            previous_outputs: outputs.clone(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn commit_step(
        &self,
        workflow_id: &str,
        token: u64,
        index: usize,
        outcome: Result<StepOutput, StepError>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        sample: Option<ResourceReading>,
        run: &mut RunLedger,
    ) -> StepCommit {
        let mut state = self.state.write();
        let Some(record) = state.owned_mut(workflow_id, token) else {
            debug!(workflow_id = %workflow_id, "Discarding result of step from cancelled run");
            return StepCommit::Cancelled;
        };
        let Some(step) = record.steps.get_mut(index) else {
            return StepCommit::Abort;
        };

        let step_name = step.name.clone();
        let duration_ms = (ended_at - started_at).num_milliseconds().max(0) as u64;
        step.ended_at = Some(ended_at);
        run.last_processed = Some(index);

        let commit = match outcome {
            Ok(output) => {
                step.status = StepState::Completed;
                let status = match &output.degraded {
                    Some(reason) => {
                        step.degraded = true;
                        warn!(
                            workflow_id = %workflow_id,
                            step = %step_name,
                            reason = %reason,
                            "Step completed with degraded result"
                        );
                        run.warnings
                            .push(format!("Step {} degraded: {}", step_name, reason));
                        StepOutcome::Degraded
                    }
                    None => StepOutcome::Completed,
                };
                debug!(workflow_id = %workflow_id, step = %step_name, duration_ms, "Step completed");

                run.outputs.insert(step_name.clone(), output.payload.clone());
                run.results.push(StepExecutionResult {
                    step_name,
                    status,
                    started_at,
                    ended_at,
                    duration_ms,
                    output: Some(output.payload),
                    error: None,
                    resource_sample: sample,
                });
                StepCommit::Continue
            }
            Err(e) => {
                let message = e.to_string();
                step.status = StepState::Failed;
                step.error = Some(message.clone());
                run.errors
                    .push(format!("Step {} failed: {}", step_name, message));

                let critical = self.policy.is_critical(&step_name);
                run.results.push(StepExecutionResult {
                    step_name: step_name.clone(),
                    status: StepOutcome::Failed,
                    started_at,
                    ended_at,
                    duration_ms,
                    output: None,
                    error: Some(message),
                    resource_sample: sample,
                });

                if critical {
                    error!(
                        workflow_id = %workflow_id,
                        step = %step_name,
                        error = %e,
                        "Critical step failed, aborting workflow"
                    );
                    record.skip_unfinished(ended_at);
                    StepCommit::Abort
                } else {
                    warn!(
                        workflow_id = %workflow_id,
                        step = %step_name,
                        error = %e,
                        "Step failed, continuing with next step"
                    );
                    StepCommit::Continue
                }
            }
        };

        record.updated_at = ended_at;
        commit
    }

    /// Archive the record. False when the run lost ownership first.
    fn finish_run(
        &self,
        workflow_id: &str,
        token: u64,
        status: WorkflowState,
        ended_at: DateTime<Utc>,
    ) -> bool {
        let mut state = self.state.write();
        if state.owned_mut(workflow_id, token).is_none() {
            return false;
        }
        state.runs.remove(workflow_id);
        let Some(mut workflow) = state.active.remove(workflow_id) else {
            return false;
        };
        workflow.status = status;
        workflow.ended_at = Some(ended_at);
        workflow.updated_at = ended_at;
        state.archive(workflow, self.history_limit);
        true
    }

    fn take_from_history(&self, workflow_id: &str) -> Option<Workflow> {
        let mut state = self.state.write();
        let position = state.history.iter().rposition(|w| w.id == workflow_id)?;
        state.history.remove(position)
    }

    fn sample_resources(&self, workflow_id: &str) -> Option<ResourceReading> {
        match self.probe.sample() {
            Ok(reading) => Some(reading),
            Err(e) => {
                debug!(workflow_id = %workflow_id, error = %e, "Resource sample unavailable");
                None
            }
        }
    }

    fn build_result(
        &self,
        workflow_id: String,
        status: WorkflowState,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        total: usize,
        run: RunLedger,
    ) -> WorkflowExecutionResult {
        let completed = run.results.iter().filter(|r| r.status.is_success()).count();
        let failed = run
            .results
            .iter()
            .filter(|r| r.status == StepOutcome::Failed)
            .count();
        let skipped = run
            .results
            .iter()
            .filter(|r| r.status == StepOutcome::Skipped)
            .count();

        let success_rate = if total == 0 {
            1.0
        } else {
            completed as f64 / total as f64
        };
        let progress_percent = match run.last_processed {
            Some(index) => (index + 1) as f64 / total as f64 * 100.0,
            None if total == 0 => 100.0,
            None => 0.0,
        };

        WorkflowExecutionResult {
            workflow_id,
            status,
            started_at,
            ended_at,
            steps: run.results,
            progress_percent,
            errors: run.errors,
            warnings: run.warnings,
            metrics: ExecutionMetrics {
                total_steps: total,
                completed_steps: completed,
                failed_steps: failed,
                skipped_steps: skipped,
                duration_ms: (ended_at - started_at).num_milliseconds().max(0) as u64,
                success_rate,
            },
        }
    }
}

impl WorkflowStatusProvider for WorkflowEngine {
    fn workflow_status(&self, workflow_id: &str) -> Option<WorkflowStatus> {
        self.status(workflow_id)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
