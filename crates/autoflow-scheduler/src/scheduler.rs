//! Workflow scheduler.
//!
//! Every armed schedule owns one timer task and one cancellation token.
//! Tearing a timer down (pause, update, delete, shutdown) cancels the token
//! and bumps the entry's generation; a firing only proceeds if the
//! generation it was armed with is still current, checked under the
//! registry lock. Wall-clock timestamps come from the [`Clock`]; waits use
//! the tokio timer.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use autoflow_config::SchedulerConfig;
use autoflow_engine::{WorkflowEngine, WorkflowExecutionResult};
use autoflow_protocols::{Clock, ReportSink};

use crate::cron_expr::CronSchedule;
use crate::definition::{
    ScheduleDefinition, ScheduleEvent, ScheduleKind, ScheduleSpec, ScheduleState,
    ScheduleUpdate, ScheduledWorkflow, SchedulerStatistics,
};
use crate::error::SchedulerError;
use crate::template::WorkflowTemplate;

struct ScheduleEntry {
    definition: ScheduleDefinition,
    template: WorkflowTemplate,
    cron: Option<CronSchedule>,
    timer: Option<CancellationToken>,
    generation: u64,
}

impl ScheduleEntry {
    fn tear_down(&mut self) {
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
        self.generation += 1;
    }

    /// A `once` schedule that has already fired.
    fn is_spent(&self) -> bool {
        !self.definition.is_recurring() && self.definition.fire_count > 0
    }

    /// Next fire time. `previous` is the last target, so a cron schedule
    /// never fires twice for the same instant.
    fn next_fire(&self, now: DateTime<Utc>, previous: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        match self.definition.kind {
            ScheduleKind::Once => self.definition.execute_at,
            ScheduleKind::Interval => self
                .definition
                .interval_ms
                .map(|ms| now + chrono::Duration::milliseconds(ms as i64)),
            ScheduleKind::Cron => {
                let after = previous.map_or(now, |p| p.max(now));
                self.cron.as_ref().and_then(|c| c.next_after(after))
            }
        }
    }

    fn snapshot(&self) -> ScheduledWorkflow {
        ScheduledWorkflow {
            definition: self.definition.clone(),
            template: self.template.clone(),
        }
    }
}

/// What a firing hands back to its timer task.
enum FireOutcome {
    Rearm,
    Stop,
}

pub struct WorkflowScheduler {
    engine: Arc<WorkflowEngine>,
    sink: Arc<dyn ReportSink>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    schedules: Mutex<HashMap<String, ScheduleEntry>>,
    events: broadcast::Sender<ScheduleEvent>,
    shutdown: CancellationToken,
}

impl WorkflowScheduler {
    /// Create a scheduler firing workflows on `engine`. Uses the engine's clock.
    pub fn new(engine: Arc<WorkflowEngine>, sink: Arc<dyn ReportSink>, config: &SchedulerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            clock: engine.clock(),
            engine,
            sink,
            config: config.clone(),
            schedules: Mutex::new(HashMap::new()),
            events,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Receive an event after every firing.
    pub fn subscribe(&self) -> broadcast::Receiver<ScheduleEvent> {
        self.events.subscribe()
    }

    /// Register a schedule and arm its timer.
    pub fn schedule(
        self: &Arc<Self>,
        template: WorkflowTemplate,
        spec: ScheduleSpec,
    ) -> Result<ScheduledWorkflow, SchedulerError> {
        let cron = spec.validate(self.config.min_interval_ms)?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = self.clock.now();

        let entry = ScheduleEntry {
            definition: ScheduleDefinition::new(&id, &template.id, &spec, now),
            template,
            cron,
            timer: None,
            generation: 0,
        };

        // Arm under the lock so the timer task sees the entry.
        let scheduled = {
            let mut schedules = self.schedules.lock();
            let entry = schedules.entry(id.clone()).or_insert(entry);
            self.arm(&id, entry);
            entry.snapshot()
        };

        info!(
            schedule_id = %id,
            kind = ?scheduled.definition.kind,
            next_fire_at = ?scheduled.definition.next_fire_at,
            "Workflow scheduled"
        );
        Ok(scheduled)
    }

    /// Merge `update` into the schedule and re-arm it. A paused schedule
    /// stays paused. Returns `Ok(false)` if the schedule does not exist; an
    /// invalid merged definition leaves the schedule untouched.
    pub fn update(self: &Arc<Self>, schedule_id: &str, update: ScheduleUpdate) -> Result<bool, SchedulerError> {
        let mut schedules = self.schedules.lock();
        let Some(entry) = schedules.get_mut(schedule_id) else {
            return Ok(false);
        };

        let spec = update.apply_to(&entry.definition.spec());
        let cron = spec.validate(self.config.min_interval_ms)?;

        entry.tear_down();
        entry.definition.set_spec(&spec);
        entry.cron = cron;

        if entry.definition.status == ScheduleState::Paused {
            entry.definition.next_fire_at = None;
        } else {
            self.arm(schedule_id, entry);
        }

        info!(schedule_id = %schedule_id, kind = ?spec.kind, "Schedule updated");
        Ok(true)
    }

    /// Tear down the timer. False if unknown, already paused or completed.
    /// A `once` schedule cannot be paused after it fired.
    pub fn pause(&self, schedule_id: &str) -> bool {
        let mut schedules = self.schedules.lock();
        let Some(entry) = schedules.get_mut(schedule_id) else {
            return false;
        };
        if entry.is_spent()
            || matches!(
                entry.definition.status,
                ScheduleState::Paused | ScheduleState::Completed
            )
        {
            return false;
        }

        entry.tear_down();
        entry.definition.status = ScheduleState::Paused;
        info!(schedule_id = %schedule_id, "Schedule paused");
        true
    }

    /// Re-arm a paused schedule. False if unknown or not paused.
    pub fn resume(self: &Arc<Self>, schedule_id: &str) -> bool {
        let mut schedules = self.schedules.lock();
        let Some(entry) = schedules.get_mut(schedule_id) else {
            return false;
        };
        if entry.definition.status != ScheduleState::Paused || entry.is_spent() {
            return false;
        }

        self.arm(schedule_id, entry);
        info!(
            schedule_id = %schedule_id,
            next_fire_at = ?entry.definition.next_fire_at,
            "Schedule resumed"
        );
        true
    }

    /// Tear down the timer and forget the schedule. A firing already in
    /// progress finishes but is not recorded.
    pub fn delete(&self, schedule_id: &str) -> bool {
        let Some(mut entry) = self.schedules.lock().remove(schedule_id) else {
            return false;
        };
        entry.tear_down();
        info!(schedule_id = %schedule_id, "Schedule deleted");
        true
    }

    pub fn get(&self, schedule_id: &str) -> Option<ScheduledWorkflow> {
        self.schedules.lock().get(schedule_id).map(ScheduleEntry::snapshot)
    }

    /// All schedules, oldest first.
    pub fn list(&self) -> Vec<ScheduledWorkflow> {
        let mut all: Vec<ScheduledWorkflow> = self
            .schedules
            .lock()
            .values()
            .map(ScheduleEntry::snapshot)
            .collect();
        all.sort_by(|a, b| a.definition.created_at.cmp(&b.definition.created_at));
        all
    }

    pub fn statistics(&self) -> SchedulerStatistics {
        let schedules = self.schedules.lock();
        let mut stats = SchedulerStatistics {
            total: schedules.len(),
            ..SchedulerStatistics::default()
        };

        for entry in schedules.values() {
            let definition = &entry.definition;
            match definition.status {
                ScheduleState::Scheduled | ScheduleState::Running => stats.active += 1,
                ScheduleState::Paused => stats.paused += 1,
                ScheduleState::Completed => stats.completed += 1,
                ScheduleState::Failed => stats.failed += 1,
            }
            if definition.status != ScheduleState::Paused {
                if let Some(next) = definition.next_fire_at {
                    stats.earliest_next_fire = Some(match stats.earliest_next_fire {
                        Some(current) => current.min(next),
                        None => next,
                    });
                }
            }
        }
        stats
    }

    /// Tear down every timer. Definitions stay queryable.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        for entry in self.schedules.lock().values_mut() {
            entry.tear_down();
        }
        info!("Workflow scheduler shut down");
    }

    /// Compute the next fire time and spawn a timer task for `entry`.
    fn arm(self: &Arc<Self>, schedule_id: &str, entry: &mut ScheduleEntry) {
        entry.tear_down();

        let now = self.clock.now();
        entry.definition.next_fire_at = entry.next_fire(now, None);
        entry.definition.status = ScheduleState::Scheduled;

        let token = self.shutdown.child_token();
        entry.timer = Some(token.clone());
        let generation = entry.generation;

        let this = self.clone();
        let schedule_id = schedule_id.to_string();
        tokio::spawn(async move {
            loop {
                let Some(delay) = this.delay_until_fire(&schedule_id, generation) else {
                    break;
                };
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                match this.fire(&schedule_id, generation).await {
                    FireOutcome::Rearm => continue,
                    FireOutcome::Stop => break,
                }
            }
            debug!(schedule_id = %schedule_id, generation, "Schedule timer stopped");
        });
    }

    fn delay_until_fire(&self, schedule_id: &str, generation: u64) -> Option<std::time::Duration> {
        let schedules = self.schedules.lock();
        let entry = schedules.get(schedule_id)?;
        if entry.generation != generation {
            return None;
        }
        let next = entry.definition.next_fire_at?;
        Some((next - self.clock.now()).to_std().unwrap_or_default())
    }

    async fn fire(&self, schedule_id: &str, generation: u64) -> FireOutcome {
        let fired_at = self.clock.now();

        let workflow = {
            let mut schedules = self.schedules.lock();
            let Some(entry) = schedules.get_mut(schedule_id) else {
                return FireOutcome::Stop;
            };
            if entry.generation != generation {
                return FireOutcome::Stop;
            }

            let workflow = entry.template.instantiate(&self.engine);
            let definition = &mut entry.definition;
            definition.status = ScheduleState::Running;
            definition.last_fired_at = Some(fired_at);
            definition.last_workflow_id = Some(workflow.id.clone());
            definition.fire_count += 1;
            workflow
        };
        let workflow_id = workflow.id.clone();

        info!(schedule_id = %schedule_id, workflow_id = %workflow_id, "Schedule fired");
        let result = self.engine.execute(workflow).await;
        let error = if result.is_success() {
            None
        } else {
            Some(SchedulerError::ExecutionFailed(failure_summary(&result)).to_string())
        };

        let (outcome, report) = {
            let mut schedules = self.schedules.lock();
            let Some(entry) = schedules.get_mut(schedule_id) else {
                debug!(schedule_id = %schedule_id, "Schedule deleted during firing");
                return FireOutcome::Stop;
            };

            entry.definition.last_error = error.clone();

            // A pause or update during the run re-owns status and timing.
            let outcome = if entry.generation != generation {
                FireOutcome::Stop
            } else {
                let recurring = entry.definition.is_recurring();
                entry.definition.status = match (&error, recurring) {
                    (Some(_), _) => ScheduleState::Failed,
                    (None, true) => ScheduleState::Scheduled,
                    (None, false) => ScheduleState::Completed,
                };
                entry.definition.next_fire_at = if recurring {
                    entry.next_fire(fired_at, entry.definition.next_fire_at)
                } else {
                    None
                };

                if entry.definition.next_fire_at.is_some() {
                    FireOutcome::Rearm
                } else {
                    entry.timer = None;
                    FireOutcome::Stop
                }
            };
            (outcome, schedule_report(&entry.definition, &result, self.clock.now()))
        };

        if let Some(e) = &error {
            warn!(schedule_id = %schedule_id, workflow_id = %workflow_id, error = %e, "Scheduled workflow failed");
        }

        let key = format!("schedule-{}", schedule_id);
        if let Err(e) = self.sink.write(&key, &report).await {
            warn!(schedule_id = %schedule_id, sink = self.sink.name(), error = %e, "Failed to write schedule report");
        }

        // No subscribers is fine.
        let _ = self.events.send(ScheduleEvent {
            schedule_id: schedule_id.to_string(),
            workflow_id,
            fired_at,
            workflow_status: result.status,
            error,
        });

        outcome
    }
}

fn failure_summary(result: &WorkflowExecutionResult) -> String {
    if result.errors.is_empty() {
        format!("workflow ended {}", result.status)
    } else {
        result.errors.join("; ")
    }
}

fn schedule_report(
    definition: &ScheduleDefinition,
    result: &WorkflowExecutionResult,
    generated_at: DateTime<Utc>,
) -> serde_json::Value {
    json!({
        "schedule": definition,
        "lastExecution": {
            "workflowId": result.workflow_id,
            "status": result.status,
            "success": result.is_success(),
            "durationMs": result.metrics.duration_ms,
            "totalSteps": result.metrics.total_steps,
            "completedSteps": result.metrics.completed_steps,
            "failedSteps": result.metrics.failed_steps,
            "errors": result.errors,
        },
        "generatedAt": generated_at.to_rfc3339(),
    })
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
