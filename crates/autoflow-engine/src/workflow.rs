//! Workflow and step records plus their read-only projections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use autoflow_protocols::Goal;

/// Lifecycle state of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowState {
    /// Whether no further transition can happen without a restart.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle state of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

/// One named unit of work within a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    pub description: String,
    pub status: StepState,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// Set when the step completed with a synthetic result.
    #[serde(default)]
    pub degraded: bool,
}

impl WorkflowStep {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            status: StepState::Pending,
            started_at: None,
            ended_at: None,
            error: None,
            degraded: false,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.status = StepState::Pending;
        self.started_at = None;
        self.ended_at = None;
        self.error = None;
        self.degraded = false;
    }
}

/// A workflow instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub goal: Goal,
    pub steps: Vec<WorkflowStep>,
    pub current_step_index: usize,
    pub status: WorkflowState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Workflow {
    /// Build a pending workflow with a fresh id.
    pub fn new(goal: Goal, steps: Vec<WorkflowStep>, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("workflow-{}", uuid::Uuid::new_v4()),
            goal,
            steps,
            current_step_index: 0,
            status: WorkflowState::Pending,
            created_at: now,
            updated_at: now,
            started_at: None,
            ended_at: None,
        }
    }

    /// Count steps in the given state.
    pub fn count(&self, state: StepState) -> usize {
        self.steps.iter().filter(|s| s.status == state).count()
    }

    /// Mark every step that has not finished as skipped.
    pub(crate) fn skip_unfinished(&mut self, now: DateTime<Utc>) {
        for step in &mut self.steps {
            if matches!(step.status, StepState::Pending | StepState::InProgress) {
                step.status = StepState::Skipped;
                step.ended_at = Some(now);
            }
        }
    }

    pub fn status_view(&self) -> WorkflowStatus {
        let total = self.steps.len();
        let completed = self.count(StepState::Completed);
        let failed = self.count(StepState::Failed);
        let skipped = self.count(StepState::Skipped);
        let progress_percent = if total == 0 {
            if self.status.is_terminal() { 100.0 } else { 0.0 }
        } else {
            (completed + failed + skipped) as f64 / total as f64 * 100.0
        };

        WorkflowStatus {
            id: self.id.clone(),
            status: self.status,
            current_step: self
                .steps
                .get(self.current_step_index)
                .filter(|_| self.status == WorkflowState::Running)
                .map(|s| s.name.clone()),
            progress_percent,
            total_steps: total,
            completed_steps: completed,
            failed_steps: failed,
            skipped_steps: skipped,
            degraded_steps: self.steps.iter().filter(|s| s.degraded).count(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn history_view(&self) -> WorkflowHistory {
        let duration_ms = match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0) as u64),
            _ => None,
        };
        WorkflowHistory {
            id: self.id.clone(),
            status: self.status,
            started_at: self.started_at,
            ended_at: self.ended_at,
            duration_ms,
            steps_count: self.steps.len(),
            goal: self.goal.description.clone(),
        }
    }
}

/// Point-in-time projection of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub id: String,
    pub status: WorkflowState,
    /// Step currently executing, only while running.
    pub current_step: Option<String>,
    pub progress_percent: f64,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
    pub degraded_steps: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Summary of a finished workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowHistory {
    pub id: String,
    pub status: WorkflowState,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub steps_count: usize,
    pub goal: String,
}
