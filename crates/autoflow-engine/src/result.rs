//! Execution results returned by [`crate::WorkflowEngine::execute`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use autoflow_protocols::ResourceReading;

use crate::workflow::WorkflowState;

/// Outcome of a single step attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    /// Completed with a synthetic result after an optional dependency failed.
    Degraded,
    Failed,
    Skipped,
}

impl StepOutcome {
    /// Completed or degraded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::Degraded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecutionResult {
    pub step_name: String,
    pub status: StepOutcome,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub resource_sample: Option<ResourceReading>,
}

impl StepExecutionResult {
    pub(crate) fn skipped(step_name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            step_name: step_name.into(),
            status: StepOutcome::Skipped,
            started_at: at,
            ended_at: at,
            duration_ms: 0,
            output: None,
            error: None,
            resource_sample: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    pub total_steps: usize,
    /// Includes degraded steps.
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
    pub duration_ms: u64,
    /// `completed_steps / total_steps`; 1.0 for a workflow without steps.
    pub success_rate: f64,
}

/// Result of one engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecutionResult {
    pub workflow_id: String,
    pub status: WorkflowState,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub steps: Vec<StepExecutionResult>,
    pub progress_percent: f64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: ExecutionMetrics,
}

impl WorkflowExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == WorkflowState::Completed
    }

    /// Result for a given step name.
    pub fn step(&self, name: &str) -> Option<&StepExecutionResult> {
        self.steps.iter().find(|s| s.step_name == name)
    }

    /// Sum of step durations, in milliseconds.
    pub fn total_step_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.duration_ms).sum()
    }
}
