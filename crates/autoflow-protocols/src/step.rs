//! Step executor trait and the values passed across it.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StepError;

/// Caller-supplied description of intent.
///
/// Immutable once a workflow has been created from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Free-text description.
    pub description: String,
    /// Structured metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Goal {
    /// Create a goal from a description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            metadata: HashMap::new(),
        }
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Owned snapshot handed to a step executor.
///
/// Executors never see the live workflow record, only this copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepContext {
    pub workflow_id: String,
    pub goal: Goal,
    pub step_name: String,
    pub step_description: String,
    /// Zero-based position of the step in the workflow.
    pub step_index: usize,
    pub total_steps: usize,
    /// Outputs of the steps that already completed in this run, keyed by step name.
    #[serde(default)]
    pub previous_outputs: HashMap<String, serde_json::Value>,
}

impl StepContext {
    /// Output of an earlier step in the same run.
    pub fn output_of(&self, step_name: &str) -> Option<&serde_json::Value> {
        self.previous_outputs.get(step_name)
    }
}

/// Payload produced by a step executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    pub payload: serde_json::Value,
    /// Set when the executor substituted a synthetic result because an
    /// optional dependency failed. Holds the reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl StepOutput {
    /// A genuine result.
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            degraded: None,
        }
    }

    /// A synthetic result standing in for a failed dependency.
    pub fn degraded(payload: serde_json::Value, reason: impl Into<String>) -> Self {
        Self {
            payload,
            degraded: Some(reason.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Core trait for step implementations.
///
/// Executors are looked up by step name and may be invoked concurrently for
/// different workflows, so they must not rely on shared mutable state.
///
/// Restarting a workflow resumes at its first failed step and treats the
/// earlier steps as already satisfied without re-running them. Executors
/// must therefore be idempotent on resume: running a step again after a
/// partial earlier run has to converge on the same result.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Name of the step this executor handles.
    fn name(&self) -> &str;

    /// Perform the step.
    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, StepError>;
}
