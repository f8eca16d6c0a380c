//! Fallback executor for steps without a registered implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use autoflow_protocols::{
    ReasoningError, ReasoningFallback, StepContext, StepError, StepExecutor, StepOutput,
};

/// Asks the reasoning service to perform the step.
///
/// A reasoning failure never fails the step: the executor returns a
/// synthetic success payload marked as degraded.
pub struct GenericStepExecutor {
    reasoning: Arc<dyn ReasoningFallback>,
}

impl GenericStepExecutor {
    pub fn new(reasoning: Arc<dyn ReasoningFallback>) -> Self {
        Self { reasoning }
    }

    fn prompt(ctx: &StepContext) -> String {
        let goal = if ctx.goal.description.is_empty() {
            "N/A"
        } else {
            ctx.goal.description.as_str()
        };
        format!(
            "Execute the following workflow step.\n\n\
             Step: {}\n\
             Description: {}\n\
             Workflow goal: {}\n\n\
             Return the execution result as a JSON object.",
            ctx.step_name, ctx.step_description, goal
        )
    }

    fn synthetic(ctx: &StepContext) -> serde_json::Value {
        json!({
            "status": "completed",
            "message": format!("Step {} executed successfully", ctx.step_name),
            "timestamp": Utc::now().to_rfc3339(),
        })
    }
}

#[async_trait]
impl StepExecutor for GenericStepExecutor {
    fn name(&self) -> &str {
        "generic"
    }

    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, StepError> {
        debug!(workflow_id = %ctx.workflow_id, step = %ctx.step_name, "Executing generic step");

        match self.reasoning.complete(&Self::prompt(&ctx)).await {
            Ok(payload) => Ok(StepOutput::new(payload)),
            Err(e) => {
                warn!(
                    workflow_id = %ctx.workflow_id,
                    step = %ctx.step_name,
                    error = %e,
                    "Reasoning fallback failed, substituting synthetic result"
                );
                Ok(StepOutput::degraded(Self::synthetic(&ctx), e.to_string()))
            }
        }
    }
}

/// Reasoning fallback used when no service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledReasoning;

#[async_trait]
impl ReasoningFallback for DisabledReasoning {
    async fn complete(&self, _prompt: &str) -> Result<serde_json::Value, ReasoningError> {
        Err(ReasoningError::Unavailable(
            "no reasoning service configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoflow_protocols::Goal;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    struct RecordingReasoning {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ReasoningFallback for RecordingReasoning {
        async fn complete(&self, prompt: &str) -> Result<serde_json::Value, ReasoningError> {
            self.prompts.lock().push(prompt.to_string());
            Ok(json!({ "result": "done" }))
        }
    }

    fn context() -> StepContext {
        StepContext {
            workflow_id: "wf-1".to_string(),
            goal: Goal::new("Build a blog"),
            step_name: "optimization".to_string(),
            step_description: "Optimize the project".to_string(),
            step_index: 3,
            total_steps: 8,
            previous_outputs: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_generic_step_uses_reasoning() {
        let reasoning = Arc::new(RecordingReasoning {
            prompts: Mutex::new(Vec::new()),
        });
        let executor = GenericStepExecutor::new(reasoning.clone());

        let output = executor.execute(context()).await.unwrap();
        assert!(!output.is_degraded());
        assert_eq!(output.payload, json!({ "result": "done" }));

        let prompts = reasoning.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Step: optimization"));
        assert!(prompts[0].contains("Workflow goal: Build a blog"));
    }

    #[tokio::test]
    async fn test_generic_step_degrades_on_failure() {
        let executor = GenericStepExecutor::new(Arc::new(DisabledReasoning));

        let output = executor.execute(context()).await.unwrap();
        assert!(output.is_degraded());
        assert_eq!(output.payload["status"], "completed");
        assert_eq!(
            output.payload["message"],
            "Step optimization executed successfully"
        );
        assert!(output.degraded.unwrap().contains("no reasoning service"));
    }
}
