//! Workflow templates instantiated on every firing.

use serde::{Deserialize, Serialize};

use autoflow_engine::{Workflow, WorkflowEngine, WorkflowStep};
use autoflow_protocols::Goal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTemplate {
    pub name: String,
    pub description: String,
}

/// Goal and step list a schedule creates workflows from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub id: String,
    pub goal: Goal,
    pub steps: Vec<StepTemplate>,
}

impl WorkflowTemplate {
    pub fn new(id: impl Into<String>, goal: Goal) -> Self {
        Self {
            id: id.into(),
            goal,
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.steps.push(StepTemplate {
            name: name.into(),
            description: description.into(),
        });
        self
    }

    /// Create a fresh pending workflow on `engine`.
    pub fn instantiate(&self, engine: &WorkflowEngine) -> Workflow {
        let steps = self
            .steps
            .iter()
            .map(|s| WorkflowStep::new(s.name.clone(), s.description.clone()))
            .collect();
        engine.create_workflow(self.goal.clone(), steps)
    }
}
