//! # AutoFlow Engine
//!
//! Runs an ordered list of steps for one workflow instance at a time,
//! applying the critical-step policy and producing a
//! [`WorkflowExecutionResult`] for every run.
//!
//! Steps are dispatched by name through a [`StepRegistry`]. Names without a
//! registered executor fall through to the [`GenericStepExecutor`], which
//! consults a reasoning service and degrades to a synthetic result when that
//! service is unavailable.

pub mod engine;
pub mod error;
pub mod fallback;
pub mod policy;
pub mod probe;
pub mod registry;
pub mod result;
pub mod workflow;

pub use engine::{WorkflowEngine, WorkflowStatusProvider};
pub use error::EngineError;
pub use fallback::{DisabledReasoning, GenericStepExecutor};
pub use policy::CriticalStepPolicy;
pub use probe::{FixedProbe, ProcessProbe};
pub use registry::StepRegistry;
pub use result::{ExecutionMetrics, StepExecutionResult, StepOutcome, WorkflowExecutionResult};
pub use workflow::{
    StepState, Workflow, WorkflowHistory, WorkflowState, WorkflowStatus, WorkflowStep,
};
