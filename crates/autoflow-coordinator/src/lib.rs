//! # AutoFlow Coordinator
//!
//! Top-level orchestration: create a workflow from a goal, execute it while
//! the monitor observes, then reduce engine and monitor output into an
//! analysis, recommendations and an overall health rating.

pub mod analysis;
pub mod coordinator;
pub mod error;
pub mod pipeline;
pub mod recommendation;

pub use analysis::{
    AnalysisResult, Analyzer, Bottleneck, ExecutionAnalysis, HealthStatus, PerformanceAnalysis,
    QualityAnalysis, ResourceSnapshot,
};
pub use coordinator::{
    MonitoringSnapshot, OrchestrationCoordinator, OrchestrationResult, OrchestrationSummary,
    report_key,
};
pub use error::CoordinatorError;
pub use pipeline::{DEFAULT_PIPELINE, default_steps};
pub use recommendation::{Priority, Recommendation, RecommendationKind, recommend};
