//! # AutoFlow Protocols
//!
//! Interface definitions for the collaborators the orchestration core calls
//! through. Contains only traits and the value types that cross them.
//!
//! ## Core Traits
//!
//! - [`StepExecutor`] - Performs the domain work of one named workflow step
//! - [`ReasoningFallback`] - External reasoning service used for unknown steps
//! - [`ReportSink`] - Destination for JSON reports
//! - [`ResourceProbe`] - Source of memory/CPU readings
//! - [`Clock`] - Wall-clock abstraction for deterministic tests

pub mod clock;
pub mod error;
pub mod probe;
pub mod reasoning;
pub mod sink;
pub mod step;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ProbeError, ReasoningError, SinkError, StepError};
pub use probe::{ResourceProbe, ResourceReading};
pub use reasoning::ReasoningFallback;
pub use sink::ReportSink;
pub use step::{Goal, StepContext, StepExecutor, StepOutput};
