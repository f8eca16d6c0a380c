//! # AutoFlow Scheduler
//!
//! Triggers workflow runs from templates on a schedule.
//!
//! - `once`: fire at a fixed instant (immediately if already due)
//! - `interval`: fire every N milliseconds
//! - `cron`: fire at the times matched by a cron expression
//!
//! Each armed schedule owns one timer task. Pause, update and delete tear
//! the task down; a firing that is already executing runs to completion.

pub mod cron_expr;
pub mod definition;
pub mod error;
pub mod scheduler;
pub mod template;

pub use cron_expr::CronSchedule;
pub use definition::{
    ScheduleDefinition, ScheduleEvent, ScheduleKind, ScheduleSpec, ScheduleState,
    ScheduleUpdate, ScheduledWorkflow, SchedulerStatistics,
};
pub use error::SchedulerError;
pub use scheduler::WorkflowScheduler;
pub use template::{StepTemplate, WorkflowTemplate};
