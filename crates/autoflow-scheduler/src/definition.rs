//! Schedule definitions and the values the scheduler reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use autoflow_engine::WorkflowState;

use crate::cron_expr::CronSchedule;
use crate::error::SchedulerError;
use crate::template::WorkflowTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Once,
    Interval,
    Cron,
}

impl ScheduleKind {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, ScheduleKind::Once)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleState {
    /// Armed and waiting for the next fire.
    Scheduled,
    /// A fired workflow is executing.
    Running,
    /// Timer torn down until resumed.
    Paused,
    /// A `once` schedule that fired successfully.
    Completed,
    /// The last firing failed. Recurring schedules stay armed.
    Failed,
}

impl std::fmt::Display for ScheduleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScheduleState::Scheduled => "scheduled",
            ScheduleState::Running => "running",
            ScheduleState::Paused => "paused",
            ScheduleState::Completed => "completed",
            ScheduleState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// When a schedule fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    pub kind: ScheduleKind,
    #[serde(default)]
    pub execute_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub interval_ms: Option<u64>,
    #[serde(default)]
    pub cron_expr: Option<String>,
}

impl ScheduleSpec {
    pub fn once(execute_at: DateTime<Utc>) -> Self {
        Self {
            kind: ScheduleKind::Once,
            execute_at: Some(execute_at),
            interval_ms: None,
            cron_expr: None,
        }
    }

    pub fn interval(interval_ms: u64) -> Self {
        Self {
            kind: ScheduleKind::Interval,
            execute_at: None,
            interval_ms: Some(interval_ms),
            cron_expr: None,
        }
    }

    pub fn cron(expr: impl Into<String>) -> Self {
        Self {
            kind: ScheduleKind::Cron,
            execute_at: None,
            interval_ms: None,
            cron_expr: Some(expr.into()),
        }
    }

    /// Check the fields `kind` needs. Returns the parsed cron expression
    /// for cron schedules.
    pub fn validate(&self, min_interval_ms: u64) -> Result<Option<CronSchedule>, SchedulerError> {
        match self.kind {
            ScheduleKind::Once => {
                if self.execute_at.is_none() {
                    return Err(SchedulerError::MissingField("execute_at".to_string()));
                }
                Ok(None)
            }
            ScheduleKind::Interval => {
                let interval_ms = self
                    .interval_ms
                    .ok_or_else(|| SchedulerError::MissingField("interval_ms".to_string()))?;
                if interval_ms < min_interval_ms {
                    return Err(SchedulerError::IntervalTooSmall {
                        interval_ms,
                        min_ms: min_interval_ms,
                    });
                }
                Ok(None)
            }
            ScheduleKind::Cron => {
                let expr = self
                    .cron_expr
                    .as_deref()
                    .ok_or_else(|| SchedulerError::MissingField("cron_expr".to_string()))?;
                CronSchedule::parse(expr).map(Some)
            }
        }
    }
}

/// Partial update merged into an existing schedule. `None` keeps the
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    #[serde(default)]
    pub kind: Option<ScheduleKind>,
    #[serde(default)]
    pub execute_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub interval_ms: Option<u64>,
    #[serde(default)]
    pub cron_expr: Option<String>,
}

impl ScheduleUpdate {
    pub fn with_kind(mut self, kind: ScheduleKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_execute_at(mut self, execute_at: DateTime<Utc>) -> Self {
        self.execute_at = Some(execute_at);
        self
    }

    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = Some(interval_ms);
        self
    }

    pub fn with_cron_expr(mut self, expr: impl Into<String>) -> Self {
        self.cron_expr = Some(expr.into());
        self
    }

    /// Merge into `spec`, producing the updated spec.
    pub fn apply_to(&self, spec: &ScheduleSpec) -> ScheduleSpec {
        ScheduleSpec {
            kind: self.kind.unwrap_or(spec.kind),
            execute_at: self.execute_at.or(spec.execute_at),
            interval_ms: self.interval_ms.or(spec.interval_ms),
            cron_expr: self.cron_expr.clone().or_else(|| spec.cron_expr.clone()),
        }
    }
}

/// A registered schedule and its firing bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDefinition {
    pub id: String,
    pub workflow_template_id: String,
    pub kind: ScheduleKind,
    pub execute_at: Option<DateTime<Utc>>,
    pub interval_ms: Option<u64>,
    pub cron_expr: Option<String>,
    pub status: ScheduleState,
    pub created_at: DateTime<Utc>,
    /// Not maintained while paused.
    pub next_fire_at: Option<DateTime<Utc>>,
    pub last_fired_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Workflow created by the most recent firing.
    pub last_workflow_id: Option<String>,
    pub fire_count: u64,
}

impl ScheduleDefinition {
    pub fn new(
        id: impl Into<String>,
        workflow_template_id: impl Into<String>,
        spec: &ScheduleSpec,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            workflow_template_id: workflow_template_id.into(),
            kind: spec.kind,
            execute_at: spec.execute_at,
            interval_ms: spec.interval_ms,
            cron_expr: spec.cron_expr.clone(),
            status: ScheduleState::Scheduled,
            created_at,
            next_fire_at: None,
            last_fired_at: None,
            last_error: None,
            last_workflow_id: None,
            fire_count: 0,
        }
    }

    pub fn spec(&self) -> ScheduleSpec {
        ScheduleSpec {
            kind: self.kind,
            execute_at: self.execute_at,
            interval_ms: self.interval_ms,
            cron_expr: self.cron_expr.clone(),
        }
    }

    pub(crate) fn set_spec(&mut self, spec: &ScheduleSpec) {
        self.kind = spec.kind;
        self.execute_at = spec.execute_at;
        self.interval_ms = spec.interval_ms;
        self.cron_expr = spec.cron_expr.clone();
    }

    pub fn is_recurring(&self) -> bool {
        self.kind.is_recurring()
    }
}

/// Schedule plus the template it instantiates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledWorkflow {
    pub definition: ScheduleDefinition,
    pub template: WorkflowTemplate,
}

/// Broadcast after every firing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub schedule_id: String,
    pub workflow_id: String,
    pub fired_at: DateTime<Utc>,
    pub workflow_status: WorkflowState,
    pub error: Option<String>,
}

impl ScheduleEvent {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStatistics {
    pub total: usize,
    /// Scheduled or running.
    pub active: usize,
    pub paused: usize,
    pub completed: usize,
    pub failed: usize,
    /// Earliest pending fire across schedules that are not paused.
    pub earliest_next_fire: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_once_requires_time() {
        let spec = ScheduleSpec {
            kind: ScheduleKind::Once,
            execute_at: None,
            interval_ms: Some(1000),
            cron_expr: None,
        };
        let err = spec.validate(1000).unwrap_err();
        assert!(matches!(err, SchedulerError::MissingField(f) if f == "execute_at"));
        assert!(ScheduleSpec::once(Utc::now()).validate(1000).unwrap().is_none());
    }

    #[test]
    fn test_validate_interval_minimum() {
        assert!(ScheduleSpec::interval(1000).validate(1000).is_ok());
        let err = ScheduleSpec::interval(999).validate(1000).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::IntervalTooSmall {
                interval_ms: 999,
                min_ms: 1000
            }
        ));
    }

    #[test]
    fn test_validate_cron_parses() {
        let cron = ScheduleSpec::cron("0 * * * *").validate(1000).unwrap();
        assert_eq!(cron.unwrap().expr(), "0 * * * *");
        assert!(ScheduleSpec::cron("every day").validate(1000).is_err());
    }

    #[test]
    fn test_update_merges_fields() {
        let spec = ScheduleSpec::interval(5000);
        let merged = ScheduleUpdate::default().with_interval_ms(2000).apply_to(&spec);
        assert_eq!(merged.kind, ScheduleKind::Interval);
        assert_eq!(merged.interval_ms, Some(2000));

        let merged = ScheduleUpdate::default()
            .with_kind(ScheduleKind::Cron)
            .with_cron_expr("*/5 * * * *")
            .apply_to(&spec);
        assert_eq!(merged.kind, ScheduleKind::Cron);
        assert_eq!(merged.cron_expr.as_deref(), Some("*/5 * * * *"));
        assert_eq!(merged.interval_ms, Some(5000));
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(
            serde_json::to_string(&ScheduleState::Scheduled).unwrap(),
            "\"scheduled\""
        );
        assert_eq!(ScheduleState::Paused.to_string(), "paused");
        assert!(ScheduleKind::Cron.is_recurring());
        assert!(!ScheduleKind::Once.is_recurring());
    }
}
