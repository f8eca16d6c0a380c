//! Cron expression evaluation.
//!
//! Accepts the 6/7-field form of the `cron` crate
//! (`second minute hour day_of_month month day_of_week [year]`) and the
//! classic 5-field form, which is read with the seconds field fixed at `0`.
//!
//! Examples:
//! - `"*/5 * * * *"` - every 5 minutes
//! - `"0 0 9 * * MON-FRI"` - 9 AM on weekdays

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::SchedulerError;

#[derive(Debug, Clone)]
pub struct CronSchedule {
    expr: String,
    schedule: Schedule,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, SchedulerError> {
        let trimmed = expr.trim();
        let normalized = if trimmed.split_whitespace().count() == 5 {
            format!("0 {}", trimmed)
        } else {
            trimmed.to_string()
        };

        let schedule = Schedule::from_str(&normalized).map_err(|e| SchedulerError::InvalidCron {
            expr: expr.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            expr: expr.to_string(),
            schedule,
        })
    }

    /// The expression as supplied.
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// First matching time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }
}
