//! # Timer Info
//!
//! Passive description of one timer firing, handed to timer functions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How late a tick may fire before it counts as past due
const PAST_DUE_TOLERANCE_MS: i64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerInfo {
    /// Cron expression that produced the tick
    pub schedule: String,

    /// Instant the scheduler aimed for
    pub scheduled_at: DateTime<Utc>,

    /// Instant the tick actually fired
    pub fired_at: DateTime<Utc>,

    /// Fired noticeably later than scheduled
    pub is_past_due: bool,
}

impl TimerInfo {
    pub fn new(schedule: impl Into<String>, scheduled_at: DateTime<Utc>, fired_at: DateTime<Utc>) -> Self {
        let is_past_due = fired_at - scheduled_at > Duration::milliseconds(PAST_DUE_TOLERANCE_MS);
        Self {
            schedule: schedule.into(),
            scheduled_at,
            fired_at,
            is_past_due,
        }
    }
}
