//! Read view of scheduled jobs.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scheduler::TriggerState;

/// One registered job as seen by the scheduler at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledJobSnapshot {
    pub name: String,
    pub group: String,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub state: TriggerState,
}
