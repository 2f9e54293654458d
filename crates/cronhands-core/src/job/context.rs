//! Execution context handed to running jobs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::key::{JobKey, TriggerKey};

/// What caused an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireKind {
    /// The cron trigger came due.
    Scheduled,
    /// A manual fire request.
    Manual,
}

/// Context of a single execution.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Unique id of this fire.
    pub fire_id: Uuid,
    pub job_key: JobKey,
    pub trigger_key: TriggerKey,
    pub kind: FireKind,
    /// When the execution was dispatched.
    pub fired_at: DateTime<Utc>,
    /// The cron instant this fire belongs to, `None` for manual fires.
    pub scheduled_for: Option<DateTime<Utc>>,
    data: Arc<[String]>,
}

impl JobContext {
    pub fn new(
        job_key: JobKey,
        kind: FireKind,
        scheduled_for: Option<DateTime<Utc>>,
        data: Arc<[String]>,
    ) -> Self {
        let trigger_key = TriggerKey::for_job(&job_key);
        Self {
            fire_id: Uuid::new_v4(),
            job_key,
            trigger_key,
            kind,
            fired_at: Utc::now(),
            scheduled_for,
            data,
        }
    }

    /// Static parameters configured for the job.
    pub fn parameters(&self) -> &[String] {
        &self.data
    }

    /// Parameter at `index`, if configured.
    pub fn parameter(&self, index: usize) -> Option<&str> {
        self.data.get(index).map(String::as_str)
    }

    pub fn is_manual(&self) -> bool {
        self.kind == FireKind::Manual
    }
}
