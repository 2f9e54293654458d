//! Scheduler abstraction.
//!
//! The engine talks to a [`SchedulerBackend`] only. A backend owns the
//! time-based firing of jobs: it parses cron expressions, computes fire
//! times, runs executions on its worker pool and reports every outcome to
//! the registered [`JobListener`]s.

mod cron_scheduler;

pub use cron_scheduler::{parse_cron, CronScheduler, CronSchedulerConfig};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{JobExecutionError, SchedulerResult};
use crate::job::{JobContext, JobKey, TriggerKey};

/// Work executed by a backend on each fire.
///
/// Called on a worker thread. Implementations report failures through
/// the returned error and should not panic.
pub trait Job: Send + Sync {
    fn execute(&self, ctx: &JobContext) -> Result<(), JobExecutionError>;
}

/// A job as registered with a backend.
#[derive(Clone)]
pub struct JobDetail {
    pub key: JobKey,
    pub job: Arc<dyn Job>,
    /// Static parameters made available to every execution.
    pub data: Arc<[String]>,
    /// Whether executions may overlap.
    pub allow_concurrent: bool,
    pub description: Option<String>,
}

impl JobDetail {
    pub fn new(key: JobKey, job: Arc<dyn Job>) -> Self {
        Self {
            key,
            job,
            data: Arc::from(Vec::<String>::new()),
            allow_concurrent: true,
            description: None,
        }
    }

    pub fn with_data(mut self, data: Arc<[String]>) -> Self {
        self.data = data;
        self
    }

    pub fn with_allow_concurrent(mut self, allow_concurrent: bool) -> Self {
        self.allow_concurrent = allow_concurrent;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

impl fmt::Debug for JobDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDetail")
            .field("key", &self.key)
            .field("data", &self.data)
            .field("allow_concurrent", &self.allow_concurrent)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A cron trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub key: TriggerKey,
    pub cron_expression: String,
}

impl Trigger {
    /// The cron trigger of `job`.
    pub fn cron(job: &JobKey, cron_expression: impl Into<String>) -> Self {
        Self {
            key: TriggerKey::for_job(job),
            cron_expression: cron_expression.into(),
        }
    }
}

/// Live view of a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerInfo {
    pub key: TriggerKey,
    pub cron_expression: String,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub previous_fire_time: Option<DateTime<Utc>>,
}

/// Trigger state as reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerState {
    Normal,
    Paused,
    /// A non-concurrent job is still running from a previous fire.
    Blocked,
    /// No further fire times.
    Complete,
    /// The backend hit a fault running the job.
    Error,
    Unknown,
}

impl TriggerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Paused => "PAUSED",
            Self::Blocked => "BLOCKED",
            Self::Complete => "COMPLETE",
            Self::Error => "ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer of job executions.
///
/// Called on the worker thread that ran the job, after every execution
/// regardless of outcome.
pub trait JobListener: Send + Sync {
    fn name(&self) -> &str;

    fn on_job_started(&self, _ctx: &JobContext) {}

    fn on_job_completed(&self, ctx: &JobContext, result: &Result<(), JobExecutionError>);
}

/// Cron-capable scheduler the engine delegates to.
#[async_trait]
pub trait SchedulerBackend: Send + Sync {
    /// Start firing triggers.
    async fn start(&self) -> SchedulerResult<()>;

    /// Stop firing triggers. With `wait_for_jobs`, returns once in-flight
    /// executions have finished.
    async fn shutdown(&self, wait_for_jobs: bool) -> SchedulerResult<()>;

    fn is_started(&self) -> bool;

    fn is_shutdown(&self) -> bool;

    async fn check_exists(&self, key: &JobKey) -> SchedulerResult<bool>;

    /// Register a job with its trigger. Fails with
    /// [`SchedulerError::AlreadyExists`](crate::SchedulerError::AlreadyExists)
    /// if the key is taken. Returns the first fire time.
    async fn schedule_job(&self, job: JobDetail, trigger: Trigger)
        -> SchedulerResult<Option<DateTime<Utc>>>;

    /// Fire a job once, now, independent of its schedule.
    async fn trigger_job(&self, key: &JobKey) -> SchedulerResult<()>;

    async fn pause_job(&self, key: &JobKey) -> SchedulerResult<()>;

    async fn resume_job(&self, key: &JobKey) -> SchedulerResult<()>;

    /// Remove a job and its trigger. Returns whether it existed.
    async fn unschedule_job(&self, key: &JobKey) -> SchedulerResult<bool>;

    async fn job_group_names(&self) -> SchedulerResult<Vec<String>>;

    async fn job_keys(&self, group: &str) -> SchedulerResult<Vec<JobKey>>;

    async fn triggers_of_job(&self, key: &JobKey) -> SchedulerResult<Vec<TriggerInfo>>;

    async fn trigger_state(&self, key: &TriggerKey) -> SchedulerResult<TriggerState>;

    fn add_listener(&self, listener: Arc<dyn JobListener>);
}
