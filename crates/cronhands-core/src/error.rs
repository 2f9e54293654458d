//! Error types for the job engine.

use std::any::Any;

use thiserror::Error;

use crate::job::JobKey;

/// Errors reported by a [`SchedulerBackend`](crate::scheduler::SchedulerBackend).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler has not been started yet.
    #[error("Scheduler has not been started")]
    NotStarted,

    /// The scheduler has been shut down.
    #[error("Scheduler has been shut down")]
    ShutDown,

    /// A job with the same key is already scheduled.
    #[error("Job already exists: {0}")]
    AlreadyExists(JobKey),

    /// No job with the given key is scheduled.
    #[error("Job not found: {0}")]
    JobNotFound(JobKey),

    /// The cron expression could not be parsed.
    #[error("Invalid cron expression '{expression}': {message}")]
    InvalidCron { expression: String, message: String },

    /// Backend specific failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for scheduler backend operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors surfaced by the [`Engine`](crate::Engine).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The scheduler backend could not be started. This is the only fatal
    /// engine error.
    #[error("Failed to start scheduler: {0}")]
    Startup(#[source] SchedulerError),

    /// A scheduler call made on behalf of the caller failed.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// A job execution that did not complete successfully.
///
/// Produced by the invoker for every failed run and handed to the
/// scheduler's listeners. The source error is flattened into a message.
#[derive(Debug, Clone, Error)]
pub enum JobExecutionError {
    /// The job method returned an error.
    #[error("Job {key} failed: {message}")]
    Failed { key: JobKey, message: String },

    /// The job method panicked.
    #[error("Job {key} panicked: {message}")]
    Panicked { key: JobKey, message: String },

    /// The worker running the job failed outside the job method.
    #[error("Job {key} could not be run: {message}")]
    Worker { key: JobKey, message: String },
}

impl JobExecutionError {
    /// Key of the job that failed.
    pub fn key(&self) -> &JobKey {
        match self {
            Self::Failed { key, .. } | Self::Panicked { key, .. } | Self::Worker { key, .. } => key,
        }
    }

    /// Failure message without the job key prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Failed { message, .. }
            | Self::Panicked { message, .. }
            | Self::Worker { message, .. } => message,
        }
    }
}

/// A job class could not be instantiated.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConstructError(String);

impl ConstructError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
