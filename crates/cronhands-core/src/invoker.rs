//! Execution wrapper around bound job methods.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::debug;

use crate::error::{panic_message, JobExecutionError};
use crate::job::{BoundMethod, JobContext, JobInstance};
use crate::metric::{JobMetric, JobMetricStatistics};
use crate::scheduler::Job;

/// What a registered job carries: the shared instance, the method bound to
/// it and the static parameters. Never changes after registration.
#[derive(Clone)]
pub struct JobPayload {
    pub instance: JobInstance,
    pub method: BoundMethod,
    pub parameters: Arc<[String]>,
}

impl JobPayload {
    pub fn new(instance: JobInstance, method: BoundMethod, parameters: Vec<String>) -> Self {
        Self {
            instance,
            method,
            parameters: parameters.into(),
        }
    }
}

impl fmt::Debug for JobPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobPayload")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// [`Job`] that calls a bound method and records one metric per run.
///
/// Errors and panics from the method are turned into a
/// [`JobExecutionError`] for the scheduler's listeners; neither escapes to
/// the worker thread.
pub struct MethodInvokerJob {
    payload: JobPayload,
    stats: Arc<JobMetricStatistics>,
}

impl MethodInvokerJob {
    pub fn new(payload: JobPayload, stats: Arc<JobMetricStatistics>) -> Self {
        Self { payload, stats }
    }

    pub fn payload(&self) -> &JobPayload {
        &self.payload
    }
}

impl Job for MethodInvokerJob {
    fn execute(&self, ctx: &JobContext) -> Result<(), JobExecutionError> {
        let key = &ctx.job_key;
        let started_at = Utc::now();
        let timer = Instant::now();

        let outcome = catch_unwind(AssertUnwindSafe(|| (self.payload.method)(ctx)));
        let duration_ms = u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(JobExecutionError::Failed {
                key: key.clone(),
                message: format!("{:#}", e),
            }),
            Err(payload) => Err(JobExecutionError::Panicked {
                key: key.clone(),
                message: panic_message(&*payload),
            }),
        };

        let metric = match &result {
            Ok(()) => JobMetric::success(key, started_at, duration_ms),
            Err(e) => JobMetric::failure(key, started_at, duration_ms, e.message()),
        };
        self.stats.add(metric);
        debug!(job = %key, duration_ms, success = result.is_ok(), "Job executed");

        result
    }
}
