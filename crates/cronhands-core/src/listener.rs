//! Completion listener registered by the engine.

use tracing::{error, trace};

use crate::error::JobExecutionError;
use crate::job::JobContext;
use crate::scheduler::JobListener;

/// Logs every failed execution. Stateless; takes no scheduling decisions.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalJobListener;

impl GlobalJobListener {
    pub const NAME: &'static str = "GlobalJobListener";
}

impl JobListener for GlobalJobListener {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn on_job_completed(&self, ctx: &JobContext, result: &Result<(), JobExecutionError>) {
        match result {
            Ok(()) => trace!(job = %ctx.job_key, fire_id = %ctx.fire_id, "Job completed"),
            Err(e) => error!(
                job = %ctx.job_key,
                fire_id = %ctx.fire_id,
                kind = ?ctx.kind,
                error = %e.message(),
                "Job failed"
            ),
        }
    }
}
