//! Jobs bundled with the binary, registered under the `demo` namespace.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use cronhands_core::{Engine, JobCatalog, JobContext};
use cronhands_macros::job_class;
use tokio::runtime::Handle;
use tracing::info;

use crate::report;

pub(crate) const NAMESPACE: &str = "demo";

/// Add the demo job classes to the global catalog.
pub(crate) fn register() {
    JobCatalog::global()
        .add::<Tracker>()
        .add::<ScheduleLister>()
        .add::<MetricsReporter>()
        .add::<Flaky>();
}

/// Counts its own runs.
#[derive(Default)]
pub(crate) struct Tracker {
    runs: AtomicU64,
}

#[job_class(namespace = "demo")]
impl Tracker {
    #[job(cron = "0/10 * * * * ?", group = "demo", description = "Counts activity")]
    #[run_now]
    fn track(&self) {
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        info!(run, "Tracking activity");
    }
}

/// Prints the live schedule.
#[derive(Default)]
pub(crate) struct ScheduleLister;

#[job_class(namespace = "demo")]
impl ScheduleLister {
    #[job(cron = "5 * * * * ?", group = "demo", concurrent = false)]
    fn list(&self) -> anyhow::Result<()> {
        let engine = Engine::global().context("engine is not running")?;
        let jobs = Handle::current().block_on(engine.list_scheduled_jobs());
        println!("{}", report::schedule_table(&jobs));
        Ok(())
    }
}

/// Prints the health report of the engine.
#[derive(Default)]
pub(crate) struct MetricsReporter;

#[job_class(namespace = "demo")]
impl MetricsReporter {
    #[job(cron = "0/30 * * * * ?", group = "metrics", concurrent = false)]
    fn report(&self) -> anyhow::Result<()> {
        let engine = Engine::global().context("engine is not running")?;
        println!("{}", report::health_report(engine.stats()));
        Ok(())
    }
}

/// Fails every other run.
#[derive(Default)]
pub(crate) struct Flaky {
    attempts: AtomicU64,
}

#[job_class(namespace = "demo")]
impl Flaky {
    #[job(cron = "0/15 * * * * ?", group = "demo", param = "upstream")]
    fn attempt(&self, ctx: &JobContext) -> anyhow::Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let target = ctx.parameter(0).unwrap_or("unknown");
        anyhow::ensure!(attempt % 2 == 1, "{} unavailable on attempt {}", target, attempt);
        info!(attempt, target, "Flaky call succeeded");
        Ok(())
    }
}
