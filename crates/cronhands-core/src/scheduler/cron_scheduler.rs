//! In-process cron scheduler.
//!
//! Each trigger gets a tokio task that sleeps until its next fire time.
//! Fires are dispatched onto the blocking thread pool, bounded by a
//! semaphore of `thread_count` permits, and tracked so that shutdown can
//! wait for them.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cron::Schedule;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Notify, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use cronhands_config::SchedulerConfig;

use super::{
    Job, JobDetail, JobListener, SchedulerBackend, Trigger, TriggerInfo, TriggerState,
};
use crate::error::{panic_message, JobExecutionError, SchedulerError, SchedulerResult};
use crate::job::{FireKind, JobContext, JobKey, TriggerKey};

/// Parse a cron expression with a leading seconds field.
///
/// Accepts 6 or 7 fields. The `?` placeholder of the Quartz dialect is
/// read as `*`.
pub fn parse_cron(expression: &str) -> SchedulerResult<Schedule> {
    let normalized = expression
        .split_whitespace()
        .map(|field| if field == "?" { "*" } else { field })
        .collect::<Vec<_>>()
        .join(" ");

    Schedule::from_str(&normalized).map_err(|e| SchedulerError::InvalidCron {
        expression: expression.to_string(),
        message: e.to_string(),
    })
}

/// Settings of a [`CronScheduler`].
#[derive(Debug, Clone)]
pub struct CronSchedulerConfig {
    pub instance_name: String,
    /// Maximum number of executions running at the same time.
    pub thread_count: usize,
}

impl Default for CronSchedulerConfig {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for CronSchedulerConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            instance_name: config.instance_name.clone(),
            thread_count: config.thread_count,
        }
    }
}

struct ScheduledEntry {
    detail: JobDetail,
    trigger: Trigger,
    schedule: Schedule,
    paused: AtomicBool,
    running: AtomicUsize,
    faulted: AtomicBool,
    complete: AtomicBool,
    next_fire: Mutex<Option<DateTime<Utc>>>,
    previous_fire: Mutex<Option<DateTime<Utc>>>,
    /// Signalled whenever an execution ends.
    idle: Notify,
    cancel: CancellationToken,
}

impl ScheduledEntry {
    fn state(&self) -> TriggerState {
        if self.faulted.load(Ordering::SeqCst) {
            TriggerState::Error
        } else if self.complete.load(Ordering::SeqCst) {
            TriggerState::Complete
        } else if self.paused.load(Ordering::SeqCst) {
            TriggerState::Paused
        } else if !self.detail.allow_concurrent && self.running.load(Ordering::SeqCst) > 0 {
            TriggerState::Blocked
        } else {
            TriggerState::Normal
        }
    }

    fn info(&self) -> TriggerInfo {
        TriggerInfo {
            key: self.trigger.key.clone(),
            cron_expression: self.trigger.cron_expression.clone(),
            next_fire_time: *self.next_fire.lock(),
            previous_fire_time: *self.previous_fire.lock(),
        }
    }

    /// Claim an execution slot. Fails for a non-concurrent job that is
    /// still running.
    fn try_begin(&self) -> bool {
        if self.detail.allow_concurrent {
            self.running.fetch_add(1, Ordering::SeqCst);
            true
        } else {
            self.running
                .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        }
    }

    /// Wait until an execution slot can be claimed, then claim it.
    async fn begin_when_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.try_begin() {
                return;
            }
            notified.await;
        }
    }

    fn end(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.idle.notify_waiters();
    }
}

struct SchedulerInner {
    instance_name: String,
    jobs: RwLock<BTreeMap<JobKey, Arc<ScheduledEntry>>>,
    listeners: RwLock<Vec<Arc<dyn JobListener>>>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    started: AtomicBool,
    shutdown: AtomicBool,
}

impl SchedulerInner {
    fn ensure_running(&self) -> SchedulerResult<()> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(SchedulerError::ShutDown);
        }
        Ok(())
    }

    fn entry(&self, key: &JobKey) -> SchedulerResult<Arc<ScheduledEntry>> {
        self.jobs
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| SchedulerError::JobNotFound(key.clone()))
    }

    fn spawn_trigger_loop(self: &Arc<Self>, entry: &Arc<ScheduledEntry>) {
        let inner = Arc::clone(self);
        let entry = Arc::clone(entry);
        self.tracker.spawn(async move {
            inner.run_trigger(entry).await;
        });
    }

    async fn run_trigger(self: Arc<Self>, entry: Arc<ScheduledEntry>) {
        let mut last_fire: Option<DateTime<Utc>> = None;
        loop {
            let now = Utc::now();
            // Never compute from before the last fire, the clock may lag
            // the timer slightly.
            let from = match last_fire {
                Some(last) if last > now => last,
                _ => now,
            };
            let Some(next) = entry.schedule.after(&from).next() else {
                *entry.next_fire.lock() = None;
                entry.complete.store(true, Ordering::SeqCst);
                debug!(trigger = %entry.trigger.key, "Trigger has no further fire times");
                break;
            };
            *entry.next_fire.lock() = Some(next);

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::select! {
                _ = entry.cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
            last_fire = Some(next);

            if entry.paused.load(Ordering::SeqCst) {
                debug!(trigger = %entry.trigger.key, "Trigger paused, skipping fire");
                continue;
            }
            *entry.previous_fire.lock() = Some(next);
            self.dispatch(&entry, FireKind::Scheduled, Some(next));
        }
    }

    /// Run one execution of `entry` on the worker pool.
    ///
    /// A scheduled fire of a non-concurrent job that is still running is
    /// skipped. A manual fire in that situation waits for the running
    /// execution to end.
    fn dispatch(
        self: &Arc<Self>,
        entry: &Arc<ScheduledEntry>,
        kind: FireKind,
        scheduled_for: Option<DateTime<Utc>>,
    ) {
        let claimed = entry.try_begin();
        if !claimed && kind == FireKind::Scheduled {
            debug!(
                job = %entry.detail.key,
                "Previous execution still running, skipping fire"
            );
            return;
        }

        let inner = Arc::clone(self);
        let entry = Arc::clone(entry);
        self.tracker.spawn(async move {
            if !claimed {
                debug!(job = %entry.detail.key, "Manual fire waiting for running execution");
                entry.begin_when_idle().await;
            }

            // A dispatched fire always runs, shutdown waits for it.
            let Ok(permit) = Arc::clone(&inner.permits).acquire_owned().await else {
                entry.end();
                return;
            };

            let ctx = JobContext::new(
                entry.detail.key.clone(),
                kind,
                scheduled_for,
                Arc::clone(&entry.detail.data),
            );
            let job = Arc::clone(&entry.detail.job);
            let listeners = inner.listeners.read().clone();

            let outcome = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                execute(job.as_ref(), &ctx, &listeners)
            })
            .await;

            entry.end();
            match outcome {
                Ok(true) => {}
                Ok(false) => {
                    entry.faulted.store(true, Ordering::SeqCst);
                }
                Err(e) => {
                    entry.faulted.store(true, Ordering::SeqCst);
                    error!(job = %entry.detail.key, error = %e, "Worker failed");
                }
            }
        });
    }
}

/// Run `job` and notify `listeners`. Returns `false` if the job panicked.
fn execute(job: &dyn Job, ctx: &JobContext, listeners: &[Arc<dyn JobListener>]) -> bool {
    for listener in listeners {
        if catch_unwind(AssertUnwindSafe(|| listener.on_job_started(ctx))).is_err() {
            warn!(listener = listener.name(), "Job listener panicked");
        }
    }

    let (result, healthy) = match catch_unwind(AssertUnwindSafe(|| job.execute(ctx))) {
        Ok(result) => (result, true),
        Err(payload) => {
            let message = panic_message(&*payload);
            error!(job = %ctx.job_key, %message, "Job panicked outside its invoker");
            let err = JobExecutionError::Worker {
                key: ctx.job_key.clone(),
                message,
            };
            (Err(err), false)
        }
    };

    for listener in listeners {
        if catch_unwind(AssertUnwindSafe(|| listener.on_job_completed(ctx, &result))).is_err() {
            warn!(listener = listener.name(), "Job listener panicked");
        }
    }
    healthy
}

/// [`SchedulerBackend`] running cron triggers inside the process.
pub struct CronScheduler {
    inner: Arc<SchedulerInner>,
}

impl Default for CronScheduler {
    fn default() -> Self {
        Self::new(CronSchedulerConfig::default())
    }
}

impl CronScheduler {
    pub fn new(config: CronSchedulerConfig) -> Self {
        let thread_count = config.thread_count.max(1);
        Self {
            inner: Arc::new(SchedulerInner {
                instance_name: config.instance_name,
                jobs: RwLock::new(BTreeMap::new()),
                listeners: RwLock::new(Vec::new()),
                permits: Arc::new(Semaphore::new(thread_count)),
                tracker: TaskTracker::new(),
                cancel: CancellationToken::new(),
                started: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.inner.instance_name
    }

    /// Number of scheduled jobs.
    pub fn job_count(&self) -> usize {
        self.inner.jobs.read().len()
    }

    /// Executions currently running or waiting for a worker.
    pub fn running_count(&self) -> usize {
        self.inner
            .jobs
            .read()
            .values()
            .map(|e| e.running.load(Ordering::SeqCst))
            .sum()
    }
}

#[async_trait]
impl SchedulerBackend for CronScheduler {
    async fn start(&self) -> SchedulerResult<()> {
        self.inner.ensure_running()?;
        let jobs = self.inner.jobs.write();
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        for entry in jobs.values() {
            self.inner.spawn_trigger_loop(entry);
        }
        info!(
            instance = %self.inner.instance_name,
            jobs = jobs.len(),
            "Scheduler started"
        );
        Ok(())
    }

    async fn shutdown(&self, wait_for_jobs: bool) -> SchedulerResult<()> {
        if self.inner.shutdown.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!(instance = %self.inner.instance_name, wait_for_jobs, "Scheduler shutting down");
        self.inner.cancel.cancel();
        self.inner.tracker.close();
        if wait_for_jobs {
            self.inner.tracker.wait().await;
        }
        info!(instance = %self.inner.instance_name, "Scheduler shut down");
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::SeqCst)
    }

    async fn check_exists(&self, key: &JobKey) -> SchedulerResult<bool> {
        self.inner.ensure_running()?;
        Ok(self.inner.jobs.read().contains_key(key))
    }

    async fn schedule_job(
        &self,
        job: JobDetail,
        trigger: Trigger,
    ) -> SchedulerResult<Option<DateTime<Utc>>> {
        self.inner.ensure_running()?;
        let schedule = parse_cron(&trigger.cron_expression)?;
        let Some(first_fire) = schedule.after(&Utc::now()).next() else {
            return Err(SchedulerError::InvalidCron {
                expression: trigger.cron_expression,
                message: "expression never fires".to_string(),
            });
        };

        let mut jobs = self.inner.jobs.write();
        if jobs.contains_key(&job.key) {
            return Err(SchedulerError::AlreadyExists(job.key));
        }

        let key = job.key.clone();
        let entry = Arc::new(ScheduledEntry {
            detail: job,
            trigger,
            schedule,
            paused: AtomicBool::new(false),
            running: AtomicUsize::new(0),
            faulted: AtomicBool::new(false),
            complete: AtomicBool::new(false),
            next_fire: Mutex::new(Some(first_fire)),
            previous_fire: Mutex::new(None),
            idle: Notify::new(),
            cancel: self.inner.cancel.child_token(),
        });
        if self.inner.started.load(Ordering::SeqCst) {
            self.inner.spawn_trigger_loop(&entry);
        }
        debug!(
            job = %key,
            cron = %entry.trigger.cron_expression,
            next_fire = %first_fire,
            "Job scheduled"
        );
        jobs.insert(key, entry);
        Ok(Some(first_fire))
    }

    async fn trigger_job(&self, key: &JobKey) -> SchedulerResult<()> {
        self.inner.ensure_running()?;
        if !self.is_started() {
            return Err(SchedulerError::NotStarted);
        }
        let entry = self.inner.entry(key)?;
        debug!(job = %key, "Manual fire");
        self.inner.dispatch(&entry, FireKind::Manual, None);
        Ok(())
    }

    async fn pause_job(&self, key: &JobKey) -> SchedulerResult<()> {
        self.inner.ensure_running()?;
        self.inner.entry(key)?.paused.store(true, Ordering::SeqCst);
        debug!(job = %key, "Job paused");
        Ok(())
    }

    async fn resume_job(&self, key: &JobKey) -> SchedulerResult<()> {
        self.inner.ensure_running()?;
        self.inner.entry(key)?.paused.store(false, Ordering::SeqCst);
        debug!(job = %key, "Job resumed");
        Ok(())
    }

    async fn unschedule_job(&self, key: &JobKey) -> SchedulerResult<bool> {
        self.inner.ensure_running()?;
        let removed = self.inner.jobs.write().remove(key);
        match removed {
            Some(entry) => {
                entry.cancel.cancel();
                debug!(job = %key, "Job unscheduled");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn job_group_names(&self) -> SchedulerResult<Vec<String>> {
        self.inner.ensure_running()?;
        let mut groups: Vec<String> = self
            .inner
            .jobs
            .read()
            .keys()
            .map(|k| k.group.clone())
            .collect();
        groups.dedup();
        Ok(groups)
    }

    async fn job_keys(&self, group: &str) -> SchedulerResult<Vec<JobKey>> {
        self.inner.ensure_running()?;
        Ok(self
            .inner
            .jobs
            .read()
            .keys()
            .filter(|k| k.group == group)
            .cloned()
            .collect())
    }

    async fn triggers_of_job(&self, key: &JobKey) -> SchedulerResult<Vec<TriggerInfo>> {
        self.inner.ensure_running()?;
        Ok(self
            .inner
            .jobs
            .read()
            .get(key)
            .map(|entry| vec![entry.info()])
            .unwrap_or_default())
    }

    async fn trigger_state(&self, key: &TriggerKey) -> SchedulerResult<TriggerState> {
        self.inner.ensure_running()?;
        Ok(self
            .inner
            .jobs
            .read()
            .values()
            .find(|entry| &entry.trigger.key == key)
            .map(|entry| entry.state())
            .unwrap_or(TriggerState::Unknown))
    }

    fn add_listener(&self, listener: Arc<dyn JobListener>) {
        debug!(listener = listener.name(), "Job listener added");
        self.inner.listeners.write().push(listener);
    }
}

#[cfg(test)]
#[path = "cron_scheduler_tests.rs"]
mod tests;
