//! The job engine.
//!
//! Registration flow for each discovered job method:
//!
//! 1. Resolve the shared instance of its class from the [`InstanceCache`].
//!    Classes that fail to construct are skipped.
//! 2. Skip keys the scheduler already knows.
//! 3. Bind the method to the instance and schedule it with its cron trigger.
//! 4. Fire it once if it carries the run-now marker.
//!
//! Every step is safe to repeat and to run concurrently, so scanning the
//! same namespace twice or racing two scans registers each job once.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use cronhands_config::Config;

use crate::cache::{InstanceCache, ScanCache};
use crate::discovery::{Discovery, JobCatalog};
use crate::error::{EngineError, EngineResult, SchedulerError, SchedulerResult};
use crate::invoker::{JobPayload, MethodInvokerJob};
use crate::job::{JobDescriptor, JobKey};
use crate::listener::GlobalJobListener;
use crate::metric::{JobMetricStatistics, MAX_METRICS};
use crate::scheduler::{
    CronScheduler, CronSchedulerConfig, JobDetail, SchedulerBackend, Trigger, TriggerState,
};
use crate::snapshot::ScheduledJobSnapshot;

static GLOBAL_ENGINE: OnceCell<Engine> = OnceCell::const_new();

/// Outcome of registering a batch of descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Newly scheduled jobs.
    pub registered: Vec<JobKey>,
    /// Jobs the scheduler already had.
    pub already_registered: Vec<JobKey>,
    /// Jobs whose class could not be constructed.
    pub unavailable: Vec<JobKey>,
    /// Jobs the scheduler refused, with the reason.
    pub failed: Vec<(JobKey, String)>,
}

impl RegistrationReport {
    pub fn merge(&mut self, other: RegistrationReport) {
        self.registered.extend(other.registered);
        self.already_registered.extend(other.already_registered);
        self.unavailable.extend(other.unavailable);
        self.failed.extend(other.failed);
    }

    /// Number of descriptors processed.
    pub fn total(&self) -> usize {
        self.registered.len()
            + self.already_registered.len()
            + self.unavailable.len()
            + self.failed.len()
    }
}

enum Registration {
    Registered,
    AlreadyRegistered,
    Unavailable,
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    backend: Option<Arc<dyn SchedulerBackend>>,
    discovery: Option<Arc<dyn Discovery>>,
    scheduler_config: CronSchedulerConfig,
    metrics_capacity: usize,
    wait_for_jobs_on_shutdown: bool,
    namespaces: Vec<String>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            discovery: None,
            scheduler_config: CronSchedulerConfig::default(),
            metrics_capacity: MAX_METRICS,
            wait_for_jobs_on_shutdown: true,
            namespaces: Vec::new(),
        }
    }

    /// Builder carrying the scheduler, metrics and scan settings of `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .scheduler_config(CronSchedulerConfig::from(&config.scheduler))
            .metrics_capacity(config.metrics.capacity)
            .wait_for_jobs_on_shutdown(config.scheduler.wait_for_jobs_on_shutdown)
            .namespaces(config.scan.namespaces.iter().cloned())
    }

    /// Use `backend` instead of an in-process [`CronScheduler`].
    pub fn backend(mut self, backend: Arc<dyn SchedulerBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Settings of the default [`CronScheduler`]. Ignored with a custom backend.
    pub fn scheduler_config(mut self, config: CronSchedulerConfig) -> Self {
        self.scheduler_config = config;
        self
    }

    /// Discovery source. Defaults to [`JobCatalog::global`].
    pub fn discovery(mut self, discovery: Arc<dyn Discovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn metrics_capacity(mut self, capacity: usize) -> Self {
        self.metrics_capacity = capacity;
        self
    }

    pub fn wait_for_jobs_on_shutdown(mut self, wait: bool) -> Self {
        self.wait_for_jobs_on_shutdown = wait;
        self
    }

    /// Namespaces scanned right after start.
    pub fn namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces.extend(namespaces.into_iter().map(Into::into));
        self
    }

    /// Start the scheduler and scan the configured namespaces.
    ///
    /// A scheduler that fails to start is the only fatal error.
    pub async fn start(self) -> EngineResult<Engine> {
        let scheduler = match self.backend {
            Some(backend) => backend,
            None => Arc::new(CronScheduler::new(self.scheduler_config)) as Arc<dyn SchedulerBackend>,
        };
        let discovery = self
            .discovery
            .unwrap_or_else(|| JobCatalog::global() as Arc<dyn Discovery>);

        scheduler.add_listener(Arc::new(GlobalJobListener));
        scheduler.start().await.map_err(EngineError::Startup)?;
        info!("Job engine started");

        let engine = Engine {
            scheduler,
            discovery,
            instances: InstanceCache::new(),
            scanned: ScanCache::new(),
            stats: Arc::new(JobMetricStatistics::with_capacity(self.metrics_capacity)),
            wait_for_jobs_on_shutdown: self.wait_for_jobs_on_shutdown,
        };
        if !self.namespaces.is_empty() {
            engine.scan_namespaces(&self.namespaces).await;
        }
        Ok(engine)
    }
}

/// Registers discovered jobs with a scheduler and records their executions.
pub struct Engine {
    scheduler: Arc<dyn SchedulerBackend>,
    discovery: Arc<dyn Discovery>,
    instances: InstanceCache,
    scanned: ScanCache,
    stats: Arc<JobMetricStatistics>,
    wait_for_jobs_on_shutdown: bool,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// The process-wide engine, started on first use with the default
    /// settings and the global [`JobCatalog`]. `namespaces` are scanned on
    /// every call; already scanned ones are skipped.
    pub async fn get_instance<I, S>(namespaces: I) -> EngineResult<&'static Engine>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let engine = GLOBAL_ENGINE
            .get_or_try_init(|| EngineBuilder::new().start())
            .await?;
        engine.scan_namespaces(namespaces).await;
        Ok(engine)
    }

    /// Install a configured engine as the process-wide one. If one is
    /// already installed it is returned and `builder` is dropped unused.
    pub async fn init_global(builder: EngineBuilder) -> EngineResult<&'static Engine> {
        GLOBAL_ENGINE.get_or_try_init(|| builder.start()).await
    }

    /// The process-wide engine, if it has been initialised.
    pub fn global() -> Option<&'static Engine> {
        GLOBAL_ENGINE.get()
    }

    /// Discover and register the jobs of each namespace not scanned before.
    pub async fn scan_namespaces<I, S>(&self, namespaces: I) -> RegistrationReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let namespaces: Vec<String> = namespaces
            .into_iter()
            .map(|ns| ns.as_ref().to_string())
            .collect();

        let mut report = RegistrationReport::default();
        for namespace in namespaces {
            if !self.scanned.insert(&namespace) {
                info!(namespace = %namespace, "Skipping already scanned namespace");
                continue;
            }

            info!(namespace = %namespace, "Scanning namespace for jobs");
            let descriptors = self.discovery.discover(&namespace);
            if descriptors.is_empty() {
                info!(namespace = %namespace, "No job methods found, check the namespace");
            }
            report.merge(self.register_discovered(descriptors).await);
        }
        report
    }

    /// Register each descriptor unless its job already exists.
    pub async fn register_discovered<I>(&self, descriptors: I) -> RegistrationReport
    where
        I: IntoIterator<Item = JobDescriptor>,
    {
        let mut report = RegistrationReport::default();
        for descriptor in descriptors {
            let key = descriptor.job_key();
            debug!(
                method = descriptor.method_name(),
                job_class = descriptor.declaring_type().name,
                "Found job method"
            );
            match self.register(&descriptor, &key).await {
                Ok(Registration::Registered) => report.registered.push(key),
                Ok(Registration::AlreadyRegistered) => report.already_registered.push(key),
                Ok(Registration::Unavailable) => report.unavailable.push(key),
                Err(e) => {
                    error!(job = %key, error = %e, "Failed to register job");
                    report.failed.push((key, e.to_string()));
                }
            }
        }
        report
    }

    async fn register(
        &self,
        descriptor: &JobDescriptor,
        key: &JobKey,
    ) -> SchedulerResult<Registration> {
        let Some(instance) = self.instances.get_or_create(descriptor) else {
            return Ok(Registration::Unavailable);
        };

        if self.scheduler.check_exists(key).await? {
            debug!(job = %key, "Job already registered");
            return Ok(Registration::AlreadyRegistered);
        }

        let Some(method) = descriptor.bind(&instance) else {
            warn!(job = %key, "Cached instance does not match the job class");
            return Ok(Registration::Unavailable);
        };

        let config = descriptor.config();
        let payload = JobPayload::new(instance, method, config.parameters.clone());
        let data = Arc::clone(&payload.parameters);
        let job = MethodInvokerJob::new(payload, Arc::clone(&self.stats));
        let detail = JobDetail::new(key.clone(), Arc::new(job))
            .with_data(data)
            .with_allow_concurrent(config.allow_concurrent)
            .with_description(config.description.clone());
        let trigger = Trigger::cron(key, config.cron_expression.as_str());

        match self.scheduler.schedule_job(detail, trigger).await {
            Ok(next_fire) => info!(
                job = %key,
                cron = %config.cron_expression,
                next_fire = ?next_fire,
                "Job registered"
            ),
            Err(SchedulerError::AlreadyExists(_)) => {
                debug!(job = %key, "Job registered concurrently");
                return Ok(Registration::AlreadyRegistered);
            }
            Err(e) => return Err(e),
        }

        if config.run_immediately {
            info!(job = %key, "Run-now marker present, firing job");
            if let Err(e) = self.scheduler.trigger_job(key).await {
                warn!(job = %key, error = %e, "Failed to fire run-now job");
            }
        }
        Ok(Registration::Registered)
    }

    /// Snapshot of every scheduled job, read live from the scheduler.
    ///
    /// Never fails: if the scheduler errors part way, the entries read so
    /// far are returned.
    pub async fn list_scheduled_jobs(&self) -> Vec<ScheduledJobSnapshot> {
        let mut jobs = Vec::new();
        if let Err(e) = self.collect_snapshots(&mut jobs).await {
            error!(error = %e, collected = jobs.len(), "Error retrieving job list");
        }
        jobs
    }

    async fn collect_snapshots(&self, jobs: &mut Vec<ScheduledJobSnapshot>) -> SchedulerResult<()> {
        for group in self.scheduler.job_group_names().await? {
            for key in self.scheduler.job_keys(&group).await? {
                let triggers = self.scheduler.triggers_of_job(&key).await?;
                let (next_fire_time, state) = match triggers.first() {
                    Some(trigger) => (
                        trigger.next_fire_time,
                        self.scheduler.trigger_state(&trigger.key).await?,
                    ),
                    None => (None, TriggerState::Unknown),
                };
                jobs.push(ScheduledJobSnapshot {
                    name: key.name,
                    group: key.group,
                    next_fire_time,
                    state,
                });
            }
        }
        Ok(())
    }

    /// Fire a registered job once, now.
    pub async fn trigger_job(&self, key: &JobKey) -> EngineResult<()> {
        self.scheduler.trigger_job(key).await?;
        Ok(())
    }

    /// Execution history.
    pub fn stats(&self) -> &Arc<JobMetricStatistics> {
        &self.stats
    }

    pub fn scheduler(&self) -> &Arc<dyn SchedulerBackend> {
        &self.scheduler
    }

    /// Namespaces scanned so far, sorted.
    pub fn scanned_namespaces(&self) -> Vec<String> {
        self.scanned.namespaces()
    }

    /// Number of job classes instantiated.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Stop the scheduler. Waits for running jobs unless configured not to.
    /// Errors are logged, not returned.
    pub async fn shutdown(&self) {
        match self.scheduler.shutdown(self.wait_for_jobs_on_shutdown).await {
            Ok(()) => info!("Job engine shut down"),
            Err(e) => error!(error = %e, "Error shutting down scheduler"),
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
