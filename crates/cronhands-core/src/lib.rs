//! # CronHands Core
//!
//! Attribute-driven job engine on top of a cron scheduler.
//!
//! ## Architecture
//!
//! ```text
//!  #[job_class] / JobCatalog ──► Discovery ──► Engine ──► SchedulerBackend
//!                                               │            │ (fires)
//!                          InstanceCache ◄──────┤            ▼
//!                          ScanCache     ◄──────┘     MethodInvokerJob
//!                                                           │
//!                              JobMetricStatistics ◄────────┤
//!                              GlobalJobListener   ◄────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`Engine`]: registers discovered jobs exactly once and answers
//!   schedule and statistics queries
//! - [`SchedulerBackend`]: the cron scheduler abstraction, with
//!   [`CronScheduler`] as the in-process implementation
//! - [`JobClass`]: a type whose methods are jobs, usually implemented with
//!   `#[job_class]` from `cronhands-macros`
//! - [`JobMetricStatistics`]: bounded execution history
//!
//! ## Example
//!
//! ```rust,no_run
//! use cronhands_core::{ConstructError, Engine, JobCatalog, JobClass, JobConfig, JobMethod};
//!
//! #[derive(Default)]
//! struct Cleanup;
//!
//! impl JobClass for Cleanup {
//!     fn construct() -> Result<Self, ConstructError> {
//!         Ok(Cleanup)
//!     }
//!
//!     fn job_methods() -> Vec<JobMethod<Self>> {
//!         vec![JobMethod::new("purge", JobConfig::new("0 0 3 * * ?"), |_, _| Ok(()))]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cronhands_core::EngineError> {
//!     JobCatalog::global().register::<Cleanup>("app::maintenance");
//!     let engine = Engine::get_instance(["app"]).await?;
//!     for job in engine.list_scheduled_jobs().await {
//!         println!("{} {} {:?}", job.group, job.name, job.next_fire_time);
//!     }
//!     engine.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod invoker;
pub mod job;
pub mod listener;
pub mod metric;
pub mod scheduler;
pub mod snapshot;

pub use cache::{InstanceCache, ScanCache};
pub use discovery::{Discovery, JobCatalog};
pub use engine::{Engine, EngineBuilder, RegistrationReport};
pub use error::{
    ConstructError, EngineError, EngineResult, JobExecutionError, SchedulerError, SchedulerResult,
};
pub use invoker::{JobPayload, MethodInvokerJob};
pub use job::{
    BoundMethod, DeclaringType, FireKind, IntoJobResult, JobClass, JobConfig, JobContext,
    JobDescriptor, JobInstance, JobKey, JobMethod, MethodFn, TriggerKey, DEFAULT_GROUP,
};
pub use listener::GlobalJobListener;
pub use metric::{DurationStats, JobMetric, JobMetricStatistics, MAX_METRICS};
pub use scheduler::{
    parse_cron, CronScheduler, CronSchedulerConfig, Job, JobDetail, JobListener, SchedulerBackend,
    Trigger, TriggerInfo, TriggerState,
};
pub use snapshot::ScheduledJobSnapshot;
