//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

/// Default bound of the execution history kept by the engine.
pub const DEFAULT_METRICS_CAPACITY: usize = 100;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scheduler backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Name reported in logs.
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Maximum number of job executions running at the same time.
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,

    /// Whether shutdown waits for in-flight executions.
    #[serde(default = "default_true")]
    pub wait_for_jobs_on_shutdown: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            thread_count: default_thread_count(),
            wait_for_jobs_on_shutdown: true,
        }
    }
}

fn default_instance_name() -> String {
    "cronhands".to_string()
}

fn default_thread_count() -> usize {
    10
}

fn default_true() -> bool {
    true
}

/// Execution history configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Number of execution records retained.
    #[serde(default = "default_metrics_capacity")]
    pub capacity: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            capacity: default_metrics_capacity(),
        }
    }
}

fn default_metrics_capacity() -> usize {
    DEFAULT_METRICS_CAPACITY
}

/// Namespaces discovered when the engine starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub namespaces: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files. Console only when unset.
    #[serde(default)]
    pub directory: Option<String>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Number of rotated files kept.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
            file_prefix: default_file_prefix(),
            max_files: default_max_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "cronhands".to_string()
}

fn default_max_files() -> usize {
    7
}
