//! Per-job scheduling configuration.

use serde::{Deserialize, Serialize};

/// Group used when a job does not name one.
pub const DEFAULT_GROUP: &str = "undefined";

/// Scheduling configuration attached to a job method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Cron expression with a seconds field (6 or 7 fields).
    pub cron_expression: String,
    /// Logical group of the job.
    pub group: String,
    /// Static parameters handed to every execution.
    pub parameters: Vec<String>,
    /// Fire once right after registration, in addition to the cron schedule.
    pub run_immediately: bool,
    /// Whether executions of this job may overlap.
    pub allow_concurrent: bool,
    /// Optional human-readable description.
    pub description: Option<String>,
}

impl JobConfig {
    pub fn new(cron_expression: impl Into<String>) -> Self {
        Self {
            cron_expression: cron_expression.into(),
            group: DEFAULT_GROUP.to_string(),
            parameters: Vec::new(),
            run_immediately: false,
            allow_concurrent: true,
            description: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_run_immediately(mut self, run_immediately: bool) -> Self {
        self.run_immediately = run_immediately;
        self
    }

    pub fn with_allow_concurrent(mut self, allow_concurrent: bool) -> Self {
        self.allow_concurrent = allow_concurrent;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
