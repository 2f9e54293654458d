//! Execution metrics.

mod statistics;

pub use statistics::{DurationStats, JobMetricStatistics, MAX_METRICS};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::JobKey;

/// Record of one completed execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetric {
    pub name: String,
    pub group: String,
    pub start_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub successful: bool,
    pub error_message: Option<String>,
}

impl JobMetric {
    pub fn success(key: &JobKey, start_time: DateTime<Utc>, duration_ms: u64) -> Self {
        Self {
            name: key.name.clone(),
            group: key.group.clone(),
            start_time,
            duration_ms,
            successful: true,
            error_message: None,
        }
    }

    pub fn failure(
        key: &JobKey,
        start_time: DateTime<Utc>,
        duration_ms: u64,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            name: key.name.clone(),
            group: key.group.clone(),
            start_time,
            duration_ms,
            successful: false,
            error_message: Some(error_message.into()),
        }
    }
}
