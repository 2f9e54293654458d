//! Job and trigger keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique `(name, group)` identifier of a schedulable job.
///
/// Names are conventionally `<TypeName>.<methodName>`. Keys order by
/// group first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobKey {
    pub group: String,
    pub name: String,
}

impl JobKey {
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
        }
    }

    /// Key for a job bound to `method` on `type_name`.
    pub fn for_method(type_name: &str, method: &str, group: impl Into<String>) -> Self {
        Self::new(format!("{}.{}", type_name, method), group)
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.name)
    }
}

/// Identifier of the trigger that fires a job.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TriggerKey {
    pub group: String,
    pub name: String,
}

impl TriggerKey {
    pub const SUFFIX: &'static str = "Trigger";

    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
        }
    }

    /// The cron trigger of `job`: same group, name suffixed with `Trigger`.
    pub fn for_job(job: &JobKey) -> Self {
        Self::new(format!("{}{}", job.name, Self::SUFFIX), job.group.clone())
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.name)
    }
}
