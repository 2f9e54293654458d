//! Job classes: types whose methods are scheduled as jobs.

use std::fmt;
use std::sync::Arc;

use crate::error::ConstructError;

use super::config::JobConfig;
use super::context::JobContext;

/// Plain function value invoking one job method on an instance.
pub type MethodFn<T> = Arc<dyn Fn(&T, &JobContext) -> anyhow::Result<()> + Send + Sync>;

/// A type declaring job methods.
///
/// One instance is constructed per type and shared by every job declared on
/// it, so state kept in the instance is visible to all of them. Usually
/// implemented with `#[job_class]` from `cronhands-macros`.
pub trait JobClass: Send + Sync + Sized + 'static {
    /// Short type name used to build job names.
    fn type_name() -> &'static str {
        let path = type_path::<Self>();
        path.rsplit("::").next().unwrap_or(path)
    }

    /// Namespace the class is discovered under, its module path by default.
    fn namespace() -> &'static str {
        type_path::<Self>()
            .rsplit_once("::")
            .map_or("", |(module, _)| module)
    }

    /// Create the shared instance.
    fn construct() -> Result<Self, ConstructError>;

    /// The job methods declared on this type.
    fn job_methods() -> Vec<JobMethod<Self>>;
}

/// Path of `T` without its generic arguments.
fn type_path<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.find('<').map_or(full, |end| &full[..end])
}

/// One job method of a [`JobClass`].
pub struct JobMethod<T> {
    pub name: &'static str,
    pub config: JobConfig,
    pub call: MethodFn<T>,
}

impl<T> JobMethod<T> {
    pub fn new<F>(name: &'static str, config: JobConfig, call: F) -> Self
    where
        F: Fn(&T, &JobContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name,
            config,
            call: Arc::new(call),
        }
    }
}

impl<T> fmt::Debug for JobMethod<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobMethod")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Return types accepted from job methods.
pub trait IntoJobResult {
    fn into_job_result(self) -> anyhow::Result<()>;
}

impl IntoJobResult for () {
    fn into_job_result(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E> IntoJobResult for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_job_result(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}
