//! Discovery output: one descriptor per job method.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::ConstructError;

use super::class::{JobClass, MethodFn};
use super::config::JobConfig;
use super::context::JobContext;
use super::key::JobKey;

/// Type-erased shared instance of a job class.
pub type JobInstance = Arc<dyn Any + Send + Sync>;

/// A job method bound to its instance.
pub type BoundMethod = Arc<dyn Fn(&JobContext) -> anyhow::Result<()> + Send + Sync>;

type Factory = Arc<dyn Fn() -> Result<JobInstance, ConstructError> + Send + Sync>;
type Binder = Arc<dyn Fn(&JobInstance) -> Option<BoundMethod> + Send + Sync>;

/// Identity of the type declaring a job method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclaringType {
    pub id: TypeId,
    pub name: &'static str,
}

impl DeclaringType {
    pub fn of<T: JobClass>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::type_name(),
        }
    }
}

impl fmt::Display for DeclaringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A discovered job method, ready to be registered.
///
/// Immutable once produced. Carries a factory for the declaring type and a
/// binder that attaches the method to the shared instance at registration.
#[derive(Clone)]
pub struct JobDescriptor {
    declaring_type: DeclaringType,
    method_name: &'static str,
    config: JobConfig,
    factory: Factory,
    binder: Binder,
}

impl JobDescriptor {
    /// Descriptors for every job method declared on `T`.
    pub fn from_class<T: JobClass>() -> Vec<Self> {
        T::job_methods()
            .into_iter()
            .map(|method| Self::from_method::<T>(method.name, method.config, method.call))
            .collect()
    }

    /// Descriptor for a single method of `T`.
    pub fn from_method<T: JobClass>(
        method_name: &'static str,
        config: JobConfig,
        call: MethodFn<T>,
    ) -> Self {
        let factory: Factory = Arc::new(|| T::construct().map(|t| Arc::new(t) as JobInstance));
        let binder: Binder = Arc::new(move |instance: &JobInstance| {
            let typed = instance.clone().downcast::<T>().ok()?;
            let call = call.clone();
            Some(Arc::new(move |ctx: &JobContext| call(&*typed, ctx)) as BoundMethod)
        });

        Self {
            declaring_type: DeclaringType::of::<T>(),
            method_name,
            config,
            factory,
            binder,
        }
    }

    pub fn declaring_type(&self) -> DeclaringType {
        self.declaring_type
    }

    pub fn method_name(&self) -> &'static str {
        self.method_name
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Key under which this job is registered.
    pub fn job_key(&self) -> JobKey {
        JobKey::for_method(
            self.declaring_type.name,
            self.method_name,
            self.config.group.clone(),
        )
    }

    /// Construct a fresh instance of the declaring type.
    pub fn construct(&self) -> Result<JobInstance, ConstructError> {
        (self.factory)()
    }

    /// Bind the method to `instance`. `None` if the instance is not of the
    /// declaring type.
    pub fn bind(&self, instance: &JobInstance) -> Option<BoundMethod> {
        (self.binder)(instance)
    }
}

impl fmt::Debug for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDescriptor")
            .field("declaring_type", &self.declaring_type.name)
            .field("method_name", &self.method_name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
