//! One shared instance per job class.

use std::any::TypeId;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::job::{JobDescriptor, JobInstance};

/// Singleton instances keyed by declaring type.
#[derive(Debug, Default)]
pub struct InstanceCache {
    instances: DashMap<TypeId, JobInstance>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instance of the descriptor's declaring type, constructed on first use.
    ///
    /// Construction runs at most once per type: concurrent callers for the
    /// same type wait on the entry and receive the same instance. A failed
    /// construction is logged and leaves no entry behind, so `None` here
    /// means the type is unavailable for now.
    pub fn get_or_create(&self, descriptor: &JobDescriptor) -> Option<JobInstance> {
        let declaring = descriptor.declaring_type();
        let result = self
            .instances
            .entry(declaring.id)
            .or_try_insert_with(|| {
                debug!(job_class = declaring.name, "Constructing job class instance");
                descriptor.construct()
            })
            .map(|entry| entry.value().clone());

        match result {
            Ok(instance) => Some(instance),
            Err(e) => {
                warn!(
                    job_class = declaring.name,
                    method = descriptor.method_name(),
                    error = %e,
                    "Could not construct job class, skipping its jobs"
                );
                None
            }
        }
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.instances.contains_key(&type_id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
