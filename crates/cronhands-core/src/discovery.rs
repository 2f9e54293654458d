//! Discovery of job methods by namespace.
//!
//! Namespaces are `::`-separated module paths. Discovering a namespace
//! yields the job methods of every class registered at that namespace or
//! anywhere below it.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::job::{DeclaringType, JobClass, JobDescriptor};

/// Source of job descriptors.
pub trait Discovery: Send + Sync {
    /// Job methods found in `namespace`.
    fn discover(&self, namespace: &str) -> Vec<JobDescriptor>;
}

struct CatalogEntry {
    namespace: String,
    declaring_type: DeclaringType,
    descriptors: fn() -> Vec<JobDescriptor>,
}

/// In-memory registry of job classes.
#[derive(Default)]
pub struct JobCatalog {
    entries: RwLock<Vec<CatalogEntry>>,
}

impl JobCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog shared by the whole process.
    pub fn global() -> Arc<JobCatalog> {
        static GLOBAL: OnceLock<Arc<JobCatalog>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(JobCatalog::new())).clone()
    }

    /// Register `T` under `namespace`. Registering the same class twice in
    /// the same namespace has no effect.
    pub fn register<T: JobClass>(&self, namespace: &str) -> &Self {
        let declaring_type = DeclaringType::of::<T>();
        let namespace = namespace.trim_matches(':');
        let mut entries = self.entries.write();
        let known = entries
            .iter()
            .any(|e| e.namespace == namespace && e.declaring_type == declaring_type);
        if !known {
            debug!(namespace, job_class = declaring_type.name, "Registered job class");
            entries.push(CatalogEntry {
                namespace: namespace.to_string(),
                declaring_type,
                descriptors: JobDescriptor::from_class::<T>,
            });
        }
        self
    }

    /// Register `T` under its own [`JobClass::namespace`].
    pub fn add<T: JobClass>(&self) -> &Self {
        self.register::<T>(T::namespace())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Distinct namespaces with at least one class, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self
            .entries
            .read()
            .iter()
            .map(|e| e.namespace.clone())
            .collect();
        namespaces.sort();
        namespaces.dedup();
        namespaces
    }
}

impl Discovery for JobCatalog {
    fn discover(&self, namespace: &str) -> Vec<JobDescriptor> {
        let namespace = namespace.trim_matches(':');
        let producers: Vec<fn() -> Vec<JobDescriptor>> = self
            .entries
            .read()
            .iter()
            .filter(|e| namespace_contains(namespace, &e.namespace))
            .map(|e| e.descriptors)
            .collect();

        producers.into_iter().flat_map(|produce| produce()).collect()
    }
}

/// Whether `candidate` is `namespace` itself or nested below it.
fn namespace_contains(namespace: &str, candidate: &str) -> bool {
    if namespace.is_empty() {
        return true;
    }
    match candidate.strip_prefix(namespace) {
        Some(rest) => rest.is_empty() || rest.starts_with("::"),
        None => false,
    }
}
