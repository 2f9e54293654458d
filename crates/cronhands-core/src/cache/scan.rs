//! Namespaces already handed to discovery.

use dashmap::DashSet;

/// Set of scanned namespaces.
#[derive(Debug, Default)]
pub struct ScanCache {
    namespaces: DashSet<String>,
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `namespace` as scanned. Returns `true` only for the first caller.
    pub fn insert(&self, namespace: &str) -> bool {
        self.namespaces.insert(namespace.to_string())
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Scanned namespaces, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self.namespaces.iter().map(|ns| ns.clone()).collect();
        namespaces.sort();
        namespaces
    }
}
