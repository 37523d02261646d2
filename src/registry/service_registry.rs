//! Service registry mapping `(cluster, service)` pairs to backend URLs.
//!
//! The registry is read by every rewrite operation and replaced wholesale by
//! the topology loader. Readers load an immutable [`RegistrySnapshot`]
//! through an [`ArcSwap`], so a lookup always sees either the complete old
//! mapping or the complete new one.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Read-only lookup of canonical backend URLs.
pub trait ServiceRegistry: Send + Sync {
    /// Look up the canonical URL of `service` within `cluster`.
    fn lookup_service_url(&self, cluster: &str, service: &str) -> Option<String>;
}

impl fmt::Debug for dyn ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServiceRegistry")
    }
}

/// Immutable mapping of cluster name to service name to URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    clusters: HashMap<String, HashMap<String, String>>,
}

impl RegistrySnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a snapshot.
    pub fn builder() -> RegistrySnapshotBuilder {
        RegistrySnapshotBuilder::default()
    }

    /// Look up a service URL.
    pub fn lookup(&self, cluster: &str, service: &str) -> Option<&str> {
        self.clusters
            .get(cluster)
            .and_then(|services| services.get(service))
            .map(String::as_str)
    }

    /// Names of all clusters in the snapshot.
    pub fn clusters(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.clusters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of services registered for `cluster`.
    pub fn service_count(&self, cluster: &str) -> usize {
        self.clusters.get(cluster).map_or(0, HashMap::len)
    }

    /// Total number of registered services across clusters.
    pub fn len(&self) -> usize {
        self.clusters.values().map(HashMap::len).sum()
    }

    /// Whether the snapshot has no services at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builder for [`RegistrySnapshot`].
#[derive(Debug, Default)]
pub struct RegistrySnapshotBuilder {
    clusters: HashMap<String, HashMap<String, String>>,
}

impl RegistrySnapshotBuilder {
    /// Bind `service` in `cluster` to `url`. A later binding for the same
    /// pair replaces the earlier one.
    pub fn service(
        mut self,
        cluster: impl Into<String>,
        service: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        self.insert(cluster, service, url);
        self
    }

    /// Non-consuming form of [`RegistrySnapshotBuilder::service`].
    pub fn insert(
        &mut self,
        cluster: impl Into<String>,
        service: impl Into<String>,
        url: impl Into<String>,
    ) {
        self.clusters
            .entry(cluster.into())
            .or_default()
            .insert(service.into(), url.into());
    }

    /// Register an empty cluster so it shows up in the snapshot.
    pub fn cluster(mut self, cluster: impl Into<String>) -> Self {
        self.clusters.entry(cluster.into()).or_default();
        self
    }

    /// Finish the snapshot.
    pub fn build(self) -> RegistrySnapshot {
        RegistrySnapshot {
            clusters: self.clusters,
        }
    }
}

/// Registry backed by an atomically swapped snapshot.
#[derive(Debug)]
pub struct DefaultServiceRegistry {
    snapshot: ArcSwap<RegistrySnapshot>,
}

impl DefaultServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::with_snapshot(RegistrySnapshot::new())
    }

    /// Create a registry serving `snapshot`.
    pub fn with_snapshot(snapshot: RegistrySnapshot) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(snapshot),
        }
    }

    /// Replace the whole mapping. Concurrent readers keep the snapshot they
    /// already loaded.
    pub fn publish(&self, snapshot: RegistrySnapshot) {
        info!(
            "Publishing service registry: {} clusters, {} services",
            snapshot.clusters.len(),
            snapshot.len()
        );
        self.snapshot.store(Arc::new(snapshot));
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }
}

impl Default for DefaultServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry for DefaultServiceRegistry {
    fn lookup_service_url(&self, cluster: &str, service: &str) -> Option<String> {
        self.snapshot
            .load()
            .lookup(cluster, service)
            .map(str::to_string)
    }
}

impl ServiceRegistry for RegistrySnapshot {
    fn lookup_service_url(&self, cluster: &str, service: &str) -> Option<String> {
        self.lookup(cluster, service).map(str::to_string)
    }
}
