//! Publishing topologies into the service registry.

use crate::registry::{DefaultServiceRegistry, RegistrySnapshot};
use crate::topology::model::Topology;
use crate::topology::store::{StoreError, TopologyStore};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Build a registry snapshot holding the canonical URL of every service of
/// every topology. Services without URLs are left out.
pub fn build_snapshot(topologies: &[Topology]) -> RegistrySnapshot {
    let mut builder = RegistrySnapshot::builder();
    for topology in topologies {
        builder = builder.cluster(topology.name.as_str());
        for service in &topology.services {
            match service.urls.first() {
                Some(url) => builder.insert(topology.name.as_str(), service.role.as_str(), url.as_str()),
                None => debug!(
                    "Topology {}: service {} has no URL",
                    topology.name, service.role
                ),
            }
        }
    }
    builder.build()
}

/// Keeps a service registry in step with a topology store.
///
/// Publishes are serialized: a snapshot read from the store is swapped in
/// before the next publish reads the store again, so an older listing can
/// never replace a newer one.
pub struct TopologyPublisher {
    store: Arc<dyn TopologyStore>,
    registry: Arc<DefaultServiceRegistry>,
    publishing: Mutex<()>,
}

impl TopologyPublisher {
    /// Create a publisher from `store` into `registry`.
    pub fn new(store: Arc<dyn TopologyStore>, registry: Arc<DefaultServiceRegistry>) -> Self {
        Self {
            store,
            registry,
            publishing: Mutex::new(()),
        }
    }

    /// Rebuild the registry from the current store contents and swap it in.
    pub async fn publish(&self) -> Result<usize, StoreError> {
        let _publishing = self.publishing.lock().await;
        let topologies = self.store.list().await?;
        let snapshot = build_snapshot(&topologies);
        let services = snapshot.len();
        self.registry.publish(snapshot);
        Ok(services)
    }

    /// Republish after every store change until the store goes away.
    pub async fn spawn_watch(self: Arc<Self>) -> Result<JoinHandle<()>, StoreError> {
        let mut events = self.store.watch().await?;
        Ok(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                debug!("Topology store event: {:?}", event);
                if let Err(e) = self.publish().await {
                    warn!("Failed to republish service registry: {}", e);
                }
            }
            info!("Topology watch ended");
        }))
    }
}
