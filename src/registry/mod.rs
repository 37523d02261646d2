//! Topology-scoped service registry and the service locator that exposes it.

mod locator;
mod service_registry;

pub use locator::{GatewayServices, ServiceLocator};
pub use service_registry::{
    DefaultServiceRegistry, RegistrySnapshot, RegistrySnapshotBuilder, ServiceRegistry,
};
