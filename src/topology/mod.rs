//! Topologies: storage and publication into the service registry.
//!
//! The admin API writes topology documents into a [`TopologyStore`]; the
//! [`TopologyPublisher`] turns the whole store into a fresh registry
//! snapshot after every change.

mod model;
mod publish;
mod store;

pub use model::{is_valid_name, Topology, TopologyService};
pub use publish::{build_snapshot, TopologyPublisher};
pub use store::{FileTopologyStore, MemoryTopologyStore, StoreError, StoreEvent, TopologyStore};
