//! Admin runtime: topology CRUD and function resolution over HTTP.

mod admin;
mod config;
mod server;

pub use admin::{AdminRoute, AdminState, TopologyListing, TopologySummary, TOPOLOGIES_API_PATH};
pub use config::GatewayConfig;
pub use server::AdminServer;
