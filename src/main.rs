//! Service registry admin server.
//!
//! Serves the topology admin API and keeps the service registry that the
//! rewrite functions read in step with it. Configured through `SVCREG_*`
//! environment variables; see [`GatewayConfig::from_env`].

use gateway_svcreg::prelude::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env();
    tracing::info!("Starting service registry admin server...");

    let store: Arc<dyn TopologyStore> = match &config.topology_dir {
        Some(dir) => {
            tracing::info!("Topologies stored in {}", dir.display());
            Arc::new(FileTopologyStore::open(dir.clone()).await?)
        }
        None => {
            tracing::info!("No SVCREG_TOPOLOGY_DIR set, keeping topologies in memory");
            Arc::new(MemoryTopologyStore::new())
        }
    };

    tracing::info!(
        "Rewrite functions: {}",
        FunctionRegistry::global().names().join(", ")
    );
    tracing::info!("Try: curl http://localhost:{}/api/v1/topologies", config.port);

    AdminServer::new(config, store).run().await
}
