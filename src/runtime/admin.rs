//! Admin API routes and handlers.

use crate::function::FunctionRegistry;
use crate::http::{AdminRequest, AdminResponse, Method, StatusCode};
use crate::registry::{DefaultServiceRegistry, GatewayServices, ServiceLocator};
use crate::rewrite::{ResolutionEnvironment, RewriteContext};
use crate::topology::{StoreError, Topology, TopologyPublisher, TopologyStore};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Base path of the topology resources.
pub const TOPOLOGIES_API_PATH: &str = "/api/v1/topologies";

/// A parsed admin request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminRoute {
    Health,
    ListTopologies,
    GetTopology(String),
    PutTopology(String),
    DeleteTopology(String),
    ListFunctions,
    Resolve {
        cluster: String,
        function: String,
        service: String,
    },
    MethodNotAllowed,
    NotFound,
}

impl AdminRoute {
    /// Match a method and path against the admin routes.
    ///
    /// Path segments are percent-decoded before matching; a segment that does
    /// not decode to UTF-8 matches no route.
    pub fn parse(method: Method, path: &str) -> Self {
        let decoded: Result<Vec<_>, _> = path
            .trim_matches('/')
            .split('/')
            .map(|segment| percent_decode_str(segment).decode_utf8())
            .collect();
        let Ok(decoded) = decoded else {
            return AdminRoute::NotFound;
        };
        let segments: Vec<&str> = decoded.iter().map(|segment| segment.as_ref()).collect();

        let route = match segments.as_slice() {
            ["_health"] => Some((method == Method::Get, AdminRoute::Health)),
            ["api", "v1", "topologies"] => Some((method == Method::Get, AdminRoute::ListTopologies)),
            ["api", "v1", "topologies", id] if !id.is_empty() => match method {
                Method::Get => Some((true, AdminRoute::GetTopology(id.to_string()))),
                Method::Put => Some((true, AdminRoute::PutTopology(id.to_string()))),
                Method::Delete => Some((true, AdminRoute::DeleteTopology(id.to_string()))),
                _ => Some((false, AdminRoute::NotFound)),
            },
            ["api", "v1", "functions"] => Some((method == Method::Get, AdminRoute::ListFunctions)),
            ["api", "v1", "clusters", cluster, "functions", function, service]
                if !cluster.is_empty() && !function.is_empty() && !service.is_empty() =>
            {
                Some((
                    method == Method::Get,
                    AdminRoute::Resolve {
                        cluster: cluster.to_string(),
                        function: function.to_string(),
                        service: service.to_string(),
                    },
                ))
            }
            _ => None,
        };

        match route {
            Some((true, route)) => route,
            Some((false, _)) => AdminRoute::MethodNotAllowed,
            None => AdminRoute::NotFound,
        }
    }
}

/// Entry of the topology listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySummary {
    pub name: String,
    pub timestamp: u64,
    pub href: String,
}

/// Body of `GET /api/v1/topologies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyListing {
    pub href: String,
    pub topologies: Vec<TopologySummary>,
}

/// Shared state of the admin handlers.
pub struct AdminState {
    store: Arc<dyn TopologyStore>,
    registry: Arc<DefaultServiceRegistry>,
    services: Arc<GatewayServices>,
    publisher: TopologyPublisher,
    functions: &'static FunctionRegistry,
}

impl AdminState {
    /// Wire a store to a fresh service registry and the global functions.
    pub fn new(store: Arc<dyn TopologyStore>) -> Self {
        let registry = Arc::new(DefaultServiceRegistry::new());
        let services = Arc::new(GatewayServices::new().with_registry(registry.clone()));
        let publisher = TopologyPublisher::new(store.clone(), registry.clone());
        Self {
            store,
            registry,
            services,
            publisher,
            functions: FunctionRegistry::global(),
        }
    }

    /// The service registry fed by the store.
    pub fn registry(&self) -> Arc<DefaultServiceRegistry> {
        self.registry.clone()
    }

    /// Republish the registry from the store.
    pub async fn publish(&self) -> Result<usize, StoreError> {
        self.publisher.publish().await
    }

    /// Handle one admin request.
    pub async fn handle(&self, request: AdminRequest) -> AdminResponse {
        let route = AdminRoute::parse(request.method, &request.path);
        debug!("Admin route: {:?}", route);

        let result = match route {
            AdminRoute::Health => Ok(AdminResponse::text("OK")),
            AdminRoute::ListTopologies => self.list_topologies().await,
            AdminRoute::GetTopology(id) => self.get_topology(&id).await,
            AdminRoute::PutTopology(id) => self.put_topology(&id, &request).await,
            AdminRoute::DeleteTopology(id) => self.delete_topology(&id).await,
            AdminRoute::ListFunctions => json(&self.functions.names()),
            AdminRoute::Resolve {
                cluster,
                function,
                service,
            } => Ok(self.resolve(&cluster, &function, &service)),
            AdminRoute::MethodNotAllowed => Ok(AdminResponse::error(
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed",
            )),
            AdminRoute::NotFound => Ok(AdminResponse::error(StatusCode::NOT_FOUND, "Not found")),
        };

        result.unwrap_or_else(|e| {
            warn!("Admin request {} {} failed: {}", request.method, request.path, e);
            e.into()
        })
    }

    async fn list_topologies(&self) -> Result<AdminResponse, StoreError> {
        let topologies = self
            .store
            .list()
            .await?
            .into_iter()
            .map(|t| TopologySummary {
                href: format!("{}/{}", TOPOLOGIES_API_PATH, t.name),
                name: t.name,
                timestamp: t.timestamp,
            })
            .collect();

        json(&TopologyListing {
            href: TOPOLOGIES_API_PATH.to_string(),
            topologies,
        })
    }

    async fn get_topology(&self, id: &str) -> Result<AdminResponse, StoreError> {
        match self.store.get(id).await? {
            Some(topology) => json(&topology),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn put_topology(
        &self,
        id: &str,
        request: &AdminRequest,
    ) -> Result<AdminResponse, StoreError> {
        let mut topology: Topology = match request.json() {
            Some(parsed) => parsed?,
            None => {
                return Ok(AdminResponse::error(
                    StatusCode::BAD_REQUEST,
                    "Topology body required",
                ))
            }
        };
        topology.name = id.to_string();

        let stored = self.store.put(topology).await?;
        self.publish().await?;
        json(&stored)
    }

    async fn delete_topology(&self, id: &str) -> Result<AdminResponse, StoreError> {
        let deleted = match self.store.remove(id).await {
            Ok(()) => true,
            Err(StoreError::NotFound(_)) | Err(StoreError::InvalidName(_)) => false,
            Err(e) => return Err(e),
        };
        if deleted {
            self.publish().await?;
        }
        json(&serde_json::json!({ "deleted": deleted }))
    }

    fn resolve(&self, cluster: &str, function: &str, service: &str) -> AdminResponse {
        let services: Arc<dyn ServiceLocator> = self.services.clone();
        let env = ResolutionEnvironment::new(services, cluster);
        let mut session = self.functions.session(&env);

        match session.resolve(function, &RewriteContext::default(), Some(service)) {
            Ok(value) => AdminResponse::text(value.unwrap_or_default()),
            Err(e) => e.into(),
        }
    }
}

fn json<T: Serialize>(data: &T) -> Result<AdminResponse, StoreError> {
    Ok(AdminResponse::json(data)?)
}

impl From<StoreError> for AdminResponse {
    fn from(err: StoreError) -> Self {
        AdminResponse::error(StatusCode(err.code()), err.to_string())
    }
}
