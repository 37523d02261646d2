//! Admin HTTP server.

use crate::http::{AdminRequest, AdminResponse, Method, StatusCode};
use crate::runtime::admin::AdminState;
use crate::runtime::GatewayConfig;
use crate::topology::{StoreError, TopologyStore};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Serves the topology admin API and resolution endpoint.
pub struct AdminServer {
    /// Server configuration.
    config: GatewayConfig,
    /// Handler state.
    state: Arc<AdminState>,
}

impl AdminServer {
    /// Create a server over `store`.
    pub fn new(config: GatewayConfig, store: Arc<dyn TopologyStore>) -> Self {
        Self {
            config,
            state: Arc::new(AdminState::new(store)),
        }
    }

    /// Get the handler state.
    pub fn state(&self) -> Arc<AdminState> {
        self.state.clone()
    }

    /// Publish the stored topologies into the service registry.
    pub async fn load(&self) -> Result<usize, StoreError> {
        let services = self.state.publish().await?;
        info!("Loaded {} services from topology store", services);
        Ok(services)
    }

    /// Start the HTTP server.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.load().await?;

        let addr = self.config.bind_addr()?;
        let listener = TcpListener::bind(addr).await?;

        info!("Admin server listening on {}", addr);

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);

            let state = self.state.clone();
            let config = self.config.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let state = state.clone();
                    let config = config.clone();
                    async move { handle_request(req, state, config, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection: {:?}", err);
                }
            });
        }
    }
}

/// Handle an incoming HTTP request.
async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AdminState>,
    config: GatewayConfig,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let path = req.uri().path().to_string();
    let method = Method::from(req.method());

    debug!("Handling request: {} {} from {}", method, path, remote_addr);

    if !config.enable_health && path == "/_health" {
        return Ok(build_response(AdminResponse::error(
            StatusCode::NOT_FOUND,
            "Not found",
        )));
    }

    let body = match Limited::new(req.into_body(), config.max_body_size)
        .collect()
        .await
    {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!("Rejecting {} {}: body too large", method, path);
            return Ok(build_response(AdminResponse::error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large",
            )));
        }
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            return Ok(build_response(AdminResponse::error(
                StatusCode::BAD_REQUEST,
                e.to_string(),
            )));
        }
    };

    let mut request = AdminRequest::new(method, path);
    if !body.is_empty() {
        request = request.body(body);
    }

    Ok(build_response(state.handle(request).await))
}

/// Build a hyper Response from an AdminResponse.
fn build_response(admin_response: AdminResponse) -> Response<Full<Bytes>> {
    let status = hyper::StatusCode::from_u16(admin_response.status.0).unwrap_or_else(|_| {
        warn!(
            "Invalid status code {}, falling back to 500 Internal Server Error",
            admin_response.status.0
        );
        hyper::StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut builder = Response::builder().status(status);

    for (name, value) in admin_response.headers {
        builder = builder.header(name, value);
    }

    let body = admin_response.body.unwrap_or_default();
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        error!("Failed to build response: {}", e);
        let mut response = Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
        *response.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}
