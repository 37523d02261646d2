//! # gateway-svcreg - Service registry rewrite functions
//!
//! A reverse-proxy gateway fronts several backend clusters, each described
//! by a *topology* that binds logical service names to backend URLs. When
//! the gateway rewrites URLs, rules may call functions such as
//! `servicePort(WEBHDFS)`; this crate resolves those calls against the
//! service registry of the cluster being processed.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐   put/delete   ┌──────────────────────────────┐
//! │   Admin API (hyper)  │ ─────────────▶ │        Topology store        │
//! └──────────────────────┘                └──────────────────────────────┘
//!                                                        │ publish (atomic swap)
//!                                                        ▼
//! ┌──────────────────────┐    lookup      ┌──────────────────────────────┐
//! │   Function session   │ ─────────────▶ │       Service registry       │
//! │  servicePort, ...    │                │ (cluster, service) -> URL    │
//! └──────────────────────┘                └──────────────────────────────┘
//!            ▲
//!            │ resolve(name, parameter)
//!     rewrite rule evaluator
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use gateway_svcreg::prelude::*;
//! use std::sync::Arc;
//!
//! let registry = RegistrySnapshot::builder()
//!     .service("sandbox", "WEBHDFS", "http://namenode:50070/webhdfs")
//!     .build();
//! let services = GatewayServices::new().with_registry(Arc::new(registry));
//! let env = ResolutionEnvironment::new(Arc::new(services), "sandbox");
//!
//! let mut session = FunctionRegistry::global().session(&env);
//! let ctx = RewriteContext::default();
//!
//! let port = session.resolve("servicePort", &ctx, Some("WEBHDFS")).unwrap();
//! assert_eq!(port.as_deref(), Some("50070"));
//!
//! // Unknown names pass through unchanged.
//! let host = session.resolve("serviceHost", &ctx, Some("literal.example.com")).unwrap();
//! assert_eq!(host.as_deref(), Some("literal.example.com"));
//! ```
//!
//! ## Function Lifecycle
//!
//! Each rewrite operation gets its own processors:
//!
//! 1. **Initialize** (`initialize`): bind the cluster and service registry
//!    of the operation's environment
//! 2. **Resolve** (`resolve`): map a service name to one URL component
//! 3. **Destroy** (`destroy`): drop the binding when the operation ends

pub mod function;
pub mod http;
pub mod jwt;
pub mod registry;
pub mod rewrite;
pub mod runtime;
pub mod topology;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::function::{
        FunctionDescriptor, FunctionError, FunctionProcessor, FunctionRegistry, FunctionSession,
        FunctionState,
    };
    pub use crate::registry::{
        DefaultServiceRegistry, GatewayServices, RegistrySnapshot, ServiceLocator, ServiceRegistry,
    };
    pub use crate::rewrite::{ResolutionEnvironment, RewriteContext, UrlRewriteEnvironment};
    pub use crate::runtime::{AdminServer, GatewayConfig};
    pub use crate::topology::{FileTopologyStore, MemoryTopologyStore, Topology, TopologyStore};
}

// Re-export for convenience
pub use function::{FunctionProcessor, FunctionRegistry};
pub use registry::{DefaultServiceRegistry, ServiceRegistry};
pub use runtime::{AdminServer, GatewayConfig};
