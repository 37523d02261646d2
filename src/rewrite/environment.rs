//! Resolution environment bound by function processors at initialization.

use crate::registry::ServiceLocator;
use std::fmt;
use std::sync::Arc;

/// Attributes a rewrite operation exposes to its functions.
pub trait UrlRewriteEnvironment: Send + Sync {
    /// The gateway's service locator.
    fn services(&self) -> Option<Arc<dyn ServiceLocator>>;

    /// Name of the cluster (topology) being processed.
    fn cluster(&self) -> Option<String>;
}

/// Environment for one request or response rewrite.
///
/// Built once per operation and never mutated afterwards.
#[derive(Clone)]
pub struct ResolutionEnvironment {
    services: Option<Arc<dyn ServiceLocator>>,
    cluster: Option<String>,
}

impl ResolutionEnvironment {
    /// Create an environment for `cluster` backed by `services`.
    pub fn new(services: Arc<dyn ServiceLocator>, cluster: impl Into<String>) -> Self {
        Self {
            services: Some(services),
            cluster: Some(cluster.into()),
        }
    }

    /// Create an environment with neither services nor cluster.
    pub fn empty() -> Self {
        Self {
            services: None,
            cluster: None,
        }
    }
}

impl UrlRewriteEnvironment for ResolutionEnvironment {
    fn services(&self) -> Option<Arc<dyn ServiceLocator>> {
        self.services.clone()
    }

    fn cluster(&self) -> Option<String> {
        self.cluster.clone()
    }
}

impl fmt::Debug for ResolutionEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionEnvironment")
            .field("services", &self.services.is_some())
            .field("cluster", &self.cluster)
            .finish()
    }
}
