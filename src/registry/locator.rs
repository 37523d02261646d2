//! Process-wide service locator.

use crate::registry::ServiceRegistry;
use std::fmt;
use std::sync::Arc;

/// Handle from which gateway services are obtained.
pub trait ServiceLocator: Send + Sync {
    /// The service registry, if this gateway runs one.
    fn service_registry(&self) -> Option<Arc<dyn ServiceRegistry>>;
}

/// Default locator holding the gateway's shared services.
#[derive(Clone, Default)]
pub struct GatewayServices {
    registry: Option<Arc<dyn ServiceRegistry>>,
}

impl GatewayServices {
    /// Create a locator that exposes no services.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose `registry` as the service registry.
    pub fn with_registry(mut self, registry: Arc<dyn ServiceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

impl ServiceLocator for GatewayServices {
    fn service_registry(&self) -> Option<Arc<dyn ServiceRegistry>> {
        self.registry.clone()
    }
}

impl fmt::Debug for GatewayServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayServices")
            .field("registry", &self.registry.is_some())
            .finish()
    }
}
