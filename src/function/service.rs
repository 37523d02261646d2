//! Service registry functions.
//!
//! Every function here resolves a logical service name against the service
//! registry of the bound cluster and returns one component of the backend
//! URL. The functions differ only in the component they extract:
//!
//! | name             | result                          |
//! |------------------|---------------------------------|
//! | `serviceUrl`     | the URL as registered           |
//! | `serviceAddress` | `host:port`, or `host`          |
//! | `serviceHost`    | `host`                          |
//! | `servicePort`    | port, or the scheme default     |
//! | `serviceScheme`  | scheme                          |
//! | `servicePath`    | path                            |
//!
//! A name the registry does not know is returned unchanged, so a rule
//! written with a literal host or port still rewrites.

use crate::function::handler::{FunctionDescriptor, FunctionError, FunctionProcessor, FunctionState};
use crate::function::resolved::ResolvedUrl;
use crate::registry::ServiceRegistry;
use crate::rewrite::{RewriteContext, UrlRewriteEnvironment};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// The URL component a service function extracts.
pub trait ServiceComponent: Send + Sync + 'static {
    /// Function name the component is dispatched under.
    const FUNCTION_NAME: &'static str;

    /// Extract the component, `None` if the URL does not carry it.
    fn extract(url: &ResolvedUrl) -> Option<String>;
}

/// Full URL.
pub struct ServiceUrl;
/// `host:port`.
pub struct ServiceAddress;
/// Host only.
pub struct ServiceHost;
/// Decimal port.
pub struct ServicePort;
/// Scheme.
pub struct ServiceScheme;
/// Path.
pub struct ServicePath;

impl ServiceComponent for ServiceUrl {
    const FUNCTION_NAME: &'static str = "serviceUrl";

    fn extract(url: &ResolvedUrl) -> Option<String> {
        Some(url.as_str().to_string())
    }
}

impl ServiceComponent for ServiceAddress {
    const FUNCTION_NAME: &'static str = "serviceAddress";

    fn extract(url: &ResolvedUrl) -> Option<String> {
        Some(url.address())
    }
}

impl ServiceComponent for ServiceHost {
    const FUNCTION_NAME: &'static str = "serviceHost";

    fn extract(url: &ResolvedUrl) -> Option<String> {
        Some(url.host().to_string())
    }
}

impl ServiceComponent for ServicePort {
    const FUNCTION_NAME: &'static str = "servicePort";

    fn extract(url: &ResolvedUrl) -> Option<String> {
        url.port().map(|port| port.to_string())
    }
}

impl ServiceComponent for ServiceScheme {
    const FUNCTION_NAME: &'static str = "serviceScheme";

    fn extract(url: &ResolvedUrl) -> Option<String> {
        Some(url.scheme().to_string())
    }
}

impl ServiceComponent for ServicePath {
    const FUNCTION_NAME: &'static str = "servicePath";

    fn extract(url: &ResolvedUrl) -> Option<String> {
        Some(url.path().to_string())
    }
}

/// Resolves `serviceUrl(name)`.
pub type ServiceUrlFunctionProcessor = ServiceFunctionProcessor<ServiceUrl>;
/// Resolves `serviceAddress(name)`.
pub type ServiceAddressFunctionProcessor = ServiceFunctionProcessor<ServiceAddress>;
/// Resolves `serviceHost(name)`.
pub type ServiceHostFunctionProcessor = ServiceFunctionProcessor<ServiceHost>;
/// Resolves `servicePort(name)`.
pub type ServicePortFunctionProcessor = ServiceFunctionProcessor<ServicePort>;
/// Resolves `serviceScheme(name)`.
pub type ServiceSchemeFunctionProcessor = ServiceFunctionProcessor<ServiceScheme>;
/// Resolves `servicePath(name)`.
pub type ServicePathFunctionProcessor = ServiceFunctionProcessor<ServicePath>;

/// What a processor holds while bound. Both fields come from the same
/// environment; either may be absent, in which case every lookup misses.
struct Binding {
    cluster: Option<String>,
    registry: Option<Arc<dyn ServiceRegistry>>,
}

/// Registry-backed function processor extracting component `C`.
pub struct ServiceFunctionProcessor<C> {
    binding: Option<Binding>,
    component: PhantomData<fn() -> C>,
}

impl<C: ServiceComponent> ServiceFunctionProcessor<C> {
    /// Create an uninitialized processor.
    pub fn new() -> Self {
        Self {
            binding: None,
            component: PhantomData,
        }
    }

    /// Boxed constructor for the function registry.
    pub fn boxed() -> Box<dyn FunctionProcessor> {
        Box::new(Self::new())
    }

    fn lookup(&self, service: &str) -> Option<String> {
        let binding = self.binding.as_ref()?;
        let cluster = binding.cluster.as_deref()?;
        let registry = binding.registry.as_ref()?;

        let Some(raw) = registry.lookup_service_url(cluster, service) else {
            debug!(
                "{}: no service '{}' in cluster '{}'",
                C::FUNCTION_NAME,
                service,
                cluster
            );
            return None;
        };

        let Some(url) = ResolvedUrl::parse(&raw) else {
            warn!(
                "{}: ignoring malformed URL '{}' for service '{}' in cluster '{}'",
                C::FUNCTION_NAME,
                raw,
                service,
                cluster
            );
            return None;
        };

        let value = C::extract(&url);
        match &value {
            Some(value) => trace!("{}({}) -> {}", C::FUNCTION_NAME, service, value),
            None => debug!(
                "{}: URL '{}' for service '{}' has no such component",
                C::FUNCTION_NAME,
                raw,
                service
            ),
        }
        value
    }
}

impl<C: ServiceComponent> Default for ServiceFunctionProcessor<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ServiceComponent> FunctionProcessor for ServiceFunctionProcessor<C> {
    fn name(&self) -> &str {
        C::FUNCTION_NAME
    }

    fn initialize(
        &mut self,
        env: Option<&dyn UrlRewriteEnvironment>,
        _descriptor: Option<&FunctionDescriptor>,
    ) -> Result<(), FunctionError> {
        let env = env.ok_or_else(|| {
            FunctionError::illegal_argument(format!(
                "{} requires a rewrite environment",
                C::FUNCTION_NAME
            ))
        })?;

        let registry = env.services().and_then(|services| services.service_registry());
        let cluster = env.cluster();

        if registry.is_none() {
            debug!(
                "{}: no service registry available, lookups will pass through",
                C::FUNCTION_NAME
            );
        }
        debug!("Initialized {} for cluster {:?}", C::FUNCTION_NAME, cluster);

        self.binding = Some(Binding { cluster, registry });
        Ok(())
    }

    fn resolve(&self, _ctx: &RewriteContext, parameter: Option<&str>) -> Option<String> {
        let parameter = parameter?;
        Some(
            self.lookup(parameter)
                .unwrap_or_else(|| parameter.to_string()),
        )
    }

    fn destroy(&mut self) {
        if self.binding.take().is_some() {
            debug!("Destroyed {}", C::FUNCTION_NAME);
        }
    }

    fn cluster(&self) -> Option<&str> {
        self.binding.as_ref()?.cluster.as_deref()
    }

    fn registry(&self) -> Option<Arc<dyn ServiceRegistry>> {
        self.binding.as_ref()?.registry.clone()
    }

    fn state(&self) -> FunctionState {
        if self.binding.is_some() {
            FunctionState::Bound
        } else {
            FunctionState::Uninitialized
        }
    }
}

impl<C: ServiceComponent> fmt::Debug for ServiceFunctionProcessor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceFunctionProcessor")
            .field("name", &C::FUNCTION_NAME)
            .field("cluster", &self.cluster())
            .field("registry", &self.registry().is_some())
            .finish()
    }
}
