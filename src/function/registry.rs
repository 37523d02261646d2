//! Function registry dispatching rewrite function calls by name.

use crate::function::handler::{FunctionDescriptor, FunctionError, FunctionProcessor};
use crate::function::service::{
    ServiceAddressFunctionProcessor, ServiceHostFunctionProcessor, ServicePathFunctionProcessor,
    ServicePortFunctionProcessor, ServiceSchemeFunctionProcessor, ServiceUrlFunctionProcessor,
};
use crate::rewrite::{RewriteContext, UrlRewriteEnvironment};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Creates a fresh, uninitialized processor.
pub type ProcessorFactory = fn() -> Box<dyn FunctionProcessor>;

/// Processors built into the gateway.
pub const BUILTIN_FUNCTIONS: &[(&str, ProcessorFactory)] = &[
    ("serviceUrl", ServiceUrlFunctionProcessor::boxed),
    ("serviceAddress", ServiceAddressFunctionProcessor::boxed),
    ("serviceHost", ServiceHostFunctionProcessor::boxed),
    ("servicePort", ServicePortFunctionProcessor::boxed),
    ("serviceScheme", ServiceSchemeFunctionProcessor::boxed),
    ("servicePath", ServicePathFunctionProcessor::boxed),
];

static GLOBAL: Lazy<FunctionRegistry> = Lazy::new(|| {
    let registry = FunctionRegistry::with_builtins();
    info!("Discovered rewrite functions: {}", registry.names().join(", "));
    registry
});

/// Name-indexed table of processor factories.
#[derive(Default)]
pub struct FunctionRegistry {
    factories: HashMap<String, ProcessorFactory>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding [`BUILTIN_FUNCTIONS`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, factory) in BUILTIN_FUNCTIONS {
            if let Err(e) = registry.register(*name, *factory) {
                warn!("Skipping builtin function: {}", e);
            }
        }
        registry
    }

    /// Process-wide registry of the builtin functions, built on first use.
    pub fn global() -> &'static FunctionRegistry {
        &GLOBAL
    }

    /// Register a processor factory under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: ProcessorFactory,
    ) -> Result<(), FunctionError> {
        let name = name.into();

        if self.factories.contains_key(&name) {
            return Err(FunctionError::DuplicateFunction(name));
        }

        debug!("Registered function: {}", name);
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Whether a function is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered function names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Create a new, uninitialized processor for `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn FunctionProcessor>, FunctionError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| FunctionError::UnknownFunction(name.to_string()))
    }

    /// Start the function calls of one rewrite operation.
    pub fn session<'a>(&'a self, env: &'a dyn UrlRewriteEnvironment) -> FunctionSession<'a> {
        FunctionSession {
            registry: self,
            env,
            descriptors: HashMap::new(),
            active: HashMap::new(),
        }
    }
}

/// Function processors bound to one rewrite operation.
///
/// A processor is created and initialized the first time its name is
/// resolved and destroyed when the session is closed or dropped, so an
/// operation that fails halfway still releases every binding.
pub struct FunctionSession<'a> {
    registry: &'a FunctionRegistry,
    env: &'a dyn UrlRewriteEnvironment,
    descriptors: HashMap<String, FunctionDescriptor>,
    active: HashMap<String, Box<dyn FunctionProcessor>>,
}

impl<'a> FunctionSession<'a> {
    /// Supply the descriptor a rule attached to `name`. Only applies to
    /// processors not yet initialized in this session.
    pub fn with_descriptor(mut self, name: impl Into<String>, descriptor: FunctionDescriptor) -> Self {
        self.descriptors.insert(name.into(), descriptor);
        self
    }

    /// Resolve one call of function `name`.
    pub fn resolve(
        &mut self,
        name: &str,
        ctx: &RewriteContext,
        parameter: Option<&str>,
    ) -> Result<Option<String>, FunctionError> {
        if !self.active.contains_key(name) {
            let mut processor = self.registry.create(name)?;
            processor.initialize(Some(self.env), self.descriptors.get(name))?;
            self.active.insert(name.to_string(), processor);
        }

        let processor = self
            .active
            .get(name)
            .ok_or_else(|| FunctionError::UnknownFunction(name.to_string()))?;
        Ok(processor.resolve(ctx, parameter))
    }

    /// Number of processors currently bound.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Destroy every bound processor.
    pub fn close(mut self) {
        self.destroy_all();
    }

    fn destroy_all(&mut self) {
        for (_, mut processor) in self.active.drain() {
            processor.destroy();
        }
    }
}

impl Drop for FunctionSession<'_> {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::handler::FunctionState;
    use crate::registry::{GatewayServices, RegistrySnapshot, ServiceRegistry};
    use crate::rewrite::ResolutionEnvironment;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    static DESTROYED: AtomicUsize = AtomicUsize::new(0);

    /// Processor that counts destroys and records its descriptor.
    struct TrackingProcessor {
        bound: bool,
        prefix: String,
    }

    impl TrackingProcessor {
        fn boxed() -> Box<dyn FunctionProcessor> {
            Box::new(TrackingProcessor {
                bound: false,
                prefix: String::new(),
            })
        }
    }

    impl FunctionProcessor for TrackingProcessor {
        fn name(&self) -> &str {
            "tracking"
        }

        fn initialize(
            &mut self,
            env: Option<&dyn UrlRewriteEnvironment>,
            descriptor: Option<&FunctionDescriptor>,
        ) -> Result<(), FunctionError> {
            env.ok_or_else(|| FunctionError::illegal_argument("environment"))?;
            self.prefix = descriptor
                .and_then(|d| d.param("prefix"))
                .unwrap_or_default()
                .to_string();
            self.bound = true;
            Ok(())
        }

        fn resolve(&self, _ctx: &RewriteContext, parameter: Option<&str>) -> Option<String> {
            parameter.map(|p| format!("{}{}", self.prefix, p))
        }

        fn destroy(&mut self) {
            if self.bound {
                DESTROYED.fetch_add(1, Ordering::SeqCst);
            }
            self.bound = false;
        }

        fn cluster(&self) -> Option<&str> {
            None
        }

        fn registry(&self) -> Option<Arc<dyn ServiceRegistry>> {
            None
        }

        fn state(&self) -> FunctionState {
            if self.bound {
                FunctionState::Bound
            } else {
                FunctionState::Uninitialized
            }
        }
    }

    fn test_env() -> ResolutionEnvironment {
        let registry = RegistrySnapshot::builder()
            .service("sandbox", "NAMENODE", "hdfs://nn.sandbox:8020")
            .build();
        let services = GatewayServices::new().with_registry(Arc::new(registry));
        ResolutionEnvironment::new(Arc::new(services), "sandbox")
    }

    #[test]
    fn test_builtins_registered() {
        let registry = FunctionRegistry::with_builtins();

        assert_eq!(
            registry.names(),
            vec![
                "serviceAddress",
                "serviceHost",
                "servicePath",
                "servicePort",
                "serviceScheme",
                "serviceUrl"
            ]
        );
        for (name, _) in BUILTIN_FUNCTIONS {
            assert_eq!(registry.create(name).unwrap().name(), *name);
        }
    }

    #[test]
    fn test_global_registry_has_builtins() {
        assert!(FunctionRegistry::global().contains("servicePort"));
        assert!(std::ptr::eq(FunctionRegistry::global(), FunctionRegistry::global()));
    }

    #[test]
    fn test_duplicate_register() {
        let mut registry = FunctionRegistry::with_builtins();

        let result = registry.register("servicePort", TrackingProcessor::boxed);

        assert_eq!(
            result,
            Err(FunctionError::DuplicateFunction("servicePort".to_string()))
        );
    }

    #[test]
    fn test_create_unknown() {
        let registry = FunctionRegistry::new();

        assert!(matches!(
            registry.create("serviceFoo"),
            Err(FunctionError::UnknownFunction(name)) if name == "serviceFoo"
        ));
    }

    #[test]
    fn test_session_resolves_builtins() {
        let registry = FunctionRegistry::with_builtins();
        let env = test_env();
        let ctx = RewriteContext::default();
        let mut session = registry.session(&env);

        assert_eq!(
            session.resolve("serviceAddress", &ctx, Some("NAMENODE")).unwrap(),
            Some("nn.sandbox:8020".to_string())
        );
        assert_eq!(
            session.resolve("serviceScheme", &ctx, Some("NAMENODE")).unwrap(),
            Some("hdfs".to_string())
        );
        assert_eq!(
            session.resolve("servicePort", &ctx, Some("literal-host")).unwrap(),
            Some("literal-host".to_string())
        );
        assert_eq!(session.resolve("servicePort", &ctx, None).unwrap(), None);
        assert_eq!(session.active_count(), 3);
    }

    #[test]
    fn test_session_unknown_function() {
        let registry = FunctionRegistry::with_builtins();
        let env = test_env();
        let mut session = registry.session(&env);

        let result = session.resolve("serviceFoo", &RewriteContext::default(), Some("x"));

        assert_eq!(result, Err(FunctionError::UnknownFunction("serviceFoo".into())));
        assert_eq!(session.active_count(), 0);
    }

    #[test]
    fn test_session_passes_descriptor_and_destroys_on_close_and_drop() {
        let mut registry = FunctionRegistry::new();
        registry.register("tracking", TrackingProcessor::boxed).unwrap();
        let env = test_env();
        let ctx = RewriteContext::default();

        let before = DESTROYED.load(Ordering::SeqCst);

        let mut session = registry.session(&env).with_descriptor(
            "tracking",
            FunctionDescriptor::new("tracking").with_param("prefix", "svc-"),
        );
        assert_eq!(
            session.resolve("tracking", &ctx, Some("a")).unwrap(),
            Some("svc-a".to_string())
        );
        assert_eq!(
            session.resolve("tracking", &ctx, Some("b")).unwrap(),
            Some("svc-b".to_string())
        );
        session.close();
        assert_eq!(DESTROYED.load(Ordering::SeqCst), before + 1);

        {
            let mut session = registry.session(&env);
            session.resolve("tracking", &ctx, Some("c")).unwrap();
            let _ = session.resolve("missing", &ctx, Some("d"));
        }
        assert_eq!(DESTROYED.load(Ordering::SeqCst), before + 2);
    }
}
