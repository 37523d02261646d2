//! Rewrite function processor trait, descriptor and error type.

use crate::http::{AdminResponse, StatusCode};
use crate::registry::ServiceRegistry;
use crate::rewrite::{RewriteContext, UrlRewriteEnvironment};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Optional configuration supplied by the rule that references a function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Function name the descriptor was written for.
    pub name: String,
    /// Free-form parameters.
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl FunctionDescriptor {
    /// Create a descriptor for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: HashMap::new(),
        }
    }

    /// Add a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Get a parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Lifecycle state of a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionState {
    /// Nothing bound; every lookup misses.
    Uninitialized,
    /// Bound to one rewrite environment.
    Bound,
}

/// A named rewrite function following the initialize-resolve-destroy model.
///
/// An instance belongs to a single rewrite operation and is never shared
/// across concurrent operations.
pub trait FunctionProcessor: Send + Sync {
    /// Name used to dispatch calls to this processor.
    fn name(&self) -> &str;

    /// Bind the processor to the environment of a rewrite operation.
    ///
    /// The environment is mandatory; the descriptor is not.
    fn initialize(
        &mut self,
        env: Option<&dyn UrlRewriteEnvironment>,
        descriptor: Option<&FunctionDescriptor>,
    ) -> Result<(), FunctionError>;

    /// Resolve one function call. `None` in gives `None` out.
    fn resolve(&self, ctx: &RewriteContext, parameter: Option<&str>) -> Option<String>;

    /// Release the binding. Safe to call repeatedly or before `initialize`.
    fn destroy(&mut self);

    /// Bound cluster name.
    fn cluster(&self) -> Option<&str>;

    /// Bound service registry.
    fn registry(&self) -> Option<Arc<dyn ServiceRegistry>>;

    /// Current lifecycle state.
    fn state(&self) -> FunctionState;
}

/// Error raised by function processors and the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FunctionError {
    /// A mandatory argument was missing or invalid.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    /// A rule referenced a function nobody registered.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    /// Two processors were registered under one name.
    #[error("function '{0}' is already registered")]
    DuplicateFunction(String),
}

impl FunctionError {
    /// Create an illegal-argument error.
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        FunctionError::IllegalArgument(message.into())
    }

    /// HTTP-style status code for this error.
    pub fn code(&self) -> u16 {
        match self {
            FunctionError::IllegalArgument(_) => 400,
            FunctionError::UnknownFunction(_) => 404,
            FunctionError::DuplicateFunction(_) => 409,
        }
    }
}

impl From<FunctionError> for AdminResponse {
    fn from(err: FunctionError) -> Self {
        AdminResponse::error(StatusCode(err.code()), err.to_string())
    }
}
