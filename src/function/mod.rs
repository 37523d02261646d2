//! Rewrite functions resolving logical service names.

pub mod handler;
pub mod registry;
pub mod service;
pub mod resolved;

pub use handler::{FunctionDescriptor, FunctionError, FunctionProcessor, FunctionState};
pub use registry::{FunctionRegistry, FunctionSession, ProcessorFactory, BUILTIN_FUNCTIONS};
pub use service::{
    ServiceAddressFunctionProcessor, ServiceComponent, ServiceFunctionProcessor,
    ServiceHostFunctionProcessor, ServicePathFunctionProcessor, ServicePortFunctionProcessor,
    ServiceSchemeFunctionProcessor, ServiceUrlFunctionProcessor,
};
pub use resolved::ResolvedUrl;
