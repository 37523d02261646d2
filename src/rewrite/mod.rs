//! Per-operation state handed to rewrite functions.

mod context;
mod environment;

pub use context::{RewriteContext, RewriteDirection};
pub use environment::{ResolutionEnvironment, UrlRewriteEnvironment};
