//! Rewrite context passed to every `resolve` call.

/// Which half of the exchange is being rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RewriteDirection {
    #[default]
    Request,
    Response,
}

/// State of the rewrite in progress.
///
/// Service functions do not consult it; it is carried so that other
/// functions sharing the dispatcher can.
#[derive(Debug, Clone, Default)]
pub struct RewriteContext {
    /// Direction of the rewrite.
    pub direction: RewriteDirection,
}

impl RewriteContext {
    /// Create a context for the given direction.
    pub fn new(direction: RewriteDirection) -> Self {
        Self { direction }
    }
}
