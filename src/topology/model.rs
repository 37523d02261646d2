//! Topology documents managed through the admin API.

use serde::{Deserialize, Serialize};

/// A named set of logical services bound to backend URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    /// Topology (cluster) name.
    pub name: String,
    /// Last update, Unix epoch milliseconds.
    #[serde(default)]
    pub timestamp: u64,
    /// Services of the topology.
    #[serde(default)]
    pub services: Vec<TopologyService>,
}

/// One logical service of a topology.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyService {
    /// Logical service name, e.g. `WEBHDFS`.
    pub role: String,
    /// Backend URLs; the first one is canonical.
    #[serde(default)]
    pub urls: Vec<String>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a service with a single URL.
    pub fn service(mut self, role: impl Into<String>, url: impl Into<String>) -> Self {
        self.services.push(TopologyService {
            role: role.into(),
            urls: vec![url.into()],
        });
        self
    }

    /// Canonical URL of `role`.
    pub fn canonical_url(&self, role: &str) -> Option<&str> {
        self.services
            .iter()
            .rev()
            .find(|service| service.role == role)
            .and_then(|service| service.urls.first())
            .map(String::as_str)
    }
}

/// Whether `name` may be used as a topology name.
///
/// Names double as file names, so they are limited to ASCII letters,
/// digits, `.`, `_` and `-`, and may not start with `.`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
