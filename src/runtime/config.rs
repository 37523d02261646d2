//! Admin server configuration.

use serde::{Deserialize, Serialize};
use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Configuration for the admin server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory of topology files; `None` keeps topologies in memory.
    pub topology_dir: Option<PathBuf>,
    /// Whether to serve `/_health`.
    pub enable_health: bool,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8443,
            topology_dir: None,
            enable_health: true,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

impl GatewayConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `SVCREG_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(host) = lookup("SVCREG_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "SVCREG_PORT") {
            config.port = port;
        }
        if let Some(dir) = lookup("SVCREG_TOPOLOGY_DIR") {
            config.topology_dir = Some(PathBuf::from(dir));
        }
        if let Some(size) = parse_var(&lookup, "SVCREG_MAX_BODY_SIZE") {
            config.max_body_size = size;
        }
        config
    }

    /// Set the host address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Keep topologies in `dir`.
    pub fn topology_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.topology_dir = Some(dir.into());
        self
    }

    /// Set the maximum request body size.
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Socket address to bind. The host must be an IP literal; IPv6 hosts
    /// may be given with or without brackets.
    pub fn bind_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        let ip: IpAddr = host.parse()?;
        Ok(SocketAddr::from((ip, self.port)))
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}
