//! Component view of a canonical backend URL.

use url::Url;

/// A registry URL parsed into scheme, host, port and path.
///
/// Only URLs with a non-empty host are accepted; anything else is treated
/// as a malformed registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    raw: String,
    parsed: Url,
}

impl ResolvedUrl {
    /// Parse a `scheme://host[:port][/path]` string.
    pub fn parse(raw: &str) -> Option<Self> {
        let parsed = Url::parse(raw).ok()?;
        match parsed.host_str() {
            Some(host) if !host.is_empty() => Some(Self {
                raw: raw.to_string(),
                parsed,
            }),
            _ => None,
        }
    }

    /// The URL exactly as the registry stores it.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Scheme, lowercased.
    pub fn scheme(&self) -> &str {
        self.parsed.scheme()
    }

    /// Host. IPv6 literals keep their brackets.
    pub fn host(&self) -> &str {
        self.parsed.host_str().unwrap_or_default()
    }

    /// Port written in the URL, or the scheme's well-known default.
    ///
    /// Writing a scheme's default port explicitly (`http://h:80`) is
    /// indistinguishable from omitting it.
    pub fn port(&self) -> Option<u16> {
        self.parsed.port_or_known_default()
    }

    /// Path, empty when the URL has none.
    pub fn path(&self) -> &str {
        self.parsed.path()
    }

    /// `host:port`, or the host alone when no port is known.
    pub fn address(&self) -> String {
        match self.port() {
            Some(port) => format!("{}:{}", self.host(), port),
            None => self.host().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_scheme_components() {
        let url = ResolvedUrl::parse("test-scheme://test-host:777/test-path").unwrap();

        assert_eq!(url.scheme(), "test-scheme");
        assert_eq!(url.host(), "test-host");
        assert_eq!(url.port(), Some(777));
        assert_eq!(url.path(), "/test-path");
        assert_eq!(url.address(), "test-host:777");
        assert_eq!(url.as_str(), "test-scheme://test-host:777/test-path");
    }

    #[test]
    fn test_known_default_ports() {
        assert_eq!(ResolvedUrl::parse("https://gw/").unwrap().port(), Some(443));
        assert_eq!(ResolvedUrl::parse("http://gw:80/x").unwrap().port(), Some(80));
        assert_eq!(
            ResolvedUrl::parse("http://gw:80/x").unwrap().address(),
            "gw:80"
        );
    }

    #[test]
    fn test_unknown_scheme_without_port() {
        let url = ResolvedUrl::parse("thrift://metastore/db").unwrap();

        assert_eq!(url.port(), None);
        assert_eq!(url.address(), "metastore");
    }

    #[test]
    fn test_ipv6_host() {
        let url = ResolvedUrl::parse("http://[::1]:8080/").unwrap();

        assert_eq!(url.host(), "[::1]");
        assert_eq!(url.address(), "[::1]:8080");
    }

    #[test]
    fn test_rejects_malformed_and_hostless() {
        assert!(ResolvedUrl::parse("not a url").is_none());
        assert!(ResolvedUrl::parse("http://host:99999/").is_none());
        assert!(ResolvedUrl::parse("mailto:ops@example.com").is_none());
        assert!(ResolvedUrl::parse("localhost:8080").is_none());
    }
}
