//! Remote endpoint addressing.
//!
//! Hosts are usually configured by their web UI base URL
//! (`http://nas.local/`); the management socket lives under a fixed path on
//! the same host, so the base URL is rewritten to the matching `ws`/`wss`
//! URL here.

use url::Url;

use crate::{Error, Result};

/// Default path of the management socket on the host.
pub const DEFAULT_WEBSOCKET_PATH: &str = "/websocket";

/// Network address of a remote management socket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Parse an endpoint using [`DEFAULT_WEBSOCKET_PATH`].
    ///
    /// See [`Endpoint::from_base_url`].
    pub fn parse(input: &str) -> Result<Self> {
        Self::from_base_url(input, DEFAULT_WEBSOCKET_PATH)
    }

    /// Parse an endpoint from a socket URL, a web base URL or a bare host.
    ///
    /// - `ws://` / `wss://` URLs are used as given
    /// - `http://` / `https://` URLs switch to `ws` / `wss`
    /// - a bare host (`nas.local`, `10.0.0.5:8080`) is treated as `ws://`
    ///
    /// For the last two forms an empty path is replaced by `websocket_path`.
    pub fn from_base_url(input: &str, websocket_path: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidEndpoint("empty address".to_string()));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("ws://{trimmed}")
        };

        let mut url = Url::parse(&candidate)
            .map_err(|e| Error::InvalidEndpoint(format!("{trimmed}: {e}")))?;

        if url.host_str().is_none() {
            return Err(Error::InvalidEndpoint(format!("{trimmed}: missing host")));
        }

        let rewrite_path = match url.scheme() {
            "ws" | "wss" => !trimmed.contains("://"),
            "http" => {
                set_scheme(&mut url, "ws", trimmed)?;
                true
            }
            "https" => {
                set_scheme(&mut url, "wss", trimmed)?;
                true
            }
            other => {
                return Err(Error::InvalidEndpoint(format!(
                    "{trimmed}: unsupported scheme '{other}'"
                )))
            }
        };

        if rewrite_path && (url.path().is_empty() || url.path() == "/") {
            url.set_path(websocket_path);
        }

        Ok(Self { url })
    }

    /// Full socket URL.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Parsed socket URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host part, for log lines.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Whether the socket uses TLS.
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "wss"
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}

impl std::str::FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn set_scheme(url: &mut Url, scheme: &str, original: &str) -> Result<()> {
    url.set_scheme(scheme)
        .map_err(|()| Error::InvalidEndpoint(format!("{original}: cannot switch to {scheme}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_base_url_becomes_ws() {
        let endpoint = Endpoint::parse("http://nas.local/").unwrap();
        assert_eq!(endpoint.as_str(), "ws://nas.local/websocket");
        assert!(!endpoint.is_secure());
    }

    #[test]
    fn test_https_base_url_becomes_wss() {
        let endpoint = Endpoint::parse("https://nas.local").unwrap();
        assert_eq!(endpoint.as_str(), "wss://nas.local/websocket");
        assert!(endpoint.is_secure());
    }

    #[test]
    fn test_bare_host() {
        let endpoint = Endpoint::parse("192.168.1.20").unwrap();
        assert_eq!(endpoint.as_str(), "ws://192.168.1.20/websocket");
        assert_eq!(endpoint.host(), "192.168.1.20");
    }

    #[test]
    fn test_bare_host_with_port() {
        let endpoint = Endpoint::parse("nas.local:8080").unwrap();
        assert_eq!(endpoint.as_str(), "ws://nas.local:8080/websocket");
    }

    #[test]
    fn test_explicit_ws_url_is_kept() {
        let endpoint = Endpoint::parse("ws://nas.local/").unwrap();
        assert_eq!(endpoint.as_str(), "ws://nas.local/");

        let endpoint = Endpoint::parse("wss://nas.local/api/current").unwrap();
        assert_eq!(endpoint.as_str(), "wss://nas.local/api/current");
    }

    #[test]
    fn test_existing_path_is_kept() {
        let endpoint = Endpoint::parse("http://nas.local/custom").unwrap();
        assert_eq!(endpoint.as_str(), "ws://nas.local/custom");
    }

    #[test]
    fn test_custom_websocket_path() {
        let endpoint = Endpoint::from_base_url("http://nas.local", "/api/current").unwrap();
        assert_eq!(endpoint.as_str(), "ws://nas.local/api/current");
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            Endpoint::parse("   "),
            Err(Error::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_rejects_unsupported_scheme() {
        assert!(matches!(
            Endpoint::parse("ftp://nas.local"),
            Err(Error::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_from_str() {
        let endpoint: Endpoint = "http://nas.local".parse().unwrap();
        assert_eq!(endpoint.to_string(), "ws://nas.local/websocket");
    }
}
