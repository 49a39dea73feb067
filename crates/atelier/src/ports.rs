//! Port traits and the wire-level request/response model.
//!
//! The executor depends only on these traits. Infrastructure crates supply
//! the implementations:
//!
//! | Port | Purpose | Implementations |
//! |------|---------|-----------------|
//! | [`Transport`] | Perform one HTTP exchange | `atelier-http`: plain and TLS `reqwest` transports |
//! | [`ConfigProvider`] | Supply the live connection configuration | [`StaticConfig`], `atelier-http`: settings file |
//! | [`ConsoleSink`] | Display server console output | `atelier-http`: tracing sink; CLI: stderr |

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::{AtelierError, ConnectionConfig, Method, TransportError};

// ---------------------------------------------------------------------------
// Wire model
// ---------------------------------------------------------------------------

/// Basic authentication credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A fully built HTTP request, ready for a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    /// Request method.
    pub method: Method,
    /// Target host.
    pub host: String,
    /// Target port.
    pub port: u16,
    /// Encoded path and query, starting with `/`.
    pub path: String,
    /// Header name/value pairs in send order.
    pub headers: Vec<(String, String)>,
    /// Credentials sent as an `Authorization: Basic` header.
    pub auth: BasicAuth,
    /// Serialised JSON body; always `None` for GET.
    pub body: Option<Vec<u8>>,
}

impl WireRequest {
    /// Returns the first header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A completed HTTP response with its body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    /// Numeric status code.
    pub status: u16,
    /// Header name/value pairs; repeated headers appear once per value.
    pub headers: Vec<(String, String)>,
    /// Complete response body.
    pub body: Vec<u8>,
}

impl WireResponse {
    /// Returns the first header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value of the given header (case-insensitive), in order.
    pub fn headers_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if the status is in `200..=299`.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Performs HTTP exchanges over a pool of kept-alive connections.
///
/// Implementations read the complete response body before returning and
/// report connection-level failures as [`TransportError`]. Any HTTP status,
/// including 4xx and 5xx, is a successful exchange at this level.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the complete response.
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError>;
}

/// The plain and encrypted variants of the transport, chosen per request.
#[derive(Clone)]
pub struct TransportSet {
    plain: Arc<dyn Transport>,
    encrypted: Arc<dyn Transport>,
}

impl TransportSet {
    /// Creates a set from a plain and an encrypted transport.
    pub fn new(plain: Arc<dyn Transport>, encrypted: Arc<dyn Transport>) -> Self {
        Self { plain, encrypted }
    }

    /// Returns the transport matching the `https` configuration flag.
    pub fn select(&self, https: bool) -> &dyn Transport {
        if https {
            self.encrypted.as_ref()
        } else {
            self.plain.as_ref()
        }
    }
}

impl std::fmt::Debug for TransportSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSet").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Supplies the connection configuration.
///
/// Called at the start of every request (and by every document operation to
/// read the namespace), so changes made by the owner of the configuration
/// take effect on the next call.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Returns the configuration as it is right now.
    async fn current(&self) -> Result<ConnectionConfig, AtelierError>;
}

/// A [`ConfigProvider`] holding a configuration value in memory.
///
/// [`StaticConfig::set`] replaces the value for subsequent requests.
#[derive(Debug, Default)]
pub struct StaticConfig {
    config: RwLock<ConnectionConfig>,
}

impl StaticConfig {
    /// Creates a provider returning `config`.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    /// Replaces the configuration returned from now on.
    pub fn set(&self, config: ConnectionConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }
}

#[async_trait]
impl ConfigProvider for StaticConfig {
    async fn current(&self) -> Result<ConnectionConfig, AtelierError> {
        Ok(self
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

// ---------------------------------------------------------------------------
// Console output
// ---------------------------------------------------------------------------

/// Receives console text emitted by the server.
///
/// Invoked at most once per response, with the lines of the response's
/// `console` field in order.
pub trait ConsoleSink: Send + Sync {
    /// Displays the given lines.
    fn output(&self, lines: &[String]);
}
