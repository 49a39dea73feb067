//! `reqwest`-backed implementations of [`atelier::Transport`].
//!
//! One [`ReqwestTransport`] per scheme is built when a client is created and
//! reused for every request, so kept-alive connections survive between calls.
//! A semaphore caps the number of exchanges in flight at
//! [`TransportSettings::max_connections`]; further calls wait for a permit.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use atelier::{Method, TransportError, TransportSet, WireRequest, WireResponse};
use tokio::sync::Semaphore;

/// Default cap on simultaneous connections per transport.
pub const MAX_SOCKETS: usize = 10;

const TCP_KEEPALIVE: Duration = Duration::from_secs(60);

/// Which variant of the HTTP primitive a transport speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain HTTP.
    Plain,
    /// HTTP over TLS.
    Encrypted,
}

impl Scheme {
    fn as_str(self) -> &'static str {
        match self {
            Scheme::Plain => "http",
            Scheme::Encrypted => "https",
        }
    }
}

/// Connection-pool and timeout settings shared by both transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    /// Maximum simultaneous exchanges (and idle pooled connections per host).
    pub max_connections: usize,
    /// Whole-exchange timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Accept self-signed or otherwise invalid server certificates.
    pub accept_invalid_certs: bool,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            max_connections: MAX_SOCKETS,
            timeout: None,
            accept_invalid_certs: false,
        }
    }
}

/// A pooled HTTP transport for one scheme.
#[derive(Debug)]
pub struct ReqwestTransport {
    scheme: Scheme,
    client: reqwest::Client,
    permits: Arc<Semaphore>,
}

impl ReqwestTransport {
    /// Builds a transport with its own connection pool.
    pub fn new(scheme: Scheme, settings: &TransportSettings) -> Result<Self, TransportError> {
        let max_connections = settings.max_connections.max(1);
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(max_connections)
            .tcp_keepalive(TCP_KEEPALIVE)
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(settings.accept_invalid_certs);
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| TransportError::InvalidRequest {
            message: error_chain(&e),
        })?;

        Ok(Self {
            scheme,
            client,
            permits: Arc::new(Semaphore::new(max_connections)),
        })
    }

    /// Returns the scheme this transport speaks.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    fn url(&self, request: &WireRequest) -> Result<reqwest::Url, TransportError> {
        let host = if request.host.contains(':') && !request.host.starts_with('[') {
            format!("[{}]", request.host)
        } else {
            request.host.clone()
        };
        let raw = format!(
            "{}://{}:{}{}",
            self.scheme.as_str(),
            host,
            request.port,
            request.path
        );
        reqwest::Url::parse(&raw).map_err(|e| TransportError::InvalidRequest {
            message: format!("{raw}: {e}"),
        })
    }
}

#[async_trait]
impl atelier::Transport for ReqwestTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        let url = self.url(&request)?;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| TransportError::Io {
                message: e.to_string(),
            })?;

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
        };
        let mut builder = self
            .client
            .request(method, url)
            .basic_auth(&request.auth.username, Some(&request.auth.password));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(map_error)?.to_vec();

        tracing::trace!(status, bytes = body.len(), "Response received");
        Ok(WireResponse {
            status,
            headers,
            body,
        })
    }
}

/// Builds the plain and encrypted transports for one client.
pub fn http_transports(settings: &TransportSettings) -> Result<TransportSet, TransportError> {
    Ok(TransportSet::new(
        Arc::new(ReqwestTransport::new(Scheme::Plain, settings)?),
        Arc::new(ReqwestTransport::new(Scheme::Encrypted, settings)?),
    ))
}

fn map_error(e: reqwest::Error) -> TransportError {
    let message = error_chain(&e);
    if e.is_timeout() {
        TransportError::Timeout { message }
    } else if e.is_connect() {
        TransportError::Connect { message }
    } else if e.is_builder() {
        TransportError::InvalidRequest { message }
    } else {
        TransportError::Io { message }
    }
}

// reqwest's top-level message rarely names the cause; append the source chain.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
