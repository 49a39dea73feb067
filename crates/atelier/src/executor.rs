//! The request executor.
//!
//! [`RequestExecutor::execute`] turns one logical document API call into one
//! HTTP exchange:
//!
//! 1. read the live [`ConnectionConfig`] from the [`ConfigProvider`];
//! 2. pick the plain or encrypted [`Transport`](crate::Transport) from the `https` flag;
//! 3. build the encoded wire path, headers (`Accept`, `Cookie`,
//!    `Content-Type`), basic credentials and, for PUT/POST, the JSON body;
//! 4. send it and wait for the complete response;
//! 5. feed every `Set-Cookie` value to the [`CookieJar`];
//! 6. classify the body by `Content-Type` and forward any `console` lines to
//!    the [`ConsoleSink`];
//! 7. fail with [`AtelierError::HttpStatus`] if the status is outside
//!    `200..=299`, otherwise return the [`ResponseEnvelope`].
//!
//! A non-2xx status does not short-circuit steps 5 and 6.
//!
//! ## Concurrency
//!
//! `execute` takes `&self` and may run concurrently from many tasks. The jar
//! is read when a request is built and written when its response arrives, so
//! for a cookie touched by two overlapping requests the later response wins.
//! Callers that depend on session state (e.g. right after authenticating)
//! should await each call before issuing the next.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::Instrument;

use crate::{
    query, AtelierError, BasicAuth, ConfigProvider, ConnectionConfig, ConsoleSink, CookieJar,
    Method, QueryParams, ResponseEnvelope, TransportSet, WireRequest, WireResponse,
};

const ACCEPT_JSON: &str = "application/json";

/// Executes document API requests for one configured server connection.
///
/// Owns the session [`CookieJar`]; two executors never share cookies.
pub struct RequestExecutor {
    config: Arc<dyn ConfigProvider>,
    transports: TransportSet,
    console: Arc<dyn ConsoleSink>,
    cookies: Mutex<CookieJar>,
}

impl RequestExecutor {
    /// Creates an executor with an empty cookie jar.
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        transports: TransportSet,
        console: Arc<dyn ConsoleSink>,
    ) -> Self {
        Self {
            config,
            transports,
            console,
            cookies: Mutex::new(CookieJar::new()),
        }
    }

    /// Returns the configuration provider this executor reads from.
    pub fn config_provider(&self) -> &Arc<dyn ConfigProvider> {
        &self.config
    }

    /// Returns a snapshot of the session cookies.
    pub fn cookies(&self) -> CookieJar {
        self.jar().clone()
    }

    /// Performs one request.
    ///
    /// `path` is relative to `/api/atelier/` and may be empty. `body` is
    /// serialised as JSON for PUT and POST (`null` when absent) and ignored
    /// for GET.
    ///
    /// # Errors
    ///
    /// - [`AtelierError::HttpStatus`] for a status outside `200..=299`.
    /// - [`AtelierError::Transport`] when no response was received.
    /// - [`AtelierError::Parse`] when a JSON response does not parse.
    /// - [`AtelierError::Configuration`] when the configuration cannot be read.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        params: Option<&QueryParams>,
        body: Option<&serde_json::Value>,
    ) -> Result<ResponseEnvelope, AtelierError> {
        let wire_path = query::wire_path(path, params);
        let span = tracing::info_span!("atelier.request", method = %method, path = %wire_path);

        let result = self
            .exchange(method, &wire_path, body)
            .instrument(span)
            .await;

        if let Err(e) = &result {
            tracing::error!(method = %method, path = %wire_path, error = %e, "API request failed");
        }
        result
    }

    async fn exchange(
        &self,
        method: Method,
        wire_path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ResponseEnvelope, AtelierError> {
        let config = self.config.current().await?;
        let request = self.build_request(method, wire_path, body, &config)?;

        tracing::info!(https = config.https, "API request {}", wire_path);
        let response = self.transports.select(config.https).send(request).await?;

        self.jar().update(response.headers_all("set-cookie"));

        let envelope = classify(wire_path, &response);
        if !response.is_success() {
            match &envelope {
                Ok(envelope) => self.forward_console(envelope),
                Err(e) => tracing::warn!(error = %e, "Error response body could not be parsed"),
            }
            return Err(AtelierError::HttpStatus {
                path: wire_path.to_string(),
                status: response.status,
            });
        }

        let envelope = envelope?;
        self.forward_console(&envelope);
        tracing::debug!(status = response.status, "API request completed");
        Ok(envelope)
    }

    fn build_request(
        &self,
        method: Method,
        wire_path: &str,
        body: Option<&serde_json::Value>,
        config: &ConnectionConfig,
    ) -> Result<WireRequest, AtelierError> {
        let mut headers = vec![("Accept".to_string(), ACCEPT_JSON.to_string())];
        if let Some(cookie) = self.jar().header_value() {
            headers.push(("Cookie".to_string(), cookie));
        }

        let body = if method.sends_body() {
            headers.push(("Content-Type".to_string(), ACCEPT_JSON.to_string()));
            let value = body.unwrap_or(&serde_json::Value::Null);
            Some(serde_json::to_vec(value).map_err(AtelierError::BodySerialization)?)
        } else {
            None
        };

        Ok(WireRequest {
            method,
            host: config.host.clone(),
            port: config.port,
            path: wire_path.to_string(),
            headers,
            auth: BasicAuth {
                username: config.username.clone(),
                password: config.password.clone(),
            },
            body,
        })
    }

    fn forward_console(&self, envelope: &ResponseEnvelope) {
        if let Some(lines) = envelope.console_lines() {
            self.console.output(&lines);
        }
    }

    fn jar(&self) -> MutexGuard<'_, CookieJar> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("transports", &self.transports)
            .field("cookies", &*self.jar())
            .finish_non_exhaustive()
    }
}

/// Classifies a response body by its `Content-Type` header.
fn classify(wire_path: &str, response: &WireResponse) -> Result<ResponseEnvelope, AtelierError> {
    let is_json = response
        .header("content-type")
        .is_some_and(|ct| ct.contains("json"));

    if is_json {
        serde_json::from_slice(&response.body)
            .map(ResponseEnvelope::Json)
            .map_err(|source| AtelierError::Parse {
                path: wire_path.to_string(),
                source,
            })
    } else {
        Ok(ResponseEnvelope::Text(
            String::from_utf8_lossy(&response.body).into_owned(),
        ))
    }
}
