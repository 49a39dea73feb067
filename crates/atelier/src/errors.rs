//! Error and retry-policy types for the Atelier client.
//!
//! [`AtelierError`] is the single error type returned by every request and
//! document operation. Transport adapters report connection-level failures as
//! [`TransportError`], which the executor wraps without altering.
//!
//! [`RetryPolicy`] is a hint only: nothing in this crate retries a request.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: connection failures, timeouts, 5xx responses.
/// - `NonRetryable` errors: 4xx responses, malformed JSON, invalid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means the caller
        /// applies its own schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried without changing its inputs.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// A connection-level failure reported by a [`crate::Transport`].
///
/// Produced before any HTTP status is available: refused or reset
/// connections, DNS failures, TLS handshake failures, premature close, or an
/// expired timeout when one is configured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("Connection failed: {message}")]
    Connect {
        /// Description from the underlying HTTP stack.
        message: String,
    },

    /// The exchange did not complete within the configured timeout.
    #[error("Request timed out: {message}")]
    Timeout {
        /// Description from the underlying HTTP stack.
        message: String,
    },

    /// The request could not be built (e.g. an unparsable host or header).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of the rejected input.
        message: String,
    },

    /// The connection failed while sending the request or reading the response.
    #[error("I/O failure: {message}")]
    Io {
        /// Description from the underlying HTTP stack.
        message: String,
    },
}

impl TransportError {
    /// Returns the retry hint for this failure.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            TransportError::InvalidRequest { .. } => RetryPolicy::NonRetryable,
            _ => RetryPolicy::Retryable { after: None },
        }
    }
}

// ---------------------------------------------------------------------------
// Client errors
// ---------------------------------------------------------------------------

/// Errors surfaced by [`crate::RequestExecutor::execute`] and the document
/// operations built on it.
#[derive(Debug, Error)]
pub enum AtelierError {
    /// The server answered with a status outside `200..=299`.
    ///
    /// Cookies and the response body were still processed before this error
    /// was returned.
    #[error("Failed to load page \"{path}\", status code: {status}")]
    HttpStatus {
        /// Encoded wire path (including the query string) of the request.
        path: String,
        /// Numeric HTTP status code.
        status: u16,
    },

    /// The transport failed before a response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response declared a JSON content type but its body is not valid JSON.
    #[error("Malformed JSON response for \"{path}\": {source}")]
    Parse {
        /// Encoded wire path of the request.
        path: String,
        /// The underlying parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// The request body could not be serialised as JSON.
    #[error("Request body could not be serialised: {0}")]
    BodySerialization(#[source] serde_json::Error),

    /// The connection configuration could not be read.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl AtelierError {
    /// Returns the HTTP status carried by an [`AtelierError::HttpStatus`].
    pub fn status(&self) -> Option<u16> {
        match self {
            AtelierError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the retry hint for this error.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            AtelierError::HttpStatus { status, .. } if *status >= 500 => {
                RetryPolicy::Retryable { after: None }
            }
            AtelierError::Transport(e) => e.retry_policy(),
            _ => RetryPolicy::NonRetryable,
        }
    }
}
