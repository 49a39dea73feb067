//! Shared value types for the Atelier client.
//!
//! ## Contents
//!
//! - [`ConnectionConfig`]: connection parameters supplied by a
//!   [`crate::ConfigProvider`] and re-read for every request.
//! - [`Method`]: the HTTP methods the document API uses.
//! - [`ResponseEnvelope`]: the resolved value of a request, either parsed JSON
//!   or raw text.
//! - Document payload types used by [`crate::AtelierClient`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Connection configuration
// ---------------------------------------------------------------------------

/// Connection parameters for one Atelier server.
///
/// Deserialises from the `objectscript.conn` settings object. Every field is
/// optional in the source document and falls back to the defaults of a local
/// development server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Host name or address of the server.
    pub host: String,
    /// TCP port of the web server.
    pub port: u16,
    /// Basic authentication user name.
    pub username: String,
    /// Basic authentication password.
    pub password: String,
    /// Namespace interpolated into document paths.
    pub ns: String,
    /// `true` selects the encrypted (TLS) transport.
    pub https: bool,
}

impl ConnectionConfig {
    /// Returns the scheme matching [`ConnectionConfig::https`].
    pub fn scheme(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 57772,
            username: "_SYSTEM".to_string(),
            password: "SYS".to_string(),
            ns: "USER".to_string(),
            https: false,
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ns", &self.ns)
            .field("https", &self.https)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

/// HTTP method of an Atelier request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read; never carries a body.
    Get,
    /// Create or replace; carries a JSON body.
    Put,
    /// Action; carries a JSON body.
    Post,
}

impl Method {
    /// Returns the upper-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
        }
    }

    /// Returns `true` for methods that send a JSON body.
    pub fn sends_body(self) -> bool {
        matches!(self, Method::Put | Method::Post)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a method name other than GET, PUT or POST.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported method: {0}")]
pub struct UnsupportedMethod(pub String);

impl std::str::FromStr for Method {
    type Err = UnsupportedMethod;

    /// Parses a method name case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "PUT" => Ok(Method::Put),
            "POST" => Ok(Method::Post),
            _ => Err(UnsupportedMethod(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// The resolved value of a request.
///
/// Classification is by the response `Content-Type` header alone: a header
/// containing `json` yields [`ResponseEnvelope::Json`], anything else (or no
/// header) yields [`ResponseEnvelope::Text`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    /// Parsed JSON document.
    Json(serde_json::Value),
    /// Raw response body.
    Text(String),
}

impl ResponseEnvelope {
    /// Returns the parsed document, if this is a JSON response.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseEnvelope::Json(v) => Some(v),
            ResponseEnvelope::Text(_) => None,
        }
    }

    /// Returns the raw body, if this is a text response.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseEnvelope::Text(t) => Some(t),
            ResponseEnvelope::Json(_) => None,
        }
    }

    /// Returns the server-emitted console lines, if the JSON document has a
    /// `console` array.
    ///
    /// String entries are returned as-is; any other entry is rendered as its
    /// JSON text.
    pub fn console_lines(&self) -> Option<Vec<String>> {
        let console = self.as_json()?.get("console")?.as_array()?;
        Some(
            console
                .iter()
                .map(|line| match line {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Document payloads
// ---------------------------------------------------------------------------

/// Body of a `putDoc` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContent {
    /// `true` when `content` holds base64-encoded binary chunks.
    pub enc: bool,
    /// Source lines (or encoded chunks when `enc` is set).
    pub content: Vec<String>,
}

impl DocumentContent {
    /// Creates plain-text content from source lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enc: false,
            content: lines.into_iter().map(Into::into).collect(),
        }
    }
}

/// Filters for a `getDocNames` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocNamesQuery {
    /// Include generated documents.
    pub generated: bool,
    /// Document category (`CLS`, `RTN`, `CSP`, `OTH`, or `*`).
    pub category: String,
    /// Document type within the category (`*` for all).
    pub doc_type: String,
    /// SQL `LIKE` filter on document names; empty means no filter.
    pub filter: String,
}

impl Default for DocNamesQuery {
    fn default() -> Self {
        Self {
            generated: false,
            category: "*".to_string(),
            doc_type: "*".to_string(),
            filter: String::new(),
        }
    }
}
