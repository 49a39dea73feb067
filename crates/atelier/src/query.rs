//! Query-string serialisation and wire-path construction.
//!
//! Parameters are held in a sorted map, so the serialised order is the key
//! order. Empty values are omitted; booleans render as `1`/`0`.

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Fixed prefix of every document API path.
pub const API_ROOT: &str = "/api/atelier/";

/// Characters left unescaped when encoding a full URI (path plus query).
const URI_RESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A scalar query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// No value; the key is omitted.
    Absent,
    /// Text; omitted when empty.
    Text(String),
    /// Boolean; always rendered as `1` or `0`.
    Bool(bool),
    /// Integer; omitted when zero.
    Int(i64),
}

impl QueryValue {
    /// Returns the rendered value, or `None` if the key must be omitted.
    pub fn render(&self) -> Option<String> {
        match self {
            QueryValue::Absent => None,
            QueryValue::Text(s) if s.is_empty() => None,
            QueryValue::Text(s) => Some(s.clone()),
            QueryValue::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            QueryValue::Int(0) => None,
            QueryValue::Int(n) => Some(n.to_string()),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(QueryValue::Absent, Into::into)
    }
}

// ---------------------------------------------------------------------------
// Parameter maps
// ---------------------------------------------------------------------------

/// Query parameters of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, QueryValue>);

impl QueryParams {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a parameter and returns the map.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds (or replaces) a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Serialises the parameters as `key=value` pairs joined with `&`.
    ///
    /// Keys whose value renders to nothing are skipped. The result is not
    /// percent-encoded; see [`wire_path`].
    pub fn to_query_string(&self) -> String {
        self.0
            .iter()
            .filter_map(|(key, value)| value.render().map(|v| format!("{key}={v}")))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Builds the encoded wire path `/api/atelier/<path>?<query>`.
///
/// The `?` is always present, even with no parameters. The combined string is
/// percent-encoded as a whole URI: reserved characters such as `/`, `?`, `&`
/// and `=` pass through, everything else outside the unreserved set is escaped.
pub fn wire_path(path: &str, params: Option<&QueryParams>) -> String {
    let query = params.map(QueryParams::to_query_string).unwrap_or_default();
    let raw = format!("{API_ROOT}{path}?{query}");
    utf8_percent_encode(&raw, URI_RESERVED).to_string()
}
