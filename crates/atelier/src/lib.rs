//! Client domain for the Atelier document API.
//!
//! An [`AtelierClient`] fetches, lists, compiles and writes server-held source
//! documents under a namespace. Every operation funnels through
//! [`RequestExecutor::execute`], which keeps the authenticated session in a
//! [`CookieJar`], builds the wire request, and resolves the response to a
//! [`ResponseEnvelope`] (parsed JSON or raw text).
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate has no network I/O dependencies.
//! The HTTP stack, configuration sources and console output are supplied
//! through the [`Transport`], [`ConfigProvider`] and [`ConsoleSink`] traits;
//! `atelier-http` provides the production implementations.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`client`] | Document operations (`get_doc`, `put_doc`, `action_compile`, ...) |
//! | [`executor`] | The request executor |
//! | [`cookies`] | Session cookie jar |
//! | [`query`] | Query-string serialisation and URI encoding |
//! | [`ports`] | Port traits and the wire request/response model |
//! | [`identifiers`] | Newtype names (`DocumentName`, `CookieName`) |
//! | [`types`] | Configuration, methods, envelopes, document payloads |
//! | [`errors`] | Error and retry-policy types |

pub mod client;
pub mod cookies;
pub mod errors;
pub mod executor;
pub mod identifiers;
pub mod ports;
pub mod query;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use client::AtelierClient;
pub use cookies::CookieJar;
pub use errors::{AtelierError, RetryPolicy, TransportError};
pub use executor::RequestExecutor;
pub use identifiers::{CookieName, DocumentName};
pub use ports::{
    BasicAuth, ConfigProvider, ConsoleSink, StaticConfig, Transport, TransportSet, WireRequest,
    WireResponse,
};
pub use query::{wire_path, QueryParams, QueryValue, API_ROOT};
pub use types::{
    ConnectionConfig, DocNamesQuery, DocumentContent, Method, ResponseEnvelope, UnsupportedMethod,
};
