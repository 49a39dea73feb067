//! Atelier HTTP infrastructure adapter.
//!
//! Implements the ports of the [`atelier`] crate:
//!
//! - [`ReqwestTransport`]: [`atelier::Transport`] over `reqwest`, one instance
//!   per scheme, each with a bounded keep-alive connection pool.
//! - [`SettingsFileConfig`]: [`atelier::ConfigProvider`] reading the
//!   `objectscript.conn` object from a JSON settings file on every request.
//! - [`TracingConsoleSink`]: [`atelier::ConsoleSink`] emitting tracing events.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Connection pooling, TLS, timeouts and the mapping of
//! `reqwest` failures onto [`atelier::TransportError`] live here. The
//! [`atelier`] crate sees only its own port traits.

use std::sync::Arc;

use atelier::{AtelierClient, ConfigProvider, ConsoleSink, TransportError};

pub mod console;
pub mod settings;
pub mod transport;

pub use console::TracingConsoleSink;
pub use settings::{parse_settings, SettingsFileConfig};
pub use transport::{http_transports, ReqwestTransport, Scheme, TransportSettings, MAX_SOCKETS};

/// Builds an [`AtelierClient`] over the `reqwest` transports.
pub fn connect(
    config: Arc<dyn ConfigProvider>,
    console: Arc<dyn ConsoleSink>,
    settings: &TransportSettings,
) -> Result<AtelierClient, TransportError> {
    Ok(AtelierClient::new(
        config,
        http_transports(settings)?,
        console,
    ))
}
