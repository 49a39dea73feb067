//! Settings-file configuration provider.
//!
//! Reads the `objectscript.conn` object from a JSON settings document. The
//! file is read again on every call so edits apply to the next request
//! without rebuilding the client.
//!
//! Both layouts editors write are accepted:
//!
//! ```json
//! { "objectscript.conn": { "host": "localhost", "port": 52773, "ns": "USER" } }
//! ```
//!
//! ```json
//! { "objectscript": { "conn": { "host": "localhost", "port": 52773, "ns": "USER" } } }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use atelier::{AtelierError, ConfigProvider, ConnectionConfig};
use serde::Deserialize;

const FLAT_KEY: &str = "objectscript.conn";

#[derive(Debug, Deserialize)]
struct ObjectScriptSection {
    conn: Option<ConnectionConfig>,
}

#[derive(Debug, Deserialize)]
struct SettingsDocument {
    #[serde(rename = "objectscript.conn")]
    flat: Option<ConnectionConfig>,
    objectscript: Option<ObjectScriptSection>,
}

/// A [`ConfigProvider`] backed by a JSON settings file.
#[derive(Debug, Clone)]
pub struct SettingsFileConfig {
    path: PathBuf,
}

impl SettingsFileConfig {
    /// Creates a provider reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the settings file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigProvider for SettingsFileConfig {
    async fn current(&self) -> Result<ConnectionConfig, AtelierError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AtelierError::Configuration {
                message: format!("cannot read {}: {e}", self.path.display()),
            })?;
        parse_settings(&text).map_err(|message| AtelierError::Configuration {
            message: format!("{}: {message}", self.path.display()),
        })
    }
}

/// Extracts the connection object from a settings document.
pub fn parse_settings(text: &str) -> Result<ConnectionConfig, String> {
    let document: SettingsDocument =
        serde_json::from_str(text).map_err(|e| format!("invalid settings JSON: {e}"))?;

    document
        .flat
        .or_else(|| document.objectscript.and_then(|section| section.conn))
        .ok_or_else(|| format!("no \"{FLAT_KEY}\" settings found"))
}
