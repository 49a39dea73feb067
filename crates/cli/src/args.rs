//! Command-line arguments.

use std::path::PathBuf;

use atelier::{ConnectionConfig, DocumentName};
use clap::{Args, Parser, Subcommand};

/// Fetch, list, compile and write documents on an Atelier server.
#[derive(Debug, Parser)]
#[command(name = "atelier", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// JSON settings file holding an `objectscript.conn` object.
    ///
    /// Used when no connection flag is given; re-read on every request.
    #[arg(long, env = "ATELIER_SETTINGS", default_value = ".vscode/settings.json")]
    pub settings: PathBuf,

    /// Per-request timeout in seconds (no timeout when omitted).
    #[arg(long, env = "ATELIER_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Accept self-signed server certificates.
    #[arg(long)]
    pub insecure: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection options; any one of them bypasses the settings file.
#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Server host.
    #[arg(long, env = "ATELIER_HOST")]
    pub host: Option<String>,

    /// Web server port.
    #[arg(long, env = "ATELIER_PORT")]
    pub port: Option<u16>,

    /// User name.
    #[arg(long, env = "ATELIER_USERNAME")]
    pub username: Option<String>,

    /// Password.
    #[arg(long, env = "ATELIER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Namespace.
    #[arg(long, env = "ATELIER_NS")]
    pub ns: Option<String>,

    /// Use TLS.
    #[arg(long, env = "ATELIER_HTTPS")]
    pub https: Option<bool>,
}

impl ConnectionArgs {
    /// Returns a configuration built from the flags, or `None` when none was
    /// given. Missing fields take their [`ConnectionConfig`] defaults.
    pub fn to_config(&self) -> Option<ConnectionConfig> {
        let any_given = self.host.is_some()
            || self.port.is_some()
            || self.username.is_some()
            || self.password.is_some()
            || self.ns.is_some()
            || self.https.is_some();
        if !any_given {
            return None;
        }

        let defaults = ConnectionConfig::default();
        Some(ConnectionConfig {
            host: self.host.clone().unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            username: self.username.clone().unwrap_or(defaults.username),
            password: self.password.clone().unwrap_or(defaults.password),
            ns: self.ns.clone().unwrap_or(defaults.ns),
            https: self.https.unwrap_or(defaults.https),
        })
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show server version, namespaces and API level.
    Info,

    /// List document names in the namespace.
    Docnames {
        /// Category: CLS, RTN, CSP, OTH or `*`.
        #[arg(long, default_value = "*")]
        category: String,

        /// Document type within the category.
        #[arg(long = "type", default_value = "*")]
        doc_type: String,

        /// SQL LIKE filter on names.
        #[arg(long, default_value = "")]
        filter: String,

        /// Include generated documents.
        #[arg(long)]
        generated: bool,
    },

    /// Fetch a document.
    Get {
        #[arg(value_parser = parse_document_name)]
        name: DocumentName,

        /// Output format (e.g. `udl`, `xml`).
        #[arg(long)]
        format: Option<String>,
    },

    /// Upload a local file as a document.
    Put {
        #[arg(value_parser = parse_document_name)]
        name: DocumentName,

        /// Source file to upload.
        file: PathBuf,

        /// Overwrite even if the server copy changed.
        #[arg(long)]
        ignore_conflict: bool,
    },

    /// Return index information for documents.
    Index {
        #[arg(required = true, value_parser = parse_document_name)]
        docs: Vec<DocumentName>,
    },

    /// Compile documents.
    Compile {
        #[arg(required = true, value_parser = parse_document_name)]
        docs: Vec<DocumentName>,

        /// Compiler flags (e.g. `cuk`).
        #[arg(long)]
        flags: Option<String>,

        /// Return generated source.
        #[arg(long)]
        source: bool,
    },
}

fn parse_document_name(s: &str) -> Result<DocumentName, String> {
    DocumentName::new(s).ok_or_else(|| "document name must not be empty".to_string())
}
