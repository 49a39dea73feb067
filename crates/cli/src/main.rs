//! Atelier CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse arguments**: connection flags (or a settings file) and one
//!    document command.
//! 2. **Wire observability**: `tracing-subscriber` with a text or JSON layer,
//!    plus an OpenTelemetry OTLP exporter when `OTEL_EXPORTER_OTLP_ENDPOINT`
//!    is set.
//! 3. **Construct infrastructure**: the configuration provider, the
//!    `reqwest` transports and the console sink, injected into an
//!    [`atelier::AtelierClient`].
//! 4. **Run the command** and print the response to stdout.

mod args;
mod observability;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use atelier::{
    AtelierClient, ConfigProvider, ConsoleSink, DocNamesQuery, DocumentContent, ResponseEnvelope,
    StaticConfig,
};
use atelier_http::{SettingsFileConfig, TracingConsoleSink, TransportSettings};
use clap::Parser;

use crate::args::{Cli, Command};

/// Writes server console output to stderr, one line per entry.
struct StderrConsole;

impl ConsoleSink for StderrConsole {
    fn output(&self, lines: &[String]) {
        for line in lines {
            eprintln!("{line}");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let provider = observability::init(cli.log_json)?;

    let result = run(cli).await;

    observability::shutdown(provider);
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config: Arc<dyn ConfigProvider> = match cli.connection.to_config() {
        Some(config) => Arc::new(StaticConfig::new(config)),
        None => {
            tracing::debug!(settings = %cli.settings.display(), "Using settings file");
            Arc::new(SettingsFileConfig::new(&cli.settings))
        }
    };
    let settings = TransportSettings {
        timeout: cli.timeout.map(Duration::from_secs),
        accept_invalid_certs: cli.insecure,
        ..TransportSettings::default()
    };
    // JSON logging routes console output into the log stream instead of stderr text.
    let console: Arc<dyn ConsoleSink> = if cli.log_json {
        Arc::new(TracingConsoleSink)
    } else {
        Arc::new(StderrConsole)
    };
    let client = atelier_http::connect(config, console, &settings)
        .context("failed to build HTTP transports")?;

    let envelope = execute(&client, cli.command).await?;
    print_envelope(&envelope)
}

async fn execute(client: &AtelierClient, command: Command) -> anyhow::Result<ResponseEnvelope> {
    let envelope = match command {
        Command::Info => client.server_info().await?,
        Command::Docnames {
            category,
            doc_type,
            filter,
            generated,
        } => {
            let query = DocNamesQuery {
                generated,
                category,
                doc_type,
                filter,
            };
            client.get_doc_names(&query).await?
        }
        Command::Get { name, format } => client
            .get_doc(&name, format.as_deref())
            .await
            .with_context(|| format!("failed to fetch {name}"))?,
        Command::Put {
            name,
            file,
            ignore_conflict,
        } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let content = DocumentContent::from_lines(text.lines());
            client
                .put_doc(&name, &content, ignore_conflict.then_some(true))
                .await
                .with_context(|| format!("failed to save {name}"))?
        }
        Command::Index { docs } => client.action_index(&docs).await?,
        Command::Compile {
            docs,
            flags,
            source,
        } => client
            .action_compile(&docs, flags.as_deref(), source)
            .await
            .context("compilation request failed")?,
    };
    Ok(envelope)
}

fn print_envelope(envelope: &ResponseEnvelope) -> anyhow::Result<()> {
    match envelope {
        ResponseEnvelope::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
        ResponseEnvelope::Text(text) => println!("{text}"),
    }
    Ok(())
}
