//! Console sink that emits server console output as tracing events.

use atelier::ConsoleSink;

/// Logs each console line at `info` under the `atelier::console` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsoleSink;

impl ConsoleSink for TracingConsoleSink {
    fn output(&self, lines: &[String]) {
        for line in lines {
            tracing::info!(target: "atelier::console", "{}", line);
        }
    }
}
