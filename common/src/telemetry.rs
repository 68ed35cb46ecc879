//! Tracing subscriber setup shared by the Lambda binaries and the CLI.

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event, no colors. CloudWatch friendly.
    #[default]
    Json,
    Pretty,
}

/// Installs the global subscriber. Level filtering comes from `RUST_LOG` and
/// falls back to `info`. Calling it twice is a no-op.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_current_span(false)
            .without_time()
            .with_target(true)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init(),
    };

    if let Err(e) = result {
        tracing::debug!("Tracing already initialized: {}", e);
    }
}
