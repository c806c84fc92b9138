//! Logging setup.
//!
//! Everything logs through `tracing`; this module installs the global
//! subscriber. `RUST_LOG` takes precedence over the configured level.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Single-line, human readable
    Compact,
    /// Multi-line, for development
    Pretty,
    /// One JSON object per event
    Json,
}

/// Filter directive for the crate at `level`, e.g. `streamhub=debug`.
pub fn directive(level: &str) -> String {
    format!("{}={}", env!("CARGO_CRATE_NAME"), level.to_ascii_lowercase())
}

pub fn init(level: &str, format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directive(level))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
}
