//! # Observability
//!
//! Centralized tracing setup for the plant collection workspace.
//!
//! Crates in this workspace are **log producers**. They use the standard
//! `tracing` macros and never decide where output goes. An embedding
//! application calls [`init`] or [`init_with_config`] once at startup.
//!
//! Two sinks are available:
//!
//! - compact human-readable lines on stderr (the default), and
//! - structured JSONL appended to a file when [`LogConfig::log_path`] is set,
//!   optionally mirrored to stderr.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "collection".into(),
//!     default_level: "debug".into(),
//!     log_path: Some("/tmp/collection.jsonl".into()),
//!     also_stderr: true,
//! });
//! tracing::info!("ready");
//! ```

mod file_sink;
mod json_layer;

use std::io;
use std::path::PathBuf;

pub use file_sink::{default_log_path, JsonlFile};
pub use json_layer::{JsonLayer, LogEntry};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, included in every JSONL line.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// JSONL output file. `None` logs compact lines to stderr only.
    pub log_path: Option<PathBuf>,

    /// Mirror JSONL output to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize the observability layer with default settings.
///
/// Logging failures are reported on stderr and otherwise ignored.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize the observability layer with custom configuration.
///
/// A second call in the same process is a no-op apart from a stderr notice.
pub fn init_with_config(config: LogConfig) {
    if let Err(e) = try_init_with_config(config) {
        eprintln!("observability: logging not initialized: {}", e);
    }
}

/// Fallible variant of [`init_with_config`].
pub fn try_init_with_config(config: LogConfig) -> io::Result<()> {
    match config.log_path.clone() {
        Some(path) => file_sink::init_file_subscriber(&config, &path),
        None => {
            use tracing_subscriber::util::SubscriberInitExt;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter(&config.default_level))
                .with_target(true)
                .compact()
                .with_writer(io::stderr)
                .finish()
                .try_init()
                .map_err(io::Error::other)
        }
    }
}

/// Build the env filter from `RUST_LOG`, falling back to `default_level`.
pub(crate) fn env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(!config.also_stderr);
    }
}
