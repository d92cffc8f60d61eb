//! Logging initialization for embedders of the collection engine.
//!
//! Library crates only emit `tracing` events. The embedding application
//! picks a sink once at startup through one of the functions here.

use crate::{Config, Paths};
use observability::LogConfig;

const SERVICE_NAME: &str = "plant-collection";

/// Initialize compact stderr logging at the configured level.
///
/// `RUST_LOG` takes precedence over `Config::log_level`.
///
/// ```ignore
/// let config = Config::new();
/// init_logging(&config);
/// tracing::info!("collection engine starting");
/// ```
pub fn init_logging(config: &Config) {
    observability::init_with_config(log_config_for(config, None));
}

/// Initialize JSONL logging to `<base>/logs/collection.jsonl`, mirrored to
/// stderr.
pub fn init_file_logging(config: &Config, paths: &Paths) {
    if let Err(e) = paths.ensure_dirs() {
        eprintln!("plant-config: cannot create log directory: {}", e);
        init_logging(config);
        return;
    }
    observability::init_with_config(log_config_for(config, Some(paths)));
}

/// Build the observability settings for a config and optional file location.
pub fn log_config_for(config: &Config, paths: Option<&Paths>) -> LogConfig {
    let level = parse_level(&config.log_level);
    LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: level.as_str().to_ascii_lowercase(),
        log_path: paths.map(Paths::log_file),
        also_stderr: paths.is_some() && !config.deployment_mode.is_production(),
    }
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeploymentMode;
    use tempfile::tempdir;

    #[test]
    fn parse_level_all_variants() {
        assert_eq!(parse_level("trace"), tracing::Level::TRACE);
        assert_eq!(parse_level("debug"), tracing::Level::DEBUG);
        assert_eq!(parse_level("info"), tracing::Level::INFO);
        assert_eq!(parse_level("warn"), tracing::Level::WARN);
        assert_eq!(parse_level("warning"), tracing::Level::WARN);
        assert_eq!(parse_level("error"), tracing::Level::ERROR);
    }

    #[test]
    fn parse_level_case_insensitive() {
        assert_eq!(parse_level("TRACE"), tracing::Level::TRACE);
        assert_eq!(parse_level(" Debug "), tracing::Level::DEBUG);
        assert_eq!(parse_level("WARNING"), tracing::Level::WARN);
    }

    #[test]
    fn parse_level_unknown_defaults_to_info() {
        assert_eq!(parse_level(""), tracing::Level::INFO);
        assert_eq!(parse_level("verbose"), tracing::Level::INFO);
    }

    #[test]
    fn log_config_without_paths_targets_stderr() {
        let mut config = Config::default();
        config.log_level = "DEBUG".to_string();

        let log_config = log_config_for(&config, None);
        assert_eq!(log_config.service_name, SERVICE_NAME);
        assert_eq!(log_config.default_level, "debug");
        assert!(log_config.log_path.is_none());
        assert!(!log_config.also_stderr);
    }

    #[test]
    fn log_config_with_paths_uses_log_file() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        let dev = log_config_for(&config, Some(&paths));
        assert_eq!(dev.log_path, Some(paths.log_file()));
        assert!(dev.also_stderr);

        config.deployment_mode = DeploymentMode::Production;
        let prod = log_config_for(&config, Some(&paths));
        assert!(!prod.also_stderr);
    }
}
