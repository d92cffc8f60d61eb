//! Configuration for the collection engine and its collaborators.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default backend URL (can be overridden at compile time via PLANT_API_URL env var).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("PLANT_API_URL") {
    Some(url) => url,
    None => "http://localhost:8000",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Fixed deadline for a single analysis request.
pub const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 120;

/// Interval between bearer-token revalidation calls.
pub const DEFAULT_REVALIDATION_INTERVAL_SECS: u64 = 600;

/// Upper bound on entries kept in the in-memory collection.
pub const DEFAULT_MAX_COLLECTION_ENTRIES: usize = 50;

/// Deployment mode. Selects how backend auth failures degrade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentMode {
    /// Backend exchange failures keep the external identity signed in.
    Production,
    /// Backend exchange failures sign the user out completely.
    #[default]
    Development,
}

impl DeploymentMode {
    /// Parse a mode name. Unknown values map to `Development`.
    pub fn from_env_value(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => DeploymentMode::Production,
            _ => DeploymentMode::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, DeploymentMode::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentMode::Production => "production",
            DeploymentMode::Development => "development",
        }
    }
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Backend base URL serving auth, collection, image and analysis endpoints.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub deployment_mode: DeploymentMode,
    #[serde(default = "default_analysis_timeout_secs")]
    pub analysis_timeout_secs: u64,
    #[serde(default = "default_revalidation_interval_secs")]
    pub revalidation_interval_secs: u64,
    #[serde(default = "default_max_collection_entries")]
    pub max_collection_entries: usize,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_analysis_timeout_secs() -> u64 {
    DEFAULT_ANALYSIS_TIMEOUT_SECS
}

fn default_revalidation_interval_secs() -> u64 {
    DEFAULT_REVALIDATION_INTERVAL_SECS
}

fn default_max_collection_entries() -> usize {
    DEFAULT_MAX_COLLECTION_ENTRIES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            deployment_mode: DeploymentMode::default(),
            analysis_timeout_secs: DEFAULT_ANALYSIS_TIMEOUT_SECS,
            revalidation_interval_secs: DEFAULT_REVALIDATION_INTERVAL_SECS,
            max_collection_entries: DEFAULT_MAX_COLLECTION_ENTRIES,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file (if present), then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `PLANT_LOG_LEVEL`, `PLANT_API_URL` and `PLANT_DEPLOY_MODE`
    /// overrides from the given lookup. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(level) = non_empty("PLANT_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = non_empty("PLANT_API_URL") {
            self.api_base_url = url;
        }
        if let Some(mode) = non_empty("PLANT_DEPLOY_MODE") {
            self.deployment_mode = DeploymentMode::from_env_value(&mode);
        }
    }

    /// The backend base URL without a trailing slash.
    ///
    /// In production a localhost backend means the deployment was never
    /// configured, which is reported as a configuration error.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        let trimmed = self.api_base_url.trim().trim_end_matches('/');
        let url = Url::parse(trimmed)?;

        if self.deployment_mode.is_production()
            && matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"))
        {
            return Err(CoreError::BackendUrl(
                "production build still points at localhost (set PLANT_API_URL)".to_string(),
            ));
        }

        Ok(url)
    }

    /// The base URL as a string suitable for path concatenation.
    pub fn api_base(&self) -> CoreResult<String> {
        Ok(self
            .api_base_url()?
            .as_str()
            .trim_end_matches('/')
            .to_string())
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn revalidation_interval(&self) -> Duration {
        Duration::from_secs(self.revalidation_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.deployment_mode, DeploymentMode::Development);
        assert_eq!(config.analysis_timeout(), Duration::from_secs(120));
        assert_eq!(config.max_collection_entries, 50);
    }

    #[test]
    fn test_config_load_from_file_fills_missing_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        std::fs::write(
            &config_path,
            r#"{ "log_level": "debug", "deployment_mode": "production" }"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.deployment_mode, DeploymentMode::Production);
        assert_eq!(config.revalidation_interval_secs, DEFAULT_REVALIDATION_INTERVAL_SECS);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.max_collection_entries = 10;
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded.max_collection_entries, 10);
    }

    #[test]
    fn test_overrides_apply_and_ignore_blank_values() {
        let mut config = Config::default();
        config.apply_overrides(lookup_from(&[
            ("PLANT_LOG_LEVEL", "trace"),
            ("PLANT_API_URL", "   "),
            ("PLANT_DEPLOY_MODE", "PROD"),
        ]));

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.deployment_mode, DeploymentMode::Production);
    }

    #[test]
    fn test_deployment_mode_parsing() {
        assert_eq!(DeploymentMode::from_env_value("production"), DeploymentMode::Production);
        assert_eq!(DeploymentMode::from_env_value(" prod "), DeploymentMode::Production);
        assert_eq!(DeploymentMode::from_env_value("dev"), DeploymentMode::Development);
        assert_eq!(DeploymentMode::from_env_value("staging"), DeploymentMode::Development);
    }

    #[test]
    fn test_api_base_trims_trailing_slash() {
        let mut config = Config::default();
        config.api_base_url = "https://api.example.com/".to_string();
        assert_eq!(config.api_base().unwrap(), "https://api.example.com");
    }

    #[test]
    fn test_localhost_rejected_in_production() {
        let mut config = Config::default();
        config.deployment_mode = DeploymentMode::Production;
        config.api_base_url = "http://localhost:8000".to_string();
        assert!(matches!(config.api_base_url(), Err(CoreError::BackendUrl(_))));

        config.deployment_mode = DeploymentMode::Development;
        assert!(config.api_base_url().is_ok());
    }

    #[test]
    fn test_config_invalid_url() {
        let mut config = Config::default();
        config.api_base_url = "not a valid url".to_string();
        assert!(matches!(config.api_base_url(), Err(CoreError::MalformedBackendUrl(_))));
    }

    #[test]
    fn test_corrupt_config_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ \"log_level\": ").unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(matches!(err, CoreError::ConfigFile(_)));
        assert!(err.to_string().starts_with("Config file is not valid JSON"));
    }
}
