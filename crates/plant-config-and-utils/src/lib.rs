//! Configuration, paths, errors, and logging setup shared by the plant
//! collection crates.

mod config;
mod error;
mod http;
mod logging;
mod paths;

pub use config::{
    Config, DeploymentMode, DEFAULT_ANALYSIS_TIMEOUT_SECS, DEFAULT_API_BASE_URL,
    DEFAULT_LOG_LEVEL, DEFAULT_MAX_COLLECTION_ENTRIES, DEFAULT_REVALIDATION_INTERVAL_SECS,
};
pub use error::{CoreError, CoreResult};
pub use http::{bearer_header, endpoint, summarize_response_body};
pub use logging::{init_file_logging, init_logging, log_config_for, parse_level};
pub use paths::Paths;
