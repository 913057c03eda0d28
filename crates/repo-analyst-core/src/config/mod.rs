//! Configuration
//!
//! Settings come from a YAML file (user-level
//! `~/.config/repo-analyst/config.yaml` or an explicit path), then
//! `REPO_ANALYST_*` environment overrides. A missing file means defaults.

mod file;
mod settings;

pub use file::FileConfigProvider;
pub use settings::{
    AppConfig, ConnectFailurePolicy, GitHubSettings, ModelSettings, SessionSettings,
};

use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
