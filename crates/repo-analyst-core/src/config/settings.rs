//! Configuration structure and environment overrides

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigResult};

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelSettings,
    pub session: SessionSettings,
    pub github: GitHubSettings,
}

/// Which LLM to talk to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    /// Provider identifier (ollama, openai, anthropic, ...)
    pub provider: String,
    /// Model name as the provider expects it
    pub name: String,
    /// Custom API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            name: "qwen2.5:7b".to_string(),
            api_base: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// What to do when the tool server cannot be reached at startup
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectFailurePolicy {
    /// Continue without tools
    #[default]
    Fallback,
    /// Abort the session
    Exit,
}

/// Session and tool-loop settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    pub tools_enabled: bool,
    /// Maximum tool-execution rounds per user turn
    pub round_limit: usize,
    /// Run the calls of one batch concurrently
    pub parallel_tools: bool,
    pub connect_timeout_secs: u64,
    pub on_connect_failure: ConnectFailurePolicy,
    /// Remote tool server (streamable HTTP); the bundled server is spawned otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tools_enabled: true,
            round_limit: 5,
            parallel_tools: true,
            connect_timeout_secs: 10,
            on_connect_failure: ConnectFailurePolicy::Fallback,
            server_url: None,
        }
    }
}

impl SessionSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// GitHub data source settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GitHubSettings {
    pub api_base: String,
    pub default_commit_limit: u32,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            default_commit_limit: 5,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_flag(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::Invalid {
            key: key.to_string(),
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}

impl AppConfig {
    /// Apply `REPO_ANALYST_*` / `GITHUB_API_URL` overrides from the process environment
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("REPO_ANALYST_PROVIDER") {
            self.model.provider = v;
        }
        if let Some(v) = lookup("REPO_ANALYST_MODEL") {
            self.model.name = v;
        }
        if let Some(v) = lookup("REPO_ANALYST_API_BASE") {
            self.model.api_base = Some(v);
        }
        if let Some(v) = lookup("REPO_ANALYST_ROUND_LIMIT") {
            self.session.round_limit = parse_env("REPO_ANALYST_ROUND_LIMIT", &v)?;
        }
        if let Some(v) = lookup("REPO_ANALYST_NO_TOOLS") {
            self.session.tools_enabled = !parse_flag("REPO_ANALYST_NO_TOOLS", &v)?;
        }
        if let Some(v) = lookup("GITHUB_API_URL") {
            self.github.api_base = v;
        }
        Ok(())
    }

    /// Reject values the session cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "model.name".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.session.round_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "session.round_limit".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.github.default_commit_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "github.default_commit_limit".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
