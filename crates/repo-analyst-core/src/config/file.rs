//! File-based configuration provider (YAML)

use std::fs;
use std::path::{Path, PathBuf};

use super::settings::AppConfig;
use super::{ConfigError, ConfigResult};

/// Reads configuration from a YAML file
///
/// # Example
///
/// ```no_run
/// use repo_analyst_core::config::FileConfigProvider;
///
/// let config = FileConfigProvider::user().load_with_env().unwrap();
/// println!("model: {}", config.model.name);
/// ```
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    /// Create a provider for a specific path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a user-level config provider (~/.config/repo-analyst/config.yaml)
    pub fn user() -> Self {
        // XDG config directory (~/.config on Linux, ~/Library/Application Support on macOS)
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("repo-analyst").join("config.yaml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the file, or defaults if it does not exist
    pub fn load(&self) -> ConfigResult<AppConfig> {
        if !self.path.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(AppConfig::default());
        }

        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load the file, apply environment overrides and validate
    pub fn load_with_env(&self) -> ConfigResult<AppConfig> {
        let mut config = self.load()?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let provider = FileConfigProvider::new(dir.path().join("config.yaml"));
        assert!(!provider.exists());
        assert_eq!(provider.load().unwrap(), AppConfig::default());
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "model:\n  provider: openai\n  name: gpt-4o\ngithub:\n  default_commit_limit: 10\n",
        )
        .unwrap();

        let config = FileConfigProvider::new(&path).load().unwrap();
        assert_eq!(config.model.provider, "openai");
        assert_eq!(config.model.name, "gpt-4o");
        assert_eq!(config.github.default_commit_limit, 10);
        assert_eq!(config.github.api_base, "https://api.github.com");
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "session: [not, a, map]\n").unwrap();

        let err = FileConfigProvider::new(&path).load().unwrap_err();
        match err {
            ConfigError::Parse { path: p, .. } => assert!(p.ends_with("config.yaml")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    #[serial]
    fn test_load_with_env_applies_overrides() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "model:\n  name: llama3.1\n").unwrap();

        std::env::set_var("REPO_ANALYST_MODEL", "mistral-nemo");
        let config = FileConfigProvider::new(&path).load_with_env();
        std::env::remove_var("REPO_ANALYST_MODEL");

        assert_eq!(config.unwrap().model.name, "mistral-nemo");
    }

    #[test]
    fn test_user_path() {
        let provider = FileConfigProvider::user();
        assert!(provider.path().ends_with("repo-analyst/config.yaml"));
    }
}
