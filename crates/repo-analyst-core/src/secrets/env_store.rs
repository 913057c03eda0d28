//! Environment variable secret store

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::SecretStore;

/// Mapping from well-known names to environment variable names
static ENV_VAR_MAP: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("github", vec!["GITHUB_TOKEN", "GH_TOKEN"]);
    m.insert("openai", vec!["OPENAI_API_KEY"]);
    m.insert("anthropic", vec!["ANTHROPIC_API_KEY"]);
    m.insert("gemini", vec!["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m.insert("groq", vec!["GROQ_API_KEY"]);
    m.insert("mistral", vec!["MISTRAL_API_KEY"]);
    m.insert("openrouter", vec!["OPENROUTER_API_KEY"]);
    m.insert("ollama", vec![]); // Ollama doesn't need an API key
    m
});

/// Secret store that reads from environment variables
///
/// Use this for tokens exported in the shell or loaded from a `.env` file by
/// the CLI.
///
/// # Name Mapping
///
/// - `github` → `GITHUB_TOKEN` or `GH_TOKEN`
/// - `openai` → `OPENAI_API_KEY`
/// - `gemini` → `GEMINI_API_KEY` or `GOOGLE_API_KEY`
/// - anything else → the key itself, then `<KEY>_API_KEY`
#[derive(Debug, Default)]
pub struct EnvSecretStore {
    _private: (),
}

impl EnvSecretStore {
    /// Create a new environment variable secret store
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Get the environment variable names for a well-known key
    pub fn env_vars_for(key: &str) -> Option<&'static [&'static str]> {
        ENV_VAR_MAP.get(key.to_lowercase().as_str()).map(|v| v.as_slice())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = non_empty_var(key) {
            return Some(value);
        }

        if let Some(env_vars) = Self::env_vars_for(key) {
            if let Some(value) = env_vars.iter().find_map(|var| non_empty_var(var)) {
                return Some(value);
            }
        }

        non_empty_var(&format!("{}_API_KEY", key.to_uppercase()))
    }
}
