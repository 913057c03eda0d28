//! Core trait for credential lookup

/// Read access to credentials
///
/// Implementations:
/// - Environment variables (`EnvSecretStore`)
/// - In-memory for testing (`MemorySecretStore`)
///
/// # Example
///
/// ```
/// use repo_analyst_core::secrets::{SecretStore, EnvSecretStore};
///
/// let store = EnvSecretStore::new();
/// // store.get("github") will check GITHUB_TOKEN, then GH_TOKEN
/// let _token = store.get("github");
/// ```
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Retrieve a secret by key
    ///
    /// The key can be:
    /// - A well-known name (e.g., "github", "openai") mapped to its env vars
    /// - A direct key (e.g., "GITHUB_TOKEN")
    fn get(&self, key: &str) -> Option<String>;

    /// Check if a secret exists
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
