//! In-memory secret store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::SecretStore;

/// In-memory secret store for tests and ephemeral use
///
/// # Example
///
/// ```
/// use repo_analyst_core::secrets::{SecretStore, MemorySecretStore};
///
/// let store = MemorySecretStore::new();
/// store.insert("github", "ghp_test");
/// assert_eq!(store.get("github"), Some("ghp_test".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory store with initial values
    pub fn with_secrets(initial: HashMap<String, String>) -> Self {
        Self {
            secrets: RwLock::new(initial),
        }
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.secrets.write().insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.secrets.write().remove(key);
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.secrets.read().get(key).cloned()
    }
}
