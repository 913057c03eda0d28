//! Credential lookup
//!
//! The GitHub token and LLM API keys are resolved through a `SecretStore` at
//! session start and handed opaquely to the data source and the provider.

mod traits;
mod env_store;
mod memory_store;

pub use traits::SecretStore;
pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;

/// Key under which the GitHub access token is looked up
pub const GITHUB_TOKEN_KEY: &str = "github";
