//! LLM Provider implementations
//!
//! All real providers go through the `genai` crate, which handles streaming,
//! provider-specific protocols and tool calling. OpenAI-compatible services
//! genai does not know natively are routed via its `ServiceTargetResolver`.
//!
//! Auth flows through a `SecretStore`, not genai's env var lookup.
//!
//! The `MockProvider` is scriptable and used throughout the tests.

mod traits;
mod error;
mod genai_adapter;
mod genai_provider;
mod mock;

pub use traits::{Provider, ProviderModelConfig, StreamChatOptions, StreamResponse};
pub use error::{ProviderError, ProviderResult};

pub use genai_provider::GenaiProvider;
pub use genai_adapter::{is_genai_supported, ProviderConfig};

pub use mock::{MockMode, MockProvider, MockReply, RecordedRequest};

use std::sync::Arc;

use crate::logging::SharedLogger;
use crate::secrets::SecretStore;

/// Create a provider for the given provider ID
///
/// `mock` yields an echoing `MockProvider`; every other ID goes to the
/// `GenaiProvider`, which treats unknown IDs as OpenAI-compatible endpoints.
pub fn create_provider(
    provider_id: &str,
    secrets: Arc<dyn SecretStore>,
    logger: SharedLogger,
) -> Arc<dyn Provider> {
    match provider_id.to_lowercase().as_str() {
        "mock" => Arc::new(MockProvider::echo(logger)),
        id => Arc::new(GenaiProvider::new(id, secrets, logger)),
    }
}
