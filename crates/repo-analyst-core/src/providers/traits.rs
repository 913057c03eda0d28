//! The LLM boundary

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::error::ProviderResult;
use crate::types::{CancellationToken, ChatMessage, StreamChunk, Tool};

/// Which model to ask, and where
#[derive(Debug, Clone)]
pub struct ProviderModelConfig {
    /// Model name, optionally prefixed with `provider/`
    pub model: String,
    /// Endpoint override
    pub api_base: Option<String>,
}

impl ProviderModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_base: None,
        }
    }
}

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct StreamChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Catalog offered to the model; `None` sends a request without tools
    pub tools: Option<Vec<Tool>>,
}

impl StreamChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }
}

pub type StreamResponse = Pin<Box<dyn Stream<Item = ProviderResult<StreamChunk>> + Send>>;

/// A chat model that answers with a stream of text and tool calls
///
/// Implementations stop yielding (or yield `ProviderError::Cancelled`) once
/// `cancel_token` is tripped.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider id, e.g. "ollama" or "mock"
    fn name(&self) -> &str;

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        model: ProviderModelConfig,
        options: StreamChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse>;
}
