//! Mock provider for testing
//!
//! Provides deterministic, scriptable responses without network dependencies.
//! Every request is recorded so tests can inspect what the model was shown.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use std::time::Duration;

use super::error::{ProviderError, ProviderResult};
use super::traits::{Provider, ProviderModelConfig, StreamChatOptions, StreamResponse};
use crate::logging::SharedLogger;
use crate::types::{CancellationToken, ChatMessage, MessageRole, StreamChunk, Tool, ToolCall};

/// One scripted model reply
#[derive(Debug, Clone, Default)]
pub struct MockReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl MockReply {
    /// A final answer
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A tool-call request
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            text: String::new(),
            tool_calls: calls,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

/// Mock response mode
#[derive(Debug, Clone, Default)]
pub enum MockMode {
    /// Echo back the last user message
    #[default]
    Echo,
    /// Return a fixed response
    Fixed(String),
    /// Return the scripted replies in order, repeating the last one once exhausted
    Script(Vec<MockReply>),
    /// Fail the stream with the given message
    Error(String),
}

/// What the provider received on one `stream_chat` call
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Option<Vec<Tool>>,
}

/// Mock LLM provider for testing
pub struct MockProvider {
    mode: MockMode,
    chunk_size: usize,
    delay: Duration,
    requests: Mutex<Vec<RecordedRequest>>,
    logger: SharedLogger,
}

impl MockProvider {
    pub fn new(mode: MockMode, logger: SharedLogger) -> Self {
        Self {
            mode,
            chunk_size: 10,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
            logger,
        }
    }

    /// Create an echo provider (echoes back user message)
    pub fn echo(logger: SharedLogger) -> Self {
        Self::new(MockMode::Echo, logger)
    }

    pub fn fixed(response: impl Into<String>, logger: SharedLogger) -> Self {
        Self::new(MockMode::Fixed(response.into()), logger)
    }

    pub fn scripted(replies: Vec<MockReply>, logger: SharedLogger) -> Self {
        Self::new(MockMode::Script(replies), logger)
    }

    pub fn error(message: impl Into<String>, logger: SharedLogger) -> Self {
        Self::new(MockMode::Error(message.into()), logger)
    }

    /// Delay before every chunk
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set chunk size for splitting text responses
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// All requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn last_user_message(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User && !m.content.is_empty())
            .map(|m| m.content.clone())
            .unwrap_or_else(|| "Hello from MockProvider!".to_string())
    }

    fn split_into_chunks(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        if self.chunk_size == 0 {
            return vec![text.to_string()];
        }

        text.chars()
            .collect::<Vec<_>>()
            .chunks(self.chunk_size)
            .map(|c| c.iter().collect())
            .collect()
    }

    fn reply_for(&self, index: usize, messages: &[ChatMessage]) -> Result<MockReply, String> {
        match &self.mode {
            MockMode::Echo => Ok(MockReply::text(format!(
                "Echo: {}",
                Self::last_user_message(messages)
            ))),
            MockMode::Fixed(response) => Ok(MockReply::text(response.clone())),
            MockMode::Script(replies) => Ok(replies
                .get(index)
                .or_else(|| replies.last())
                .cloned()
                .unwrap_or_default()),
            MockMode::Error(message) => Err(message.clone()),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        _model: ProviderModelConfig,
        options: StreamChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse> {
        let index = {
            let mut requests = self.requests.lock();
            requests.push(RecordedRequest {
                messages: messages.clone(),
                tools: options.tools.clone(),
            });
            requests.len() - 1
        };
        self.logger
            .debug(&format!("MockProvider: request #{} ({} messages)", index, messages.len()));

        let items: Vec<ProviderResult<StreamChunk>> = match self.reply_for(index, &messages) {
            Ok(reply) => self
                .split_into_chunks(&reply.text)
                .into_iter()
                .map(|text| Ok(StreamChunk::text(text)))
                .chain(reply.tool_calls.into_iter().map(|tc| Ok(StreamChunk::tool_call(tc))))
                .collect(),
            Err(message) => vec![Err(ProviderError::Other(format!("Mock error: {}", message)))],
        };

        let delay = self.delay;
        let stream = stream::iter(items).then(move |item| {
            let cancel = cancel_token.clone();
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if cancel.is_cancelled() {
                    return Err(ProviderError::Cancelled);
                }
                item
            }
        });

        Ok(Box::pin(stream))
    }
}
