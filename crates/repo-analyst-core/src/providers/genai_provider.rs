//! GenaiProvider - unified provider using the genai crate
//!
//! Handles Ollama (the default), the other genai-native services and
//! OpenAI-compatible endpoints selected through the ServiceTargetResolver.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::sync::Arc;

use genai::chat::{ChatRequest, ChatStreamEvent};

use crate::logging::SharedLogger;
use crate::secrets::SecretStore;
use crate::types::{CancellationToken, ChatMessage};

use super::error::{ProviderError, ProviderResult};
use super::genai_adapter::{
    create_client, from_genai_event, is_genai_supported, to_genai_messages, to_genai_options,
    to_genai_tools, ProviderConfig,
};
use super::traits::{Provider, ProviderModelConfig, StreamChatOptions, StreamResponse};

/// Unified provider using genai for all supported LLM APIs
pub struct GenaiProvider {
    provider_id: String,
    secrets: Arc<dyn SecretStore>,
    logger: SharedLogger,
}

impl GenaiProvider {
    pub fn new(
        provider_id: impl Into<String>,
        secrets: Arc<dyn SecretStore>,
        logger: SharedLogger,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            secrets,
            logger,
        }
    }

    /// Check if this provider can handle the given provider ID
    pub fn supports(provider_id: &str) -> bool {
        is_genai_supported(provider_id)
    }

    /// Extract model name from a model string (e.g., "openai/gpt-4o" -> "gpt-4o")
    pub fn extract_model_name(model: &str) -> &str {
        model.split_once('/').map(|(_, name)| name).unwrap_or(model)
    }
}

#[async_trait]
impl Provider for GenaiProvider {
    fn name(&self) -> &str {
        &self.provider_id
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        model_config: ProviderModelConfig,
        options: StreamChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse> {
        self.logger.debug(&format!(
            "[GenaiProvider] stream_chat: provider={}, model={}, messages={}",
            self.provider_id,
            model_config.model,
            messages.len()
        ));

        let config = ProviderConfig {
            provider: self.provider_id.clone(),
            api_base: model_config.api_base.clone(),
        };
        let client = create_client(&config, Arc::clone(&self.secrets));

        let mut chat_req = ChatRequest::new(to_genai_messages(messages)?);
        if let Some(tools) = &options.tools {
            if !tools.is_empty() {
                chat_req = chat_req.with_tools(to_genai_tools(tools.clone()));
            }
        }

        let genai_options = to_genai_options(&options);
        let model_name = Self::extract_model_name(&model_config.model);

        let chat_stream = client
            .exec_chat_stream(model_name, chat_req, Some(&genai_options))
            .await
            .map_err(|e| ProviderError::request(&self.provider_id, e.to_string()))?;

        self.logger.debug("[GenaiProvider] Stream started");

        let logger = Arc::clone(&self.logger);
        let provider_id = self.provider_id.clone();

        let stream = chat_stream
            .stream
            .then(move |result| {
                let cancel = cancel_token.clone();
                let logger = Arc::clone(&logger);
                let provider_id = provider_id.clone();

                async move {
                    if cancel.is_cancelled() {
                        logger.info("[GenaiProvider] Stream cancelled");
                        return vec![Err(ProviderError::Cancelled)];
                    }

                    match result {
                        Ok(event) => {
                            match &event {
                                ChatStreamEvent::Chunk(c) => logger.debug(&format!(
                                    "[GenaiProvider] Chunk ({} chars)",
                                    c.content.len()
                                )),
                                ChatStreamEvent::ToolCallChunk(_) => {
                                    logger.debug("[GenaiProvider] ToolCallChunk")
                                }
                                ChatStreamEvent::End(_) => logger.debug("[GenaiProvider] End"),
                                _ => {}
                            }
                            from_genai_event(event)
                        }
                        Err(e) => {
                            logger.error(&format!("[GenaiProvider] Stream error: {}", e));
                            vec![Err(ProviderError::stream(provider_id, e.to_string()))]
                        }
                    }
                }
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::secrets::MemorySecretStore;

    #[test]
    fn test_extract_model_name() {
        assert_eq!(GenaiProvider::extract_model_name("openai/gpt-4o"), "gpt-4o");
        assert_eq!(GenaiProvider::extract_model_name("qwen2.5:7b"), "qwen2.5:7b");
    }

    #[test]
    fn test_supports() {
        assert!(GenaiProvider::supports("ollama"));
        assert!(GenaiProvider::supports("anthropic"));
        assert!(GenaiProvider::supports("openrouter"));
        assert!(!GenaiProvider::supports("unknown_provider"));
    }

    #[test]
    fn test_name() {
        let provider = GenaiProvider::new(
            "ollama",
            Arc::new(MemorySecretStore::new()),
            NoOpLogger::shared(),
        );
        assert_eq!(provider.name(), "ollama");
    }
}
