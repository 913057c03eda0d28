//! The tool-mediated inference loop

use std::sync::Arc;

use thiserror::Error;

use crate::config::AppConfig;
use crate::logging::SharedLogger;
use crate::providers::{Provider, ProviderError, ProviderModelConfig, StreamChatOptions};
use crate::types::{CancellationToken, ChatMessage, ConversationError};

use super::response::ModelResponse;
use super::session::{Session, TurnState};

pub const DEFAULT_ROUND_LIMIT: usize = 5;

/// Why a turn ended without a final answer
///
/// All of these are recoverable: the conversation is rolled back to where it
/// was before the turn and the session can take the next prompt.
#[derive(Error, Debug)]
pub enum TurnError {
    #[error("The model kept requesting tools after {limit} rounds")]
    RoundLimitExceeded { limit: usize },

    #[error("Model request failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Turn cancelled")]
    Cancelled,

    #[error("Conversation history is invalid: {0}")]
    InvalidHistory(#[from] ConversationError),
}

/// Drives a session from a user prompt to a final answer
pub struct ConversationOrchestrator {
    provider: Arc<dyn Provider>,
    model: ProviderModelConfig,
    options: StreamChatOptions,
    round_limit: usize,
    logger: SharedLogger,
}

impl ConversationOrchestrator {
    pub fn new(provider: Arc<dyn Provider>, model: ProviderModelConfig, logger: SharedLogger) -> Self {
        Self {
            provider,
            model,
            options: StreamChatOptions::default(),
            round_limit: DEFAULT_ROUND_LIMIT,
            logger,
        }
    }

    /// Build from loaded configuration
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig, logger: SharedLogger) -> Self {
        let mut model = ProviderModelConfig::new(config.model.name.clone());
        model.api_base = config.model.api_base.clone();

        let options = StreamChatOptions {
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
            tools: None,
        };

        Self::new(provider, model, logger)
            .with_options(options)
            .with_round_limit(config.session.round_limit)
    }

    /// Maximum number of tool-execution rounds per turn
    pub fn with_round_limit(mut self, limit: usize) -> Self {
        self.round_limit = limit;
        self
    }

    /// Sampling options; the tool catalog is filled in per request
    pub fn with_options(mut self, options: StreamChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn round_limit(&self) -> usize {
        self.round_limit
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// Run one user turn to completion
    ///
    /// On success the final answer is returned and the session is back in
    /// `AwaitingUserInput`. On any error, cancellation included, the
    /// conversation is restored to its length before the turn.
    pub async fn run_turn(
        &self,
        session: &mut Session,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, TurnError> {
        let mark = session.conversation().len();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TurnError::Cancelled),
            result = self.drive(session, prompt, cancel) => result,
        };

        if let Err(e) = &result {
            self.logger.warn(&format!("[Orchestrator] Turn failed: {}", e));
            session.rollback(mark);
        }
        self.transition(session, TurnState::AwaitingUserInput);
        result
    }

    fn transition(&self, session: &mut Session, state: TurnState) {
        if session.state() != state {
            self.logger.debug(&format!(
                "[Orchestrator] {} -> {}",
                session.state(),
                state
            ));
            session.set_state(state);
        }
    }

    async fn request(
        &self,
        session: &Session,
        cancel: &CancellationToken,
    ) -> Result<ModelResponse, TurnError> {
        session.conversation().validate()?;

        let mut options = self.options.clone();
        let catalog = session.catalog();
        options.tools = if catalog.is_empty() {
            None
        } else {
            Some(catalog.to_vec())
        };

        let stream = self
            .provider
            .stream_chat(
                session.conversation().messages().to_vec(),
                self.model.clone(),
                options,
                cancel.clone(),
            )
            .await?;
        Ok(ModelResponse::collect(stream).await?)
    }

    fn finish(&self, session: &mut Session, answer: String) -> Result<String, TurnError> {
        self.transition(session, TurnState::FinalAnswerReady);
        session.push(ChatMessage::assistant(answer.clone()))?;
        Ok(answer)
    }

    async fn drive(
        &self,
        session: &mut Session,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, TurnError> {
        session.push(ChatMessage::user(prompt))?;
        let mut rounds = 0;

        loop {
            self.transition(session, TurnState::AwaitingModelResponse);
            let mut response = self.request(session, cancel).await?;

            if !response.has_tool_calls() {
                return self.finish(session, response.text);
            }

            if !session.tools_enabled() {
                self.logger.warn(
                    "[Orchestrator] Model requested tools while tools are disabled; treating the response as final",
                );
                return self.finish(session, response.raw_answer());
            }

            response.assign_missing_ids(rounds);
            if let Err(e) = response.validate_calls() {
                self.logger.warn(&format!(
                    "[Orchestrator] Unusable tool request ({}); showing the raw response",
                    e
                ));
                return self.finish(session, response.raw_answer());
            }

            if rounds >= self.round_limit {
                return Err(TurnError::RoundLimitExceeded {
                    limit: self.round_limit,
                });
            }

            self.transition(session, TurnState::ToolCallsPending);
            let calls = response.tool_calls;
            self.logger.info(&format!(
                "[Orchestrator] Round {}: model requested {} tool call(s): {}",
                rounds + 1,
                calls.len(),
                calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
            ));
            session.push(ChatMessage::assistant_with_tool_calls(response.text, calls.clone()))?;

            self.transition(session, TurnState::ExecutingTools);
            let results = match session.client() {
                Some(client) => client.invoke_many(&calls).await,
                None => Vec::new(),
            };
            for result in &results {
                session.push(ChatMessage::tool_result(result))?;
            }
            rounds += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::providers::{MockProvider, MockReply};
    use crate::types::{MessageRole, ToolCall};
    use serde_json::json;
    use std::time::Duration;

    fn orchestrator(provider: Arc<MockProvider>) -> ConversationOrchestrator {
        ConversationOrchestrator::new(provider, ProviderModelConfig::new("mock"), NoOpLogger::shared())
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let provider = Arc::new(MockProvider::fixed("Hello there", NoOpLogger::shared()));
        let orch = orchestrator(Arc::clone(&provider));
        let mut session = Session::without_tools(Some("system".to_string()));

        let answer = orch
            .run_turn(&mut session, "hi", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(answer, "Hello there");
        assert_eq!(session.state(), TurnState::AwaitingUserInput);
        let roles: Vec<MessageRole> = session.conversation().messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]);
        assert!(provider.requests()[0].tools.is_none());
    }

    #[tokio::test]
    async fn test_tool_request_without_tools_is_final() {
        let call = ToolCall::new("c1", "get_repo_info", json!({"owner": "o", "repo": "r"}));
        let provider = Arc::new(MockProvider::scripted(
            vec![MockReply::tool_calls(vec![call])],
            NoOpLogger::shared(),
        ));
        let orch = orchestrator(Arc::clone(&provider));
        let mut session = Session::without_tools(None);

        let answer = orch
            .run_turn(&mut session, "what languages?", &CancellationToken::new())
            .await
            .unwrap();

        assert!(answer.starts_with("get_repo_info("));
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_provider_error_rolls_back() {
        let provider = Arc::new(MockProvider::error("offline", NoOpLogger::shared()));
        let orch = orchestrator(provider);
        let mut session = Session::without_tools(Some("system".to_string()));

        let err = orch
            .run_turn(&mut session, "hi", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::Provider(_)));
        assert_eq!(session.conversation().len(), 1);
        assert_eq!(session.state(), TurnState::AwaitingUserInput);
    }

    #[tokio::test]
    async fn test_cancel_rolls_back() {
        let provider = Arc::new(
            MockProvider::fixed("slow answer", NoOpLogger::shared()).with_delay(Duration::from_secs(30)),
        );
        let orch = orchestrator(provider);
        let mut session = Session::without_tools(None);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = orch.run_turn(&mut session, "hi", &cancel).await.unwrap_err();
        assert!(matches!(err, TurnError::Cancelled));
        assert!(session.conversation().is_empty());
        assert_eq!(session.state(), TurnState::AwaitingUserInput);
    }

    #[tokio::test]
    async fn test_session_usable_after_failed_turn() {
        let provider = Arc::new(MockProvider::echo(NoOpLogger::shared()));
        let orch = orchestrator(provider);
        let mut session = Session::without_tools(None);

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        assert!(orch.run_turn(&mut session, "first", &cancelled).await.is_err());

        let answer = orch
            .run_turn(&mut session, "second", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(answer, "Echo: second");
        assert_eq!(session.conversation().len(), 2);
    }
}
