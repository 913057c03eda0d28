//! Session state: history, tool connection and turn state

use std::future::Future;

use crate::config::ConnectFailurePolicy;
use crate::logging::SharedLogger;
use crate::mcp::{McpResult, ToolInvocationClient};
use crate::types::{ChatMessage, Conversation, ConversationError, Tool};

/// Where a session is within the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingUserInput,
    AwaitingModelResponse,
    ToolCallsPending,
    ExecutingTools,
    FinalAnswerReady,
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TurnState::AwaitingUserInput => "awaiting user input",
            TurnState::AwaitingModelResponse => "awaiting model response",
            TurnState::ToolCallsPending => "tool calls pending",
            TurnState::ExecutingTools => "executing tools",
            TurnState::FinalAnswerReady => "final answer ready",
        };
        f.write_str(name)
    }
}

/// One interactive run
///
/// Owns the conversation and, in tools-enabled mode, the single connection
/// to the tool server. Call [`Session::shutdown`] on every exit path to
/// release the connection.
pub struct Session {
    conversation: Conversation,
    client: Option<ToolInvocationClient>,
    state: TurnState,
}

impl Session {
    /// A session that can call tools through `client`
    pub fn with_tools(system_prompt: Option<String>, client: ToolInvocationClient) -> Self {
        Self::build(system_prompt, Some(client))
    }

    /// A session that never calls tools; every model response is final
    pub fn without_tools(system_prompt: Option<String>) -> Self {
        Self::build(system_prompt, None)
    }

    fn build(system_prompt: Option<String>, client: Option<ToolInvocationClient>) -> Self {
        let conversation = match system_prompt {
            Some(prompt) => Conversation::with_system_prompt(prompt),
            None => Conversation::new(),
        };
        Self {
            conversation,
            client,
            state: TurnState::AwaitingUserInput,
        }
    }

    /// Connect and build a session, applying the connect-failure policy
    ///
    /// With `Fallback` a failed connection yields a tools-disabled session;
    /// with `Exit` the error is returned. `system_prompt` is told whether
    /// tools ended up enabled.
    pub async fn establish<F, P>(
        system_prompt: P,
        connect: F,
        policy: ConnectFailurePolicy,
        logger: &SharedLogger,
    ) -> McpResult<Self>
    where
        F: Future<Output = McpResult<ToolInvocationClient>>,
        P: FnOnce(bool) -> Option<String>,
    {
        match connect.await {
            Ok(client) => Ok(Self::with_tools(system_prompt(true), client)),
            Err(e) => match policy {
                ConnectFailurePolicy::Fallback => {
                    logger.warn(&format!(
                        "[Session] Tool server unavailable ({}), continuing without tools",
                        e
                    ));
                    Ok(Self::without_tools(system_prompt(false)))
                }
                ConnectFailurePolicy::Exit => {
                    logger.error(&format!("[Session] Tool server unavailable: {}", e));
                    Err(e)
                }
            },
        }
    }

    pub fn tools_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub fn client(&self) -> Option<&ToolInvocationClient> {
        self.client.as_ref()
    }

    /// Tool catalog offered to the model; empty when tools are disabled
    pub fn catalog(&self) -> &[Tool] {
        self.client.as_ref().map(|c| c.tools()).unwrap_or(&[])
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: TurnState) {
        self.state = state;
    }

    pub(crate) fn push(&mut self, message: ChatMessage) -> Result<(), ConversationError> {
        self.conversation.push(message)
    }

    pub(crate) fn rollback(&mut self, len: usize) {
        self.conversation.rollback(len);
    }

    /// Release the tool connection
    pub async fn shutdown(self) -> McpResult<()> {
        match self.client {
            Some(client) => client.disconnect().await,
            None => Ok(()),
        }
    }
}
