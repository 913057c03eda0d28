//! Append-only conversation history

use std::collections::HashSet;

use thiserror::Error;

use super::message::{ChatMessage, MessageRole};

/// A message that would leave the history in a state the model cannot follow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("tool message at position {index} has no tool_call_id")]
    MissingToolCallId { index: usize },

    #[error("tool message at position {index} does not follow an assistant tool request")]
    OrphanToolResult { index: usize },

    #[error("tool message at position {index} answers unknown call '{call_id}'")]
    UnknownToolCall { index: usize, call_id: String },

    #[error("tool call '{call_id}' answered more than once (position {index})")]
    DuplicateToolResult { index: usize, call_id: String },

    #[error("{role} message at position {index} carries a tool_call_id")]
    UnexpectedToolCallId { index: usize, role: MessageRole },
}

/// Ordered chat history for one session
///
/// Tool-role messages must answer a call issued by the closest preceding
/// assistant message; tool messages of the same batch may sit in between.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with a system prompt
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(prompt)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Append a message, rejecting it if it would break the tool-result ordering
    pub fn push(&mut self, message: ChatMessage) -> Result<(), ConversationError> {
        check_message(&self.messages, self.messages.len(), &message)?;
        self.messages.push(message);
        Ok(())
    }

    /// Re-check the entire history
    pub fn validate(&self) -> Result<(), ConversationError> {
        validate_messages(&self.messages)
    }

    /// Drop everything appended after `len` messages
    pub(crate) fn rollback(&mut self, len: usize) {
        self.messages.truncate(len);
    }
}

/// Check a full message list against the tool-result ordering rules
pub fn validate_messages(messages: &[ChatMessage]) -> Result<(), ConversationError> {
    for (index, message) in messages.iter().enumerate() {
        check_message(&messages[..index], index, message)?;
    }
    Ok(())
}

fn check_message(
    history: &[ChatMessage],
    index: usize,
    message: &ChatMessage,
) -> Result<(), ConversationError> {
    if message.role != MessageRole::Tool {
        if message.tool_call_id.is_some() {
            return Err(ConversationError::UnexpectedToolCallId {
                index,
                role: message.role,
            });
        }
        return Ok(());
    }

    let call_id = message
        .tool_call_id
        .as_deref()
        .ok_or(ConversationError::MissingToolCallId { index })?;

    // Walk back over the results of the current batch to the assistant request.
    let mut answered = HashSet::new();
    let mut requester = None;
    for previous in history.iter().rev() {
        match previous.role {
            MessageRole::Tool => {
                if let Some(id) = previous.tool_call_id.as_deref() {
                    answered.insert(id);
                }
            }
            MessageRole::Assistant => {
                requester = Some(previous);
                break;
            }
            _ => break,
        }
    }

    let requester = requester
        .filter(|m| m.has_tool_calls())
        .ok_or(ConversationError::OrphanToolResult { index })?;

    if !requester.tool_calls.iter().any(|c| c.id == call_id) {
        return Err(ConversationError::UnknownToolCall {
            index,
            call_id: call_id.to_string(),
        });
    }

    if answered.contains(call_id) {
        return Err(ConversationError::DuplicateToolResult {
            index,
            call_id: call_id.to_string(),
        });
    }

    Ok(())
}
