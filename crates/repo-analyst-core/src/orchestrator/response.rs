//! Collecting and interpreting one model response

use std::collections::HashSet;

use futures::StreamExt;
use thiserror::Error;

use crate::providers::{ProviderResult, StreamResponse};
use crate::types::{StreamChunk, ToolCall};

/// A tool-call batch the orchestrator refuses to execute
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelResponseParseError {
    #[error("tool call #{index} has no name")]
    EmptyToolName { index: usize },

    #[error("arguments for '{name}' are not a JSON object")]
    NonObjectArguments { name: String },

    #[error("tool call id '{id}' appears more than once")]
    DuplicateCallId { id: String },
}

/// Everything the model produced in one round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelResponse {
    /// Drain a provider stream; partial tool-call deltas are ignored in favour
    /// of the complete calls emitted at the end
    pub async fn collect(mut stream: StreamResponse) -> ProviderResult<Self> {
        let mut response = Self::default();
        while let Some(chunk) = stream.next().await {
            match chunk? {
                StreamChunk::Text { text } => response.text.push_str(&text),
                StreamChunk::ToolCall { tool_call } => response.tool_calls.push(tool_call),
                StreamChunk::ToolCallDelta { .. } => {}
            }
        }
        Ok(response)
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Give id-less calls a stable id; some local models omit them
    pub fn assign_missing_ids(&mut self, round: usize) {
        for (index, call) in self.tool_calls.iter_mut().enumerate() {
            if call.id.trim().is_empty() {
                call.id = format!("call_{}_{}", round, index);
            }
        }
    }

    /// Check the tool-call batch before anything is executed
    pub fn validate_calls(&self) -> Result<(), ModelResponseParseError> {
        let mut seen = HashSet::new();
        for (index, call) in self.tool_calls.iter().enumerate() {
            if call.name.trim().is_empty() {
                return Err(ModelResponseParseError::EmptyToolName { index });
            }
            if !call.input.is_object() {
                return Err(ModelResponseParseError::NonObjectArguments {
                    name: call.name.clone(),
                });
            }
            if !seen.insert(call.id.as_str()) {
                return Err(ModelResponseParseError::DuplicateCallId {
                    id: call.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// What to show when the response cannot be acted on: the text, or the
    /// raw calls when there is no text
    pub fn raw_answer(&self) -> String {
        if !self.text.trim().is_empty() || self.tool_calls.is_empty() {
            return self.text.clone();
        }
        self.tool_calls
            .iter()
            .map(|c| format!("{}({})", c.name, c.input))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
