//! Tool/function calling types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Unique within one registry
    pub name: String,
    pub description: String,
    /// JSON Schema object the call arguments must satisfy
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl Tool {
    /// Create a new tool definition accepting an empty object
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        }
    }

    /// Set the input schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Matched against `ToolResult::call_id`; unique within one batch
    pub id: String,
    pub name: String,
    /// Arguments as sent by the model, checked against the tool's schema
    pub input: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// Outcome of a tool execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Ok,
    /// Execution failed; the payload explains why and still goes to the model
    Error,
}

/// Result of executing a tool, before it is bound to a specific call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub status: ToolStatus,
    /// JSON text on success, a readable message on error
    pub payload: String,
}

impl ToolOutput {
    pub fn ok(payload: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Ok,
            payload: payload.into(),
        }
    }

    pub fn error(payload: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            payload: payload.into(),
        }
    }
}

/// Tool result to send back to LLM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this is responding to
    #[serde(rename = "callId")]
    pub call_id: String,
    /// Whether the tool succeeded
    pub status: ToolStatus,
    /// The result content (JSON text on success, a readable message on error)
    pub content: String,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            status: ToolStatus::Ok,
            content: content.into(),
        }
    }

    /// Create an error tool result
    pub fn error(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            status: ToolStatus::Error,
            content: error.into(),
        }
    }

    /// Bind an execution output to the call it answers
    pub fn from_output(call_id: impl Into<String>, output: ToolOutput) -> Self {
        Self {
            call_id: call_id.into(),
            status: output.status,
            content: output.payload,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Error
    }
}
