//! Pieces of a streamed model response

use serde::{Deserialize, Serialize};

use super::tool::ToolCall;

/// One item of a provider stream
///
/// Text arrives in fragments. A tool call is only acted upon once it arrives
/// complete as `ToolCall`; `ToolCallDelta` fragments are progress hints and
/// may be dropped by consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    Text { text: String },
    ToolCall { tool_call: ToolCall },
    ToolCallDelta {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arguments_delta: Option<String>,
    },
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        StreamChunk::Text { text: text.into() }
    }

    pub fn tool_call(tool_call: ToolCall) -> Self {
        StreamChunk::ToolCall { tool_call }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StreamChunk::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match self {
            StreamChunk::ToolCall { tool_call } => Some(tool_call),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        let text = StreamChunk::text("Python and Shell");
        assert_eq!(text.as_text(), Some("Python and Shell"));
        assert!(text.as_tool_call().is_none());

        let call = StreamChunk::tool_call(ToolCall::new("c1", "get_repo_info", json!({"owner": "octocat"})));
        assert_eq!(call.as_tool_call().map(|c| c.name.as_str()), Some("get_repo_info"));
        assert!(call.as_text().is_none());
    }

    #[test]
    fn test_delta_is_tagged() {
        let delta = StreamChunk::ToolCallDelta {
            id: "c1".to_string(),
            name: None,
            arguments_delta: Some("{\"own".to_string()),
        };
        let value = serde_json::to_value(&delta).unwrap();
        assert_eq!(value["type"], "tool_call_delta");
        assert!(value.get("name").is_none());
    }
}
