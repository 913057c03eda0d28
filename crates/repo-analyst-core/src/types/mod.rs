//! Core types for LLM interactions
//!
//! This module contains the shared types passed between the provider, the
//! tool channel and the orchestrator.

mod message;
mod tool;
mod stream;
mod cancellation;
mod conversation;

pub use message::{ChatMessage, MessageRole};
pub use tool::{Tool, ToolCall, ToolOutput, ToolResult, ToolStatus};
pub use stream::StreamChunk;
pub use cancellation::CancellationToken;
pub use conversation::{validate_messages, Conversation, ConversationError};
