//! Adapter between our conversation types and genai types
//!
//! Auth flows through the configured `SecretStore`, not genai's default env
//! var lookup, so the CLI's `.env` handling and the test stores behave the
//! same way for every provider.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatStreamEvent,
    Tool as GenaiTool, ToolCall as GenaiToolCall,
    ToolResponse as GenaiToolResponse,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};
use serde_json::{json, Value};

use crate::secrets::SecretStore;
use crate::types::{ChatMessage, MessageRole, StreamChunk, Tool, ToolCall};

use super::error::{ProviderError, ProviderResult};
use super::traits::StreamChatOptions;

// ============================================================================
// Message Conversion
// ============================================================================

fn to_genai_tool_call(call: &ToolCall) -> ProviderResult<GenaiToolCall> {
    let value = json!({
        "call_id": call.id,
        "fn_name": call.name,
        "fn_arguments": call.input,
    });
    Ok(serde_json::from_value(value)?)
}

/// Convert one conversation message into one or more genai messages
///
/// An assistant message that carries both text and tool calls becomes a text
/// message followed by the tool-call message.
pub fn to_genai_message(msg: ChatMessage) -> ProviderResult<Vec<GenaiMessage>> {
    match msg.role {
        MessageRole::System => Ok(vec![GenaiMessage::system(msg.content)]),
        MessageRole::User => Ok(vec![GenaiMessage::user(msg.content)]),
        MessageRole::Assistant if msg.tool_calls.is_empty() => {
            Ok(vec![GenaiMessage::assistant(msg.content)])
        }
        MessageRole::Assistant => {
            let mut out = Vec::with_capacity(2);
            if !msg.content.trim().is_empty() {
                out.push(GenaiMessage::assistant(msg.content));
            }
            let calls = msg
                .tool_calls
                .iter()
                .map(to_genai_tool_call)
                .collect::<ProviderResult<Vec<_>>>()?;
            out.push(GenaiMessage::from(calls));
            Ok(out)
        }
        MessageRole::Tool => {
            let call_id = msg.tool_call_id.ok_or_else(|| {
                ProviderError::Other("tool message without a tool call id".to_string())
            })?;
            Ok(vec![GenaiMessage::from(GenaiToolResponse::new(
                call_id,
                msg.content,
            ))])
        }
    }
}

pub fn to_genai_messages(messages: Vec<ChatMessage>) -> ProviderResult<Vec<GenaiMessage>> {
    let mut out = Vec::with_capacity(messages.len());
    for msg in messages {
        out.extend(to_genai_message(msg)?);
    }
    Ok(out)
}

// ============================================================================
// Tool and Option Conversion
// ============================================================================

pub fn to_genai_tool(tool: Tool) -> GenaiTool {
    GenaiTool::new(&tool.name)
        .with_description(&tool.description)
        .with_schema(tool.input_schema)
}

pub fn to_genai_tools(tools: Vec<Tool>) -> Vec<GenaiTool> {
    tools.into_iter().map(to_genai_tool).collect()
}

pub fn to_genai_options(options: &StreamChatOptions) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default();

    if let Some(temp) = options.temperature {
        genai_opts = genai_opts.with_temperature(temp as f64);
    }

    if let Some(max_tokens) = options.max_tokens {
        genai_opts = genai_opts.with_max_tokens(max_tokens);
    }

    // Tool calls are only surfaced through the End event when captured
    genai_opts.with_capture_tool_calls(true)
}

// ============================================================================
// Response Conversion
// ============================================================================

/// Convert a genai tool call into ours
///
/// Some OpenAI-compatible servers send the arguments as a JSON-encoded string;
/// those are decoded when they parse, otherwise kept verbatim.
pub fn from_genai_tool_call(tc: &GenaiToolCall) -> ToolCall {
    let input = match &tc.fn_arguments {
        Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|_| tc.fn_arguments.clone()),
        other => other.clone(),
    };

    ToolCall {
        id: tc.call_id.clone(),
        name: tc.fn_name.clone(),
        input,
    }
}

/// Convert a genai stream event into zero or more chunks
pub fn from_genai_event(event: ChatStreamEvent) -> Vec<ProviderResult<StreamChunk>> {
    match event {
        ChatStreamEvent::Chunk(chunk) => vec![Ok(StreamChunk::text(chunk.content))],
        ChatStreamEvent::ToolCallChunk(chunk) => vec![Ok(StreamChunk::ToolCallDelta {
            id: chunk.tool_call.call_id,
            name: Some(chunk.tool_call.fn_name),
            arguments_delta: Some(chunk.tool_call.fn_arguments.to_string()),
        })],
        ChatStreamEvent::End(end) => match end.captured_tool_calls() {
            Some(tool_calls) => tool_calls
                .iter()
                .map(|tc| Ok(StreamChunk::tool_call(from_genai_tool_call(tc))))
                .collect(),
            None => Vec::new(),
        },
        ChatStreamEvent::Start
        | ChatStreamEvent::ReasoningChunk(_)
        | ChatStreamEvent::ThoughtSignatureChunk(_) => Vec::new(),
    }
}

// ============================================================================
// Provider Resolution
// ============================================================================

/// Provider configuration for routing
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider identifier (e.g., "ollama", "openai", "openrouter")
    pub provider: String,
    /// Custom API base URL
    pub api_base: Option<String>,
}

/// The genai adapter that speaks a provider's protocol
pub fn adapter_kind_for(provider: &str) -> Option<AdapterKind> {
    match provider.to_lowercase().as_str() {
        "ollama" => Some(AdapterKind::Ollama),
        "openai" | "openrouter" | "mistral" => Some(AdapterKind::OpenAI),
        "anthropic" => Some(AdapterKind::Anthropic),
        "gemini" | "google" => Some(AdapterKind::Gemini),
        "groq" => Some(AdapterKind::Groq),
        "xai" => Some(AdapterKind::Xai),
        "deepseek" => Some(AdapterKind::DeepSeek),
        "cohere" => Some(AdapterKind::Cohere),
        _ => None,
    }
}

/// Check if a provider is handled by genai (natively or via OpenAI-compat)
pub fn is_genai_supported(provider: &str) -> bool {
    adapter_kind_for(provider).is_some()
}

/// Map a provider ID to the secret store key holding its API key
pub fn provider_to_secret_key(provider: &str) -> String {
    match provider.to_lowercase().as_str() {
        "google" => "gemini".to_string(),
        other => other.to_string(),
    }
}

fn default_endpoint(provider: &str) -> Option<&'static str> {
    match provider {
        "openrouter" => Some("https://openrouter.ai/api/v1/"),
        "mistral" => Some("https://api.mistral.ai/v1/"),
        _ => None,
    }
}

/// genai joins paths onto the endpoint, which must end in a slash
fn normalize_base(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    }
}

// ============================================================================
// Client Creation with Custom Auth
// ============================================================================

/// Create a genai Client whose auth and endpoint follow our configuration
pub fn create_client(config: &ProviderConfig, secrets: Arc<dyn SecretStore>) -> Client {
    let provider = config.provider.to_lowercase();

    let secret_key = provider_to_secret_key(&provider);
    let auth_resolver = AuthResolver::from_resolver_async_fn(
        move |_model_iden: ModelIden| -> Pin<Box<dyn Future<Output = genai::resolver::Result<Option<AuthData>>> + Send>> {
            let secrets = Arc::clone(&secrets);
            let secret_key = secret_key.clone();
            Box::pin(async move {
                // None is fine for keyless providers such as Ollama
                Ok(secrets.get(&secret_key).map(AuthData::from_single))
            })
        },
    );

    let target_provider = provider.clone();
    let target_api_base = config.api_base.as_deref().map(normalize_base);
    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let adapter_kind = match adapter_kind_for(&target_provider) {
                Some(kind) => kind,
                // Unknown providers are treated as OpenAI-compatible when given a base URL
                None if target_api_base.is_some() => AdapterKind::OpenAI,
                None => return Ok(target),
            };

            let endpoint = match (&target_api_base, default_endpoint(&target_provider)) {
                (Some(base), _) => Endpoint::from_owned(base.clone()),
                (None, Some(url)) => Endpoint::from_static(url),
                (None, None) => target.endpoint,
            };

            Ok(ServiceTarget {
                endpoint,
                auth: target.auth,
                model: ModelIden::new(adapter_kind, target.model.model_name.clone()),
            })
        },
    );

    Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build()
}
