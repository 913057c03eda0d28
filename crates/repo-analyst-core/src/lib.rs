//! Repo Analyst Core
//!
//! Tool-mediated LLM conversations about GitHub repositories. A reasoning
//! client (the orchestrator) talks to an LLM provider and, whenever the model
//! asks for live data, to a tool server over MCP.
//!
//! ## Tool-mediated inference loop
//!
//! ```rust,ignore
//! use repo_analyst_core::github::{register_tools, GitHubClient};
//! use repo_analyst_core::mcp::{ToolInvocationClient, ToolServer};
//! use repo_analyst_core::orchestrator::{ConversationOrchestrator, Session};
//! use repo_analyst_core::tools::ToolRegistry;
//!
//! let registry = register_tools(ToolRegistry::builder(), source, 5)?.build();
//! let (client_io, server_io) = tokio::io::duplex(64 * 1024);
//! tokio::spawn(ToolServer::new(Arc::new(registry), logger.clone()).serve_stream(server_io));
//!
//! let client = ToolInvocationClient::connect_stream(client_io, timeout, logger.clone()).await?;
//! let mut session = Session::with_tools(Some(system_prompt), client);
//!
//! let orchestrator = ConversationOrchestrator::from_config(provider, &config, logger);
//! let answer = orchestrator.run_turn(&mut session, "What languages does it use?", &cancel).await?;
//! session.shutdown().await?;
//! ```

pub mod analysis;
pub mod config;
pub mod github;
pub mod logging;
pub mod mcp;
pub mod orchestrator;
pub mod providers;
pub mod secrets;
pub mod tools;
pub mod types;

// Re-export commonly used types
pub use types::{
    CancellationToken, ChatMessage, Conversation, ConversationError, MessageRole, StreamChunk,
    Tool, ToolCall, ToolOutput, ToolResult, ToolStatus,
};

pub use analysis::{system_prompt, AnalysisMode, AnalysisModeError};

pub use config::{AppConfig, ConfigError, ConnectFailurePolicy, FileConfigProvider};

pub use logging::{Logger, NoOpLogger, SharedLogger, TracingLogger};

pub use secrets::{EnvSecretStore, MemorySecretStore, SecretStore, GITHUB_TOKEN_KEY};

pub use providers::{create_provider, Provider, ProviderError, ProviderModelConfig};

pub use tools::{ToolError, ToolExecutionError, ToolExecutor, ToolRegistry, ToolRegistryBuilder};

pub use github::{GitHubClient, RepositorySource, SourceError};

pub use mcp::{McpError, McpResult, ToolInvocationClient, ToolServer};

pub use orchestrator::{ConversationOrchestrator, Session, TurnError, TurnState};
