//! MCP (Model Context Protocol) tool channel
//!
//! Built on the official rmcp SDK. `ToolServer` exposes a `ToolRegistry`;
//! `ToolInvocationClient` is the session's single connection to it, over a
//! spawned child process, any duplex stream, or Streamable HTTP.
//!
//! # Example
//!
//! ```rust,ignore
//! use repo_analyst_core::mcp::{ToolInvocationClient, ToolServer};
//!
//! let (client_io, server_io) = tokio::io::duplex(64 * 1024);
//! tokio::spawn(ToolServer::new(registry, logger.clone()).serve_stream(server_io));
//!
//! let client = ToolInvocationClient::connect_stream(client_io, timeout, logger).await?;
//! for tool in client.tools() {
//!     println!("{}: {}", tool.name, tool.description);
//! }
//! let results = client.invoke_many(&calls).await;
//! ```

mod client;
mod server;

use std::time::Duration;

use thiserror::Error;

pub use client::{from_mcp_tool, ToolInvocationClient};
pub use server::{to_mcp_tool, ToolServer};

/// Tool channel errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Timed out after {0:?} waiting for the tool server")]
    Timeout(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type McpResult<T> = Result<T, McpError>;
