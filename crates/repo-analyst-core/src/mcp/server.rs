//! MCP server exposing a `ToolRegistry`
//!
//! The handler is written against `rmcp::ServerHandler` directly: tools come
//! from the registry at runtime, so there is no macro-generated router.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool as McpTool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::transport::IntoTransport;
use rmcp::{ErrorData, ServerHandler, ServiceExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::logging::SharedLogger;
use crate::tools::ToolRegistry;
use crate::types::{CancellationToken, Tool, ToolStatus};

use super::{McpError, McpResult};

/// Convert one of our tool specs into the MCP wire type
pub fn to_mcp_tool(tool: &Tool) -> McpTool {
    let schema: JsonObject = match &tool.input_schema {
        Value::Object(map) => map.clone(),
        _ => JsonObject::new(),
    };
    McpTool::new(tool.name.clone(), tool.description.clone(), Arc::new(schema))
}

/// Serves the tools of a registry over MCP
///
/// Stateless apart from the immutable registry; every request is handled
/// independently.
#[derive(Clone)]
pub struct ToolServer {
    registry: Arc<ToolRegistry>,
    logger: SharedLogger,
    shutdown: CancellationToken,
}

impl ToolServer {
    pub fn new(registry: Arc<ToolRegistry>, logger: SharedLogger) -> Self {
        Self {
            registry,
            logger,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Stop every running `serve_*` call of this server and its clones
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Serve over the process's stdin/stdout until the peer disconnects
    pub async fn serve_stdio(self) -> McpResult<()> {
        self.run(rmcp::transport::stdio()).await
    }

    /// Serve over any duplex byte stream (socket, in-memory pipe, ...)
    pub async fn serve_stream<S>(self, io: S) -> McpResult<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        self.run(io).await
    }

    async fn run<T, E, A>(self, transport: T) -> McpResult<()>
    where
        T: IntoTransport<RoleServer, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let shutdown = self.shutdown.clone();
        let logger = Arc::clone(&self.logger);
        logger.info(&format!(
            "[ToolServer] Serving {} tools",
            self.registry.len()
        ));

        let service = ServiceExt::serve(self, transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;
        let service_token = service.cancellation_token();

        tokio::select! {
            result = service.waiting() => {
                let reason = result.map_err(|e| McpError::Protocol(e.to_string()))?;
                logger.info(&format!("[ToolServer] Session ended: {:?}", reason));
            }
            _ = shutdown.cancelled() => {
                logger.info("[ToolServer] Shutdown requested");
                service_token.cancel();
            }
        }
        Ok(())
    }
}

impl ServerHandler for ToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "GitHub repository analysis tools.\n\n\
                 • get_repo_info: metadata, language breakdown and popularity stats\n\
                 • get_commit_history: most recent commits"
                    .to_string(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools: Vec<McpTool> = self.registry.list().iter().map(to_mcp_tool).collect();
        self.logger
            .debug(&format!("[ToolServer] tools/list -> {} tools", tools.len()));
        Ok(ListToolsResult {
            tools,
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let name = request.name.to_string();
        let arguments = Value::Object(request.arguments.unwrap_or_default());
        self.logger.info(&format!("[ToolServer] tools/call {}", name));

        match self.registry.invoke(&name, arguments).await {
            Ok(output) => {
                let content = vec![Content::text(output.payload)];
                Ok(match output.status {
                    ToolStatus::Ok => CallToolResult::success(content),
                    ToolStatus::Error => CallToolResult::error(content),
                })
            }
            Err(e) => {
                self.logger
                    .warn(&format!("[ToolServer] Rejected call to {}: {}", name, e));
                Err(ErrorData::invalid_params(e.to_string(), None))
            }
        }
    }
}
