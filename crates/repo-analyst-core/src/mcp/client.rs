//! MCP client used by the orchestrator
//!
//! Connects to exactly one tool server per session, caches its catalog and
//! forwards tool calls.

use std::time::Duration;

use futures::future::join_all;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation,
    RawContent, Tool as McpTool,
};
use rmcp::service::RunningService;
use rmcp::transport::{ConfigureCommandExt, IntoTransport, TokioChildProcess};
use rmcp::{RoleClient, ServiceExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::Command;

use crate::logging::SharedLogger;
use crate::types::{Tool, ToolCall, ToolResult};

use super::{McpError, McpResult};

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "repo-analyst".to_string(),
            title: Some("Repo Analyst".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

/// Convert an MCP tool into a catalog entry
pub fn from_mcp_tool(tool: &McpTool) -> Tool {
    Tool {
        name: tool.name.to_string(),
        description: tool
            .description
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default(),
        input_schema: Value::Object(tool.input_schema.as_ref().clone()),
    }
}

/// Flatten a call result into the text the model will see
fn result_text(result: &CallToolResult) -> String {
    let texts: Vec<&str> = result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect();

    if texts.is_empty() {
        result
            .structured_content
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default()
    } else {
        texts.join("\n")
    }
}

/// Client end of the tool channel
pub struct ToolInvocationClient {
    service: RunningService<RoleClient, ClientInfo>,
    tools: Vec<Tool>,
    parallel: bool,
    logger: SharedLogger,
}

impl ToolInvocationClient {
    /// Spawn a tool server as a child process and talk to it over its stdio
    pub async fn connect_child_process(
        command: impl AsRef<std::ffi::OsStr>,
        args: Vec<String>,
        env: Vec<(String, String)>,
        timeout: Duration,
        logger: SharedLogger,
    ) -> McpResult<Self> {
        let label = command.as_ref().to_string_lossy().into_owned();
        logger.info(&format!("[ToolInvocationClient] Spawning tool server: {}", label));

        let transport = TokioChildProcess::new(Command::new(command).configure(move |cmd| {
            cmd.args(&args);
            for (key, value) in &env {
                cmd.env(key, value);
            }
        }))
        .map_err(|e| McpError::ConnectionFailed(format!("failed to spawn {}: {}", label, e)))?;

        Self::connect_transport(transport, timeout, logger).await
    }

    /// Connect over an already-open duplex byte stream
    pub async fn connect_stream<S>(io: S, timeout: Duration, logger: SharedLogger) -> McpResult<Self>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Self::connect_transport(io, timeout, logger).await
    }

    /// Connect to a remote server over Streamable HTTP
    pub async fn connect_http(url: &str, timeout: Duration, logger: SharedLogger) -> McpResult<Self> {
        use rmcp::transport::StreamableHttpClientTransport;

        logger.info(&format!("[ToolInvocationClient] Connecting to HTTP: {}", url));
        let transport = StreamableHttpClientTransport::from_uri(url);
        Self::connect_transport(transport, timeout, logger).await
    }

    async fn connect_transport<T, E, A>(
        transport: T,
        timeout: Duration,
        logger: SharedLogger,
    ) -> McpResult<Self>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let handshake = async {
            let service = client_info()
                .serve(transport)
                .await
                .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

            let listed = service
                .list_tools(Default::default())
                .await
                .map_err(|e| McpError::InitializationFailed(format!("tools/list failed: {}", e)))?;

            Ok::<_, McpError>((service, listed.tools))
        };

        let (service, mcp_tools) = tokio::time::timeout(timeout, handshake)
            .await
            .map_err(|_| McpError::Timeout(timeout))??;

        let tools: Vec<Tool> = mcp_tools.iter().map(from_mcp_tool).collect();
        if let Some(info) = service.peer_info() {
            logger.info(&format!(
                "[ToolInvocationClient] Connected to {} {} ({} tools)",
                info.server_info.name,
                info.server_info.version,
                tools.len()
            ));
        }

        Ok(Self {
            service,
            tools,
            parallel: true,
            logger,
        })
    }

    /// Run the calls of one batch concurrently (default) or one after another
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// The catalog discovered at connect time
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Server name and version from the handshake
    pub fn server_info(&self) -> Option<&Implementation> {
        self.service.peer_info().map(|info| &info.server_info)
    }

    /// Invoke one tool; every failure is reported as an error result
    pub async fn invoke(&self, call: &ToolCall) -> ToolResult {
        self.logger.info(&format!(
            "[ToolInvocationClient] Calling {} ({})",
            call.name, call.id
        ));

        let params = CallToolRequestParams {
            meta: None,
            name: call.name.clone().into(),
            arguments: call.input.as_object().cloned(),
            task: None,
        };

        match self.service.call_tool(params).await {
            Ok(result) => {
                let text = result_text(&result);
                if result.is_error.unwrap_or(false) {
                    self.logger.warn(&format!(
                        "[ToolInvocationClient] {} returned an error: {}",
                        call.name, text
                    ));
                    ToolResult::error(&call.id, text)
                } else {
                    ToolResult::success(&call.id, text)
                }
            }
            Err(e) => {
                self.logger.warn(&format!(
                    "[ToolInvocationClient] {} failed: {}",
                    call.name, e
                ));
                ToolResult::error(&call.id, format!("Tool call failed: {}", e))
            }
        }
    }

    /// Invoke a batch; results come back in request order
    pub async fn invoke_many(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        if self.parallel {
            join_all(calls.iter().map(|call| self.invoke(call))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.invoke(call).await);
            }
            results
        }
    }

    /// Close the connection (and stop a spawned server)
    pub async fn disconnect(self) -> McpResult<()> {
        self.logger.info("[ToolInvocationClient] Disconnecting");
        self.service
            .cancel()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::Content;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_from_mcp_tool() {
        let schema = json!({"type": "object"}).as_object().cloned().unwrap();
        let mcp = McpTool::new("get_commit_history", "Recent commits", Arc::new(schema));
        let tool = from_mcp_tool(&mcp);
        assert_eq!(tool.name, "get_commit_history");
        assert_eq!(tool.description, "Recent commits");
        assert_eq!(tool.input_schema, json!({"type": "object"}));
    }

    #[test]
    fn test_result_text_joins_text_parts() {
        let result = CallToolResult::success(vec![Content::text("one"), Content::text("two")]);
        assert_eq!(result_text(&result), "one\ntwo");
    }

    #[tokio::test]
    async fn test_connect_to_closed_stream_fails() {
        let (client_end, server_end) = tokio::io::duplex(64);
        drop(server_end);

        let result = ToolInvocationClient::connect_stream(
            client_end,
            Duration::from_secs(5),
            crate::logging::NoOpLogger::shared(),
        )
        .await;
        assert!(matches!(result, Err(McpError::InitializationFailed(_))));
    }

    #[tokio::test]
    async fn test_connect_times_out() {
        // The peer never answers the initialize request
        let (client_end, _server_end) = tokio::io::duplex(1024);

        let result = ToolInvocationClient::connect_stream(
            client_end,
            Duration::from_millis(50),
            crate::logging::NoOpLogger::shared(),
        )
        .await;
        assert!(matches!(result, Err(McpError::Timeout(_))));
    }
}
