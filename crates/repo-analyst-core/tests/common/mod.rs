//! Shared fixtures: a canned repository source and an in-process tool server

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use repo_analyst_core::github::{
    language_shares, register_tools, CommitRecord, RepoInfo, RepoMetadata, RepoStats,
    RepositorySource, SourceError, SourceResult,
};
use repo_analyst_core::mcp::{McpResult, ToolInvocationClient, ToolServer};
use repo_analyst_core::tools::{FnExecutor, ToolExecutionError, ToolRegistry};
use repo_analyst_core::{NoOpLogger, Session, Tool};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Knows exactly one repository, octocat/hello-world (Python and Shell)
#[derive(Default)]
pub struct FakeSource {
    pub calls: Mutex<Vec<String>>,
}

impl FakeSource {
    fn known(owner: &str, repo: &str) -> bool {
        owner == "octocat" && repo == "hello-world"
    }
}

#[async_trait]
impl RepositorySource for FakeSource {
    async fn repo_info(&self, owner: &str, repo: &str) -> SourceResult<RepoInfo> {
        self.calls.lock().push(format!("repo_info {}/{}", owner, repo));
        if !Self::known(owner, repo) {
            return Err(SourceError::NotFound {
                resource: format!("/repos/{}/{}", owner, repo),
            });
        }
        Ok(RepoInfo {
            metadata: RepoMetadata {
                full_name: "octocat/hello-world".to_string(),
                description: Some("My first repository".to_string()),
                html_url: "https://github.com/octocat/hello-world".to_string(),
                default_branch: "main".to_string(),
                primary_language: Some("Python".to_string()),
                license: Some("MIT".to_string()),
                topics: vec!["demo".to_string()],
                created_at: "2011-01-26T19:01:12Z".to_string(),
                updated_at: "2024-05-01T10:00:00Z".to_string(),
                pushed_at: Some("2024-05-01T09:58:00Z".to_string()),
                archived: false,
                fork: false,
            },
            languages: language_shares(vec![
                ("Python".to_string(), 7500),
                ("Shell".to_string(), 2500),
            ]),
            stats: RepoStats {
                stars: 2100,
                forks: 1900,
                open_issues: 12,
                watchers: 2100,
                size_kb: 108,
            },
        })
    }

    async fn commit_history(
        &self,
        owner: &str,
        repo: &str,
        limit: u32,
    ) -> SourceResult<Vec<CommitRecord>> {
        self.calls
            .lock()
            .push(format!("commit_history {}/{} {}", owner, repo, limit));
        if !Self::known(owner, repo) {
            return Err(SourceError::NotFound {
                resource: format!("/repos/{}/{}/commits", owner, repo),
            });
        }
        Ok((0..limit.min(3))
            .map(|i| CommitRecord {
                sha: format!("{:040x}", i + 1),
                message: format!("Commit number {}", i + 1),
                author: "The Octocat".to_string(),
                date: "2024-05-01T09:58:00Z".to_string(),
                url: format!("https://github.com/octocat/hello-world/commit/{:040x}", i + 1),
            })
            .collect())
    }
}

/// The GitHub tools over a fresh `FakeSource`
pub fn github_registry(source: Arc<FakeSource>) -> ToolRegistry {
    register_tools(ToolRegistry::builder(), source, 5)
        .expect("register GitHub tools")
        .build()
}

/// A `sleep` tool that waits `delay_ms` and returns `label`
pub fn sleep_registry() -> ToolRegistry {
    let spec = Tool::new("sleep", "Wait, then echo the label").with_schema(json!({
        "type": "object",
        "properties": {
            "label": { "type": "string" },
            "delay_ms": { "type": "integer", "minimum": 0 }
        },
        "required": ["label", "delay_ms"],
        "additionalProperties": false
    }));

    let executor = FnExecutor::new(|args: Value| {
        async move {
            let delay = args["delay_ms"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, ToolExecutionError>(args["label"].clone())
        }
        .boxed()
    });

    ToolRegistry::builder()
        .register(spec, Arc::new(executor))
        .expect("register sleep tool")
        .build()
}

/// Start a server for `registry` in-process and connect a client to it
pub async fn connect(registry: ToolRegistry) -> ToolInvocationClient {
    serve(registry).await.0
}

/// Like `connect`, but also hand back the server and its serving task
pub async fn serve(
    registry: ToolRegistry,
) -> (ToolInvocationClient, ToolServer, JoinHandle<McpResult<()>>) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let server = ToolServer::new(Arc::new(registry), NoOpLogger::shared());
    let handle = tokio::spawn(server.clone().serve_stream(server_io));

    let client = ToolInvocationClient::connect_stream(client_io, CONNECT_TIMEOUT, NoOpLogger::shared())
        .await
        .expect("connect to in-process tool server");
    (client, server, handle)
}

/// A tools-enabled session over the GitHub tools
pub async fn github_session(source: Arc<FakeSource>) -> Session {
    let client = connect(github_registry(source)).await;
    Session::with_tools(Some("You analyze GitHub repositories.".to_string()), client)
}
