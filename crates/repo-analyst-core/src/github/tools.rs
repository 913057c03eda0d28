//! The repository tools exposed to the model

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::Value;

use crate::tools::{input_schema_for, ToolError, ToolExecutionError, ToolExecutor, ToolRegistryBuilder};
use crate::types::Tool;

use super::source::RepositorySource;

pub const GET_REPO_INFO: &str = "get_repo_info";
pub const GET_COMMIT_HISTORY: &str = "get_commit_history";

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RepoInfoArgs {
    #[schemars(description = "Repository owner (user or organization)")]
    pub owner: String,
    #[schemars(description = "Repository name")]
    pub repo: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CommitHistoryArgs {
    #[schemars(description = "Repository owner (user or organization)")]
    pub owner: String,
    #[schemars(description = "Repository name")]
    pub repo: String,
    #[schemars(description = "Number of most recent commits to return (default 5, max 100)")]
    #[serde(default)]
    pub limit: Option<u32>,
}

fn parse_args<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, ToolExecutionError> {
    serde_json::from_value(arguments)
        .map_err(|e| ToolExecutionError::new(format!("Invalid arguments: {}", e)))
}

struct RepoInfoTool {
    source: Arc<dyn RepositorySource>,
}

#[async_trait]
impl ToolExecutor for RepoInfoTool {
    async fn execute(&self, arguments: Value) -> Result<Value, ToolExecutionError> {
        let args: RepoInfoArgs = parse_args(arguments)?;
        let info = self
            .source
            .repo_info(&args.owner, &args.repo)
            .await
            .map_err(|e| ToolExecutionError::new(format!("Failed to fetch repo info: {}", e)))?;
        Ok(serde_json::to_value(info)?)
    }
}

struct CommitHistoryTool {
    source: Arc<dyn RepositorySource>,
    default_limit: u32,
}

#[async_trait]
impl ToolExecutor for CommitHistoryTool {
    async fn execute(&self, arguments: Value) -> Result<Value, ToolExecutionError> {
        let args: CommitHistoryArgs = parse_args(arguments)?;
        let limit = args.limit.unwrap_or(self.default_limit);
        let commits = self
            .source
            .commit_history(&args.owner, &args.repo, limit)
            .await
            .map_err(|e| {
                ToolExecutionError::new(format!("Failed to fetch commit history: {}", e))
            })?;
        Ok(serde_json::to_value(commits)?)
    }
}

pub fn repo_info_spec() -> Tool {
    Tool::new(
        GET_REPO_INFO,
        "Fetch repository information from GitHub: description, primary language, \
         language breakdown in percent, stars, forks, open issues and activity dates.",
    )
    .with_schema(input_schema_for::<RepoInfoArgs>())
}

pub fn commit_history_spec() -> Tool {
    Tool::new(
        GET_COMMIT_HISTORY,
        "Fetch the most recent commits of a GitHub repository: sha, message, author, date and URL.",
    )
    .with_schema(input_schema_for::<CommitHistoryArgs>())
}

/// Register `get_repo_info` and `get_commit_history` over any repository source
pub fn register_tools(
    builder: ToolRegistryBuilder,
    source: Arc<dyn RepositorySource>,
    default_commit_limit: u32,
) -> Result<ToolRegistryBuilder, ToolError> {
    builder
        .register(
            repo_info_spec(),
            Arc::new(RepoInfoTool {
                source: Arc::clone(&source),
            }),
        )?
        .register(
            commit_history_spec(),
            Arc::new(CommitHistoryTool {
                source,
                default_limit: default_commit_limit,
            }),
        )
}
