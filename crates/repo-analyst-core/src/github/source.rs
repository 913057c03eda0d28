//! The repository data boundary

use async_trait::async_trait;
use thiserror::Error;

use super::types::{CommitRecord, RepoInfo};

/// Upstream failures of a repository source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Not Found: {resource}")]
    NotFound { resource: String },

    #[error("API rate limit exceeded: {message}")]
    RateLimited { message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Something that can describe repositories and their history
#[async_trait]
pub trait RepositorySource: Send + Sync {
    async fn repo_info(&self, owner: &str, repo: &str) -> SourceResult<RepoInfo>;

    /// Most recent commits first; `limit` is clamped to 1..=100
    async fn commit_history(&self, owner: &str, repo: &str, limit: u32)
        -> SourceResult<Vec<CommitRecord>>;
}

/// Clamp a requested commit count to what the API serves per page
pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, 100)
}
