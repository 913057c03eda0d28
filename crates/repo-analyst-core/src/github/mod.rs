//! GitHub repository data source and the tools built on it

mod client;
mod source;
mod tools;
mod types;

pub use client::GitHubClient;
pub use source::{clamp_limit, RepositorySource, SourceError, SourceResult};
pub use tools::{
    commit_history_spec, register_tools, repo_info_spec, CommitHistoryArgs, RepoInfoArgs,
    GET_COMMIT_HISTORY, GET_REPO_INFO,
};
pub use types::{language_shares, CommitRecord, LanguageShare, RepoInfo, RepoMetadata, RepoStats};
