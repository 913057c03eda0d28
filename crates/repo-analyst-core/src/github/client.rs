//! GitHub REST v3 client

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::GitHubSettings;
use crate::logging::SharedLogger;
use crate::secrets::{SecretStore, GITHUB_TOKEN_KEY};

use super::source::{clamp_limit, RepositorySource, SourceError, SourceResult};
use super::types::{language_shares, CommitRecord, RepoInfo, RepoMetadata, RepoStats};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

// ============================================================================
// Wire types (only the fields we read)
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiLicense {
    spdx_id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRepo {
    full_name: String,
    description: Option<String>,
    html_url: String,
    #[serde(default)]
    default_branch: String,
    language: Option<String>,
    license: Option<ApiLicense>,
    #[serde(default)]
    topics: Vec<String>,
    created_at: String,
    updated_at: String,
    pushed_at: Option<String>,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    fork: bool,
    stargazers_count: u64,
    forks_count: u64,
    open_issues_count: u64,
    subscribers_count: Option<u64>,
    watchers_count: u64,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct ApiCommitAuthor {
    name: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCommitDetail {
    message: String,
    author: Option<ApiCommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    sha: String,
    html_url: String,
    commit: ApiCommitDetail,
    author: Option<ApiUser>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

impl ApiRepo {
    fn into_parts(self) -> (RepoMetadata, RepoStats) {
        let license = self.license.and_then(|l| {
            l.spdx_id
                .filter(|id| id != "NOASSERTION")
                .or(l.name)
        });
        let metadata = RepoMetadata {
            full_name: self.full_name,
            description: self.description,
            html_url: self.html_url,
            default_branch: self.default_branch,
            primary_language: self.language,
            license,
            topics: self.topics,
            created_at: self.created_at,
            updated_at: self.updated_at,
            pushed_at: self.pushed_at,
            archived: self.archived,
            fork: self.fork,
        };
        let stats = RepoStats {
            stars: self.stargazers_count,
            forks: self.forks_count,
            open_issues: self.open_issues_count,
            watchers: self.subscribers_count.unwrap_or(self.watchers_count),
            size_kb: self.size,
        };
        (metadata, stats)
    }
}

impl From<ApiCommit> for CommitRecord {
    fn from(c: ApiCommit) -> Self {
        let (name, date) = match c.commit.author {
            Some(a) => (a.name, a.date),
            None => (None, None),
        };
        CommitRecord {
            sha: c.sha,
            message: c.commit.message,
            author: name
                .or_else(|| c.author.map(|u| u.login))
                .unwrap_or_else(|| "unknown".to_string()),
            date: date.unwrap_or_default(),
            url: c.html_url,
        }
    }
}

/// Map a non-success response onto a `SourceError`
fn classify_failure(status: StatusCode, ratelimit_remaining: Option<&str>, body: &str, resource: &str) -> SourceError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

    match status {
        StatusCode::NOT_FOUND => SourceError::NotFound {
            resource: resource.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimited { message },
        StatusCode::FORBIDDEN if ratelimit_remaining == Some("0") => {
            SourceError::RateLimited { message }
        }
        _ => SourceError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

// ============================================================================
// Client
// ============================================================================

/// `RepositorySource` backed by the GitHub REST API
///
/// # Example
///
/// ```no_run
/// use repo_analyst_core::github::{GitHubClient, RepositorySource};
/// use repo_analyst_core::logging::NoOpLogger;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GitHubClient::new("https://api.github.com", None, NoOpLogger::shared())?;
/// let info = client.repo_info("rust-lang", "rust").await?;
/// println!("{} stars", info.stats.stars);
/// # Ok(())
/// # }
/// ```
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    logger: SharedLogger,
}

impl GitHubClient {
    /// Create a client; the token, when present, is sent as `Authorization: token …`
    pub fn new(
        api_base: impl Into<String>,
        token: Option<String>,
        logger: SharedLogger,
    ) -> SourceResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("repo-analyst/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("token {}", token))
                .map_err(|e| SourceError::Network(format!("invalid token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            logger,
        })
    }

    /// Build from settings, resolving the token through the secret store
    pub fn from_settings(
        settings: &GitHubSettings,
        secrets: &dyn SecretStore,
        logger: SharedLogger,
    ) -> SourceResult<Self> {
        let token = secrets.get(GITHUB_TOKEN_KEY);
        if token.is_none() {
            logger.warn("[GitHubClient] No GitHub token found, using unauthenticated requests");
        }
        Self::new(settings.api_base.clone(), token, logger)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn check(&self, response: Response, resource: &str) -> SourceResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let remaining = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();
        let err = classify_failure(status, remaining.as_deref(), &body, resource);
        self.logger
            .warn(&format!("[GitHubClient] {} failed: {}", resource, err));
        Err(err)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> SourceResult<T> {
        let url = format!("{}{}", self.api_base, path);
        self.logger.debug(&format!("[GitHubClient] GET {}", url));

        let mut request = self.http.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let response = self.check(response, path).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl RepositorySource for GitHubClient {
    async fn repo_info(&self, owner: &str, repo: &str) -> SourceResult<RepoInfo> {
        let path = format!("/repos/{}/{}", owner, repo);
        let api_repo: ApiRepo = self.get_json(&path, &[]).await?;
        let languages: HashMap<String, u64> =
            self.get_json(&format!("{}/languages", path), &[]).await?;

        let (metadata, stats) = api_repo.into_parts();
        Ok(RepoInfo {
            metadata,
            languages: language_shares(languages),
            stats,
        })
    }

    async fn commit_history(
        &self,
        owner: &str,
        repo: &str,
        limit: u32,
    ) -> SourceResult<Vec<CommitRecord>> {
        let path = format!("/repos/{}/{}/commits", owner, repo);
        let limit = clamp_limit(limit);
        let commits: Vec<ApiCommit> = self
            .get_json(&path, &[("per_page", limit.to_string())])
            .await?;

        Ok(commits
            .into_iter()
            .take(limit as usize)
            .map(CommitRecord::from)
            .collect())
    }
}
