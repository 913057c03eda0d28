//! Repository records returned by a `RepositorySource`

use serde::{Deserialize, Serialize};

/// Descriptive repository metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub default_branch: String,
    pub primary_language: Option<String>,
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub pushed_at: Option<String>,
    pub archived: bool,
    pub fork: bool,
}

/// Popularity and activity counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStats {
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub watchers: u64,
    /// Repository size in KB as reported by GitHub
    pub size_kb: u64,
}

/// Share of the codebase written in one language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageShare {
    pub name: String,
    /// Percentage of total bytes, one decimal
    pub percent: f64,
}

/// Everything `get_repo_info` reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub metadata: RepoMetadata,
    /// Largest share first
    pub languages: Vec<LanguageShare>,
    pub stats: RepoStats,
}

/// One commit from the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: String,
    pub url: String,
}

impl CommitRecord {
    /// First line of the commit message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// Convert per-language byte counts into percentages, largest first
pub fn language_shares<I>(bytes: I) -> Vec<LanguageShare>
where
    I: IntoIterator<Item = (String, u64)>,
{
    let mut entries: Vec<(String, u64)> = bytes.into_iter().collect();
    let total: u64 = entries.iter().map(|(_, b)| *b).sum();
    if total == 0 {
        return Vec::new();
    }

    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
        .into_iter()
        .map(|(name, b)| LanguageShare {
            name,
            percent: ((b as f64 / total as f64) * 1000.0).round() / 10.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_shares() {
        let shares = language_shares(vec![
            ("Shell".to_string(), 250),
            ("Python".to_string(), 750),
        ]);
        assert_eq!(shares[0], LanguageShare { name: "Python".to_string(), percent: 75.0 });
        assert_eq!(shares[1], LanguageShare { name: "Shell".to_string(), percent: 25.0 });
    }

    #[test]
    fn test_language_shares_round_to_one_decimal() {
        let shares = language_shares(vec![
            ("Rust".to_string(), 2),
            ("C".to_string(), 1),
        ]);
        assert_eq!(shares[0].percent, 66.7);
        assert_eq!(shares[1].percent, 33.3);
    }

    #[test]
    fn test_language_shares_empty() {
        assert!(language_shares(Vec::new()).is_empty());
        assert!(language_shares(vec![("Rust".to_string(), 0)]).is_empty());
    }

    #[test]
    fn test_commit_summary() {
        let commit = CommitRecord {
            sha: "abc".to_string(),
            message: "Fix parser\n\nLonger body".to_string(),
            author: "octocat".to_string(),
            date: "2024-01-01T00:00:00Z".to_string(),
            url: "https://github.com/o/r/commit/abc".to_string(),
        };
        assert_eq!(commit.summary(), "Fix parser");
    }
}
