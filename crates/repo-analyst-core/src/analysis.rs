//! Analysis modes offered to the operator
//!
//! Each mode turns a repository coordinate into the user prompt of one turn.
//! The model is expected to fetch the data itself through the tools.

use std::fmt;
use std::str::FromStr;

use crate::github::{GET_COMMIT_HISTORY, GET_REPO_INFO};

const COMMIT_INSTRUCTIONS: &str = "Analyze these GitHub commits and provide insights about:
1. Common themes in commit messages
2. Code areas frequently modified
3. Notable changes or patterns
Please format your response in a clear, structured way.";

const REPO_INSTRUCTIONS: &str = "Analyze this GitHub repository information and provide insights about:
1. Repository size and activity level
2. Main programming languages
3. Notable features (stars, forks, etc.)
Please format your response in a clear, structured way.";

/// What the operator wants to know about a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Themes and patterns in the recent commits
    Commits,
    /// Size, languages and popularity
    Repo,
    /// Operator-supplied analysis instructions over repo info and commits
    Custom(String),
    /// A free-form question
    Ask(String),
}

impl AnalysisMode {
    /// Mode keywords accepted on the command line
    pub const NAMES: [&'static str; 4] = ["commits", "repo", "custom", "ask"];

    /// Parse a mode keyword, attaching `text` to the modes that need one
    pub fn from_name(name: &str, text: Option<String>) -> Result<Self, AnalysisModeError> {
        match name.trim().to_lowercase().as_str() {
            "commits" => Ok(Self::Commits),
            "repo" => Ok(Self::Repo),
            "custom" => text
                .filter(|t| !t.trim().is_empty())
                .map(Self::Custom)
                .ok_or(AnalysisModeError::MissingPrompt("custom")),
            "ask" => text
                .filter(|t| !t.trim().is_empty())
                .map(Self::Ask)
                .ok_or(AnalysisModeError::MissingPrompt("ask")),
            other => Err(AnalysisModeError::Unknown(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Commits => "commits",
            Self::Repo => "repo",
            Self::Custom(_) => "custom",
            Self::Ask(_) => "ask",
        }
    }

    /// Heading for the printed answer
    pub fn title(&self) -> &'static str {
        match self {
            Self::Commits => "Commit Analysis Results",
            Self::Repo => "Repository Analysis Results",
            Self::Custom(_) => "Custom Analysis Results",
            Self::Ask(_) => "Answer",
        }
    }

    /// Build the user prompt for `owner/repo`
    pub fn prompt(&self, owner: &str, repo: &str) -> String {
        let target = format!("{}/{}", owner, repo);
        match self {
            Self::Commits => format!(
                "Look at the recent commits of the GitHub repository {target} \
                 (use the {GET_COMMIT_HISTORY} tool).\n\n{COMMIT_INSTRUCTIONS}"
            ),
            Self::Repo => format!(
                "Look at the GitHub repository {target} (use the {GET_REPO_INFO} tool).\n\n{REPO_INSTRUCTIONS}"
            ),
            Self::Custom(instructions) => format!(
                "Gather the repository information and recent commits of the GitHub repository \
                 {target} (use the {GET_REPO_INFO} and {GET_COMMIT_HISTORY} tools), then follow \
                 these instructions:\n\n{instructions}"
            ),
            Self::Ask(question) => format!(
                "Regarding the GitHub repository {target}: {question}"
            ),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnalysisMode {
    type Err = AnalysisModeError;

    /// Only the modes that carry no text can be parsed from a bare keyword
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s, None)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisModeError {
    #[error("Unknown analysis mode '{0}' (expected one of commits, repo, custom, ask)")]
    Unknown(String),

    #[error("Analysis mode '{0}' needs a prompt")]
    MissingPrompt(&'static str),
}

/// System prompt for a session about `owner/repo`
pub fn system_prompt(owner: &str, repo: &str, tools_enabled: bool) -> String {
    let mut prompt = format!(
        "You are a software analyst helping an operator understand the GitHub repository {}/{}.",
        owner, repo
    );
    if tools_enabled {
        prompt.push_str(&format!(
            " Use the {} and {} tools to fetch live data before answering, and base your answer \
             on what they return. If a tool reports an error, explain it instead of guessing.",
            GET_REPO_INFO, GET_COMMIT_HISTORY
        ));
    } else {
        prompt.push_str(
            " No live data is available in this session; answer from general knowledge and say \
             so when you are unsure.",
        );
    }
    prompt
}
