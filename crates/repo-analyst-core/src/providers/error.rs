//! Provider error types

use thiserror::Error;

/// Errors that can occur during provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request could not be started
    #[error("{provider} request failed: {message}")]
    Request { provider: String, message: String },

    /// The response stream broke off
    #[error("{provider} stream error: {message}")]
    Stream { provider: String, message: String },

    /// A conversation message could not be converted for the provider
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request was cancelled
    #[error("Request cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    pub fn request(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn stream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stream {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
