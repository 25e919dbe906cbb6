//! AI gateway error types.
//!
//! These stay internal to the gateway: the public analysis surface maps
//! failures to degraded results instead of propagating them.

use thiserror::Error;

/// Result type for AI provider calls.
pub type AiResult<T> = Result<T, AiError>;

/// Errors from a single provider call.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Payload too large for {provider}: {size_mb:.2}MB (max {max_mb}MB)")]
    PayloadTooLarge {
        provider: String,
        size_mb: f64,
        max_mb: u64,
    },

    #[error("Empty response from {0}")]
    EmptyResponse(String),

    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    #[error("Malformed provider output: {0}")]
    MalformedOutput(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AiError {
    pub fn not_configured(provider: impl Into<String>) -> Self {
        Self::NotConfigured(provider.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedOutput(msg.into())
    }
}
