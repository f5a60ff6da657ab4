//! Provider error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("rate limit exceeded, please wait a moment and try again")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("quota exhausted: {body}")]
    QuotaExhausted { body: String },

    #[error("upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("upstream communication failure: {0}")]
    Communication(#[from] reqwest::Error),

    #[error("upstream stream failure: {code}: {message}")]
    StreamFailure { code: String, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// True when the failure happened before any network traffic.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }

    /// Upstream HTTP status behind this error, if it came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::QuotaExhausted { .. } => Some(402),
            Self::Upstream { status, .. } => Some(*status),
            Self::Communication(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
