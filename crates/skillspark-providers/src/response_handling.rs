//! Status classification shared by the streaming and one-shot calls

use reqwest::{header::HeaderMap, Response, StatusCode};

use crate::ProviderError;

/// Extract retry-after delay from response headers
/// Returns delay in milliseconds
pub fn extract_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(|secs| secs * 1000)
}

/// Map a non-success status to its failure kind.
pub fn classify_status(status: StatusCode, headers: &HeaderMap, body: String) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            retry_after_ms: extract_retry_after(headers),
        },
        StatusCode::PAYMENT_REQUIRED => ProviderError::QuotaExhausted { body },
        _ => ProviderError::Upstream {
            status: status.as_u16(),
            body,
        },
    }
}

/// Pass a successful response through untouched, otherwise read the body
/// and turn it into the matching error. Runs before any body streaming.
pub async fn ensure_success(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(%status, body = %body, "DashScope returned an error status");
    Err(classify_status(status, &headers, body))
}
