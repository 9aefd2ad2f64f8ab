//! Mapping from HTTP and decoding failures onto [`ProviderError`].

use std::time::Duration;

use readcal_core::ProviderError;
use reqwest::StatusCode;

/// Classify a non-success HTTP status.
///
/// Returns `None` for success statuses.
pub fn classify_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    context: &str,
) -> Option<ProviderError> {
    if status.is_success() {
        return None;
    }
    let err = if status == StatusCode::NOT_FOUND {
        ProviderError::not_found(context.to_string())
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ProviderError::RateLimited { retry_after }
    } else if status.is_server_error() {
        ProviderError::unavailable(format!("HTTP {} from {context}", status.as_u16()))
    } else {
        // 400/401/403 etc. mean the request or the source changed shape under us.
        ProviderError::unavailable(format!(
            "Unexpected HTTP {} from {context}",
            status.as_u16()
        ))
    };
    Some(err)
}

/// Map a transport-level reqwest error. Timeouts and connection failures are
/// both transient.
pub fn transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::unavailable("request timed out")
    } else if err.is_connect() {
        ProviderError::unavailable(format!("connection failed: {err}"))
    } else {
        ProviderError::unavailable(err.to_string())
    }
}

/// Build a `Malformed` error with a short excerpt of the offending body.
pub fn malformed(err: serde_json::Error, body: &str) -> ProviderError {
    let excerpt: String = body.chars().take(200).collect();
    ProviderError::malformed(format!("{err}. Response: {excerpt}"))
}

/// Parse a `Retry-After` header given in whole seconds.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
