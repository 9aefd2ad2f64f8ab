use std::time::Duration;

/// Typed failure of a metadata source call.
///
/// Adapters return these instead of panicking or bubbling transport errors;
/// anything unexpected is folded into `Unavailable`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The source has no record for this identity. Never retried.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The source asked us to slow down.
    #[error("Rate limited by source{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// Transient failure: timeout, connection error, 5xx.
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The source answered with something we could not decode.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs()),
        None => String::new(),
    }
}

impl ProviderError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Whether the adapter boundary may retry this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Whether a caller holding stale data should fall back to it.
    ///
    /// Malformed counts as unavailable for selection purposes.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::Malformed(_) | Self::RateLimited { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_message_includes_hint() {
        let err = ProviderError::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.to_string(), "Rate limited by source (retry after 30s)");

        let err = ProviderError::RateLimited { retry_after: None };
        assert_eq!(err.to_string(), "Rate limited by source");
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(ProviderError::unavailable("timeout").is_retryable());
        assert!(!ProviderError::malformed("bad json").is_retryable());
        assert!(!ProviderError::not_found("42").is_retryable());
        assert!(!ProviderError::RateLimited { retry_after: None }.is_retryable());
    }

    #[test]
    fn test_not_found_is_not_degradable() {
        assert!(!ProviderError::not_found("42").is_degradable());
        assert!(ProviderError::malformed("x").is_degradable());
    }
}
