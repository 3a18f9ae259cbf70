//! Fafnir error types

use std::time::Duration;

/// Fafnir error types
#[derive(Debug, thiserror::Error)]
pub enum FafnirError {
    // Upstream/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("not found: {0}")]
    NotFound(String),

    // Backend errors
    #[error("backend error: {0}")]
    Backend(String),

    /// More than one stored record matched a key that is supposed to be
    /// unique. Surfaced as its own kind so callers never silently pick one.
    #[error("duplicate records in '{collection}' for key '{key}'")]
    DuplicateRecord {
        collection: &'static str,
        key: String,
    },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("data error: {0}")]
    Data(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Wrapped document-store errors
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

impl FafnirError {
    /// Whether this error is worth retrying at the upstream client layer.
    ///
    /// Transport failures, rate limits, and 5xx responses are transient;
    /// everything else (auth, not-found, backend, config) is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            FafnirError::Http(_) | FafnirError::RateLimited { .. } => true,
            FafnirError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Retry-after hint carried by a `RateLimited` error, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FafnirError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for Fafnir operations
pub type Result<T> = std::result::Result<T, FafnirError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(FafnirError::Http("connection reset".into()).is_transient());
        assert!(FafnirError::RateLimited { retry_after: None }.is_transient());
        assert!(
            FafnirError::Api {
                status: 503,
                message: "unavailable".into()
            }
            .is_transient()
        );
        assert!(
            !FafnirError::Api {
                status: 404,
                message: "no such summoner".into()
            }
            .is_transient()
        );
        assert!(!FafnirError::AuthenticationFailed.is_transient());
        assert!(!FafnirError::NotFound("x".into()).is_transient());
    }

    #[test]
    fn retry_after_only_on_rate_limit() {
        let e = FafnirError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(e.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(FafnirError::Http("x".into()).retry_after(), None);
    }
}
