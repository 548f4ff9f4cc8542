//! Error types for Abacus.

pub mod unified;

pub use unified::{status_message, ErrorCategory};

use thiserror::Error;

/// Primary error type for all Abacus operations.
#[derive(Error, Debug)]
pub enum AbacusError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Operation canceled")]
    Canceled,
}

impl AbacusError {
    /// Create an API error from a status code and response body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Network(err) if err.is_timeout() => ErrorCategory::Timeout,
            Self::Network(_) => ErrorCategory::Network,
            Self::Io(_) => ErrorCategory::Network,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Stream(_) => ErrorCategory::Network,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                408 => ErrorCategory::Timeout,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Canceled => ErrorCategory::Canceled,
        }
    }

    /// Whether the transport should retry after this error.
    ///
    /// Only 5xx responses and transport-level failures qualify; every other
    /// status is surfaced as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => (500..=599).contains(status),
            Self::Network(err) => err.status().is_none(),
            _ => false,
        }
    }

    /// Human-readable description suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { status, .. } => status_message(*status).to_string(),
            Self::Configuration(msg) => format!("The assistant is not configured yet: {msg}"),
            other => other.category().describe().to_string(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AbacusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable() {
        assert!(AbacusError::api(500, "boom").is_retryable());
        assert!(AbacusError::api(503, "busy").is_retryable());
        assert_eq!(AbacusError::api(502, "").category(), ErrorCategory::Server);
    }

    #[test]
    fn client_errors_are_not_retryable() {
        for status in [400, 401, 403, 404, 408, 429] {
            assert!(!AbacusError::api(status, "").is_retryable(), "status {status}");
        }
        assert_eq!(
            AbacusError::api(401, "").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(AbacusError::api(429, "").category(), ErrorCategory::RateLimit);
    }

    #[test]
    fn non_transport_errors_are_not_retryable() {
        assert!(!AbacusError::Configuration("no key".into()).is_retryable());
        assert!(!AbacusError::Stream("cut".into()).is_retryable());
        assert!(!AbacusError::Canceled.is_retryable());
    }

    #[test]
    fn user_message_is_keyed_by_status() {
        let msg = AbacusError::api(401, "{\"error\":\"bad key\"}").user_message();
        assert_eq!(msg, status_message(401));
        assert!(msg.contains("API key"));
        assert_ne!(
            AbacusError::api(429, "").user_message(),
            AbacusError::api(503, "").user_message()
        );
    }

    #[test]
    fn configuration_message_mentions_cause() {
        let msg = AbacusError::Configuration("missing API key".into()).user_message();
        assert!(msg.contains("missing API key"));
    }
}
