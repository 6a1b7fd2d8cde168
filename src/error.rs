//! Error types for bankbridge
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for bankbridge
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Credential Errors
    // ============================================================================
    #[error("Signing key unavailable: {message}")]
    KeyUnavailable { message: String },

    #[error("Token signing failed: {message}")]
    SigningFailed { message: String },

    #[error("Token has expired")]
    TokenExpired,

    #[error("Malformed token: {message}")]
    TokenMalformed { message: String },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("Rate limited by upstream, retry after {retry_after_seconds}s")]
    RateLimited {
        retry_after_seconds: u64,
        request_id: Option<String>,
    },

    #[error("Invalid request (400): {message}")]
    InvalidRequest { message: String },

    #[error("Unauthorized (401): {message}")]
    Unauthorized { message: String },

    #[error("Forbidden (403): {message}")]
    Forbidden { message: String },

    #[error("Not found (404): {message}")]
    NotFound { message: String },

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Connection failed: {message}")]
    ConnectionFailure { message: String },

    #[error("HTTP {status}: {message}")]
    GenericHttp { status: u16, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Session Errors
    // ============================================================================
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Account {account_uid} not authorized in session {session_id}")]
    AccountNotAuthorized {
        session_id: String,
        account_uid: String,
    },

    // ============================================================================
    // Configuration / I/O Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a key-unavailable error
    pub fn key_unavailable(message: impl Into<String>) -> Self {
        Self::KeyUnavailable {
            message: message.into(),
        }
    }

    /// Create a signing error
    pub fn signing_failed(message: impl Into<String>) -> Self {
        Self::SigningFailed {
            message: message.into(),
        }
    }

    /// Create a malformed-token error
    pub fn token_malformed(message: impl Into<String>) -> Self {
        Self::TokenMalformed {
            message: message.into(),
        }
    }

    /// Create a connection failure error
    pub fn connection_failure(message: impl Into<String>) -> Self {
        Self::ConnectionFailure {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a session-not-found error
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Map an upstream HTTP status code to the corresponding error variant.
    ///
    /// The mapping is closed: every status outside the known set becomes
    /// `GenericHttp` rather than a panic or a silent success.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 => Self::InvalidRequest { message },
            401 => Self::Unauthorized { message },
            403 => Self::Forbidden { message },
            404 => Self::NotFound { message },
            500..=599 => Self::ServerError { status, message },
            _ => Self::GenericHttp { status, message },
        }
    }

    /// Check if this error is retryable by the transport layer.
    ///
    /// `RateLimited` is deliberately excluded: a 429 carries a server-side
    /// policy the caller must respect, so it is surfaced instead of retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ServerError { .. } | Error::Timeout { .. } | Error::ConnectionFailure { .. }
        )
    }
}

/// Result type alias for bankbridge
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::from_status(404, "no such resource");
        assert_eq!(err.to_string(), "Not found (404): no such resource");

        let err = Error::session_not_found("sess-1");
        assert_eq!(err.to_string(), "Session not found: sess-1");

        let err = Error::RateLimited {
            retry_after_seconds: 30,
            request_id: None,
        };
        assert_eq!(err.to_string(), "Rate limited by upstream, retry after 30s");
    }

    #[test]
    fn test_status_mapping_is_closed() {
        assert!(matches!(
            Error::from_status(400, ""),
            Error::InvalidRequest { .. }
        ));
        assert!(matches!(
            Error::from_status(401, ""),
            Error::Unauthorized { .. }
        ));
        assert!(matches!(Error::from_status(403, ""), Error::Forbidden { .. }));
        assert!(matches!(Error::from_status(404, ""), Error::NotFound { .. }));
        assert!(matches!(
            Error::from_status(500, ""),
            Error::ServerError { status: 500, .. }
        ));
        assert!(matches!(
            Error::from_status(503, ""),
            Error::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            Error::from_status(418, ""),
            Error::GenericHttp { status: 418, .. }
        ));
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::from_status(500, "").is_retryable());
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(Error::connection_failure("refused").is_retryable());

        assert!(!Error::from_status(400, "").is_retryable());
        assert!(!Error::from_status(404, "").is_retryable());
        assert!(!Error::RateLimited {
            retry_after_seconds: 60,
            request_id: None
        }
        .is_retryable());
    }
}
