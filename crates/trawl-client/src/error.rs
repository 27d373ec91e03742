//! Error types for the client library.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the record store or the refresh endpoint.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Network or HTTP transport failure.
    ///
    /// DNS resolution, connection refused, reset sockets and body read failures.
    #[error("Network error: {0}")]
    NetworkError(#[source] reqwest::Error),

    /// The call exceeded the configured timeout.
    #[error("Timeout error: {0}")]
    TimeoutError(String),

    /// The upstream answered with a non-success HTTP status.
    ///
    /// `status_text` is the status line's reason phrase.
    #[error("Upstream returned {status} {status_text}")]
    UpstreamStatus {
        /// HTTP status code returned by the upstream.
        status: u16,
        /// Reason phrase for the status.
        status_text: String,
    },

    /// A success response whose body is not a JSON array of records.
    #[error("Failed to decode page: {0}")]
    DecodeError(String),

    /// The refresh endpoint declined to issue a new bearer credential.
    #[error("Refresh rejected: {0}")]
    RefreshRejected(String),

    /// Invalid base URL or HTTP client settings.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl ClientError {
    /// Builds an [`UpstreamStatus`](Self::UpstreamStatus) from a status code
    /// and the reason phrase the upstream sent, if any.
    ///
    /// Without a reason phrase the canonical one for `status` is used.
    #[must_use]
    pub fn upstream(status: StatusCode, reason: Option<&str>) -> Self {
        Self::UpstreamStatus {
            status: status.as_u16(),
            status_text: reason
                .or_else(|| status.canonical_reason())
                .unwrap_or("Unknown Status")
                .to_string(),
        }
    }

    /// Check if this is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimeoutError(_))
    }

    /// Check if the upstream rejected the request with an HTTP status.
    #[must_use]
    pub const fn is_upstream_status(&self) -> bool {
        matches!(self, Self::UpstreamStatus { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimeoutError(err.to_string())
        } else {
            Self::NetworkError(err)
        }
    }
}
