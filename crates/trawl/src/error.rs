use thiserror::Error;

use trawl_client::ClientError;

/// Message returned whenever no usable credential can be established.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized. No access token or refresh token.";

/// Errors surfaced by the downloads proxy.
///
/// Each variant maps to a distinct HTTP status (see [`ProxyError::status`]);
/// the `Display` text is the message returned to the client.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    /// Client-supplied parameters out of range. Never reaches the network.
    #[error("{0}")]
    Validation(String),

    /// No usable credential: refresh credential missing or refresh rejected.
    #[error("{0}")]
    Unauthorized(String),

    /// The record store answered with a non-success status, mirrored verbatim.
    #[error("{status_text}")]
    Upstream { status: u16, status_text: String },

    /// An upstream call or the whole search walk exceeded its deadline.
    #[error("{0}")]
    Timeout(String),

    /// Transport failures, undecodable first pages and other unexpected errors.
    #[error("{0}")]
    Internal(String),
}

impl ProxyError {
    /// The default authentication failure.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::Unauthorized(UNAUTHORIZED_MESSAGE.to_string())
    }

    /// HTTP status code for this error.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Upstream { status, .. } => *status,
            Self::Timeout(_) => 504,
            Self::Internal(_) => 500,
        }
    }
}

impl From<ClientError> for ProxyError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::UpstreamStatus {
                status,
                status_text,
            } => Self::Upstream {
                status,
                status_text,
            },
            ClientError::TimeoutError(message) => {
                Self::Timeout(format!("Upstream timed out: {message}"))
            }
            ClientError::RefreshRejected(_) => Self::unauthorized(),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses() {
        assert_eq!(ProxyError::Validation("x".into()).status(), 400);
        assert_eq!(ProxyError::unauthorized().status(), 401);
        assert_eq!(
            ProxyError::Upstream {
                status: 503,
                status_text: "Service Unavailable".into()
            }
            .status(),
            503
        );
        assert_eq!(ProxyError::Timeout("x".into()).status(), 504);
        assert_eq!(ProxyError::Internal("x".into()).status(), 500);
    }

    #[test]
    fn test_upstream_status_is_mirrored() {
        let err: ProxyError = ClientError::UpstreamStatus {
            status: 418,
            status_text: "I'm a teapot".into(),
        }
        .into();

        assert_eq!(err.status(), 418);
        assert_eq!(err.to_string(), "I'm a teapot");
    }

    #[test]
    fn test_client_error_mapping() {
        let decode: ProxyError = ClientError::DecodeError("bad".into()).into();
        assert!(matches!(decode, ProxyError::Internal(_)));

        let timeout: ProxyError = ClientError::TimeoutError("slow".into()).into();
        assert_eq!(timeout.status(), 504);

        let rejected: ProxyError = ClientError::RefreshRejected("no".into()).into();
        assert_eq!(rejected.to_string(), UNAUTHORIZED_MESSAGE);
    }
}
