//! Error types for the trawl daemon.

use thiserror::Error;

use trawl_client::ClientError;

/// Errors that can occur while starting or running the daemon.
///
/// Per-request failures never surface here; they are answered as JSON
/// envelopes by the server.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// I/O error (config file, socket binding, signal registration).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An upstream client could not be constructed.
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}

/// Result type alias using `DaemonError`.
pub type Result<T> = std::result::Result<T, DaemonError>;

/// Validation failures from the shared configuration types.
impl From<anyhow::Error> for DaemonError {
    fn from(err: anyhow::Error) -> Self {
        Self::Config(err.to_string())
    }
}
