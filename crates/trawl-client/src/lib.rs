//! # trawl-client
//!
//! HTTP clients for the two external collaborators of the downloads proxy:
//!
//! - the upstream **record store**, which serves the downloads collection one
//!   page at a time (`GET <base>/downloads?limit=<n>&page=<m>`), and
//! - the **refresh endpoint**, which trades a refresh credential for a new
//!   bearer credential.
//!
//! Both are exposed behind traits ([`RecordStore`], [`SessionRefresher`]) so
//! the proxy core can be exercised against in-memory fakes.
//!
//! ## Example
//!
//! ```no_run
//! use secrecy::SecretString;
//! use trawl_client::{DownloadsClient, PageFetch, RecordStore};
//! use trawl_common::UpstreamConfig;
//!
//! # async fn example() -> Result<(), trawl_client::ClientError> {
//! let config = UpstreamConfig::new(
//!     "https://api.example.com",
//!     "http://localhost:5173/api/refresh",
//! );
//! let client = DownloadsClient::new(&config)?;
//!
//! let token = SecretString::from("bearer-token".to_string());
//! match client.fetch_page(&token, 25, 1).await? {
//!     PageFetch::Page(page) => println!("{} records of {:?}", page.len(), page.total_count),
//!     PageFetch::NoContent { .. } => println!("no more records"),
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use trawl_common::Page;

pub mod downloads;
pub mod error;
pub mod refresh;

pub use downloads::DownloadsClient;
pub use error::ClientError;
pub use refresh::RefreshClient;

/// Outcome of a successful page request.
#[derive(Debug, Clone, PartialEq)]
pub enum PageFetch {
    /// The upstream answered "no content": the collection is exhausted.
    NoContent {
        /// Total-count header, if the upstream sent one anyway.
        total_count: Option<String>,
    },
    /// A decoded page of records.
    Page(Page),
}

/// A paginated source of download records.
///
/// Implementations must be thread-safe (Send + Sync) so a single instance can
/// serve every inbound request.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch one page of records.
    ///
    /// # Arguments
    ///
    /// * `token` - Bearer credential forwarded in the `Authorization` header
    /// * `limit` - Records per page
    /// * `page` - 1-based page number
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [`ClientError::UpstreamStatus`] for any non-success HTTP status
    /// - [`ClientError::DecodeError`] when a success body is not a record array
    /// - [`ClientError::TimeoutError`] / [`ClientError::NetworkError`] for transport failures
    async fn fetch_page(
        &self,
        token: &SecretString,
        limit: u32,
        page: u32,
    ) -> Result<PageFetch, ClientError>;
}

/// Credentials issued by a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshedSession {
    /// The newly issued bearer credential.
    pub access_token: SecretString,
    /// A rotated refresh credential, if the endpoint issued one.
    pub refresh_token: Option<SecretString>,
}

/// The credential refresh collaborator.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    /// Exchange the session's refresh credential for a new bearer credential.
    ///
    /// Performs exactly one call; implementations must not retry.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::RefreshRejected`] when the endpoint declines or
    /// issues no bearer credential, or a transport error.
    async fn refresh(
        &self,
        refresh_token: &SecretString,
        access_token: Option<&SecretString>,
    ) -> Result<RefreshedSession, ClientError>;
}

/// Builds a reqwest client honouring optional timeouts.
pub(crate) fn build_http_client(
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(connect_timeout) = connect_timeout {
        builder = builder.connect_timeout(connect_timeout);
    }
    builder
        .build()
        .map_err(|e| ClientError::ConfigurationError(format!("failed to build HTTP client: {e}")))
}
