//! # trawl
//!
//! A downloads listing proxy with full-corpus fuzzy search.
//!
//! The upstream record store only serves its collection one page at a time
//! and cannot search. `trawl` sits in front of it and:
//!
//! - guards every request with the session's credentials, refreshing the
//!   bearer credential at most once ([`CredentialGuard`])
//! - passes plain listing requests through as a single page fetch
//! - answers search requests by walking every upstream page, aggregating the
//!   records in memory and ranking them with a fuzzy matcher ([`SearchProxy`])
//!
//! [`DownloadsService`] ties these together in the order the endpoint
//! requires; the `trawl-daemon` crate exposes it over HTTP.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use trawl::{DownloadsService, Session};
//! use trawl_client::{DownloadsClient, RefreshClient};
//! use trawl_common::{ListingParams, SearchConfig, UpstreamConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let upstream = UpstreamConfig::new(
//!     "https://api.example.com",
//!     "http://localhost:5173/api/refresh",
//! );
//! let service = DownloadsService::new(
//!     Arc::new(DownloadsClient::new(&upstream)?),
//!     Arc::new(RefreshClient::new(&upstream)?),
//!     SearchConfig::default(),
//! );
//!
//! let mut session = Session::from_cookie_header(Some("accessToken=a; refreshToken=r"));
//! let params = ListingParams {
//!     query: Some("the show".to_string()),
//!     ..ListingParams::default()
//! };
//!
//! let response = service.handle(&mut session, &params).await?;
//! println!("{response}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod matcher;
pub mod proxy;
pub mod service;
pub mod session;

pub use error::{ProxyError, UNAUTHORIZED_MESSAGE};
pub use matcher::{FuzzyMatcher, ScoredMatch};
pub use proxy::{Listing, ListingRequest, ProxyResponse, SearchProxy, SearchResultSet};
pub use service::DownloadsService;
pub use session::{CredentialGuard, Session};
