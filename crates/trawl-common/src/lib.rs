//! # trawl-common
//!
//! Common types shared by the trawl downloads proxy crates.
//!
//! This crate provides the foundational types for proxying an upstream
//! downloads collection:
//! - Opaque download [`Record`]s and the [`Page`]s they arrive in
//! - The JSON [`ApiResponse`] envelope returned to clients
//! - Raw listing parameters as they arrive on the query string
//! - Upstream and search configuration
//! - Cookie helpers for the session credentials
//!
//! ## Example
//!
//! ```
//! use trawl_common::{ApiResponse, Record};
//!
//! let record: Record = serde_json::from_value(serde_json::json!({
//!     "id": 7,
//!     "filename": "The.Show.S01E01.mkv",
//! }))
//! .unwrap();
//!
//! assert_eq!(record.field_text("filename").as_deref(), Some("The.Show.S01E01.mkv"));
//! assert_eq!(record.field_text("id").as_deref(), Some("7"));
//!
//! let response = ApiResponse::listing(vec![record], Some("1".to_string()), 10, 1);
//! assert!(response.success);
//! ```

/// Upstream and search configuration types.
pub mod config;
/// Session cookie parsing and formatting.
pub mod cookie;
/// Opaque download records and upstream pages.
pub mod record;
/// Inbound listing parameters.
pub mod request;
/// The JSON envelope returned to clients.
pub mod response;

pub use config::{DecodeFailurePolicy, SearchConfig, UpstreamConfig};
pub use record::{Page, Record};
pub use request::{DEFAULT_LIMIT, DEFAULT_PAGE, ListingParams, MAX_LIMIT};
pub use response::ApiResponse;
