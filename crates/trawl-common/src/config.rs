use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::request::MAX_LIMIT;

/// Default header carrying the upstream's total record count.
pub const DEFAULT_TOTAL_COUNT_HEADER: &str = "X-Total-Count";

/// Default page size for full-corpus search walks.
pub const DEFAULT_SEARCH_PAGE_SIZE: u32 = 2500;

const fn default_timeout_seconds() -> u64 {
    30
}

const fn default_connect_timeout_seconds() -> u64 {
    10
}

fn default_total_count_header() -> String {
    DEFAULT_TOTAL_COUNT_HEADER.to_string()
}

/// Connection details for the upstream record store and the refresh collaborator.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use trawl_common::UpstreamConfig;
///
/// let config = UpstreamConfig::new("https://api.example.com", "http://localhost:5173/api/refresh")
///     .with_timeout_seconds(5);
///
/// assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
/// assert_eq!(config.total_count_header, "X-Total-Count");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the record store; `/downloads` is appended.
    pub base_url: String,
    /// Absolute URL of the credential refresh endpoint.
    pub refresh_url: String,
    /// Response header carrying the total record count.
    #[serde(default = "default_total_count_header")]
    pub total_count_header: String,
    /// Per-call timeout in seconds; `0` disables it.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Connection timeout in seconds; `0` disables it.
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
}

impl UpstreamConfig {
    /// Creates a configuration with default header name and timeouts.
    #[must_use]
    pub fn new(base_url: impl Into<String>, refresh_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_url: refresh_url.into(),
            total_count_header: default_total_count_header(),
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
        }
    }

    /// Sets the per-call timeout in seconds.
    #[must_use]
    pub const fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Sets the connection timeout in seconds.
    #[must_use]
    pub const fn with_connect_timeout_seconds(mut self, connect_timeout_seconds: u64) -> Self {
        self.connect_timeout_seconds = connect_timeout_seconds;
        self
    }

    /// Sets the total-count header name.
    #[must_use]
    pub fn with_total_count_header(mut self, header: impl Into<String>) -> Self {
        self.total_count_header = header.into();
        self
    }

    /// Returns the per-call timeout, if enabled.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        seconds(self.timeout_seconds)
    }

    /// Returns the connection timeout, if enabled.
    #[must_use]
    pub const fn connect_timeout(&self) -> Option<Duration> {
        seconds(self.connect_timeout_seconds)
    }

    /// Validates URLs and the header name.
    ///
    /// # Errors
    ///
    /// Returns an error if either URL is not an absolute `http(s)` URL or the
    /// header name is empty.
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_http_url("upstream.base_url", &self.base_url)?;
        validate_http_url("upstream.refresh_url", &self.refresh_url)?;

        if self.total_count_header.trim().is_empty() {
            anyhow::bail!("upstream.total_count_header must not be empty");
        }

        Ok(())
    }
}

/// What to do when a page after the first fails to decode during a search walk.
///
/// A decode failure on the very first page is always an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DecodeFailurePolicy {
    /// Treat the malformed page as end-of-stream and rank what was collected.
    #[default]
    Exhaust,
    /// Fail the whole search.
    Fail,
}

/// Tuning for the full-corpus search walk and the fuzzy matcher.
///
/// # Examples
///
/// ```
/// use trawl_common::{DecodeFailurePolicy, SearchConfig};
///
/// let config = SearchConfig::builder()
///     .page_size(500)
///     .max_records(10_000)
///     .decode_failure(DecodeFailurePolicy::Fail)
///     .build();
///
/// assert_eq!(config.record_cap(), Some(10_000));
/// assert_eq!(config.keys, vec!["id".to_string(), "filename".to_string()]);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct SearchConfig {
    /// Records requested per upstream call.
    #[builder(default = DEFAULT_SEARCH_PAGE_SIZE)]
    pub page_size: u32,
    /// Hard cap on aggregated records; `0` means unbounded.
    #[builder(default)]
    pub max_records: usize,
    /// Deadline for a whole search walk in seconds; `0` means none.
    #[builder(default)]
    pub deadline_seconds: u64,
    /// Handling of undecodable trailing pages.
    #[builder(default)]
    pub decode_failure: DecodeFailurePolicy,
    /// Record fields matched against the query.
    #[builder(default = default_keys())]
    pub keys: Vec<String>,
    /// Matches scoring below this are dropped; `0` keeps every match.
    #[builder(default)]
    pub min_score: u32,
}

fn default_keys() -> Vec<String> {
    vec!["id".to_string(), "filename".to_string()]
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SearchConfig {
    /// Returns the aggregate cap, if any.
    #[must_use]
    pub const fn record_cap(&self) -> Option<usize> {
        if self.max_records == 0 {
            None
        } else {
            Some(self.max_records)
        }
    }

    /// Returns the whole-walk deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Duration> {
        seconds(self.deadline_seconds)
    }

    /// Validates the page size and key set.
    ///
    /// # Errors
    ///
    /// Returns an error if `page_size` is outside `1..=2500` or no keys are set.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_LIMIT).contains(&i64::from(self.page_size)) {
            anyhow::bail!(
                "search.page_size must be between 1 and {MAX_LIMIT}, got {}",
                self.page_size
            );
        }

        if self.keys.iter().all(|k| k.trim().is_empty()) {
            anyhow::bail!("search.keys must name at least one record field");
        }

        Ok(())
    }
}

const fn seconds(value: u64) -> Option<Duration> {
    if value == 0 {
        None
    } else {
        Some(Duration::from_secs(value))
    }
}

fn validate_http_url(name: &str, value: &str) -> anyhow::Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| anyhow::anyhow!("{name} is not a valid URL '{value}': {e}"))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("{name} must use http or https, got '{}'", parsed.scheme());
    }

    Ok(())
}
