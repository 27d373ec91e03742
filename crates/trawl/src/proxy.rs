//! The aggregating search proxy.
//!
//! Without a query a request is a single pass-through page fetch. With a
//! query the proxy walks every page of the upstream collection, concatenates
//! the records into an in-memory aggregate and ranks the aggregate locally
//! with the [`FuzzyMatcher`].
//!
//! # Termination
//!
//! A search walk ends normally when the upstream answers "no content", sends
//! an empty page, the configured record cap is reached, or (under
//! [`DecodeFailurePolicy::Exhaust`]) a page after the first cannot be decoded.
//! Any other failure aborts the walk and discards everything collected.

use std::sync::Arc;

use log::{debug, error, info, warn};
use secrecy::SecretString;

use trawl_client::{ClientError, PageFetch, RecordStore};
use trawl_common::{
    ApiResponse, DecodeFailurePolicy, ListingParams, MAX_LIMIT, Record, SearchConfig,
};

use crate::error::ProxyError;
use crate::matcher::FuzzyMatcher;

/// A validated listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    query: Option<String>,
    limit: u32,
    page: u32,
}

impl ListingRequest {
    /// Validates raw listing parameters.
    ///
    /// An empty query is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Validation`] if `limit` is outside `1..=2500` or
    /// `page` is less than 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use trawl::ListingRequest;
    ///
    /// let request = ListingRequest::new(Some("show"), 25, 2).unwrap();
    /// assert_eq!(request.query(), Some("show"));
    ///
    /// let err = ListingRequest::new(None, 0, 1).unwrap_err();
    /// assert_eq!(err.to_string(), "Bad Request. Limit must be between 1 and 2500");
    /// ```
    pub fn new(query: Option<&str>, limit: i64, page: i64) -> Result<Self, ProxyError> {
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ProxyError::Validation(format!(
                "Bad Request. Limit must be between 1 and {MAX_LIMIT}"
            )));
        }

        if page < 1 {
            return Err(ProxyError::Validation(
                "Bad Request. Page must be greater than 0".to_string(),
            ));
        }

        let limit = u32::try_from(limit)
            .map_err(|_| ProxyError::Validation(format!("Bad Request. Invalid limit {limit}")))?;
        let page = u32::try_from(page)
            .map_err(|_| ProxyError::Validation(format!("Bad Request. Invalid page {page}")))?;

        Ok(Self {
            query: query.filter(|q| !q.is_empty()).map(str::to_string),
            limit,
            page,
        })
    }

    /// Validates parameters exactly as they arrived on the query string.
    ///
    /// # Errors
    ///
    /// See [`ListingRequest::new`].
    pub fn from_params(params: &ListingParams) -> Result<Self, ProxyError> {
        Self::new(params.search_query(), params.limit(), params.page())
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }
}

/// One upstream page passed through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub data: Vec<Record>,
    pub total_count: Option<String>,
    pub limit: u32,
    pub page: u32,
}

/// Ranked matches from a full-corpus walk.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResultSet {
    /// Matching records, best first.
    pub data: Vec<Record>,
    /// Total-count header of the last decoded page.
    pub total_count: Option<String>,
    /// Internal page size used for the walk.
    pub page_size: u32,
    /// Upstream calls made, the terminating call included.
    pub pages_fetched: u32,
    pub query: String,
}

/// Successful outcome of [`SearchProxy::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyResponse {
    Listing(Listing),
    Search(SearchResultSet),
}

impl From<ProxyResponse> for ApiResponse {
    fn from(response: ProxyResponse) -> Self {
        match response {
            ProxyResponse::Listing(listing) => Self::listing(
                listing.data,
                listing.total_count,
                listing.limit,
                listing.page,
            ),
            ProxyResponse::Search(result) => Self::search(
                result.data,
                result.total_count,
                result.page_size,
                result.pages_fetched,
                result.query,
            ),
        }
    }
}

/// Records accumulated by a search walk before matching.
#[derive(Debug, Default)]
struct Aggregate {
    records: Vec<Record>,
    total_count: Option<String>,
    pages_fetched: u32,
}

/// Serves listing and search requests against a paginated [`RecordStore`].
pub struct SearchProxy<S: RecordStore> {
    store: Arc<S>,
    config: SearchConfig,
    matcher: FuzzyMatcher,
}

impl<S: RecordStore> SearchProxy<S> {
    #[must_use]
    pub fn new(store: Arc<S>, config: SearchConfig) -> Self {
        let matcher = FuzzyMatcher::from_config(&config);
        Self {
            store,
            config,
            matcher,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Serves a validated request with an established bearer credential.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Upstream`] when the record store rejects any
    /// call, [`ProxyError::Timeout`] when a call or the whole walk runs out
    /// of time, and [`ProxyError::Internal`] for transport or decode failures.
    pub async fn handle(
        &self,
        request: &ListingRequest,
        token: &SecretString,
    ) -> Result<ProxyResponse, ProxyError> {
        match request.query() {
            None => self
                .list_page(token, request.limit(), request.page())
                .await
                .map(ProxyResponse::Listing),
            Some(query) => self.search(query, token).await.map(ProxyResponse::Search),
        }
    }

    /// Fetches exactly one upstream page.
    ///
    /// # Errors
    ///
    /// Any record-store failure, see [`SearchProxy::handle`].
    pub async fn list_page(
        &self,
        token: &SecretString,
        limit: u32,
        page: u32,
    ) -> Result<Listing, ProxyError> {
        let (data, total_count) = match self.store.fetch_page(token, limit, page).await? {
            PageFetch::NoContent { total_count } => (Vec::new(), total_count),
            PageFetch::Page(fetched) => (fetched.records, fetched.total_count),
        };

        Ok(Listing {
            data,
            total_count,
            limit,
            page,
        })
    }

    /// Walks the whole collection and ranks it against `query`.
    ///
    /// # Errors
    ///
    /// See [`SearchProxy::handle`]. Partial aggregates are never returned on
    /// error.
    pub async fn search(
        &self,
        query: &str,
        token: &SecretString,
    ) -> Result<SearchResultSet, ProxyError> {
        let walk = self.aggregate(token);

        let aggregate = match self.config.deadline() {
            Some(deadline) => tokio::time::timeout(deadline, walk).await.map_err(|_| {
                warn!("Search walk exceeded its {}s deadline", deadline.as_secs());
                ProxyError::Timeout(format!(
                    "Search did not complete within {}s",
                    deadline.as_secs()
                ))
            })??,
            None => walk.await?,
        };

        let scanned = aggregate.records.len();
        let data = self.matcher.rank(query, aggregate.records);

        info!(
            "Search matched {} of {scanned} records across {} pages",
            data.len(),
            aggregate.pages_fetched
        );

        Ok(SearchResultSet {
            data,
            total_count: aggregate.total_count,
            page_size: self.config.page_size,
            pages_fetched: aggregate.pages_fetched,
            query: query.to_string(),
        })
    }

    async fn aggregate(&self, token: &SecretString) -> Result<Aggregate, ProxyError> {
        let page_size = self.config.page_size;
        let cap = self.config.record_cap();
        let mut aggregate = Aggregate::default();
        let mut page: u32 = 1;

        loop {
            debug!("Querying page {page}");
            aggregate.pages_fetched = page;

            match self.store.fetch_page(token, page_size, page).await {
                Ok(PageFetch::NoContent { .. }) => {
                    debug!("No more data to query after page {}", page - 1);
                    break;
                }
                Ok(PageFetch::Page(fetched)) if fetched.is_empty() => {
                    debug!("Page {page} was empty, no more data to query");
                    break;
                }
                Ok(PageFetch::Page(fetched)) => {
                    aggregate.total_count = fetched.total_count;
                    aggregate.records.extend(fetched.records);

                    if let Some(cap) = cap.filter(|cap| aggregate.records.len() >= *cap) {
                        warn!(
                            "Search aggregate reached {cap} records at page {page}, stopping walk"
                        );
                        aggregate.records.truncate(cap);
                        break;
                    }
                }
                Err(ClientError::DecodeError(message))
                    if page > 1 && self.config.decode_failure == DecodeFailurePolicy::Exhaust =>
                {
                    warn!("Treating undecodable page {page} as end of data: {message}");
                    break;
                }
                Err(e) => {
                    error!("Search walk aborted at page {page}: {e}");
                    return Err(e.into());
                }
            }

            page = page
                .checked_add(1)
                .ok_or_else(|| ProxyError::Internal("Search page counter overflowed".to_string()))?;
        }

        Ok(aggregate)
    }
}
