use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Page size used when the client does not supply a usable `limit`.
pub const DEFAULT_LIMIT: i64 = 10;

/// Page number used when the client does not supply a usable `page`.
pub const DEFAULT_PAGE: i64 = 1;

/// Largest page size accepted by the upstream record store.
pub const MAX_LIMIT: i64 = 2500;

/// Listing parameters exactly as they arrive on the query string.
///
/// Values are kept as strings so that non-numeric input can fall back to the
/// defaults instead of rejecting the request outright. Numeric values, even
/// zero or negative ones, are passed through for range validation.
///
/// # Examples
///
/// ```
/// use trawl_common::ListingParams;
///
/// let params = ListingParams {
///     limit: Some("abc".to_string()),
///     page: Some("-3".to_string()),
///     query: Some(String::new()),
/// };
///
/// assert_eq!(params.limit(), 10);
/// assert_eq!(params.page(), -3);
/// assert_eq!(params.search_query(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingParams {
    /// Requested page size.
    pub limit: Option<String>,
    /// Requested page number, starting at 1.
    pub page: Option<String>,
    /// Search query; presence selects the aggregated search path.
    pub query: Option<String>,
}

impl ListingParams {
    /// Parses listing parameters from a raw query string.
    ///
    /// Parsing never fails. When a parameter repeats, its first value is
    /// used; unknown parameters are ignored.
    ///
    /// ```
    /// use trawl_common::ListingParams;
    ///
    /// let params = ListingParams::from_query(Some("limit=5&limit=6&query=the+show"));
    ///
    /// assert_eq!(params.limit(), 5);
    /// assert_eq!(params.search_query(), Some("the show"));
    /// ```
    #[must_use]
    pub fn from_query(raw: Option<&str>) -> Self {
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            let slot = match key.as_ref() {
                "limit" => &mut params.limit,
                "page" => &mut params.page,
                "query" => &mut params.query,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    /// Returns the requested limit, or [`DEFAULT_LIMIT`] when absent or non-numeric.
    #[must_use]
    pub fn limit(&self) -> i64 {
        parse_or(self.limit.as_deref(), DEFAULT_LIMIT)
    }

    /// Returns the requested page, or [`DEFAULT_PAGE`] when absent or non-numeric.
    #[must_use]
    pub fn page(&self) -> i64 {
        parse_or(self.page.as_deref(), DEFAULT_PAGE)
    }

    /// Returns the search query, treating an empty string as absent.
    #[must_use]
    pub fn search_query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.is_empty())
    }
}

fn parse_or(value: Option<&str>, default: i64) -> i64 {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(limit: Option<&str>, page: Option<&str>, query: Option<&str>) -> ListingParams {
        ListingParams {
            limit: limit.map(String::from),
            page: page.map(String::from),
            query: query.map(String::from),
        }
    }

    #[test]
    fn test_defaults_when_absent() {
        let p = params(None, None, None);
        assert_eq!(p.limit(), DEFAULT_LIMIT);
        assert_eq!(p.page(), DEFAULT_PAGE);
        assert_eq!(p.search_query(), None);
    }

    #[test]
    fn test_defaults_when_not_numeric() {
        let p = params(Some("ten"), Some("1.5"), None);
        assert_eq!(p.limit(), DEFAULT_LIMIT);
        assert_eq!(p.page(), DEFAULT_PAGE);
    }

    #[test]
    fn test_numeric_values_pass_through_for_validation() {
        let p = params(Some("0"), Some("-1"), None);
        assert_eq!(p.limit(), 0);
        assert_eq!(p.page(), -1);

        let p = params(Some(" 2501 "), Some("7"), None);
        assert_eq!(p.limit(), 2501);
        assert_eq!(p.page(), 7);
    }

    #[test]
    fn test_from_query_first_value_wins() {
        let p = ListingParams::from_query(Some("limit=5&limit=6&page=2&page=x&query=a&query=b"));
        assert_eq!(p, params(Some("5"), Some("2"), Some("a")));
    }

    #[test]
    fn test_from_query_decodes_and_ignores_unknown() {
        let p = ListingParams::from_query(Some("query=the%20show+s01e01&sort=asc&limit"));
        assert_eq!(p.search_query(), Some("the show s01e01"));
        assert_eq!(p.limit.as_deref(), Some(""));
        assert_eq!(p.limit(), DEFAULT_LIMIT);

        assert_eq!(ListingParams::from_query(None), ListingParams::default());
        assert_eq!(ListingParams::from_query(Some("")), ListingParams::default());
    }

    #[test]
    fn test_search_query() {
        assert_eq!(params(None, None, Some("")).search_query(), None);
        assert_eq!(
            params(None, None, Some("show s01e01")).search_query(),
            Some("show s01e01")
        );
    }
}
