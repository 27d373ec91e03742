use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::record::Record;

/// The JSON envelope returned for every listing request.
///
/// Successful responses carry `data`, `totalCount`, `limit` and `page` (plus
/// `query` for searches). Failures carry only `success`, `status` and `error`.
/// `totalCount` is serialized as `null` on success when the upstream did not
/// report one.
///
/// # Examples
///
/// ```
/// use trawl_common::ApiResponse;
///
/// let failure = ApiResponse::failure(401, "Unauthorized");
/// let json = serde_json::to_value(&failure).expect("serializable");
///
/// assert_eq!(json, serde_json::json!({
///     "success": false,
///     "status": 401,
///     "error": "Unauthorized",
/// }));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// HTTP status mirrored into the body.
    pub status: u16,
    /// Records for this response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Record>>,
    /// Upstream total-count signal; `Some(None)` serializes as `null`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub total_count: Option<Option<String>>,
    /// Effective page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Requested page, or the number of internal pages fetched for a search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// The search query echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Human-readable failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    /// Builds a successful pass-through listing response.
    #[must_use]
    pub const fn listing(
        data: Vec<Record>,
        total_count: Option<String>,
        limit: u32,
        page: u32,
    ) -> Self {
        Self {
            success: true,
            status: 200,
            data: Some(data),
            total_count: Some(total_count),
            limit: Some(limit),
            page: Some(page),
            query: None,
            error: None,
        }
    }

    /// Builds a successful search response.
    #[must_use]
    pub fn search(
        data: Vec<Record>,
        total_count: Option<String>,
        limit: u32,
        pages_fetched: u32,
        query: impl Into<String>,
    ) -> Self {
        Self {
            query: Some(query.into()),
            page: Some(pages_fetched),
            ..Self::listing(data, total_count, limit, pages_fetched)
        }
    }

    /// Builds a failure response.
    #[must_use]
    pub fn failure(status: u16, error: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            data: None,
            total_count: None,
            limit: None,
            page: None,
            query: None,
            error: Some(error.into()),
        }
    }

    /// Returns the number of records carried, zero for failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    /// Returns `true` when no records are carried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for ApiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{json}"),
            Err(_) => write!(f, "Error serializing ApiResponse to JSON"),
        }
    }
}

// Distinguishes an explicit `null` from an absent field.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
