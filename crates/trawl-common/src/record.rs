use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single download as served by the upstream record store.
///
/// Records are treated as opaque JSON objects: every field is round-tripped
/// unchanged from upstream to client. Only the fields named by the search
/// configuration (by default `id` and `filename`) are ever read, and only for
/// matching.
///
/// # Examples
///
/// ```
/// use trawl_common::Record;
///
/// let record: Record = serde_json::from_str(r#"{"id": 1, "filename": "a.mkv", "size": 10}"#)
///     .expect("valid record");
///
/// assert_eq!(record.field_text("filename").as_deref(), Some("a.mkv"));
/// assert!(record.get("size").is_some());
/// assert!(record.field_text("missing").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Creates a record from a JSON object map.
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Returns the raw value of a field, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the textual form of a field for matching.
    ///
    /// Strings are returned as-is, numbers and booleans by their JSON text.
    /// Nulls, arrays, objects and missing fields yield `None`.
    #[must_use]
    pub fn field_text(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.0.get(key)? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Borrows all fields of the record.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the record, returning its fields.
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// One page of records as returned by a single upstream call.
///
/// Pages are short-lived: the search path concatenates their records into an
/// aggregate and discards the page itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Records in upstream order.
    pub records: Vec<Record>,
    /// The upstream's total-count header, verbatim.
    pub total_count: Option<String>,
}

impl Page {
    /// Creates a page from records and an optional total-count signal.
    #[must_use]
    pub const fn new(records: Vec<Record>, total_count: Option<String>) -> Self {
        Self {
            records,
            total_count,
        }
    }

    /// Returns the number of records on the page.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when the page carries no records.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
