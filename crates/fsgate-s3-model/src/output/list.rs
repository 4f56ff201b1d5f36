//! Listing operation outputs.

use crate::types::Object;

/// Output of `ListObjects` (v1).
#[derive(Debug, Clone, Default)]
pub struct ListObjectsOutput {
    /// The bucket that was listed.
    pub name: String,
    /// Echo of the request prefix.
    pub prefix: String,
    /// Echo of the request delimiter.
    pub delimiter: String,
    /// Echo of the request marker.
    pub marker: String,
    /// Marker for the next page; set when truncated.
    pub next_marker: Option<String>,
    /// Echo of the effective page size.
    pub max_keys: i32,
    /// Whether more results remain.
    pub is_truncated: bool,
    /// Object entries, lexicographically ordered by key.
    pub contents: Vec<Object>,
    /// Collapsed key groups when a delimiter was given.
    pub common_prefixes: Vec<String>,
}

/// Output of `ListObjectsV2`.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsV2Output {
    /// The bucket that was listed.
    pub name: String,
    /// Echo of the request prefix.
    pub prefix: String,
    /// Echo of the request delimiter.
    pub delimiter: String,
    /// Echo of the request continuation token.
    pub continuation_token: Option<String>,
    /// Token for the next page; set when truncated.
    pub next_continuation_token: Option<String>,
    /// Echo of the request start-after key.
    pub start_after: Option<String>,
    /// Echo of the effective page size.
    pub max_keys: i32,
    /// Number of keys plus common prefixes returned.
    pub key_count: i32,
    /// Whether more results remain.
    pub is_truncated: bool,
    /// Object entries, lexicographically ordered by key.
    pub contents: Vec<Object>,
    /// Collapsed key groups when a delimiter was given.
    pub common_prefixes: Vec<String>,
}
