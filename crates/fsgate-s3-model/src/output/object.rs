//! Object operation outputs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Output of `GetObject`. The body is streamed to the caller's writer.
#[derive(Debug, Clone)]
pub struct GetObjectOutput {
    /// The range expression that was applied, if any.
    pub accept_ranges: Option<String>,
    /// Number of body bytes written.
    pub content_length: u64,
    /// Stored content type; empty if none was set.
    pub content_type: String,
    /// Stored content encoding; empty if none was set.
    pub content_encoding: String,
    /// Stored ETag; empty if the attribute is missing.
    pub etag: String,
    /// File mtime.
    pub last_modified: DateTime<Utc>,
    /// User metadata (`X-Amz-Meta-*`, `Expires`, content headers).
    pub metadata: HashMap<String, String>,
    /// Number of tags on the object.
    pub tag_count: usize,
}

/// Output of `HeadObject`.
#[derive(Debug, Clone)]
pub struct HeadObjectOutput {
    /// Full object size in bytes.
    pub content_length: u64,
    /// Stored content type; empty if none was set.
    pub content_type: String,
    /// Stored content encoding; empty if none was set.
    pub content_encoding: String,
    /// Stored ETag; empty if the attribute is missing.
    pub etag: String,
    /// File mtime.
    pub last_modified: DateTime<Utc>,
    /// User metadata (`X-Amz-Meta-*`, `Expires`, content headers).
    pub metadata: HashMap<String, String>,
}

/// Output of `CopyObject`.
#[derive(Debug, Clone)]
pub struct CopyObjectOutput {
    /// ETag of the destination object.
    pub etag: String,
    /// Destination file mtime.
    pub last_modified: DateTime<Utc>,
}
