//! Object operation inputs.

use std::collections::HashMap;

/// Input for `PutObject`.
///
/// The object body travels as a separate reader argument so the record
/// itself stays plain data. A key ending in `/` creates a directory-key.
#[derive(Debug, Clone, Default)]
pub struct PutObjectInput {
    /// Target bucket.
    pub bucket: String,
    /// Object key; path components become directory components.
    pub key: String,
    /// Declared body length in bytes, used as a preallocation hint.
    pub content_length: u64,
    /// `Content-Type` to store with the object.
    pub content_type: Option<String>,
    /// `Content-Encoding` to store with the object.
    pub content_encoding: Option<String>,
    /// User metadata, stored verbatim as `user.<key>` attributes
    /// (`X-Amz-Meta-*` and `Expires` keys are surfaced on reads).
    pub metadata: HashMap<String, String>,
}

/// Input for `GetObject`.
#[derive(Debug, Clone, Default)]
pub struct GetObjectInput {
    /// Source bucket.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Optional HTTP-style range expression (`bytes=0-499`).
    pub range: Option<String>,
}

/// Input for `CopyObject`.
#[derive(Debug, Clone, Default)]
pub struct CopyObjectInput {
    /// Source bucket.
    pub src_bucket: String,
    /// Source key.
    pub src_key: String,
    /// Destination bucket.
    pub dst_bucket: String,
    /// Destination key.
    pub dst_key: String,
}
