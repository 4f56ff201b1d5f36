//! Listing operation inputs.

/// Input for `ListObjects` (v1, marker-paginated).
#[derive(Debug, Clone, Default)]
pub struct ListObjectsInput {
    /// Target bucket.
    pub bucket: String,
    /// Only keys starting with this prefix are returned.
    pub prefix: Option<String>,
    /// Keys beyond the prefix are grouped at the first occurrence of this
    /// delimiter into `common_prefixes`.
    pub delimiter: Option<String>,
    /// Results begin strictly after this key.
    pub marker: Option<String>,
    /// Maximum number of keys plus common prefixes to return.
    /// `None` defaults to 1000; `Some(0)` returns an empty page.
    pub max_keys: Option<i32>,
}

/// Input for `ListObjectsV2` (continuation-token-paginated).
#[derive(Debug, Clone, Default)]
pub struct ListObjectsV2Input {
    /// Target bucket.
    pub bucket: String,
    /// Only keys starting with this prefix are returned.
    pub prefix: Option<String>,
    /// Keys beyond the prefix are grouped at the first occurrence of this
    /// delimiter into `common_prefixes`.
    pub delimiter: Option<String>,
    /// Opaque token from a previous page's `next_continuation_token`.
    pub continuation_token: Option<String>,
    /// Start listing after this key; ignored when a token is present.
    pub start_after: Option<String>,
    /// Maximum number of keys plus common prefixes to return.
    /// `None` defaults to 1000; `Some(0)` returns an empty page.
    pub max_keys: Option<i32>,
}
