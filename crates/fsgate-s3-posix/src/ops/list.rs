//! Listing handlers.
//!
//! Implements `list_objects` (v1) and `list_objects_v2` over the generic
//! walker. An entry is an object iff its `user.etag` attribute exists, so
//! explicit directory-keys list while implicit parent directories stay
//! invisible; the staging subtree is pruned unconditionally.

use std::path::Path;

use anyhow::Context;
use fsgate_s3_model::input::{ListObjectsInput, ListObjectsV2Input};
use fsgate_s3_model::output::{ListObjectsOutput, ListObjectsV2Output};
use fsgate_s3_model::Object;
use tracing::debug;

use crate::backend::PosixBackend;
use crate::error::{is_no_attr, BackendResult};
use crate::meta;
use crate::namespace::STAGING_DIR;
use crate::utils::{decode_continuation_token, encode_continuation_token};
use crate::walk::{self, WalkResults};

/// Default page size when the request does not carry one.
const DEFAULT_MAX_KEYS: i32 = 1000;

/// The effective page size: `None` falls back to the default, negative
/// values are treated as the default, zero stays zero.
fn effective_max_keys(max_keys: Option<i32>) -> usize {
    match max_keys {
        Some(n) if n >= 0 => n as usize,
        _ => DEFAULT_MAX_KEYS as usize,
    }
}

impl PosixBackend {
    /// Run the walker over a bucket with the xattr object predicate.
    fn walk_bucket(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
        marker: &str,
        max_keys: usize,
    ) -> BackendResult<WalkResults> {
        let bucket_path = self.bucket_path(bucket);

        let results = walk::walk(
            &bucket_path,
            prefix,
            delimiter,
            marker,
            max_keys,
            |path: &Path| match xattr::get(path, meta::ETAG_KEY) {
                Ok(found) => Ok(found.is_some()),
                Err(err) if is_no_attr(&err) => Ok(false),
                Err(err) => Err(err),
            },
            |path: &Path| match xattr::get(path, meta::ETAG_KEY) {
                Ok(found) => Ok(found
                    .map(|b| String::from_utf8_lossy(&b).into_owned())
                    .unwrap_or_default()),
                Err(err) if is_no_attr(&err) => Ok(String::new()),
                Err(err) => Err(err),
            },
            &[STAGING_DIR],
        )
        .with_context(|| format!("walk {bucket}"))?;

        Ok(results)
    }

    /// List objects with v1 marker pagination.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket`.
    pub fn list_objects(&self, input: ListObjectsInput) -> BackendResult<ListObjectsOutput> {
        self.stat_bucket(&input.bucket)?;

        let prefix = input.prefix.unwrap_or_default();
        let delimiter = input.delimiter.unwrap_or_default();
        let marker = input.marker.unwrap_or_default();
        let max_keys = effective_max_keys(input.max_keys);

        let results = self.walk_bucket(&input.bucket, &prefix, &delimiter, &marker, max_keys)?;

        debug!(
            bucket = %input.bucket,
            prefix = %prefix,
            count = results.objects.len(),
            is_truncated = results.truncated,
            "list_objects completed"
        );

        Ok(ListObjectsOutput {
            name: input.bucket,
            prefix,
            delimiter,
            marker,
            next_marker: results
                .truncated
                .then_some(results.next_marker.clone()),
            max_keys: max_keys as i32,
            is_truncated: results.truncated,
            contents: to_objects(&results),
            common_prefixes: results.common_prefixes,
        })
    }

    /// List objects with v2 continuation-token pagination.
    ///
    /// The token is the base64-encoded last key of the previous page; when
    /// absent, `start_after` seeds the marker.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket`; `InvalidRequest` for an undecodable token.
    pub fn list_objects_v2(
        &self,
        input: ListObjectsV2Input,
    ) -> BackendResult<ListObjectsV2Output> {
        self.stat_bucket(&input.bucket)?;

        let prefix = input.prefix.unwrap_or_default();
        let delimiter = input.delimiter.unwrap_or_default();
        let max_keys = effective_max_keys(input.max_keys);

        let marker = match &input.continuation_token {
            Some(token) => decode_continuation_token(token)?,
            None => input.start_after.clone().unwrap_or_default(),
        };

        let results = self.walk_bucket(&input.bucket, &prefix, &delimiter, &marker, max_keys)?;

        let contents = to_objects(&results);
        let key_count = (contents.len() + results.common_prefixes.len()) as i32;

        debug!(
            bucket = %input.bucket,
            prefix = %prefix,
            key_count,
            is_truncated = results.truncated,
            "list_objects_v2 completed"
        );

        Ok(ListObjectsV2Output {
            name: input.bucket,
            prefix,
            delimiter,
            continuation_token: input.continuation_token,
            next_continuation_token: results
                .truncated
                .then(|| encode_continuation_token(&results.next_marker)),
            start_after: input.start_after,
            max_keys: max_keys as i32,
            key_count,
            is_truncated: results.truncated,
            contents,
            common_prefixes: results.common_prefixes,
        })
    }
}

/// Convert walker entries into listing records.
fn to_objects(results: &WalkResults) -> Vec<Object> {
    results
        .objects
        .iter()
        .map(|o| Object {
            key: o.key.clone(),
            etag: o.etag.clone(),
            size: o.size,
            last_modified: o.last_modified,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_default_max_keys() {
        assert_eq!(effective_max_keys(None), 1000);
        assert_eq!(effective_max_keys(Some(-5)), 1000);
    }

    #[test]
    fn test_should_keep_explicit_max_keys() {
        assert_eq!(effective_max_keys(Some(0)), 0);
        assert_eq!(effective_max_keys(Some(42)), 42);
    }
}
