//! Bucket ACL handlers.
//!
//! The ACL is an opaque JSON blob in the bucket's `user.acl` attribute;
//! this engine stores and returns it without evaluating the grammar.

use anyhow::Context;
use tracing::debug;

use crate::backend::PosixBackend;
use crate::error::BackendResult;
use crate::meta;

impl PosixBackend {
    /// Read the bucket ACL blob.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BackendError::NoSuchBucket`] for a missing
    /// bucket; a bucket without the attribute yields an empty blob.
    pub fn get_bucket_acl(&self, bucket: &str) -> BackendResult<Vec<u8>> {
        self.stat_bucket(bucket)?;

        let acl = meta::get_attr(&self.bucket_path(bucket), meta::ACL_KEY)
            .with_context(|| format!("get acl of bucket {bucket}"))?
            .unwrap_or_default();
        Ok(acl)
    }

    /// Replace the bucket ACL blob.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BackendError::NoSuchBucket`] for a missing
    /// bucket.
    pub fn put_bucket_acl(&self, bucket: &str, data: &[u8]) -> BackendResult<()> {
        self.stat_bucket(bucket)?;

        meta::set_attr(&self.bucket_path(bucket), meta::ACL_KEY, data)
            .with_context(|| format!("set acl of bucket {bucket}"))?;

        debug!(bucket, len = data.len(), "put_bucket_acl completed");
        Ok(())
    }
}
