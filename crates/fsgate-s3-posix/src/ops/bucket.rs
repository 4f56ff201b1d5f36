//! Bucket operation handlers.
//!
//! Implements `list_buckets`, `head_bucket`, `create_bucket`, and
//! `delete_bucket`. A bucket is a directory immediately under the engine
//! root; its creation date is the directory mtime and its ACL lives in the
//! `user.acl` attribute.

use std::fs;
use std::os::unix::fs::DirBuilderExt;

use anyhow::Context;
use fsgate_s3_model::Bucket;
use tracing::debug;

use crate::backend::PosixBackend;
use crate::error::{is_not_empty, is_not_found, BackendError, BackendResult};
use crate::meta::{self, Acl};
use crate::namespace::STAGING_DIR;
use crate::utils::mtime_datetime;

/// Mode for bucket directories.
const BUCKET_MODE: u32 = 0o777;

impl PosixBackend {
    /// List all buckets, sorted by name.
    ///
    /// Non-directory entries under the root and entries whose metadata
    /// cannot be read are skipped.
    ///
    /// # Errors
    ///
    /// Propagates root read errors.
    pub fn list_buckets(&self) -> BackendResult<Vec<Bucket>> {
        let entries = fs::read_dir(self.root()).context("readdir buckets")?;

        let mut buckets = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else {
                continue;
            };
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if !meta.is_dir() {
                // Buckets must be directories.
                continue;
            }

            buckets.push(Bucket {
                name,
                creation_date: mtime_datetime(meta.modified()),
            });
        }

        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(buckets)
    }

    /// Verify a bucket exists.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NoSuchBucket`] when it does not.
    pub fn head_bucket(&self, bucket: &str) -> BackendResult<()> {
        self.stat_bucket(bucket)
    }

    /// Create a bucket directory and stamp it with a private ACL for
    /// `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::BucketAlreadyExists`] when the directory is
    /// already present.
    pub fn create_bucket(&self, bucket: &str, owner: &str) -> BackendResult<()> {
        let path = self.bucket_path(bucket);

        let mut builder = fs::DirBuilder::new();
        builder.mode(BUCKET_MODE);
        match builder.create(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(BackendError::BucketAlreadyExists {
                    bucket: bucket.to_owned(),
                });
            }
            Err(err) => {
                return Err(anyhow::Error::from(err)
                    .context(format!("mkdir bucket {bucket}"))
                    .into())
            }
        }

        let acl = serde_json::to_vec(&Acl::private(owner)).context("marshal acl")?;
        meta::set_attr(&path, meta::ACL_KEY, &acl)
            .with_context(|| format!("set acl on bucket {bucket}"))?;

        debug!(bucket, owner, "create_bucket completed");
        Ok(())
    }

    /// Delete an empty bucket.
    ///
    /// A bucket whose only entry is the staging tree counts as empty: the
    /// staging tree is removed first, then the bucket directory.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NoSuchBucket`] for a missing bucket and
    /// [`BackendError::BucketNotEmpty`] when any other entry remains.
    pub fn delete_bucket(&self, bucket: &str) -> BackendResult<()> {
        let path = self.bucket_path(bucket);

        let entries = match fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(err) if is_not_found(&err) => {
                return Err(BackendError::NoSuchBucket {
                    bucket: bucket.to_owned(),
                });
            }
            Err(err) => {
                return Err(anyhow::Error::from(err)
                    .context(format!("readdir bucket {bucket}"))
                    .into())
            }
        };

        let names: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name())
            .collect();
        if names.len() == 1 && names[0] == STAGING_DIR {
            // Staging state alone does not make a bucket non-empty.
            match fs::remove_dir_all(path.join(STAGING_DIR)) {
                Ok(()) => {}
                Err(err) if is_not_found(&err) => {}
                Err(err) => {
                    return Err(anyhow::Error::from(err)
                        .context(format!("remove staging dir of bucket {bucket}"))
                        .into())
                }
            }
        }

        match fs::remove_dir(&path) {
            Ok(()) => {}
            Err(err) if is_not_empty(&err) => {
                return Err(BackendError::BucketNotEmpty {
                    bucket: bucket.to_owned(),
                });
            }
            Err(err) => {
                return Err(anyhow::Error::from(err)
                    .context(format!("remove bucket {bucket}"))
                    .into())
            }
        }

        debug!(bucket, "delete_bucket completed");
        Ok(())
    }
}
