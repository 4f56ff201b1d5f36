//! The POSIX storage engine.
//!
//! [`PosixBackend`] owns the root directory path, an open handle on the
//! root (used only for the IAM attribute), the configuration, and the IAM
//! cache. Everything else lives on the filesystem: buckets are directories
//! under the root, objects are files, metadata is extended attributes.
//! Individual operations are implemented in the [`crate::ops`] submodules
//! as `impl PosixBackend` blocks.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::PosixConfig;
use crate::error::{is_not_found, BackendError, BackendResult};
use crate::iam::IamCache;
use crate::namespace;

/// The POSIX filesystem storage engine.
///
/// Stateless apart from the IAM cache; safe to share across threads behind
/// an `Arc`. Filesystem atomicity (`rename`, `mkdir` exclusivity) provides
/// the cross-request ordering guarantees.
///
/// # Examples
///
/// ```no_run
/// use fsgate_s3_posix::{PosixBackend, PosixConfig};
///
/// let config = PosixConfig::builder().root("/srv/objects".into()).build();
/// let backend = PosixBackend::new(config).unwrap();
/// let buckets = backend.list_buckets().unwrap();
/// ```
#[derive(Debug)]
pub struct PosixBackend {
    root: PathBuf,
    root_file: File,
    config: PosixConfig,
    iam: IamCache,
}

impl PosixBackend {
    /// Open the engine over the configured root directory.
    ///
    /// # Errors
    ///
    /// Fails if the root does not exist or is not a directory.
    pub fn new(config: PosixConfig) -> BackendResult<Self> {
        let root = PathBuf::from(&config.root);

        let meta = std::fs::metadata(&root)
            .with_context(|| format!("stat root {}", root.display()))?;
        if !meta.is_dir() {
            return Err(BackendError::Internal(anyhow::anyhow!(
                "root {} is not a directory",
                root.display()
            )));
        }

        let root_file =
            File::open(&root).with_context(|| format!("open root {}", root.display()))?;

        let iam = IamCache::new(config.iam_cache_ttl());
        Ok(Self {
            root,
            root_file,
            config,
            iam,
        })
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &PosixConfig {
        &self.config
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a bucket directory.
    pub(crate) fn bucket_path(&self, bucket: &str) -> PathBuf {
        namespace::bucket_path(&self.root, bucket)
    }

    /// Absolute path of an object within a bucket.
    pub(crate) fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        namespace::object_path(&self.root, bucket, key)
    }

    /// Verify the bucket directory exists.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NoSuchBucket`] when missing; other stat
    /// failures are wrapped with context.
    pub(crate) fn stat_bucket(&self, bucket: &str) -> BackendResult<()> {
        match std::fs::metadata(self.bucket_path(bucket)) {
            Ok(_) => Ok(()),
            Err(err) if is_not_found(&err) => Err(BackendError::NoSuchBucket {
                bucket: bucket.to_owned(),
            }),
            Err(err) => Err(anyhow::Error::from(err)
                .context(format!("stat bucket {bucket}"))
                .into()),
        }
    }

    // -----------------------------------------------------------------------
    // IAM
    // -----------------------------------------------------------------------

    /// Return the IAM blob, refreshing the cache when stale.
    ///
    /// # Errors
    ///
    /// Propagates root-attribute read failures.
    pub fn get_iam(&self) -> BackendResult<Vec<u8>> {
        self.iam.get(&self.root_file)
    }

    /// Atomically (within this process) read-modify-write the IAM blob.
    ///
    /// # Errors
    ///
    /// Propagates attribute I/O failures and errors from `update`.
    pub fn store_iam(
        &self,
        update: impl FnOnce(Vec<u8>) -> anyhow::Result<Vec<u8>>,
    ) -> BackendResult<()> {
        self.iam.store(&self.root_file, update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(dir: &tempfile::TempDir) -> PosixBackend {
        let config = PosixConfig::builder()
            .root(dir.path().to_string_lossy().into_owned())
            .build();
        PosixBackend::new(config).expect("backend")
    }

    #[test]
    fn test_should_open_over_existing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = backend(&dir);
        assert_eq!(engine.root(), dir.path());
    }

    #[test]
    fn test_should_fail_on_missing_root() {
        let config = PosixConfig::builder()
            .root("/nonexistent/fsgate-root".into())
            .build();
        assert!(PosixBackend::new(config).is_err());
    }

    #[test]
    fn test_should_fail_on_file_root() {
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        let config = PosixConfig::builder()
            .root(tmp.path().to_string_lossy().into_owned())
            .build();
        assert!(PosixBackend::new(config).is_err());
    }

    #[test]
    fn test_should_report_missing_bucket() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = backend(&dir);
        let err = engine.stat_bucket("ghost").expect_err("must be missing");
        assert!(matches!(err, BackendError::NoSuchBucket { .. }));
    }

    #[test]
    fn test_should_roundtrip_iam_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = backend(&dir);

        engine.store_iam(|_| Ok(b"iam-blob".to_vec())).expect("store");
        assert_eq!(engine.get_iam().expect("get"), b"iam-blob");
    }
}
