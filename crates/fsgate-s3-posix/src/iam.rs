//! IAM cache: the one piece of in-memory shared state.
//!
//! The IAM store is a single opaque blob held in the `user.iam` attribute
//! on the root directory and cached process-wide with a time-based expiry.
//! Readers either see a value whose expiry is in the future or trigger a
//! refresh; all mutation happens under the exclusive lock.
//!
//! The refresh path is double-checked: a reader that finds the cache stale
//! drops its shared lock, takes the exclusive lock, re-checks staleness
//! (another thread may have refreshed in between), and only then reads the
//! root attribute.

use std::fs::File;
use std::time::{Duration, Instant};

use anyhow::Context;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::BackendResult;
use crate::meta;

/// Cached IAM blob with validity and expiry.
#[derive(Debug)]
struct CacheState {
    bytes: Vec<u8>,
    valid: bool,
    expire: Instant,
}

/// Process-wide IAM cache. One instance per engine; the TTL comes from the
/// engine configuration.
#[derive(Debug)]
pub struct IamCache {
    state: RwLock<CacheState>,
    ttl: Duration,
}

impl IamCache {
    /// Create an empty, invalid cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState {
                bytes: Vec::new(),
                valid: false,
                expire: Instant::now(),
            }),
            ttl,
        }
    }

    /// Return the IAM blob, refreshing from the root attribute when the
    /// cache is invalid or expired. An absent attribute is an empty store.
    ///
    /// # Errors
    ///
    /// Propagates root-attribute read failures.
    pub fn get(&self, root: &File) -> BackendResult<Vec<u8>> {
        {
            let state = self.state.read();
            if state.valid && state.expire > Instant::now() {
                return Ok(state.bytes.clone());
            }
        }

        let mut state = self.state.write();
        // Re-check: another thread may have refreshed while we waited.
        if state.valid && state.expire > Instant::now() {
            return Ok(state.bytes.clone());
        }

        let bytes = meta::get_attr_fd(root, meta::IAM_KEY)
            .context("read iam attribute from root")?
            .unwrap_or_default();
        debug!(len = bytes.len(), "refreshed iam cache");

        state.bytes = bytes.clone();
        state.valid = true;
        state.expire = Instant::now() + self.ttl;
        Ok(bytes)
    }

    /// Read-modify-write the IAM blob under the exclusive lock.
    ///
    /// Reads the current attribute (absent means empty), applies `update`,
    /// writes the result back, and refreshes the cache. Writers from other
    /// processes are not detected; only in-process writers serialize here.
    ///
    /// # Errors
    ///
    /// Propagates attribute I/O failures and errors from `update`.
    pub fn store(
        &self,
        root: &File,
        update: impl FnOnce(Vec<u8>) -> anyhow::Result<Vec<u8>>,
    ) -> BackendResult<()> {
        let mut state = self.state.write();

        let current = meta::get_attr_fd(root, meta::IAM_KEY)
            .context("read iam attribute from root")?
            .unwrap_or_default();
        let updated = update(current)?;

        meta::set_attr_fd(root, meta::IAM_KEY, &updated)
            .context("write iam attribute to root")?;
        debug!(len = updated.len(), "stored iam blob");

        state.bytes = updated;
        state.valid = true;
        state.expire = Instant::now() + self.ttl;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_handle(dir: &tempfile::TempDir) -> File {
        File::open(dir.path()).expect("open root")
    }

    #[test]
    fn test_should_return_empty_store_when_attribute_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = root_handle(&dir);
        let cache = IamCache::new(Duration::from_secs(60));

        assert!(cache.get(&root).expect("get").is_empty());
    }

    #[test]
    fn test_should_roundtrip_store_and_get() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = root_handle(&dir);
        let cache = IamCache::new(Duration::from_secs(60));

        cache
            .store(&root, |_| Ok(b"{\"accounts\":[]}".to_vec()))
            .expect("store");
        assert_eq!(cache.get(&root).expect("get"), b"{\"accounts\":[]}");
    }

    #[test]
    fn test_should_pass_current_bytes_to_update() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = root_handle(&dir);
        let cache = IamCache::new(Duration::from_secs(60));

        cache.store(&root, |_| Ok(b"one".to_vec())).expect("store");
        cache
            .store(&root, |current| {
                assert_eq!(current, b"one");
                Ok(b"two".to_vec())
            })
            .expect("store again");
        assert_eq!(cache.get(&root).expect("get"), b"two");
    }

    #[test]
    fn test_should_serve_cached_value_before_expiry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = root_handle(&dir);
        let cache = IamCache::new(Duration::from_secs(3600));

        cache.store(&root, |_| Ok(b"cached".to_vec())).expect("store");
        // Mutate the attribute behind the cache's back; the cached value
        // must win until the TTL lapses.
        meta::set_attr_fd(&root, meta::IAM_KEY, b"behind-the-back").expect("fset");
        assert_eq!(cache.get(&root).expect("get"), b"cached");
    }

    #[test]
    fn test_should_refresh_after_expiry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = root_handle(&dir);
        let cache = IamCache::new(Duration::from_secs(0));

        cache.store(&root, |_| Ok(b"old".to_vec())).expect("store");
        meta::set_attr_fd(&root, meta::IAM_KEY, b"new").expect("fset");
        assert_eq!(cache.get(&root).expect("get"), b"new");
    }

    #[test]
    fn test_should_propagate_update_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = root_handle(&dir);
        let cache = IamCache::new(Duration::from_secs(60));

        let result = cache.store(&root, |_| anyhow::bail!("rejected"));
        assert!(result.is_err());
    }
}
