//! Namespace layer: bucket/key to filesystem path mapping.
//!
//! Buckets are directories under the engine root; an object's path is the
//! bucket directory joined with its key, so key path components become
//! directory components. Keys ending in `/` are directory-keys and map to
//! directories instead of regular files.
//!
//! Multipart state is decoupled from the arbitrary key string (which may
//! contain path separators) by naming the staging container after the
//! lowercase hex SHA-256 of the key.

use std::fs;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{is_not_found, BackendError, BackendResult};

/// Staging subtree name inside each bucket. Never listed as objects.
pub const STAGING_DIR: &str = ".sgwtmp";

/// Multipart staging subtree, relative to the bucket.
pub const MULTIPART_DIR: &str = ".sgwtmp/multipart";

/// Mode for implicit parent directories and multipart directories.
pub const DIR_MODE: u32 = 0o755;

/// Whether the key names a directory (trailing `/`).
#[must_use]
pub fn is_directory_key(key: &str) -> bool {
    key.ends_with('/')
}

/// Lowercase hex SHA-256 of the key, used to name its multipart container.
#[must_use]
pub fn key_hash(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Absolute path of a bucket directory.
#[must_use]
pub fn bucket_path(root: &Path, bucket: &str) -> PathBuf {
    root.join(bucket)
}

/// Absolute path of an object within its bucket.
#[must_use]
pub fn object_path(root: &Path, bucket: &str, key: &str) -> PathBuf {
    root.join(bucket).join(key)
}

/// Absolute path of a bucket's staging directory.
#[must_use]
pub fn staging_path(root: &Path, bucket: &str) -> PathBuf {
    root.join(bucket).join(STAGING_DIR)
}

/// Absolute path of the multipart container directory for a key.
#[must_use]
pub fn multipart_container_path(root: &Path, bucket: &str, key: &str) -> PathBuf {
    root.join(bucket).join(MULTIPART_DIR).join(key_hash(key))
}

/// Create `path` and any missing parents with the given mode, failing with
/// [`BackendError::ObjectParentIsFile`] when a path component exists as a
/// non-directory.
///
/// # Errors
///
/// Returns [`BackendError::ObjectParentIsFile`] on a component conflict.
/// Other filesystem errors surface through the final double-check, which
/// resolves concurrent creation races in favor of success.
pub fn mkdir_all(path: &Path, mode: u32, key: &str) -> BackendResult<()> {
    // Fast path: if the path already resolves, it must be a directory.
    if let Ok(meta) = fs::metadata(path) {
        if meta.is_dir() {
            return Ok(());
        }
        return Err(BackendError::ObjectParentIsFile {
            key: key.to_owned(),
        });
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            mkdir_all(parent, mode, key)?;
        }
    }

    let mut builder = fs::DirBuilder::new();
    builder.mode(mode);
    if builder.create(path).is_err() {
        // A concurrent creator may have won the race; only a non-directory
        // occupying the path is an error.
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => return Ok(()),
            _ => {
                return Err(BackendError::ObjectParentIsFile {
                    key: key.to_owned(),
                })
            }
        }
    }
    Ok(())
}

/// Create the missing parent directories of an object path.
///
/// # Errors
///
/// Returns [`BackendError::ObjectParentIsFile`] when a component along the
/// key exists as a regular file.
pub fn ensure_parent_dirs(obj_path: &Path, key: &str) -> BackendResult<()> {
    match obj_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => mkdir_all(dir, DIR_MODE, key),
        _ => Ok(()),
    }
}

/// Prune implicit parent directories of a deleted object.
///
/// Walks from the object path up toward the bucket, removing each parent
/// directory that is not preserved by the `is_preserved` predicate
/// (callers pass an ETag-attribute check: a parent explicitly created by a
/// directory-key put carries one and is kept). Stops at the bucket
/// boundary, at the first preserved parent, and at the first failed
/// removal; a sibling object likely still lives in that directory, so the
/// failure is not an error.
pub fn remove_parents(
    bucket_path: &Path,
    obj_path: &Path,
    is_preserved: impl Fn(&Path) -> bool,
) {
    let mut current = obj_path.to_path_buf();

    loop {
        let Some(parent) = current.parent() else {
            break;
        };
        if parent == bucket_path || parent.as_os_str().is_empty() {
            break;
        }
        if is_preserved(parent) {
            break;
        }
        if fs::remove_dir(parent).is_err() {
            break;
        }
        current = parent.to_path_buf();
    }
}

/// Whether `rel` (a path relative to the bucket) lies inside one of the
/// pruned subtrees.
#[must_use]
pub fn in_pruned_subtree(rel: &str, pruned: &[&str]) -> bool {
    pruned.iter().any(|p| {
        rel == *p || rel.strip_prefix(p).is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Stat a path, mapping "not found" to `None`.
///
/// # Errors
///
/// Propagates any I/O error other than not-found.
pub fn stat_opt(path: &Path) -> std::io::Result<Option<fs::Metadata>> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(err) if is_not_found(&err) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Whether the path is made of plain components only (no `..`, no root).
///
/// Keys arrive validated by the front end, but path traversal out of the
/// bucket must be impossible regardless.
#[must_use]
pub fn is_clean_key_path(key: &str) -> bool {
    !key.is_empty()
        && Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_classify_directory_keys() {
        assert!(is_directory_key("photos/"));
        assert!(!is_directory_key("photos/cat.jpg"));
        assert!(!is_directory_key(""));
    }

    #[test]
    fn test_should_hash_key_to_lowercase_hex() {
        let sum = key_hash("my/object");
        assert_eq!(sum.len(), 64);
        assert!(sum.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        // Same key, same container.
        assert_eq!(sum, key_hash("my/object"));
        assert_ne!(sum, key_hash("my/other"));
    }

    #[test]
    fn test_should_join_object_paths() {
        let path = object_path(Path::new("/data"), "bkt", "a/b/c");
        assert_eq!(path, Path::new("/data/bkt/a/b/c"));
    }

    #[test]
    fn test_should_place_container_under_staging() {
        let path = multipart_container_path(Path::new("/data"), "bkt", "key");
        assert!(path.starts_with("/data/bkt/.sgwtmp/multipart"));
    }

    #[test]
    fn test_should_create_nested_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let target = tmp.path().join("a/b/c");
        mkdir_all(&target, DIR_MODE, "a/b/c/obj").expect("mkdir_all");
        assert!(target.is_dir());
        // Idempotent.
        mkdir_all(&target, DIR_MODE, "a/b/c/obj").expect("mkdir_all again");
    }

    #[test]
    fn test_should_fail_when_component_is_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("a"), b"file").expect("write");
        let err = mkdir_all(&tmp.path().join("a/b"), DIR_MODE, "a/b/obj")
            .expect_err("must fail on file component");
        assert!(matches!(err, BackendError::ObjectParentIsFile { .. }));
    }

    #[test]
    fn test_should_remove_unpreserved_parents() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bucket = tmp.path().join("bkt");
        let obj = bucket.join("a/b/c/obj");
        std::fs::create_dir_all(obj.parent().expect("parent")).expect("mkdirs");

        remove_parents(&bucket, &obj, |_| false);
        assert!(!bucket.join("a").exists());
        assert!(bucket.is_dir());
    }

    #[test]
    fn test_should_stop_at_preserved_parent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bucket = tmp.path().join("bkt");
        let obj = bucket.join("a/b/obj");
        std::fs::create_dir_all(obj.parent().expect("parent")).expect("mkdirs");

        let preserved = bucket.join("a");
        remove_parents(&bucket, &obj, |p| p == preserved);
        assert!(!bucket.join("a/b").exists());
        assert!(bucket.join("a").is_dir());
    }

    #[test]
    fn test_should_stop_at_nonempty_parent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bucket = tmp.path().join("bkt");
        std::fs::create_dir_all(bucket.join("a/b")).expect("mkdirs");
        std::fs::write(bucket.join("a/sibling"), b"x").expect("write");

        remove_parents(&bucket, &bucket.join("a/b/obj"), |_| false);
        assert!(!bucket.join("a/b").exists());
        // `a` still holds a sibling, so the prune stops without error.
        assert!(bucket.join("a").is_dir());
    }

    #[test]
    fn test_should_detect_pruned_subtrees() {
        assert!(in_pruned_subtree(".sgwtmp", &[STAGING_DIR]));
        assert!(in_pruned_subtree(".sgwtmp/multipart/x", &[STAGING_DIR]));
        assert!(!in_pruned_subtree(".sgwtmp2", &[STAGING_DIR]));
        assert!(!in_pruned_subtree("data/.sgwtmp", &[STAGING_DIR]));
    }

    #[test]
    fn test_should_accept_clean_keys_only() {
        assert!(is_clean_key_path("a/b/c"));
        assert!(is_clean_key_path("a"));
        assert!(!is_clean_key_path(""));
        assert!(!is_clean_key_path("../escape"));
        assert!(!is_clean_key_path("/rooted"));
        assert!(!is_clean_key_path("a/../b"));
    }
}
