//! Backend error types.
//!
//! Defines [`BackendError`], a domain-specific error enum covering the
//! S3-compatible error conditions this engine can produce. Filesystem
//! "not found" conditions are translated into the matching variant at each
//! call site; transient I/O errors are wrapped with the operation name and
//! path via [`anyhow::Context`] and carried by the [`BackendError::Internal`]
//! variant.
//!
//! # Usage
//!
//! ```
//! use fsgate_s3_posix::error::BackendError;
//!
//! let err = BackendError::NoSuchBucket {
//!     bucket: "my-bucket".to_owned(),
//! };
//! assert!(err.to_string().contains("my-bucket"));
//! ```

use std::io;

/// Backend error type.
///
/// Each variant corresponds to a well-known S3 error code. Anything that is
/// not an S3-visible condition (disk failures, permission problems) travels
/// through [`BackendError::Internal`] with contextual wrapping.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    // -----------------------------------------------------------------------
    // Bucket errors
    // -----------------------------------------------------------------------
    /// The specified bucket does not exist.
    #[error("The specified bucket does not exist: {bucket}")]
    NoSuchBucket {
        /// The bucket name that was not found.
        bucket: String,
    },

    /// The requested bucket name is already in use.
    #[error("The requested bucket name is not available: {bucket}")]
    BucketAlreadyExists {
        /// The bucket name that already exists.
        bucket: String,
    },

    /// The bucket is not empty and cannot be deleted.
    #[error("The bucket you tried to delete is not empty: {bucket}")]
    BucketNotEmpty {
        /// The bucket name that is not empty.
        bucket: String,
    },

    // -----------------------------------------------------------------------
    // Object / key errors
    // -----------------------------------------------------------------------
    /// The specified key does not exist.
    #[error("The specified key does not exist: {key}")]
    NoSuchKey {
        /// The key that was not found.
        key: String,
    },

    /// A path component along the object key exists as a regular file.
    #[error("A parent of the object key is an existing file: {key}")]
    ObjectParentIsFile {
        /// The key whose parent chain conflicts.
        key: String,
    },

    /// The object cannot be written because a directory occupies its path.
    #[error("An existing directory occupies the object path: {key}")]
    ExistingObjectIsDirectory {
        /// The conflicting key.
        key: String,
    },

    // -----------------------------------------------------------------------
    // Multipart upload errors
    // -----------------------------------------------------------------------
    /// The specified multipart upload does not exist.
    #[error("The specified upload does not exist: {upload_id}")]
    NoSuchUpload {
        /// The upload ID that was not found.
        upload_id: String,
    },

    /// A part referenced by `CompleteMultipartUpload` is missing, has a
    /// mismatched ETag, or violates the equal-size-non-trailing rule.
    #[error("One or more of the specified parts could not be found or did not match")]
    InvalidPart,

    // -----------------------------------------------------------------------
    // Request errors
    // -----------------------------------------------------------------------
    /// The request is invalid (for example, a range outside the object).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of what was invalid.
        message: String,
    },

    // -----------------------------------------------------------------------
    // Internal / catch-all
    // -----------------------------------------------------------------------
    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BackendError {
    /// Build an [`BackendError::InvalidRequest`] from any message.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }
}

/// Convenience result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

// ---------------------------------------------------------------------------
// io::Error classification
// ---------------------------------------------------------------------------

/// Whether the error is a plain "not found".
#[must_use]
pub fn is_not_found(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}

/// Whether the error is `ENOTEMPTY` (directory has entries).
#[must_use]
pub fn is_not_empty(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ENOTEMPTY)
}

/// Whether the error indicates the path is a directory (`EISDIR`).
#[must_use]
pub fn is_dir_error(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EISDIR)
}

/// Whether the error means the extended attribute is absent (`ENODATA`,
/// spelled `ENOATTR` on some systems). Absent attributes are values, not
/// errors.
#[must_use]
pub fn is_no_attr(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ENODATA)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_format_no_such_bucket() {
        let err = BackendError::NoSuchBucket {
            bucket: "my-bucket".to_owned(),
        };
        assert!(err.to_string().contains("my-bucket"));
    }

    #[test]
    fn test_should_format_no_such_key() {
        let err = BackendError::NoSuchKey {
            key: "path/to/obj".to_owned(),
        };
        assert!(err.to_string().contains("path/to/obj"));
    }

    #[test]
    fn test_should_build_invalid_request() {
        let err = BackendError::invalid_request("range out of bounds");
        assert!(err.to_string().contains("range out of bounds"));
    }

    #[test]
    fn test_should_wrap_internal_errors() {
        let err = BackendError::Internal(anyhow::anyhow!("disk I/O failure"));
        assert!(err.to_string().contains("disk I/O failure"));
    }

    #[test]
    fn test_should_classify_not_found() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        assert!(is_not_found(&err));
        assert!(!is_not_empty(&err));
    }

    #[test]
    fn test_should_classify_not_empty() {
        let err = io::Error::from_raw_os_error(libc::ENOTEMPTY);
        assert!(is_not_empty(&err));
        assert!(!is_not_found(&err));
    }

    #[test]
    fn test_should_classify_is_dir() {
        let err = io::Error::from_raw_os_error(libc::EISDIR);
        assert!(is_dir_error(&err));
    }
}
