//! Shared entry types returned by listing operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bucket entry from `ListBuckets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// The bucket name.
    pub name: String,
    /// Creation time (the bucket directory's mtime).
    pub creation_date: DateTime<Utc>,
}

/// An object entry from `ListObjects` / `ListObjectsV2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    /// The object key, relative to the bucket.
    pub key: String,
    /// Hex MD5 for single-part objects, `<hex>-<count>` for multipart.
    pub etag: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time of the backing file.
    pub last_modified: DateTime<Utc>,
}

/// A staged part entry from `ListObjectParts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// The part number (1-based).
    pub part_number: u32,
    /// Hex MD5 of the part body; empty if the attribute is missing.
    pub etag: String,
    /// Part file mtime, RFC 3339.
    pub last_modified: String,
    /// Part size in bytes.
    pub size: u64,
}

/// An in-progress upload entry from `ListMultipartUploads`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    /// The object key the upload targets.
    pub key: String,
    /// The upload ID.
    pub upload_id: String,
    /// Upload directory mtime, RFC 3339.
    pub initiated: String,
}

/// A caller-supplied part reference in `CompleteMultipartUpload`.
///
/// The ETag is optional; when present it is validated against the stored
/// part ETag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    /// The part number as staged by `PutObjectPart`.
    pub part_number: u32,
    /// The ETag the caller received from `PutObjectPart`, if echoed back.
    pub etag: Option<String>,
}

impl CompletedPart {
    /// A part reference without an ETag.
    #[must_use]
    pub fn new(part_number: u32) -> Self {
        Self {
            part_number,
            etag: None,
        }
    }

    /// A part reference carrying the ETag returned by `PutObjectPart`.
    #[must_use]
    pub fn with_etag(part_number: u32, etag: impl Into<String>) -> Self {
        Self {
            part_number,
            etag: Some(etag.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_build_completed_part_without_etag() {
        let part = CompletedPart::new(3);
        assert_eq!(part.part_number, 3);
        assert!(part.etag.is_none());
    }

    #[test]
    fn test_should_build_completed_part_with_etag() {
        let part = CompletedPart::with_etag(1, "abc123");
        assert_eq!(part.etag.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_should_serialize_object_timestamp_as_rfc3339() {
        let object = Object {
            key: "a/b".to_owned(),
            etag: "d41d8cd98f00b204e9800998ecf8427e".to_owned(),
            size: 0,
            last_modified: chrono::DateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&object).expect("serialize");
        assert!(json.contains("1970-01-01T00:00:00Z"));
    }
}
