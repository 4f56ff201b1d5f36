//! Multipart upload operation outputs.

use crate::types::{Part, Upload};

/// Output of `CreateMultipartUpload`.
#[derive(Debug, Clone)]
pub struct CreateMultipartUploadOutput {
    /// The bucket the upload lives in.
    pub bucket: String,
    /// The key the upload will materialize as.
    pub key: String,
    /// The generated upload ID.
    pub upload_id: String,
}

/// Output of `CompleteMultipartUpload`.
#[derive(Debug, Clone)]
pub struct CompleteMultipartUploadOutput {
    /// The bucket the object was written to.
    pub bucket: String,
    /// The assembled object's key.
    pub key: String,
    /// The multipart ETag (`<hex>-<count>`).
    pub etag: String,
}

/// Output of `ListMultipartUploads`.
#[derive(Debug, Clone, Default)]
pub struct ListMultipartUploadsOutput {
    /// The bucket that was listed.
    pub bucket: String,
    /// Echo of the request delimiter.
    pub delimiter: String,
    /// Echo of the request prefix.
    pub prefix: String,
    /// Echo of the request key marker.
    pub key_marker: String,
    /// Echo of the request upload-ID marker.
    pub upload_id_marker: String,
    /// Key half of the marker for the next page; set when truncated.
    pub next_key_marker: String,
    /// Upload-ID half of the marker for the next page; set when truncated.
    pub next_upload_id_marker: String,
    /// Echo of the request page size.
    pub max_uploads: u32,
    /// Whether more uploads remain.
    pub is_truncated: bool,
    /// The uploads on this page, ordered by `(key, upload_id)`.
    pub uploads: Vec<Upload>,
}

/// Output of `ListObjectParts`.
#[derive(Debug, Clone, Default)]
pub struct ListObjectPartsOutput {
    /// The bucket that was listed.
    pub bucket: String,
    /// The key of the upload.
    pub key: String,
    /// The upload ID that was listed.
    pub upload_id: String,
    /// Echo of the request marker.
    pub part_number_marker: u32,
    /// The last returned part number; `0` on an empty page.
    pub next_part_number_marker: u32,
    /// Echo of the request page size.
    pub max_parts: u32,
    /// Whether more parts remain.
    pub is_truncated: bool,
    /// The parts on this page, ordered by part number.
    pub parts: Vec<Part>,
}
