//! Multipart upload operation inputs.

use std::collections::HashMap;

use crate::types::CompletedPart;

/// Input for `CreateMultipartUpload`.
#[derive(Debug, Clone, Default)]
pub struct CreateMultipartUploadInput {
    /// Target bucket.
    pub bucket: String,
    /// Object key the upload will materialize as.
    pub key: String,
    /// User metadata copied onto the final object at completion.
    pub metadata: HashMap<String, String>,
}

/// Input for `PutObjectPart`. The part body travels as a separate reader.
#[derive(Debug, Clone, Default)]
pub struct PutObjectPartInput {
    /// Target bucket.
    pub bucket: String,
    /// Object key of the upload.
    pub key: String,
    /// Upload ID from `CreateMultipartUpload`.
    pub upload_id: String,
    /// Part number (1-based). Re-putting a number overwrites the part.
    pub part_number: u32,
    /// Declared part length in bytes, used as a preallocation hint.
    pub content_length: u64,
}

/// Input for `CompleteMultipartUpload`.
#[derive(Debug, Clone, Default)]
pub struct CompleteMultipartUploadInput {
    /// Target bucket.
    pub bucket: String,
    /// Object key of the upload.
    pub key: String,
    /// Upload ID from `CreateMultipartUpload`.
    pub upload_id: String,
    /// Parts to assemble, in the order they should be concatenated.
    pub parts: Vec<CompletedPart>,
}

/// Input for `ListMultipartUploads`.
#[derive(Debug, Clone, Default)]
pub struct ListMultipartUploadsInput {
    /// Target bucket.
    pub bucket: String,
    /// Only uploads whose key starts with this prefix are returned.
    pub prefix: Option<String>,
    /// Echoed back in the output; uploads are not grouped.
    pub delimiter: Option<String>,
    /// Composite pagination marker: key half.
    pub key_marker: Option<String>,
    /// Composite pagination marker: upload-ID half.
    pub upload_id_marker: Option<String>,
    /// Page size; `0` means no limit.
    pub max_uploads: u32,
}

/// Input for `ListObjectParts`.
#[derive(Debug, Clone, Default)]
pub struct ListObjectPartsInput {
    /// Target bucket.
    pub bucket: String,
    /// Object key of the upload.
    pub key: String,
    /// Upload ID from `CreateMultipartUpload`.
    pub upload_id: String,
    /// Only parts with a strictly greater number are returned.
    pub part_number_marker: u32,
    /// Page size; `0` means no limit.
    pub max_parts: u32,
}
