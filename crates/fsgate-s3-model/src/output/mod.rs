//! Output records, grouped by operation family.

pub mod list;
pub mod multipart;
pub mod object;

pub use list::{ListObjectsOutput, ListObjectsV2Output};
pub use multipart::{
    CompleteMultipartUploadOutput, CreateMultipartUploadOutput, ListMultipartUploadsOutput,
    ListObjectPartsOutput,
};
pub use object::{CopyObjectOutput, GetObjectOutput, HeadObjectOutput};
