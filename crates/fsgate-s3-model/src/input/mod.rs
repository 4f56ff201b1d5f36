//! Input records, grouped by operation family.

pub mod list;
pub mod multipart;
pub mod object;

pub use list::{ListObjectsInput, ListObjectsV2Input};
pub use multipart::{
    CompleteMultipartUploadInput, CreateMultipartUploadInput, ListMultipartUploadsInput,
    ListObjectPartsInput, PutObjectPartInput,
};
pub use object::{CopyObjectInput, GetObjectInput, PutObjectInput};
