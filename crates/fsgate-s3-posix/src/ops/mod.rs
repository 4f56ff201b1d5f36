//! Storage operation implementations.
//!
//! Each submodule contributes an `impl` block on
//! [`crate::backend::PosixBackend`], grouped by operation family. The
//! modules orchestrate the namespace, atomic-writer, metadata, walker, and
//! IAM components; none of them holds state of its own.

pub mod bucket;
pub mod bucket_config;
pub mod list;
pub mod multipart;
pub mod object;
pub mod object_config;
