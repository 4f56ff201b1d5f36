//! Semantic input/output records for the fsgate S3 data plane.
//!
//! This crate defines the boundary types the storage engine consumes and
//! produces: one input record per multi-field operation, one output record
//! per operation that returns more than a single value, and the shared
//! listing entry types (`Bucket`, `Object`, `Part`, `Upload`).
//!
//! These records are deliberately plain data. Wire concerns (header names,
//! XML shapes, signatures) belong to whatever front end drives the engine;
//! nothing here performs I/O.

pub mod input;
pub mod output;
pub mod types;

pub use types::{Bucket, CompletedPart, Object, Part, Upload};
