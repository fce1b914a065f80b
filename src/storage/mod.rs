//! Storage module
//!
//! Object store access for uploads, listings and streamed reads.
//!
//! # Overview
//!
//! This module provides:
//! - Bucket URL parsing for GCS, S3, R2, Azure and local directories
//! - Create-only uploads with retry and throughput logging
//! - Streaming object reads behind the blocking [`ObjectSource`] trait
//! - Object name validation

mod bucket;
mod source;
mod validate;

pub use bucket::{ObjectEntry, StorageBucket, UploadOutcome};
pub use source::{LocalSource, ObjectSource};
pub use validate::{validate_blob_name, validate_path_within, MAX_BLOB_NAME_LEN};
