// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Datawagon
//!
//! Moves periodic analytics exports from a local directory into an object
//! store and registers them as external warehouse tables.
//!
//! ## Features
//!
//! - **File Scanning**: TOML-configured sources, filename metadata via regex
//! - **Deduplicated Upload**: Only files not yet in the bucket, create-only writes
//! - **Schema Inference**: Column types from a bounded, streamed CSV sample
//! - **External Tables**: Hive-partitioned tables over versioned storage folders
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use datawagon::schema::SchemaInferrer;
//! use datawagon::storage::StorageBucket;
//!
//! let bucket = StorageBucket::parse("gs://exports")?;
//! let schema = tokio::task::spawn_blocking(move || {
//!     SchemaInferrer::new().infer_schema(&bucket, "caravan-versioned/claims_v1-1/a.csv.gz")
//! })
//! .await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────┐   ┌───────────┐   ┌─────────────┐
//! │  scanner  │──▶│ compare  │──▶│  storage  │──▶│  warehouse  │
//! │ local fs  │   │ new files│   │ upload    │   │ ext. tables │
//! └───────────┘   └──────────┘   └─────┬─────┘   └──────▲──────┘
//!                                      │ stream         │ fields
//!                                      └───▶ schema ────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Runtime settings and source configuration
pub mod config;

/// Retry with backoff for network calls
pub mod retry;

/// Schema inference from sampled CSV
pub mod schema;

/// Object store access
pub mod storage;

/// Local file discovery and filename metadata
pub mod scanner;

/// Local vs. bucket comparison
pub mod compare;

/// Zip to gzip conversion
pub mod convert;

/// External table management
pub mod warehouse;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use schema::{InferredField, InferredSchema, PrimitiveType, SchemaInferrer};
pub use storage::{ObjectSource, StorageBucket};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
