//! Schema inference module
//!
//! Infers warehouse column types from a bounded sample of CSV rows.
//!
//! # Features
//!
//! - **Streaming Sampling**: Reads at most N rows, decompressing gzip on the fly
//! - **Name Normalization**: Lowercase, `[a-z0-9_]` only, unique per header
//! - **Type Classification**: INT64, BOOL, BIGNUMERIC, TIMESTAMP, DATE or STRING
//!   under a confidence threshold
//! - **Graceful Fallback**: Unreadable sources return `None` instead of an error

mod classify;
mod inference;
mod normalize;
mod sampler;
mod types;

pub use classify::{
    classify, is_bool, is_date, is_decimal, is_int64, is_null_marker, is_timestamp,
    TypeClassifier, DEFAULT_CONFIDENCE, DEFAULT_MIN_NON_NULL,
};
pub use inference::{infer_schema, SchemaInferrer};
pub use normalize::{normalize_column_name, normalize_column_names, EMPTY_COLUMN_NAME};
pub use sampler::{sample_rows, RowSampler, SampleError, DEFAULT_SAMPLE_SIZE};
pub use types::{ColumnSample, InferredField, InferredSchema, PrimitiveType, SampledRows};

#[cfg(test)]
mod tests;
