//! Schema inference over sampled CSV rows

use super::classify::TypeClassifier;
use super::normalize::normalize_column_names;
use super::sampler::{RowSampler, SampleError, DEFAULT_SAMPLE_SIZE};
use super::types::{ColumnSample, InferredField, InferredSchema, PrimitiveType, SampledRows};
use crate::storage::ObjectSource;
use std::io::Read;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Schema inferrer with configuration options
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaInferrer {
    sampler: RowSampler,
    classifier: TypeClassifier,
}

impl SchemaInferrer {
    /// Create a new schema inferrer with default settings
    pub fn new() -> Self {
        Self {
            sampler: RowSampler::new().with_max_rows(DEFAULT_SAMPLE_SIZE),
            classifier: TypeClassifier::new(),
        }
    }

    /// Set the number of data rows sampled per file
    #[must_use]
    pub fn with_sample_size(mut self, rows: usize) -> Self {
        self.sampler = self.sampler.with_max_rows(rows);
        self
    }

    /// Set the minimum non-null values per column
    #[must_use]
    pub fn with_min_non_null(mut self, min: usize) -> Self {
        self.classifier = self.classifier.with_min_non_null(min);
        self
    }

    /// Set the confidence threshold
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.classifier = self.classifier.with_confidence(confidence);
        self
    }

    /// Enable/disable report title row detection
    #[must_use]
    pub fn with_title_row_detection(mut self, enabled: bool) -> Self {
        self.sampler = self.sampler.with_title_row_detection(enabled);
        self
    }

    /// Infer the schema of one stored object
    ///
    /// Returns `None` when the object cannot be read or decompressed, or has
    /// no header at all. Callers fall back to warehouse auto-detection.
    /// Compression is detected from a `.gz` suffix.
    pub fn infer_schema(&self, source: &dyn ObjectSource, location: &str) -> Option<InferredSchema> {
        let start = Instant::now();

        let reader = match source.open(location) {
            Ok(reader) => reader,
            Err(e) => {
                warn!(
                    "Schema inference skipped for {}: {}",
                    location,
                    SampleError::SourceUnavailable(e.to_string())
                );
                return None;
            }
        };

        let is_compressed = location.to_ascii_lowercase().ends_with(".gz");
        let schema = self.infer_from_reader(reader, is_compressed, location)?;

        info!(
            "Inferred {} columns for {} from {} rows in {:?}",
            schema.fields.len(),
            location,
            schema.sampled_rows,
            start.elapsed()
        );
        let summary: Vec<String> = schema
            .type_distribution()
            .iter()
            .map(|(ty, count)| format!("{ty}={count}"))
            .collect();
        info!("Type distribution: {}", summary.join(", "));

        Some(schema)
    }

    /// Infer a schema from an already opened byte stream
    pub fn infer_from_reader<R: Read>(
        &self,
        reader: R,
        is_compressed: bool,
        label: &str,
    ) -> Option<InferredSchema> {
        match self.sampler.sample(reader, is_compressed) {
            Ok(sampled) => self.infer_from_rows(&sampled),
            Err(e) => {
                warn!("Schema inference failed for {}: {}", label, e);
                None
            }
        }
    }

    /// Build the schema from sampled rows
    ///
    /// A header without data rows yields an all-STRING schema.
    pub fn infer_from_rows(&self, sampled: &SampledRows) -> Option<InferredSchema> {
        if sampled.header.is_empty() {
            debug!("No header row found, nothing to infer");
            return None;
        }

        let names = normalize_column_names(&sampled.header);

        let fields = if sampled.rows.is_empty() {
            debug!("Header without data rows, using STRING for all columns");
            names
                .into_iter()
                .map(|name| InferredField::new(name, PrimitiveType::String))
                .collect()
        } else {
            names
                .into_iter()
                .zip(&sampled.header)
                .enumerate()
                .map(|(index, (name, raw))| {
                    let column = ColumnSample::from_rows(raw.as_str(), index, &sampled.rows);
                    let field_type = self.classifier.classify(&column.values);
                    debug!("Column '{}' ({}) -> {}", column.name, name, field_type);
                    InferredField::new(name, field_type)
                })
                .collect()
        };

        Some(InferredSchema {
            fields,
            has_title_row: sampled.has_title_row,
            sampled_rows: sampled.rows.len(),
        })
    }
}

/// Infer a schema with default settings
pub fn infer_schema(source: &dyn ObjectSource, location: &str) -> Option<InferredSchema> {
    SchemaInferrer::new().infer_schema(source, location)
}
