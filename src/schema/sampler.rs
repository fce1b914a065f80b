//! Bounded row sampling from delimited text
//!
//! Reads the header and at most `max_rows` data rows from a byte stream,
//! decompressing gzip on the fly. Memory use is bounded by
//! `max_rows * columns`; the rest of the stream is never read.

use super::types::SampledRows;
use flate2::read::MultiGzDecoder;
use std::io::{self, Read};
use thiserror::Error;

/// Default number of data rows sampled per file
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Failure modes that stop sampling for the whole file
#[derive(Error, Debug)]
pub enum SampleError {
    /// The object could not be opened or the stream broke mid-read
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// The gzip stream is corrupt or truncated
    #[error("Decompression failed: {0}")]
    Decompression(String),
}

/// Streaming CSV row sampler
#[derive(Debug, Clone, Copy)]
pub struct RowSampler {
    max_rows: usize,
    detect_title_row: bool,
}

impl Default for RowSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl RowSampler {
    /// Create a sampler reading up to [`DEFAULT_SAMPLE_SIZE`] rows
    pub fn new() -> Self {
        Self {
            max_rows: DEFAULT_SAMPLE_SIZE,
            detect_title_row: true,
        }
    }

    /// Set the maximum number of data rows
    #[must_use]
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Enable/disable report title row detection
    #[must_use]
    pub fn with_title_row_detection(mut self, enabled: bool) -> Self {
        self.detect_title_row = enabled;
        self
    }

    /// Sample rows from a reader
    pub fn sample<R: Read>(
        &self,
        reader: R,
        is_compressed: bool,
    ) -> Result<SampledRows, SampleError> {
        if is_compressed {
            self.sample_plain(MultiGzDecoder::new(reader), true)
        } else {
            self.sample_plain(reader, false)
        }
    }

    fn sample_plain<R: Read>(
        &self,
        reader: R,
        is_compressed: bool,
    ) -> Result<SampledRows, SampleError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = csv_reader.byte_records();
        let mut next_record = || -> Result<Option<Vec<String>>, SampleError> {
            match records.next() {
                None => Ok(None),
                Some(Ok(record)) => Ok(Some(
                    record
                        .iter()
                        .map(|field| String::from_utf8_lossy(field).into_owned())
                        .collect(),
                )),
                Some(Err(e)) => Err(map_csv_error(e, is_compressed)),
            }
        };

        let Some(first) = next_record()? else {
            return Ok(SampledRows::default());
        };

        let mut has_title_row = false;
        let mut pending = None;
        let header = if self.detect_title_row && first.len() == 1 {
            match next_record()? {
                Some(second) if second.len() > 1 => {
                    has_title_row = true;
                    second
                }
                other => {
                    pending = other;
                    first
                }
            }
        } else {
            first
        };

        let width = header.len();
        let mut rows = Vec::with_capacity(self.max_rows.min(1024));

        if let Some(record) = pending {
            if rows.len() < self.max_rows {
                rows.push(fit_row(record, width));
            }
        }

        while rows.len() < self.max_rows {
            match next_record()? {
                Some(record) => rows.push(fit_row(record, width)),
                None => break,
            }
        }

        Ok(SampledRows {
            header,
            rows,
            has_title_row,
        })
    }
}

/// Sample rows with a one-off sampler
pub fn sample_rows<R: Read>(
    reader: R,
    is_compressed: bool,
    max_rows: usize,
) -> Result<SampledRows, SampleError> {
    RowSampler::new().with_max_rows(max_rows).sample(reader, is_compressed)
}

/// Pad short rows with nulls and drop extra trailing fields
fn fit_row(record: Vec<String>, width: usize) -> Vec<Option<String>> {
    let mut row: Vec<Option<String>> = record.into_iter().take(width).map(Some).collect();
    row.resize(width, None);
    row
}

fn map_csv_error(err: csv::Error, is_compressed: bool) -> SampleError {
    match err.into_kind() {
        csv::ErrorKind::Io(e) => map_io_error(e, is_compressed),
        other => SampleError::SourceUnavailable(format!("{other:?}")),
    }
}

/// Corrupt gzip data surfaces as `InvalidInput`/`InvalidData`/`UnexpectedEof`
fn map_io_error(err: io::Error, is_compressed: bool) -> SampleError {
    let corrupt = matches!(
        err.kind(),
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof
    );
    if is_compressed && corrupt {
        SampleError::Decompression(err.to_string())
    } else {
        SampleError::SourceUnavailable(err.to_string())
    }
}
