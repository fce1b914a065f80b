//! Schema types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Primitive column type understood by the warehouse
///
/// The serialized and displayed names are the warehouse type keywords and
/// must not be renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveType {
    #[serde(rename = "INT64")]
    Int64,
    #[serde(rename = "BOOL")]
    Bool,
    #[serde(rename = "BIGNUMERIC")]
    BigNumeric,
    #[serde(rename = "TIMESTAMP")]
    Timestamp,
    #[serde(rename = "DATE")]
    Date,
    #[serde(rename = "STRING")]
    String,
}

impl PrimitiveType {
    /// Warehouse type keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::Int64 => "INT64",
            PrimitiveType::Bool => "BOOL",
            PrimitiveType::BigNumeric => "BIGNUMERIC",
            PrimitiveType::Timestamp => "TIMESTAMP",
            PrimitiveType::Date => "DATE",
            PrimitiveType::String => "STRING",
        }
    }
}

impl std::fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inferred output column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredField {
    /// Normalized, warehouse-safe column name
    pub name: String,
    /// Inferred type
    #[serde(rename = "type")]
    pub field_type: PrimitiveType,
    /// Always true for sampled schemas
    pub nullable: bool,
}

impl InferredField {
    /// Create a nullable field
    pub fn new(name: impl Into<String>, field_type: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }
}

/// Observed values of one source column
#[derive(Debug, Clone, Default)]
pub struct ColumnSample {
    /// Raw header name as read from the file
    pub name: String,
    /// Values in row order; `None` where the row was too short
    pub values: Vec<Option<String>>,
}

impl ColumnSample {
    /// Gather the values at `index` across all sampled rows
    pub fn from_rows(name: impl Into<String>, index: usize, rows: &[Vec<Option<String>>]) -> Self {
        let values = rows
            .iter()
            .map(|row| row.get(index).cloned().flatten())
            .collect();
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Header and bounded data rows read from one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampledRows {
    /// Header names as they appear in the file
    pub header: Vec<String>,
    /// Data rows, each padded or truncated to the header width
    pub rows: Vec<Vec<Option<String>>>,
    /// Whether a single-field report title preceded the header
    pub has_title_row: bool,
}

/// Result of a successful inference run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredSchema {
    /// One field per source column, in source order
    pub fields: Vec<InferredField>,
    /// Whether the file starts with a title row before the header
    pub has_title_row: bool,
    /// Number of data rows inspected
    pub sampled_rows: usize,
}

impl InferredSchema {
    /// Number of leading rows a reader must skip to reach the data
    pub fn skip_leading_rows(&self) -> u32 {
        if self.has_title_row {
            2
        } else {
            1
        }
    }

    /// Count of fields per type, ordered by type
    pub fn type_distribution(&self) -> BTreeMap<PrimitiveType, usize> {
        let mut counts = BTreeMap::new();
        for field in &self.fields {
            *counts.entry(field.field_type).or_insert(0) += 1;
        }
        counts
    }

    /// Look up a field by normalized name
    pub fn field(&self, name: &str) -> Option<&InferredField> {
        self.fields.iter().find(|f| f.name == name)
    }
}
