//! Common types used throughout DataWagon
//!
//! This module contains shared type definitions used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// Extra named values captured from a file name, ordered by key
pub type StringMap = BTreeMap<String, String>;

// ============================================================================
// Table Mode
// ============================================================================

/// How loads into an existing table behave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableMode {
    /// Add new files next to existing ones
    #[default]
    Append,
    /// Replace the table contents
    Replace,
}

impl std::fmt::Display for TableMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableMode::Append => write!(f, "append"),
            TableMode::Replace => write!(f, "replace"),
        }
    }
}

// ============================================================================
// File Kinds
// ============================================================================

/// Local file formats the scanner picks up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Plain `.csv`
    Csv,
    /// Gzip-compressed `.csv.gz`
    CsvGz,
    /// `.zip` archive of CSV files
    Zip,
}

impl FileKind {
    /// File name suffix
    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Csv => ".csv",
            FileKind::CsvGz => ".csv.gz",
            FileKind::Zip => ".zip",
        }
    }

    /// Detect the kind from a file name (case-insensitive)
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".csv.gz") {
            Some(FileKind::CsvGz)
        } else if lower.ends_with(".csv") {
            Some(FileKind::Csv)
        } else if lower.ends_with(".zip") {
            Some(FileKind::Zip)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_detection() {
        assert_eq!(FileKind::from_file_name("a.CSV"), Some(FileKind::Csv));
        assert_eq!(FileKind::from_file_name("a.csv.gz"), Some(FileKind::CsvGz));
        assert_eq!(FileKind::from_file_name("a.zip"), Some(FileKind::Zip));
        assert_eq!(FileKind::from_file_name("a.gz"), None);
    }

    #[test]
    fn test_table_mode_serde() {
        let mode: TableMode = serde_json::from_str("\"replace\"").unwrap();
        assert_eq!(mode, TableMode::Replace);
        assert_eq!(TableMode::default().to_string(), "append");
    }
}
