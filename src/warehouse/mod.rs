//! Warehouse module
//!
//! Registers uploaded storage folders as queryable external tables.
//!
//! # Features
//!
//! - **Folder Discovery**: Groups `.csv.gz` objects into versioned storage folders
//! - **DDL Rendering**: BigQuery `CREATE EXTERNAL TABLE` statements with Hive partitioning
//! - **DuckDB Backend**: Views over `read_csv` for local and cloud buckets

mod engine;
mod folders;
mod table;

pub use engine::{duckdb_type, DuckDbWarehouse};
pub use folders::{
    normalize_table_name, partition_columns, scan_storage_folders, StorageFolder,
    PARTITION_SEGMENT,
};
pub use table::ExternalTableSpec;

use crate::error::Result;
use serde::Serialize;

/// An existing external table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    /// Table name within the dataset
    pub table_name: String,
    /// Object globs the table reads
    pub source_uris: Vec<String>,
    /// Hive partition columns
    pub partition_columns: Vec<String>,
    /// Leading rows skipped per file
    pub skip_rows: u32,
    /// Whether columns were auto-detected
    pub autodetect: bool,
}

/// Analytical warehouse holding external tables
pub trait Warehouse {
    /// Create (or replace) an external table
    fn create_external_table(&self, spec: &ExternalTableSpec) -> Result<()>;

    /// All external tables, sorted by name
    fn list_tables(&self) -> Result<Vec<TableInfo>>;

    /// Check if a table exists
    fn table_exists(&self, table: &str) -> Result<bool>;

    /// Drop a table, `TableNotFound` if missing
    fn drop_table(&self, table: &str) -> Result<()>;
}
