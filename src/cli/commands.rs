//! CLI commands and argument parsing

use crate::config::{AppConfig, DEFAULT_STORAGE_PREFIX};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Datawagon: upload analytics exports and register them as external tables
#[derive(Parser, Debug)]
#[command(name = "datawagon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory containing the CSV exports
    #[arg(long, global = true, env = "DW_CSV_SOURCE_DIR", default_value = ".")]
    pub csv_source_dir: PathBuf,

    /// Source configuration file (TOML)
    #[arg(
        long,
        global = true,
        env = "DW_CSV_SOURCE_TOML",
        default_value = "datawagon.toml"
    )]
    pub csv_source_config: PathBuf,

    /// Warehouse project id
    #[arg(long, global = true, env = "DW_GCS_PROJECT_ID")]
    pub gcs_project_id: Option<String>,

    /// Bucket name or URL (gs://, s3://, r2://, az://, or a local directory)
    #[arg(long, global = true, env = "DW_GCS_BUCKET")]
    pub gcs_bucket: Option<String>,

    /// Warehouse dataset for external tables
    #[arg(long, global = true, env = "DW_BQ_DATASET")]
    pub bq_dataset: Option<String>,

    /// Root folder of the versioned storage folders
    #[arg(long, global = true, env = "DW_BQ_STORAGE_PREFIX", default_value = DEFAULT_STORAGE_PREFIX)]
    pub bq_storage_prefix: String,

    /// DuckDB database file holding the external tables
    #[arg(
        long,
        global = true,
        env = "DW_WAREHOUSE_DB",
        default_value = "datawagon.duckdb"
    )]
    pub warehouse_db: PathBuf,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output (DEBUG level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Runtime settings resolved from flags and environment
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            csv_source_dir: self.csv_source_dir.clone(),
            csv_source_config: self.csv_source_config.clone(),
            gcs_project_id: self.gcs_project_id.clone(),
            gcs_bucket: self.gcs_bucket.clone(),
            bq_dataset: self.bq_dataset.clone(),
            bq_storage_prefix: self.bq_storage_prefix.clone(),
        }
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List matching files in the local source directory
    Scan {
        /// Only files of this kind
        #[arg(long)]
        kind: Option<FileKindArg>,
    },

    /// List files already in the bucket, per source
    Storage,

    /// Compare local files with the bucket
    Compare,

    /// Upload new `.csv.gz` files to the bucket
    Upload {
        /// Show what would be uploaded without uploading
        #[arg(long)]
        dry_run: bool,
    },

    /// Convert matched `.zip` archives into `.csv.gz` files
    ZipToGzip {
        /// Delete each archive after conversion
        #[arg(long)]
        remove_zip: bool,
    },

    /// Infer the schema of one object in the bucket
    InferSchema {
        /// Object name relative to the bucket root
        location: String,

        /// Maximum data rows to sample
        #[arg(long, default_value_t = crate::schema::DEFAULT_SAMPLE_SIZE)]
        sample_size: usize,
    },

    /// Create external tables for storage folders that have none
    CreateTables {
        /// Print DDL instead of creating tables
        #[arg(long)]
        ddl: bool,

        /// Fail a table instead of falling back to autodetect
        #[arg(long)]
        no_autodetect: bool,
    },

    /// List external tables
    ListTables,

    /// Drop external tables
    DropTables {
        /// Table names
        #[arg(required = true)]
        names: Vec<String>,
    },
}

/// File kind filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FileKindArg {
    /// `.csv`
    Csv,
    /// `.csv.gz`
    CsvGz,
    /// `.zip`
    Zip,
}

impl From<FileKindArg> for crate::types::FileKind {
    fn from(kind: FileKindArg) -> Self {
        match kind {
            FileKindArg::Csv => Self::Csv,
            FileKindArg::CsvGz => Self::CsvGz,
            FileKindArg::Zip => Self::Zip,
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
