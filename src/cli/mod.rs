//! CLI module
//!
//! Command-line interface for the upload and table workflow.
//!
//! # Commands
//!
//! - `scan` - List matching local files
//! - `storage` - List files already in the bucket
//! - `compare` - Compare local files with the bucket
//! - `upload` - Upload new files
//! - `zip-to-gzip` - Convert zip archives to `.csv.gz`
//! - `infer-schema` - Infer the schema of one object
//! - `create-tables` - Create external tables for new storage folders
//! - `list-tables` / `drop-tables` - Manage external tables

mod commands;
mod runner;

pub use commands::{Cli, Commands, FileKindArg, OutputFormat};
pub use runner::Runner;
