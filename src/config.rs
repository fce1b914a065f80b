//! Configuration types
//!
//! [`AppConfig`] holds the runtime settings resolved by the CLI (flags and
//! `DW_*` environment variables). [`SourceConfig`] is the TOML file that
//! describes which local files belong to which table:
//!
//! ```toml
//! [file.youtube_assets]
//! is_enabled = true
//! select_file_name_base = "YouTube_*_M_*"
//! exclude_file_name_base = "summary"
//! regex_pattern = 'YouTube_(.+)_M_(\d{8})'
//! regex_group_names = ["content_owner", "file_date_key"]
//! storage_folder_name = "youtube_assets"
//! table_append_or_replace = "append"
//! ```

use crate::error::{Error, Result, ResultExt};
use crate::types::TableMode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Default root folder for versioned storage folders
pub const DEFAULT_STORAGE_PREFIX: &str = "caravan-versioned";

/// Longest regex accepted from configuration
pub const MAX_REGEX_LEN: usize = 500;

/// Most `|` alternations accepted in one regex
pub const MAX_REGEX_ALTERNATIONS: usize = 20;

/// Quantified group that is itself quantified, e.g. `(a+)+`
static NESTED_QUANTIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*[+*]\)[+*]").expect("Invalid nested quantifier regex"));

// ============================================================================
// Application Config
// ============================================================================

/// Runtime settings resolved from flags and environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory containing the CSV exports
    pub csv_source_dir: PathBuf,
    /// Path to the source TOML file
    pub csv_source_config: PathBuf,
    /// Warehouse project
    pub gcs_project_id: Option<String>,
    /// Bucket name or URL
    pub gcs_bucket: Option<String>,
    /// Warehouse dataset for external tables
    pub bq_dataset: Option<String>,
    /// Root folder under which versioned storage folders live
    pub bq_storage_prefix: String,
}

impl AppConfig {
    /// Bucket name, or an error naming the missing setting
    pub fn bucket(&self) -> Result<&str> {
        non_empty(self.gcs_bucket.as_deref()).ok_or_else(|| Error::missing_field("gcs_bucket"))
    }

    /// Project id, or an error naming the missing setting
    pub fn project(&self) -> Result<&str> {
        non_empty(self.gcs_project_id.as_deref())
            .ok_or_else(|| Error::missing_field("gcs_project_id"))
    }

    /// Dataset name, or an error naming the missing setting
    pub fn dataset(&self) -> Result<&str> {
        non_empty(self.bq_dataset.as_deref()).ok_or_else(|| Error::missing_field("bq_dataset"))
    }

    /// Storage prefix with surrounding slashes removed
    pub fn storage_prefix(&self) -> &str {
        let prefix = self.bq_storage_prefix.trim_matches('/');
        if prefix.is_empty() {
            DEFAULT_STORAGE_PREFIX
        } else {
            prefix
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Source Config
// ============================================================================

/// All file sources keyed by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// `[file.<id>]` tables
    #[serde(default)]
    pub file: BTreeMap<String, FileSource>,
}

impl SourceConfig {
    /// Enabled sources in id order
    pub fn enabled(&self) -> impl Iterator<Item = (&String, &FileSource)> {
        self.file.iter().filter(|(_, source)| source.is_enabled)
    }
}

/// One kind of export file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    /// Whether this source is scanned
    #[serde(default = "default_true")]
    pub is_enabled: bool,

    /// Storage folder (defaults to `select_file_name_base`)
    #[serde(default)]
    pub storage_folder_name: Option<String>,

    /// Destination table (defaults to `select_file_name_base`)
    #[serde(default)]
    pub table_name: Option<String>,

    /// Glob fragment matched anywhere in the file name
    pub select_file_name_base: String,

    /// Glob fragment that excludes a file
    #[serde(default)]
    pub exclude_file_name_base: Option<String>,

    /// Regex with one capture group per entry of `regex_group_names`
    #[serde(default)]
    pub regex_pattern: Option<String>,

    /// Names for the regex capture groups
    #[serde(default)]
    pub regex_group_names: Option<Vec<String>>,

    /// Load behavior for the destination table
    #[serde(default)]
    pub table_append_or_replace: TableMode,
}

fn default_true() -> bool {
    true
}

impl FileSource {
    /// Folder files are uploaded to, before versioning
    pub fn storage_folder(&self) -> &str {
        self.storage_folder_name
            .as_deref()
            .unwrap_or(&self.select_file_name_base)
    }

    /// Destination table name
    pub fn table(&self) -> &str {
        self.table_name
            .as_deref()
            .unwrap_or(&self.select_file_name_base)
    }

    /// Compile the metadata regex, if any
    pub fn compiled_regex(&self) -> Result<Option<Regex>> {
        self.regex_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(Error::from)
    }

    fn validate(&self, id: &str) -> Result<()> {
        if self.select_file_name_base.trim().is_empty() {
            return Err(Error::invalid_value(
                format!("file.{id}.select_file_name_base"),
                "cannot be empty",
            ));
        }

        match (&self.regex_pattern, &self.regex_group_names) {
            (None, None) => Ok(()),
            (Some(pattern), Some(names)) => {
                validate_regex_complexity(pattern)
                    .map_err(|e| Error::invalid_value(format!("file.{id}.regex_pattern"), e.to_string()))?;
                let regex = Regex::new(pattern)
                    .map_err(|e| Error::invalid_value(format!("file.{id}.regex_pattern"), e.to_string()))?;
                let groups = regex.captures_len() - 1;
                if groups != names.len() {
                    return Err(Error::invalid_value(
                        format!("file.{id}.regex_group_names"),
                        format!(
                            "pattern has {groups} groups but {} names were given",
                            names.len()
                        ),
                    ));
                }
                Ok(())
            }
            _ => Err(Error::invalid_value(
                format!("file.{id}"),
                "regex_pattern and regex_group_names must both be set or both be omitted",
            )),
        }
    }
}

/// Reject regexes likely to backtrack catastrophically
pub fn validate_regex_complexity(pattern: &str) -> Result<()> {
    if pattern.len() > MAX_REGEX_LEN {
        return Err(Error::config(format!(
            "regex longer than {MAX_REGEX_LEN} characters"
        )));
    }
    if NESTED_QUANTIFIER_REGEX.is_match(pattern) {
        return Err(Error::config("regex contains nested quantifiers"));
    }
    let alternations = pattern.matches('|').count();
    if alternations > MAX_REGEX_ALTERNATIONS {
        return Err(Error::config(format!(
            "regex has {alternations} alternations (max {MAX_REGEX_ALTERNATIONS})"
        )));
    }
    Ok(())
}

/// Load and validate a source config file
pub fn load_source_config(path: impl AsRef<Path>) -> Result<SourceConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::Io(e)
        }
    })?;
    load_source_config_from_str(&content)
        .with_context(|| format!("Invalid source config {}", path.display()))
}

/// Parse and validate a source config from TOML text
pub fn load_source_config_from_str(content: &str) -> Result<SourceConfig> {
    let config: SourceConfig = toml::from_str(content)?;

    if config.file.is_empty() {
        return Err(Error::config(
            "Source config must define at least one [file.<id>] table",
        ));
    }
    for (id, source) in &config.file {
        source.validate(id)?;
    }

    Ok(config)
}
