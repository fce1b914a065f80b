//! Storage folder discovery
//!
//! Every versioned storage folder in the bucket maps to one external table.

use crate::storage::ObjectEntry;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Hive partition folder segment written by the uploader
pub const PARTITION_SEGMENT: &str = "report_date=";

/// Sample files kept per folder summary
const MAX_SAMPLE_FILES: usize = 3;

static VERSION_SUFFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_v\d+(-\d+)?$").expect("Invalid version suffix regex"));

static PARTITION_COLUMN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\w+)=\*").expect("Invalid partition column regex"));

/// One storage folder holding `.csv.gz` objects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageFolder {
    /// Folder path relative to the bucket root
    pub storage_folder_name: String,
    /// Folder name without the version suffix
    pub table_name: String,
    /// Version suffix such as `v1-1`, empty when unversioned
    pub file_version: String,
    /// Warehouse table name for this folder
    pub proposed_table_name: String,
    /// Number of `.csv.gz` objects
    pub file_count: usize,
    /// Whether objects live under `report_date=` folders
    pub has_partitioning: bool,
    /// First few object paths
    pub sample_files: Vec<String>,
}

/// Warehouse-safe table name: `name_version` with `-` replaced by `_`
pub fn normalize_table_name(table_name: &str, file_version: &str) -> String {
    if file_version.is_empty() {
        table_name.to_string()
    } else {
        format!("{table_name}_{}", file_version.replace('-', "_"))
    }
}

/// Partition column names in a source URI, e.g. `.../report_date=*/...`
pub fn partition_columns(uri: &str) -> Vec<String> {
    PARTITION_COLUMN_REGEX
        .captures_iter(uri)
        .map(|c| c[1].to_string())
        .collect()
}

/// Folder containing an object: the path before the partition segment, or
/// the parent directory when unpartitioned
fn folder_of(path: &str) -> Option<String> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() < 2 {
        return None;
    }
    let end = parts
        .iter()
        .position(|p| p.contains(PARTITION_SEGMENT))
        .unwrap_or(parts.len() - 1);
    Some(parts[..end].join("/"))
}

/// Group `.csv.gz` objects by storage folder, sorted by proposed table name
pub fn scan_storage_folders(entries: &[ObjectEntry], prefix: &str) -> Vec<StorageFolder> {
    let prefix = prefix.trim_matches('/');
    let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();

    for entry in entries {
        let path = entry.path.as_str();
        if !path.ends_with(".csv.gz") {
            continue;
        }
        if !prefix.is_empty() && !path.starts_with(&format!("{prefix}/")) {
            continue;
        }
        if let Some(folder) = folder_of(path) {
            groups.entry(folder).or_default().push(path);
        }
    }

    let mut folders: Vec<StorageFolder> = groups
        .into_iter()
        .map(|(folder, files)| {
            let folder_name = folder.rsplit('/').next().unwrap_or(&folder);
            let (table_name, file_version) = match VERSION_SUFFIX_REGEX.find(folder_name) {
                Some(m) => (
                    folder_name[..m.start()].to_string(),
                    m.as_str().trim_start_matches('_').to_string(),
                ),
                None => (folder_name.to_string(), String::new()),
            };

            StorageFolder {
                proposed_table_name: normalize_table_name(&table_name, &file_version),
                has_partitioning: files.iter().any(|f| f.contains(PARTITION_SEGMENT)),
                file_count: files.len(),
                sample_files: files
                    .iter()
                    .take(MAX_SAMPLE_FILES)
                    .map(|f| (*f).to_string())
                    .collect(),
                storage_folder_name: folder,
                table_name,
                file_version,
            }
        })
        .collect();

    folders.sort_by(|a, b| a.proposed_table_name.cmp(&b.proposed_table_name));
    folders
}
