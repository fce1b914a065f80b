//! Local vs. bucket file comparison

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::scanner::{ManagedFile, ManagedFileGroup};
use crate::storage::ObjectEntry;
use crate::types::FileKind;
use glob::Pattern;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// File counts for one base name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompareRow {
    /// `select_file_name_base` of the source
    pub base_name: String,
    /// Files already in the bucket
    pub bucket_count: usize,
    /// Files found locally
    pub local_count: usize,
}

/// Count local and uploaded files per base name, sorted by name
///
/// `remote` maps each base name to the file names already stored for it.
pub fn compare_counts(
    local: &[ManagedFileGroup],
    remote: &BTreeMap<String, Vec<String>>,
) -> Vec<CompareRow> {
    let mut rows: BTreeMap<&str, CompareRow> = BTreeMap::new();

    for group in local {
        let row = rows
            .entry(group.base_name.as_str())
            .or_insert_with(|| CompareRow {
                base_name: group.base_name.clone(),
                bucket_count: 0,
                local_count: 0,
            });
        row.local_count += group.files.len();
    }

    for (base_name, names) in remote {
        let row = rows.entry(base_name.as_str()).or_insert_with(|| CompareRow {
            base_name: base_name.clone(),
            bucket_count: 0,
            local_count: 0,
        });
        row.bucket_count += names.len();
    }

    rows.into_values().collect()
}

/// Bucket file names per base name for every enabled source
///
/// An object belongs to a source when it lives under
/// `{storage_prefix}/{storage_folder}` (versioned folders included) and its
/// name matches `*{base}*.csv.gz`, ignoring case.
pub fn group_remote_files(
    config: &SourceConfig,
    entries: &[ObjectEntry],
    storage_prefix: &str,
) -> Result<BTreeMap<String, Vec<String>>> {
    let storage_prefix = storage_prefix.trim_matches('/');
    let mut remote = BTreeMap::new();

    for (_, source) in config.enabled() {
        let base = source.select_file_name_base.to_lowercase();
        let pattern = Pattern::new(&format!("*{base}*{}", FileKind::CsvGz.extension()))
            .map_err(|e| Error::invalid_value("select_file_name_base", e.to_string()))?;
        let folder = source.storage_folder().trim_matches('/');
        let folder_prefix = if storage_prefix.is_empty() {
            folder.to_string()
        } else {
            format!("{storage_prefix}/{folder}")
        };

        let names: Vec<String> = entries
            .iter()
            .filter(|e| e.path.starts_with(&folder_prefix))
            .map(ObjectEntry::file_name)
            .filter(|name| pattern.matches(&name.to_lowercase()))
            .map(str::to_string)
            .collect();

        remote
            .entry(source.select_file_name_base.clone())
            .or_insert_with(Vec::new)
            .extend(names);
    }

    Ok(remote)
}

/// Local files whose name is not yet in the bucket
pub fn find_new_files<'a>(
    local: &'a [ManagedFileGroup],
    remote_names: &HashSet<String>,
) -> Vec<&'a ManagedFile> {
    local
        .iter()
        .flat_map(|group| group.files.iter())
        .filter(|file| !remote_names.contains(&file.file_name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_source_config_from_str;
    use crate::types::{FileKind, StringMap, TableMode};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn file(name: &str) -> ManagedFile {
        ManagedFile {
            source_id: "src".to_string(),
            path: PathBuf::from(format!("/data/{name}")),
            file_name: name.to_string(),
            base_name: "base".to_string(),
            kind: FileKind::CsvGz,
            file_size_bytes: 10,
            file_version: None,
            report_date: None,
            content_owner: None,
            storage_folder_name: "base".to_string(),
            table_name: "base".to_string(),
            table_mode: TableMode::Append,
            extra: StringMap::new(),
        }
    }

    fn group(base: &str, names: &[&str]) -> ManagedFileGroup {
        ManagedFileGroup {
            source_id: base.to_string(),
            base_name: base.to_string(),
            table_name: base.to_string(),
            table_mode: TableMode::Append,
            files: names.iter().map(|n| file(n)).collect(),
        }
    }

    #[test]
    fn test_compare_counts() {
        let local = vec![group("zeta", &["a.csv.gz", "b.csv.gz"]), group("alpha", &[])];
        let mut remote = BTreeMap::new();
        remote.insert("zeta".to_string(), vec!["a.csv.gz".to_string()]);
        remote.insert("beta".to_string(), vec!["x.csv.gz".to_string()]);

        let rows = compare_counts(&local, &remote);
        assert_eq!(
            rows,
            vec![
                CompareRow {
                    base_name: "alpha".to_string(),
                    bucket_count: 0,
                    local_count: 0
                },
                CompareRow {
                    base_name: "beta".to_string(),
                    bucket_count: 1,
                    local_count: 0
                },
                CompareRow {
                    base_name: "zeta".to_string(),
                    bucket_count: 1,
                    local_count: 2
                },
            ]
        );
    }

    #[test]
    fn test_find_new_files() {
        let local = vec![group("zeta", &["a.csv.gz", "b.csv.gz"])];
        let remote: HashSet<String> = ["a.csv.gz".to_string()].into_iter().collect();

        let new_files = find_new_files(&local, &remote);
        let names: Vec<&str> = new_files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["b.csv.gz"]);
    }

    #[test]
    fn test_group_remote_files() {
        let config = load_source_config_from_str(
            r#"
[file.claims]
select_file_name_base = "claim_raw"
storage_folder_name = "claim_raw"

[file.assets]
select_file_name_base = "asset"
storage_folder_name = "assets"
"#,
        )
        .unwrap();
        let entries: Vec<ObjectEntry> = [
            "caravan/claim_raw_v1-1/report_date=2023-06-30/Claim_Raw_202306.csv.gz",
            "caravan/claim_raw/claim_raw_202305.csv.gz",
            "caravan/claim_raw/claim_raw_202305.csv",
            "caravan/assets/other.csv.gz",
            "elsewhere/claim_raw/claim_raw_202301.csv.gz",
        ]
        .iter()
        .map(|p| ObjectEntry {
            path: (*p).to_string(),
            size: 1,
            last_modified: Utc::now(),
        })
        .collect();

        let remote = group_remote_files(&config, &entries, "caravan").unwrap();
        assert_eq!(
            remote.get("claim_raw").unwrap(),
            &vec![
                "Claim_Raw_202306.csv.gz".to_string(),
                "claim_raw_202305.csv.gz".to_string()
            ]
        );
        assert!(remote.get("asset").unwrap().is_empty());
    }
}
