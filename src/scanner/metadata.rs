//! Metadata derived from export file names

use crate::config::FileSource;
use crate::error::{Error, Result};
use crate::types::{FileKind, StringMap, TableMode};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// `_v1` or `_v1-2` anywhere in a file name
static FILE_VERSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_v\d+(-\d+)?").expect("Invalid file version regex"));

/// Regex group promoted to [`ManagedFile::content_owner`]
pub const CONTENT_OWNER_GROUP: &str = "content_owner";

/// Regex group promoted to [`ManagedFile::report_date`]
pub const FILE_DATE_KEY_GROUP: &str = "file_date_key";

/// One local export file with everything needed to upload it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedFile {
    /// Id of the `[file.<id>]` source that matched
    pub source_id: String,
    /// Absolute path on disk
    pub path: PathBuf,
    /// File name with extension
    pub file_name: String,
    /// `select_file_name_base` of the matching source
    pub base_name: String,
    /// File format
    pub kind: FileKind,
    /// Size on disk
    pub file_size_bytes: u64,
    /// `v1`, `v1-1`, ... when the name carries a version
    pub file_version: Option<String>,
    /// Month-end date derived from the `file_date_key` group
    pub report_date: Option<NaiveDate>,
    /// Value of the `content_owner` group
    pub content_owner: Option<String>,
    /// Storage folder, suffixed with the version when present
    pub storage_folder_name: String,
    /// Destination table
    pub table_name: String,
    /// Table load behavior
    pub table_mode: TableMode,
    /// Remaining regex groups by name
    pub extra: StringMap,
}

impl ManagedFile {
    /// Build the metadata for a matched file
    pub fn build(
        source_id: &str,
        source: &FileSource,
        regex: Option<&Regex>,
        path: &Path,
    ) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::config(format!("Not a file: {}", path.display())))?;
        let kind = FileKind::from_file_name(&file_name)
            .ok_or_else(|| Error::config(format!("Unsupported file type: {file_name}")))?;
        let file_size_bytes = std::fs::metadata(path)?.len();

        let mut groups = match (regex, source.regex_group_names.as_deref()) {
            (Some(regex), Some(names)) => extract_groups(regex, names, &file_name)?,
            _ => StringMap::new(),
        };

        let report_date = groups
            .remove(FILE_DATE_KEY_GROUP)
            .map(|key| date_key_to_date(&key).map(month_end))
            .transpose()?;
        let content_owner = groups.remove(CONTENT_OWNER_GROUP);

        let file_version = file_version(&file_name);
        let storage_folder_name = versioned_folder(source.storage_folder(), file_version.as_deref());

        Ok(Self {
            source_id: source_id.to_string(),
            path: path.to_path_buf(),
            file_name,
            base_name: source.select_file_name_base.clone(),
            kind,
            file_size_bytes,
            file_version,
            report_date,
            content_owner,
            storage_folder_name,
            table_name: source.table().to_string(),
            table_mode: source.table_append_or_replace,
            extra: groups,
        })
    }

    /// Report date as `YYYY-MM-DD`
    pub fn report_date_str(&self) -> Option<String> {
        self.report_date.map(|d| d.format("%Y-%m-%d").to_string())
    }

    /// Report date as the integer `YYYYMMDD`
    pub fn report_date_key(&self) -> Option<u32> {
        self.report_date
            .map(|d| d.year() as u32 * 10_000 + d.month() * 100 + d.day())
    }

    /// Object name for the upload, under `prefix` when non-empty
    ///
    /// `{prefix}/{folder}/report_date={YYYY-MM-DD}/{file}` when a report date
    /// is known, otherwise `{prefix}/{folder}/{file}`.
    pub fn destination_path(&self, prefix: &str) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(4);
        let prefix = prefix.trim_matches('/');
        if !prefix.is_empty() {
            parts.push(prefix.to_string());
        }
        parts.push(self.storage_folder_name.trim_matches('/').to_string());
        if let Some(date) = self.report_date_str() {
            parts.push(format!("report_date={date}"));
        }
        parts.push(self.file_name.clone());
        parts.join("/")
    }

    /// Human-readable size, e.g. `2.50 MB`
    pub fn human_size(&self) -> String {
        human_readable_size(self.file_size_bytes)
    }
}

/// Match the anchored regex against a file name and name its groups
fn extract_groups(regex: &Regex, names: &[String], file_name: &str) -> Result<StringMap> {
    let captures = regex
        .captures(file_name)
        .filter(|c| c.get(0).is_some_and(|m| m.start() == 0))
        .ok_or_else(|| {
            Error::config(format!(
                "File name '{file_name}' does not match pattern '{}'",
                regex.as_str()
            ))
        })?;

    let mut groups = StringMap::new();
    for (index, name) in names.iter().enumerate() {
        if let Some(value) = captures.get(index + 1) {
            groups.insert(name.clone(), value.as_str().to_string());
        }
    }
    Ok(groups)
}

/// Version tag without the leading underscore, e.g. `v1-1`
pub fn file_version(file_name: &str) -> Option<String> {
    FILE_VERSION_REGEX
        .find(file_name)
        .map(|m| m.as_str().trim_start_matches('_').to_string())
}

/// `{folder}_{version}` for versioned files, `folder` otherwise
pub fn versioned_folder(folder: &str, version: Option<&str>) -> String {
    match version {
        Some(v) if !v.is_empty() => format!("{folder}_{v}"),
        _ => folder.to_string(),
    }
}

/// Parse `YYYYMMDD`, or `YYYYMM` as the first of the month
pub fn date_key_to_date(key: &str) -> Result<NaiveDate> {
    let key = key.trim();
    let invalid = |reason: &str| Error::invalid_value("file_date_key", format!("'{key}': {reason}"));

    if !key.bytes().all(|b| b.is_ascii_digit()) || !matches!(key.len(), 6 | 8) {
        return Err(invalid("expected YYYYMMDD or YYYYMM"));
    }

    let year: i32 = key[0..4].parse().map_err(|_| invalid("bad year"))?;
    let month: u32 = key[4..6].parse().map_err(|_| invalid("bad month"))?;
    let day: u32 = if key.len() == 8 {
        key[6..8].parse().map_err(|_| invalid("bad day"))?
    } else {
        1
    };

    if !(1900..=2100).contains(&year) {
        return Err(invalid("year out of range 1900-2100"));
    }

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid("not a calendar date"))
}

/// Last day of the date's month
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

/// Format a byte count with binary units
pub fn human_readable_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.2} {}", UNITS[unit])
}
