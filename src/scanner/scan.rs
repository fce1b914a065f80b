//! Local directory scanning

use super::metadata::ManagedFile;
use crate::config::{FileSource, SourceConfig};
use crate::error::{Error, Result};
use crate::storage::validate_path_within;
use crate::types::{FileKind, TableMode};
use glob::{glob_with, MatchOptions, Pattern};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Editor lock files are never picked up
const LOCK_FILE_PREFIX: &str = ".~lock";

/// Files matched by one source, bound for one table
#[derive(Debug, Clone, Serialize)]
pub struct ManagedFileGroup {
    /// Source id
    pub source_id: String,
    /// `select_file_name_base` of the source
    pub base_name: String,
    /// Destination table
    pub table_name: String,
    /// Table load behavior
    pub table_mode: TableMode,
    /// Matched files, sorted by path
    pub files: Vec<ManagedFile>,
}

/// Scans a source directory using a [`SourceConfig`]
#[derive(Debug, Clone)]
pub struct FileScanner {
    source_dir: PathBuf,
    config: SourceConfig,
}

impl FileScanner {
    /// Create a scanner over `source_dir`
    pub fn new(source_dir: impl Into<PathBuf>, config: SourceConfig) -> Self {
        Self {
            source_dir: source_dir.into(),
            config,
        }
    }

    /// Source configuration in use
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Scan every enabled source, optionally restricted to one file kind
    ///
    /// A file matched by more than one source is an error.
    pub fn scan(&self, kind: Option<FileKind>) -> Result<Vec<ManagedFileGroup>> {
        if !self.source_dir.is_dir() {
            return Err(Error::FileNotFound {
                path: self.source_dir.display().to_string(),
            });
        }

        let mut groups = Vec::new();
        let mut owners: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();

        for (id, source) in self.config.enabled() {
            let group = self.scan_source(id, source, kind)?;
            for file in &group.files {
                owners.entry(file.path.clone()).or_default().push(id.clone());
            }
            groups.push(group);
        }

        if let Some((path, sources)) = owners.into_iter().find(|(_, ids)| ids.len() > 1) {
            return Err(Error::DuplicateFile {
                file: path.display().to_string(),
                sources,
            });
        }

        Ok(groups)
    }

    /// Scan for a single source
    pub fn scan_source(
        &self,
        id: &str,
        source: &FileSource,
        kind: Option<FileKind>,
    ) -> Result<ManagedFileGroup> {
        let regex = source.compiled_regex()?;
        let paths = find_files(
            &self.source_dir,
            &source.select_file_name_base,
            source.exclude_file_name_base.as_deref(),
            kind,
        )?;
        debug!("Source '{}' matched {} files", id, paths.len());

        let files = paths
            .iter()
            .map(|path| ManagedFile::build(id, source, regex.as_ref(), path))
            .collect::<Result<Vec<_>>>()?;

        Ok(ManagedFileGroup {
            source_id: id.to_string(),
            base_name: source.select_file_name_base.clone(),
            table_name: source.table().to_string(),
            table_mode: source.table_append_or_replace,
            files,
        })
    }
}

/// Recursively find files named `*{base}*{ext}`, case-insensitively
///
/// Files containing `exclude` and editor lock files are skipped. Results are
/// sorted by path.
pub fn find_files(
    base: &Path,
    select: &str,
    exclude: Option<&str>,
    kind: Option<FileKind>,
) -> Result<Vec<PathBuf>> {
    let extension = kind.map_or("", |k| k.extension());
    let full_pattern = format!(
        "{}/**/*{select}*{extension}",
        Pattern::escape(&base.display().to_string())
    );
    let exclude = exclude
        .map(|e| Pattern::new(&format!("*{}*", e.to_lowercase())))
        .transpose()
        .map_err(|e| Error::invalid_value("exclude_file_name_base", e.to_string()))?;

    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let entries = glob_with(&full_pattern, options)
        .map_err(|e| Error::invalid_value("select_file_name_base", e.to_string()))?;

    let mut matches = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Error accessing path: {}", e);
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if name.starts_with(LOCK_FILE_PREFIX) {
            continue;
        }
        if kind.is_none() && FileKind::from_file_name(&name).is_none() {
            continue;
        }
        if exclude.as_ref().is_some_and(|p| p.matches(&name.to_lowercase())) {
            continue;
        }
        if let Err(e) = validate_path_within(base, &path) {
            error!("Path validation failed: {}", e);
            continue;
        }

        matches.push(path);
    }

    matches.sort();
    Ok(matches)
}
