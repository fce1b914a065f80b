//! Zip to gzip conversion
//!
//! Export bundles arrive as `.zip` archives; the bucket stores one
//! `.csv.gz` per CSV entry.

use crate::error::{Error, Result, ResultExt};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// Archive resource limits
#[derive(Debug, Clone, Copy)]
pub struct ZipLimits {
    /// Total uncompressed bytes across all entries
    pub max_total_size: u64,
    /// Entries in the archive
    pub max_entries: usize,
    /// Compression ratio above which a warning is logged
    pub warn_ratio: f64,
}

impl Default for ZipLimits {
    fn default() -> Self {
        Self {
            max_total_size: 1024 * 1024 * 1024,
            max_entries: 10_000,
            warn_ratio: 100.0,
        }
    }
}

/// Reject archives that would expand beyond the limits
pub fn check_zip_safety(path: &Path, limits: &ZipLimits) -> Result<()> {
    let display = path.display().to_string();
    let compressed_size = fs::metadata(path)?.len();
    let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))
        .map_err(|e| Error::unsafe_archive(&display, format!("invalid zip file: {e}")))?;

    if archive.len() > limits.max_entries {
        return Err(Error::unsafe_archive(
            &display,
            format!(
                "{} entries exceeds limit of {}",
                archive.len(),
                limits.max_entries
            ),
        ));
    }

    let mut total: u64 = 0;
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        if entry.enclosed_name().is_none() {
            return Err(Error::unsafe_archive(
                &display,
                format!("entry '{}' escapes the archive directory", entry.name()),
            ));
        }
        total = total.saturating_add(entry.size());
    }

    if total > limits.max_total_size {
        return Err(Error::unsafe_archive(
            &display,
            format!(
                "decompressed size ({total} bytes) exceeds limit ({} bytes)",
                limits.max_total_size
            ),
        ));
    }

    if compressed_size > 0 {
        let ratio = total as f64 / compressed_size as f64;
        if ratio > limits.warn_ratio {
            warn!("High compression ratio: {ratio:.1}:1 for {}", path.display());
        }
    }

    Ok(())
}

/// Convert every CSV entry of a zip archive into a sibling `.csv.gz`
///
/// Entries under `__MACOSX/` and non-CSV entries are skipped. Two entries
/// with the same base name are rejected before anything is written. Returns
/// the written paths. The archive is deleted afterwards when `remove_zip` is
/// set.
pub fn zip_to_gzip(zip_path: &Path, remove_zip: bool, limits: &ZipLimits) -> Result<Vec<PathBuf>> {
    check_zip_safety(zip_path, limits)?;

    let display = zip_path.display().to_string();
    let out_dir = zip_path.parent().unwrap_or_else(|| Path::new("."));
    let mut archive = ZipArchive::new(BufReader::new(File::open(zip_path)?))?;
    let plan = plan_entries(&mut archive, &display)?;

    let mut written = Vec::new();
    let mut remaining = limits.max_total_size;

    for (index, file_name) in plan {
        let mut entry = archive.by_index(index)?;
        let out_path = out_dir.join(format!("{file_name}.gz"));
        let partial = out_dir.join(format!("{file_name}.gz.partial"));

        let copied = match write_gzip(&mut entry, &partial, remaining) {
            Ok(copied) => copied,
            Err(e) => {
                let _ = fs::remove_file(&partial);
                return Err(e);
            }
        };
        if copied > remaining {
            let _ = fs::remove_file(&partial);
            return Err(Error::unsafe_archive(
                &display,
                "decompressed data exceeds the size limit",
            ));
        }
        remaining -= copied;
        fs::rename(&partial, &out_path)
            .with_context(|| format!("Failed to move {} into place", partial.display()))?;

        info!("Converted {} -> {}", entry.name(), out_path.display());
        written.push(out_path);
    }

    if remove_zip {
        fs::remove_file(zip_path)
            .with_context(|| format!("Failed to remove {}", zip_path.display()))?;
        info!("Removed {}", zip_path.display());
    }

    Ok(written)
}

/// Index and output base name of every CSV entry to convert
fn plan_entries<R: Read + io::Seek>(
    archive: &mut ZipArchive<R>,
    display: &str,
) -> Result<Vec<(usize, String)>> {
    let mut plan = Vec::new();
    let mut seen = HashSet::new();

    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        let name = entry.name().to_string();

        if entry.is_dir() || name.starts_with("__MACOSX/") {
            continue;
        }
        if !name.to_ascii_lowercase().ends_with(".csv") {
            debug!("Skipping non-CSV entry {}", name);
            continue;
        }

        let Some(file_name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        else {
            return Err(Error::unsafe_archive(
                display,
                format!("entry '{name}' has no usable file name"),
            ));
        };
        if !seen.insert(file_name.to_lowercase()) {
            return Err(Error::unsafe_archive(
                display,
                format!("entry '{name}' collides with another entry named '{file_name}'"),
            ));
        }

        plan.push((index, file_name));
    }

    Ok(plan)
}

/// Gzip at most `limit + 1` bytes of `entry` into `path`, returning the bytes read
fn write_gzip(entry: impl Read, path: &Path, limit: u64) -> Result<u64> {
    let mut encoder = GzEncoder::new(BufWriter::new(File::create(path)?), Compression::default());
    let copied = io::copy(&mut entry.take(limit.saturating_add(1)), &mut encoder)?;
    encoder.finish()?.flush()?;
    Ok(copied)
}
