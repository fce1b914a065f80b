//! Object name and path validation

use crate::error::{Error, Result};
use std::path::{Component, Path};

/// Longest object name accepted by the bucket
pub const MAX_BLOB_NAME_LEN: usize = 1024;

/// Validate an object name before any read or write
///
/// Rejects empty names, names over [`MAX_BLOB_NAME_LEN`] bytes, control
/// characters, absolute names and `..` segments. URL-encoded names are
/// decoded and checked again, so `%2e%2e/` is caught as well.
pub fn validate_blob_name(name: &str) -> Result<()> {
    validate_decoded(name, name, 0)
}

fn validate_decoded(original: &str, name: &str, depth: usize) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name(original, "name cannot be empty"));
    }
    if name.len() > MAX_BLOB_NAME_LEN {
        return Err(Error::invalid_name(
            original,
            format!("name exceeds {MAX_BLOB_NAME_LEN} bytes"),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::invalid_name(original, "control characters"));
    }
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(Error::invalid_name(original, "absolute path"));
    }
    if name.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(Error::invalid_name(original, "path traversal"));
    }

    if depth < 3 && name.contains('%') {
        if let Ok(decoded) = urlencoding::decode(name) {
            if decoded != name {
                return validate_decoded(original, &decoded, depth + 1);
            }
        }
    }

    Ok(())
}

/// Check that `path` stays inside `base` once resolved
pub fn validate_path_within(base: &Path, path: &Path) -> Result<()> {
    let relative = path.strip_prefix(base).unwrap_or(path);
    if relative.is_absolute()
        || relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        return Err(Error::invalid_name(
            path.display().to_string(),
            format!("escapes {}", base.display()),
        ));
    }

    if let (Ok(base), Ok(resolved)) = (base.canonicalize(), path.canonicalize()) {
        if !resolved.starts_with(&base) {
            return Err(Error::invalid_name(
                path.display().to_string(),
                format!("resolves outside {}", base.display()),
            ));
        }
    }

    Ok(())
}
