//! Byte stream sources for schema inference

use super::validate::validate_blob_name;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

/// Something that can open a stored object as a blocking byte stream
///
/// Implementations must stream; the returned reader is consumed only as far
/// as the caller needs.
pub trait ObjectSource: Send + Sync {
    /// Open the object at `location`
    fn open(&self, location: &str) -> Result<Box<dyn Read + Send>>;
}

/// Objects stored as files under a local directory
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    /// Create a source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ObjectSource for LocalSource {
    fn open(&self, location: &str) -> Result<Box<dyn Read + Send>> {
        validate_blob_name(location)?;
        let path = self.root.join(location);
        let file = File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;
        Ok(Box::new(BufReader::new(file)))
    }
}
