//! Scanner module
//!
//! Finds export files in the local source directory and derives upload
//! metadata (version, report date, storage folder) from their names.

mod metadata;
mod scan;

pub use metadata::{
    date_key_to_date, file_version, human_readable_size, month_end, versioned_folder,
    ManagedFile, CONTENT_OWNER_GROUP, FILE_DATE_KEY_GROUP,
};
pub use scan::{find_files, FileScanner, ManagedFileGroup};

#[cfg(test)]
mod tests;
