//! Error types for DataWagon
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! Schema inference keeps its own [`crate::schema::SampleError`] because its
//! failures never leave the inference engine.

use thiserror::Error;

/// The main error type for DataWagon
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid regex: {0}")]
    Regex(#[from] regex::Error),

    // ============================================================================
    // Validation Errors
    // ============================================================================
    #[error("Invalid object name '{name}': {message}")]
    InvalidObjectName { name: String, message: String },

    #[error("Unsafe archive '{path}': {message}")]
    UnsafeArchive { path: String, message: String },

    #[error("Duplicate file '{file}' matched by sources {sources:?}")]
    DuplicateFile { file: String, sources: Vec<String> },

    // ============================================================================
    // Storage Errors
    // ============================================================================
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Object already exists: {path}")]
    AlreadyExists { path: String },

    #[error("Object not found: {path}")]
    ObjectNotFound { path: String },

    #[error("Max retries ({max_retries}) exceeded: {message}")]
    MaxRetriesExceeded { max_retries: u32, message: String },

    // ============================================================================
    // Warehouse Errors
    // ============================================================================
    #[error("Warehouse error: {message}")]
    Warehouse { message: String },

    #[error("Table '{table}' not found")]
    TableNotFound { table: String },

    #[error("Schema inference failed for '{location}'")]
    SchemaUnavailable { location: String },

    // ============================================================================
    // Archive Errors
    // ============================================================================
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid object name error
    pub fn invalid_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidObjectName {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an unsafe archive error
    pub fn unsafe_archive(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsafeArchive {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a warehouse error
    pub fn warehouse(message: impl Into<String>) -> Self {
        Self::Warehouse {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Only transient object store failures qualify. Missing objects,
    /// precondition failures and local errors are returned immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ObjectStore(e) => is_retryable_store_error(e),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

/// Check if an object store error is transient
fn is_retryable_store_error(err: &object_store::Error) -> bool {
    !matches!(
        err,
        object_store::Error::NotFound { .. }
            | object_store::Error::AlreadyExists { .. }
            | object_store::Error::Precondition { .. }
            | object_store::Error::NotSupported { .. }
            | object_store::Error::NotImplemented
            | object_store::Error::InvalidPath { .. }
            | object_store::Error::UnknownConfigurationKey { .. }
    )
}

/// Result type alias for DataWagon
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
