//! Error types for storage and resolution
//!
//! Expected absence (missing keys, profiles or records) is never an error;
//! it is represented by defaults. These types cover backend failures and
//! contract violations at the public boundary.

use thiserror::Error;

/// Errors from persisted store operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error reading/writing the backing store
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error at the host boundary
    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A name starting with `@` that is not `@base` or `@base.path`
    #[error("invalid nested item name '{0}' - expected '@base' or '@base.path'")]
    InvalidName(String),
}

/// Result type for persisted store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors from configuration resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The persisted store could not be read
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Host argument was neither absent, a query string, nor an object
    #[error("invalid host argument: expected a query string or an object, got {0}")]
    InvalidArgument(String),
}

/// Result type for configuration resolution
pub type ResolveResult<T> = Result<T, ResolveError>;
