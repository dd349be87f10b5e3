//! Error types for memokit
//!
//! Every error is local to one memoized call and is never retried here.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// memokit error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Key construction
    // ========================================================================
    /// Call arguments do not match the declared signature.
    #[error("Argument binding error for {callable}: {message}")]
    ArgumentBinding { callable: String, message: String },

    /// A parameter value has no hashable normal form.
    #[error("Parameter '{param}' is not hashable: {reason}")]
    NotHashable { param: String, reason: String },

    // ========================================================================
    // Storage
    // ========================================================================
    #[error("Storage unavailable at {}: {reason}", .path.display())]
    StorageUnavailable { path: PathBuf, reason: String },

    #[error("Invalid storage configuration: {0}")]
    InvalidStorageConfiguration(String),

    // ========================================================================
    // Wrapped computation
    // ========================================================================
    #[error("Computation failed: {0}")]
    Computation(#[source] anyhow::Error),

    // ========================================================================
    // Config
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // External conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Errors caused by how the caller described or invoked the callable
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::ArgumentBinding { .. }
                | Error::NotHashable { .. }
                | Error::InvalidStorageConfiguration(_)
        )
    }

    /// Errors raised by a storage backend
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::StorageUnavailable { .. } | Error::Io(_))
    }

    pub fn binding(callable: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ArgumentBinding {
            callable: callable.into(),
            message: message.into(),
        }
    }

    pub fn not_hashable(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::NotHashable {
            param: param.into(),
            reason: reason.into(),
        }
    }

    pub fn storage_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::StorageUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
