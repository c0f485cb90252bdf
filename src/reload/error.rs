//! Error types for change detection and reloading.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::UnitId;

/// Errors from reloader operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReloadError {
    #[error("Unit '{unit}' carries no version tag")]
    NoVersionTag { unit: UnitId },

    #[error("Artifact not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Cannot read {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Failed to load unit '{unit}': {reason}")]
    LoadFailure { unit: UnitId, reason: String },

    #[error("Tick failed: {reason}")]
    TickFailure { reason: String },

    #[error("Check interval must be a positive number of milliseconds")]
    InvalidInterval,

    #[error("Reloader service is stopped")]
    ServiceStopped,

    #[error("No tokio runtime to run the reloader service on")]
    NoRuntime,

    #[error("Invalid artifact {path}: {reason}")]
    Artifact { path: PathBuf, reason: String },
}

impl ReloadError {
    /// Classify an I/O failure on `path`, keeping "not found" distinct.
    pub fn from_io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            ReloadError::FileNotFound { path }
        } else {
            ReloadError::Io {
                path,
                reason: err.to_string(),
            }
        }
    }
}

pub type ReloadResult<T> = Result<T, ReloadError>;
