//! Result and error types for Covkit.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for Covkit operations
pub type CoverageResult<T> = Result<T, CoverageError>;

/// Errors that can occur while configuring or collecting coverage
#[derive(Debug, Error)]
pub enum CoverageError {
    /// Coverage directory does not exist, is not a directory, or is not writable
    #[error("Invalid coverage directory {}: {reason}", .path.display())]
    InvalidDirectory {
        /// Rejected path
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// The test run finished without producing profiling data
    #[error("No coverage data: {reason}")]
    NoData {
        /// Why no data is available
        reason: String,
    },

    /// External conversion tool missing or failed
    #[error("Coverage conversion failed: {message}")]
    Conversion {
        /// Error message
        message: String,
    },

    /// Operation called in the wrong collector state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoverageError {
    /// Create an invalid directory error
    #[must_use]
    pub fn invalid_directory(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::InvalidDirectory {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create a no-data outcome
    #[must_use]
    pub fn no_data(reason: impl Into<String>) -> Self {
        Self::NoData {
            reason: reason.into(),
        }
    }

    /// Create a conversion error
    #[must_use]
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Classify the error
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidDirectory { .. } => FailureKind::InvalidDirectory,
            Self::NoData { .. } => FailureKind::NoData,
            Self::Conversion { .. } => FailureKind::Conversion,
            Self::InvalidState { .. } => FailureKind::InvalidState,
            Self::Io(_) => FailureKind::Io,
            Self::Json(_) => FailureKind::Json,
        }
    }

    /// True when the run produced nothing to collect
    #[must_use]
    pub const fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }
}

/// Error classification recorded in a failed collector state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Directory rejected
    InvalidDirectory,
    /// Nothing to collect
    NoData,
    /// Conversion tool failed
    Conversion,
    /// Wrong collector state
    InvalidState,
    /// Filesystem failure
    Io,
    /// Malformed JSON
    Json,
}
