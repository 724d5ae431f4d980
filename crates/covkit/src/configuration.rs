//! Harness-side coverage configuration
//!
//! A configuration only exists once collection has been decided: it carries a
//! directory that was checked to exist and accept writes, and the format the
//! collector must produce.

use crate::format::CoverageFormat;
use crate::result::{CoverageError, CoverageResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where to write coverage output, and in which format
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CoverageConfiguration {
    coverage_directory: PathBuf,
    format: CoverageFormat,
}

impl CoverageConfiguration {
    /// Create a configuration for an existing, writable directory
    ///
    /// # Errors
    ///
    /// Returns `CoverageError::InvalidDirectory` if the path is missing, is not a
    /// directory, or rejects writes.
    pub fn new(coverage_directory: impl Into<PathBuf>, format: CoverageFormat) -> CoverageResult<Self> {
        let coverage_directory = coverage_directory.into();
        validate_directory(&coverage_directory)?;
        debug!(
            directory = %coverage_directory.display(),
            %format,
            "coverage configuration accepted"
        );
        Ok(Self {
            coverage_directory,
            format,
        })
    }

    /// Create the directory (and parents) if needed, then validate it
    ///
    /// # Errors
    ///
    /// Returns `CoverageError::InvalidDirectory` if the directory cannot be
    /// created or fails validation.
    pub fn create(coverage_directory: impl Into<PathBuf>, format: CoverageFormat) -> CoverageResult<Self> {
        let coverage_directory = coverage_directory.into();
        fs::create_dir_all(&coverage_directory).map_err(|e| {
            CoverageError::invalid_directory(&coverage_directory, format!("cannot create: {e}"))
        })?;
        Self::new(coverage_directory, format)
    }

    /// Directory the collector writes into
    #[must_use]
    pub fn coverage_directory(&self) -> &Path {
        &self.coverage_directory
    }

    /// Format the collector must produce
    #[must_use]
    pub const fn format(&self) -> CoverageFormat {
        self.format
    }
}

fn validate_directory(path: &Path) -> CoverageResult<()> {
    let metadata = fs::metadata(path)
        .map_err(|e| CoverageError::invalid_directory(path, format!("cannot stat: {e}")))?;
    if !metadata.is_dir() {
        return Err(CoverageError::invalid_directory(path, "not a directory"));
    }
    // Anonymous file, removed when dropped.
    tempfile::tempfile_in(path)
        .map_err(|e| CoverageError::invalid_directory(path, format!("not writable: {e}")))?;
    Ok(())
}
