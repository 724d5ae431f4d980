//! Client-side coverage request
//!
//! The decoded form of what a client asked for. `collect` and `format` are
//! independent: a client can state a preferred format while collection is off.

use crate::configuration::CoverageConfiguration;
use crate::format::CoverageFormat;
use crate::result::CoverageResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Whether to collect coverage, and in what format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CoverageRequest {
    collect: bool,
    format: CoverageFormat,
}

impl CoverageRequest {
    /// Create a request. Any combination is valid.
    #[must_use]
    pub const fn new(collect: bool, format: CoverageFormat) -> Self {
        Self { collect, format }
    }

    /// Request collection in `format`
    #[must_use]
    pub const fn enabled(format: CoverageFormat) -> Self {
        Self::new(true, format)
    }

    /// Request no collection
    #[must_use]
    pub const fn disabled() -> Self {
        Self::new(false, CoverageFormat::Exported)
    }

    /// Whether coverage should be collected
    #[must_use]
    pub const fn collect(&self) -> bool {
        self.collect
    }

    /// Preferred format; only meaningful when `collect()` is true
    #[must_use]
    pub const fn format(&self) -> CoverageFormat {
        self.format
    }

    /// Turn the request into a configuration for an existing directory
    ///
    /// Returns `Ok(None)` without touching `directory` when collection was not
    /// requested.
    ///
    /// # Errors
    ///
    /// Returns `CoverageError::InvalidDirectory` if collection was requested and
    /// the directory is unusable.
    pub fn resolve(&self, directory: impl Into<PathBuf>) -> CoverageResult<Option<CoverageConfiguration>> {
        if !self.collect {
            debug!("coverage not requested");
            return Ok(None);
        }
        CoverageConfiguration::new(directory, self.format).map(Some)
    }

    /// Like [`resolve`](Self::resolve), but creates the directory first
    ///
    /// # Errors
    ///
    /// Returns `CoverageError::InvalidDirectory` if the directory cannot be
    /// created or is unusable.
    pub fn resolve_or_create(
        &self,
        directory: impl Into<PathBuf>,
    ) -> CoverageResult<Option<CoverageConfiguration>> {
        if !self.collect {
            debug!("coverage not requested");
            return Ok(None);
        }
        CoverageConfiguration::create(directory, self.format).map(Some)
    }
}
