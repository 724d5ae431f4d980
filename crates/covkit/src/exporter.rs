//! Conversion of raw profiles into the portable export format.

use crate::raw::RawProfileOutput;
use crate::result::{CoverageError, CoverageResult};
use crate::toolchain::LlvmToolchain;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the exported JSON document
pub const EXPORT_FILE_NAME: &str = "coverage.json";

/// File name of the merged indexed profile
pub const PROFDATA_FILE_NAME: &str = "coverage.profdata";

/// Files written by an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    /// The exported document
    pub document: PathBuf,
    /// Intermediate files left next to it
    pub intermediates: Vec<PathBuf>,
}

/// Converts raw profiles into an exported document under `destination`
pub trait Exporter {
    /// Convert `profiles` (already checked to be non-empty) from `raw`
    ///
    /// # Errors
    ///
    /// Returns `CoverageError::Conversion` if the conversion step fails and
    /// `CoverageError::Io` if writing fails.
    fn export(
        &self,
        raw: &RawProfileOutput,
        profiles: &[PathBuf],
        destination: &Path,
    ) -> CoverageResult<ExportedDocument>;
}

/// `llvm-profdata merge` followed by `llvm-cov export`
#[derive(Debug, Clone, Default)]
pub struct LlvmExporter {
    toolchain: LlvmToolchain,
}

impl LlvmExporter {
    /// Create an exporter using `toolchain`
    #[must_use]
    pub const fn new(toolchain: LlvmToolchain) -> Self {
        Self { toolchain }
    }

    /// Tools in use
    #[must_use]
    pub const fn toolchain(&self) -> &LlvmToolchain {
        &self.toolchain
    }
}

impl Exporter for LlvmExporter {
    fn export(
        &self,
        raw: &RawProfileOutput,
        profiles: &[PathBuf],
        destination: &Path,
    ) -> CoverageResult<ExportedDocument> {
        if raw.binaries().is_empty() {
            return Err(CoverageError::conversion(
                "no instrumented binaries supplied; llvm-cov export needs at least one",
            ));
        }

        // Staged so a failed export leaves the destination untouched.
        let staging = tempfile::Builder::new().prefix(".covkit-export-").tempdir_in(destination)?;

        let staged_profdata = staging.path().join(PROFDATA_FILE_NAME);
        debug!(profiles = profiles.len(), output = %staged_profdata.display(), "merging raw profiles");
        self.toolchain.merge(profiles, &staged_profdata)?;

        let json = self.toolchain.export(&staged_profdata, raw.binaries())?;
        if json.iter().all(u8::is_ascii_whitespace) {
            return Err(CoverageError::conversion("llvm-cov export produced no output"));
        }
        let staged_document = staging.path().join(EXPORT_FILE_NAME);
        fs::write(&staged_document, &json)?;

        let profdata = destination.join(PROFDATA_FILE_NAME);
        let document = destination.join(EXPORT_FILE_NAME);
        fs::rename(&staged_profdata, &profdata)?;
        if let Err(e) = fs::rename(&staged_document, &document) {
            let _ = fs::remove_file(&profdata);
            return Err(e.into());
        }
        info!(document = %document.display(), bytes = json.len(), "coverage exported");

        Ok(ExportedDocument {
            document,
            intermediates: vec![profdata],
        })
    }
}
