//! Totals read back from an exported coverage document.
//!
//! Only the parts of the `llvm-cov export` JSON needed for a summary are
//! parsed: per-export `totals` for lines, functions and regions, plus the
//! covered file names. Everything else is ignored.

use crate::result::CoverageResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Covered/total pair for one metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoverageCounter {
    /// Instrumented items
    pub count: u64,
    /// Items executed at least once
    pub covered: u64,
}

impl CoverageCounter {
    /// Create a counter
    #[must_use]
    pub const fn new(count: u64, covered: u64) -> Self {
        Self { count, covered }
    }

    /// Covered percentage, 0.0 when nothing is instrumented
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.covered as f64 / self.count as f64 * 100.0
        }
    }

    fn add(&mut self, other: Self) {
        self.count = self.count.saturating_add(other.count);
        self.covered = self.covered.saturating_add(other.covered);
    }
}

/// Summary of an exported coverage document
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExportSummary {
    /// Source files with coverage records
    pub files: Vec<String>,
    /// Line coverage
    pub lines: CoverageCounter,
    /// Function coverage
    pub functions: CoverageCounter,
    /// Region coverage
    pub regions: CoverageCounter,
}

#[derive(Deserialize)]
struct ExportDocument {
    data: Vec<ExportData>,
}

#[derive(Deserialize)]
struct ExportData {
    #[serde(default)]
    files: Vec<ExportFile>,
    totals: ExportTotals,
}

#[derive(Deserialize)]
struct ExportFile {
    filename: String,
}

#[derive(Deserialize)]
struct ExportTotals {
    lines: CoverageCounter,
    functions: CoverageCounter,
    regions: CoverageCounter,
}

impl ExportSummary {
    /// Parse an exported JSON document
    ///
    /// # Errors
    ///
    /// Returns `CoverageError::Json` if the document is not an export.
    pub fn from_json(json: &str) -> CoverageResult<Self> {
        let document: ExportDocument = serde_json::from_str(json)?;
        let mut summary = Self::default();
        for data in document.data {
            summary.files.extend(data.files.into_iter().map(|f| f.filename));
            summary.lines.add(data.totals.lines);
            summary.functions.add(data.totals.functions);
            summary.regions.add(data.totals.regions);
        }
        summary.files.sort();
        summary.files.dedup();
        Ok(summary)
    }

    /// Read and parse an exported document from disk
    ///
    /// # Errors
    ///
    /// Returns `CoverageError::Io` if the file can't be read and
    /// `CoverageError::Json` if it doesn't parse.
    pub fn load(path: &Path) -> CoverageResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
