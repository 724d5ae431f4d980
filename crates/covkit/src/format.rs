//! Coverage output format shared by requests and configurations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Format in which coverage data is handed back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageFormat {
    /// Merged and converted to the `llvm-cov export` JSON document
    #[default]
    Exported,
    /// `.profraw` files exactly as the instrumented processes wrote them
    Raw,
}

impl CoverageFormat {
    /// Every format, in declaration order
    pub const ALL: [Self; 2] = [Self::Exported, Self::Raw];

    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exported => "exported",
            Self::Raw => "raw",
        }
    }

    /// Whether collection runs the external conversion step
    #[must_use]
    pub const fn requires_conversion(self) -> bool {
        matches!(self, Self::Exported)
    }
}

impl fmt::Display for CoverageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
