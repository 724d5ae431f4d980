//! LLVM coverage tools.
//!
//! Locates `llvm-profdata` and `llvm-cov`, builds their argument lists, and
//! shells out to them.

use crate::result::{CoverageError, CoverageResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::debug;

/// Environment variable overriding the `llvm-profdata` path
pub const PROFDATA_ENV: &str = "LLVM_PROFDATA";

/// Environment variable overriding the `llvm-cov` path
pub const COV_ENV: &str = "LLVM_COV";

const PROFDATA_TOOL: &str = "llvm-profdata";
const COV_TOOL: &str = "llvm-cov";

/// Paths to the two LLVM tools used for export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlvmToolchain {
    profdata: PathBuf,
    cov: PathBuf,
}

impl Default for LlvmToolchain {
    fn default() -> Self {
        Self::from_env()
    }
}

impl LlvmToolchain {
    /// Use exactly these tool paths
    #[must_use]
    pub fn new(profdata: impl Into<PathBuf>, cov: impl Into<PathBuf>) -> Self {
        Self {
            profdata: profdata.into(),
            cov: cov.into(),
        }
    }

    /// Resolve from `LLVM_PROFDATA` / `LLVM_COV`, falling back to `PATH`
    #[must_use]
    pub fn from_env() -> Self {
        Self::resolve(None, None)
    }

    /// Resolve each tool: explicit path, then environment, then `PATH`
    #[must_use]
    pub fn resolve(profdata: Option<PathBuf>, cov: Option<PathBuf>) -> Self {
        Self::resolve_with(profdata, cov, |key| std::env::var_os(key))
    }

    fn resolve_with<F>(profdata: Option<PathBuf>, cov: Option<PathBuf>, env: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let lookup = |explicit: Option<PathBuf>, key: &str, fallback: &str| {
            explicit
                .filter(|p| !p.as_os_str().is_empty())
                .or_else(|| env(key).filter(|v| !v.is_empty()).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(fallback))
        };
        Self {
            profdata: lookup(profdata, PROFDATA_ENV, PROFDATA_TOOL),
            cov: lookup(cov, COV_ENV, COV_TOOL),
        }
    }

    /// `llvm-profdata` path
    #[must_use]
    pub fn profdata(&self) -> &Path {
        &self.profdata
    }

    /// `llvm-cov` path
    #[must_use]
    pub fn cov(&self) -> &Path {
        &self.cov
    }

    /// Arguments for merging raw profiles into one indexed profile
    #[must_use]
    pub fn merge_args(profiles: &[PathBuf], output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["merge".into(), "-sparse".into()];
        args.extend(profiles.iter().map(|p| p.as_os_str().to_owned()));
        args.push("-o".into());
        args.push(output.as_os_str().to_owned());
        args
    }

    /// Arguments for exporting an indexed profile as JSON
    ///
    /// The first binary is positional; the rest are passed with `-object`.
    #[must_use]
    pub fn export_args(profdata: &Path, binaries: &[PathBuf]) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "export".into(),
            "-format=text".into(),
            "-instr-profile".into(),
            profdata.as_os_str().to_owned(),
        ];
        for (i, binary) in binaries.iter().enumerate() {
            if i > 0 {
                args.push("-object".into());
            }
            args.push(binary.as_os_str().to_owned());
        }
        args
    }

    /// Run `llvm-profdata merge`
    ///
    /// # Errors
    ///
    /// Returns `CoverageError::Conversion` if the tool is missing or fails.
    pub fn merge(&self, profiles: &[PathBuf], output: &Path) -> CoverageResult<()> {
        run_tool(&self.profdata, &Self::merge_args(profiles, output))?;
        Ok(())
    }

    /// Run `llvm-cov export` and return its stdout
    ///
    /// # Errors
    ///
    /// Returns `CoverageError::Conversion` if the tool is missing or fails.
    pub fn export(&self, profdata: &Path, binaries: &[PathBuf]) -> CoverageResult<Vec<u8>> {
        let output = run_tool(&self.cov, &Self::export_args(profdata, binaries))?;
        Ok(output.stdout)
    }
}

fn run_tool(tool: &Path, args: &[OsString]) -> CoverageResult<Output> {
    debug!(tool = %tool.display(), ?args, "running coverage tool");

    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| CoverageError::conversion(format!("Failed to execute {}: {e}", tool.display())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CoverageError::conversion(format!(
            "{} exited with {}: {}",
            tool.display(),
            output.status,
            stderr.trim()
        )));
    }

    Ok(output)
}
