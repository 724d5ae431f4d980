//! Raw profiling output handed over by a finished test run
//!
//! The handle does not interpret profile contents. It only knows the root the
//! instrumentation runtime wrote into (a directory or a single file), how the
//! run ended, and which instrumented binaries an export needs.

use crate::result::{CoverageError, CoverageResult};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use walkdir::WalkDir;

/// File extension of LLVM raw profiles
pub const PROFILE_EXTENSION: &str = "profraw";

/// Environment variable the LLVM profiling runtime reads its output path from
pub const PROFILE_ENV: &str = "LLVM_PROFILE_FILE";

/// `LLVM_PROFILE_FILE` file-name pattern, unique per process and module
pub const PROFILE_FILE_PATTERN: &str = "%p-%m.profraw";

/// How the test run that produced the output ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunTermination {
    /// Process exited normally. Failing tests still leave profiles behind.
    Exited {
        /// Exit code
        code: i32,
    },
    /// Run died or was torn down before writing profiles
    Aborted {
        /// What happened
        reason: String,
    },
}

impl RunTermination {
    /// Classify a finished process
    #[must_use]
    pub fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => Self::Exited { code },
            None => Self::Aborted {
                reason: format!("terminated without exit code ({status})"),
            },
        }
    }

    /// True if the run never got to write its profiles
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Opaque handle to the profiling output of one completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProfileOutput {
    root: PathBuf,
    termination: RunTermination,
    binaries: Vec<PathBuf>,
}

impl RawProfileOutput {
    /// Create a handle for output under `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, termination: RunTermination) -> Self {
        Self {
            root: root.into(),
            termination,
            binaries: Vec::new(),
        }
    }

    /// Add an instrumented binary (test bundle, host app, target app)
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binaries.push(binary.into());
        self
    }

    /// Add several instrumented binaries
    #[must_use]
    pub fn with_binaries<I, P>(mut self, binaries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.binaries.extend(binaries.into_iter().map(Into::into));
        self
    }

    /// Directory or file the runtime wrote into
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// How the run ended
    #[must_use]
    pub const fn termination(&self) -> &RunTermination {
        &self.termination
    }

    /// Instrumented binaries
    #[must_use]
    pub fn binaries(&self) -> &[PathBuf] {
        &self.binaries
    }

    /// Every regular file under the root, sorted
    ///
    /// # Errors
    ///
    /// Returns `CoverageError::Io` if the tree cannot be read.
    pub fn files(&self) -> CoverageResult<Vec<PathBuf>> {
        if self.root.is_file() {
            return Ok(vec![self.root.clone()]);
        }
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Non-empty `.profraw` files under the root, sorted
    ///
    /// # Errors
    ///
    /// Returns `CoverageError::Io` if the tree cannot be read.
    pub fn profiles(&self) -> CoverageResult<Vec<PathBuf>> {
        let mut profiles = Vec::new();
        for file in self.files()? {
            let is_profile = file.extension().is_some_and(|ext| ext == PROFILE_EXTENSION);
            if is_profile && file.metadata()?.len() > 0 {
                profiles.push(file);
            }
        }
        Ok(profiles)
    }

    /// Profiles to collect, or `NoData` if there is nothing usable
    ///
    /// # Errors
    ///
    /// Returns `CoverageError::NoData` for aborted runs, a missing root, or no
    /// non-empty profiles; `CoverageError::Io` if the tree cannot be read.
    pub fn require_profiles(&self) -> CoverageResult<Vec<PathBuf>> {
        if let RunTermination::Aborted { reason } = &self.termination {
            return Err(CoverageError::no_data(format!("test run aborted: {reason}")));
        }
        if !self.root.exists() {
            return Err(CoverageError::no_data(format!(
                "profile output {} does not exist",
                self.root.display()
            )));
        }
        let profiles = self.profiles()?;
        if profiles.is_empty() {
            return Err(CoverageError::no_data(format!(
                "no non-empty .{PROFILE_EXTENSION} files under {}",
                self.root.display()
            )));
        }
        Ok(profiles)
    }

    /// Path of `file` relative to the output root
    #[must_use]
    pub fn relative_path(&self, file: &Path) -> PathBuf {
        if self.root.is_dir() {
            if let Ok(relative) = file.strip_prefix(&self.root) {
                return relative.to_path_buf();
            }
        }
        file.file_name().map_or_else(|| file.to_path_buf(), PathBuf::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::result::FailureKind;
    use std::fs;

    fn exited() -> RunTermination {
        RunTermination::Exited { code: 0 }
    }

    #[test]
    fn test_profiles_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("host")).unwrap();
        fs::write(dir.path().join("b.profraw"), b"bbbb").unwrap();
        fs::write(dir.path().join("a.profraw"), b"aaaa").unwrap();
        fs::write(dir.path().join("host").join("c.profraw"), b"cc").unwrap();
        fs::write(dir.path().join("empty.profraw"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"hi").unwrap();

        let raw = RawProfileOutput::new(dir.path(), exited());
        let names: Vec<PathBuf> = raw
            .profiles()
            .unwrap()
            .iter()
            .map(|p| raw.relative_path(p))
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.profraw"),
                PathBuf::from("b.profraw"),
                PathBuf::from("host/c.profraw"),
            ]
        );
        assert_eq!(raw.files().unwrap().len(), 5);
    }

    #[test]
    fn test_single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("run.profraw");
        fs::write(&file, b"data").unwrap();

        let raw = RawProfileOutput::new(&file, exited());
        assert_eq!(raw.profiles().unwrap(), vec![file.clone()]);
        assert_eq!(raw.relative_path(&file), PathBuf::from("run.profraw"));
    }

    #[test]
    fn test_missing_root_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let raw = RawProfileOutput::new(dir.path().join("gone"), exited());
        assert!(raw.files().unwrap().is_empty());
        assert_eq!(raw.require_profiles().unwrap_err().kind(), FailureKind::NoData);
    }

    #[test]
    fn test_empty_directory_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zero.profraw"), b"").unwrap();
        let raw = RawProfileOutput::new(dir.path(), exited());
        assert!(raw.require_profiles().unwrap_err().is_no_data());
    }

    #[test]
    fn test_aborted_run_is_no_data_even_with_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.profraw"), b"data").unwrap();
        let raw = RawProfileOutput::new(
            dir.path(),
            RunTermination::Aborted {
                reason: "session lost".to_string(),
            },
        );
        let err = raw.require_profiles().unwrap_err();
        assert!(err.is_no_data());
        assert!(err.to_string().contains("session lost"));
    }

    #[test]
    fn test_failing_tests_still_yield_profiles() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.profraw"), b"data").unwrap();
        let raw = RawProfileOutput::new(dir.path(), RunTermination::Exited { code: 1 });
        assert_eq!(raw.require_profiles().unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_root_is_walked() {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join(std::ffi::OsStr::from_bytes(b"run-\xff"));
        if fs::create_dir(&root).is_err() {
            // Some filesystems only accept UTF-8 names.
            return;
        }
        fs::write(root.join("1.profraw"), b"data").unwrap();

        let raw = RawProfileOutput::new(&root, exited());
        assert_eq!(raw.require_profiles().unwrap(), vec![root.join("1.profraw")]);
    }

    #[test]
    fn test_binaries() {
        let raw = RawProfileOutput::new("/tmp", exited())
            .with_binary("/bin/tests")
            .with_binaries(["/bin/app", "/bin/host"]);
        assert_eq!(raw.binaries().len(), 3);
        assert_eq!(raw.binaries()[0], PathBuf::from("/bin/tests"));
    }

    #[cfg(unix)]
    #[test]
    fn test_from_status() {
        use std::os::unix::process::ExitStatusExt;

        assert_eq!(
            RunTermination::from_status(ExitStatus::from_raw(0)),
            RunTermination::Exited { code: 0 }
        );
        assert_eq!(
            RunTermination::from_status(ExitStatus::from_raw(3 << 8)),
            RunTermination::Exited { code: 3 }
        );
        assert!(RunTermination::from_status(ExitStatus::from_raw(9)).is_aborted());
    }

    #[test]
    fn test_termination_serde() {
        let json = serde_json::to_string(&RunTermination::Exited { code: 2 }).unwrap();
        assert_eq!(json, r#"{"status":"exited","code":2}"#);
    }
}
