//! Coverage Collector
//!
//! Turns the raw output of a finished test run into coverage artifacts inside
//! the configured directory.
//!
//! ```text
//! Idle ──collect──► Collecting ──┬──► Succeeded(artifact)
//!                                └──► Failed(kind)
//! ```
//!
//! Terminal states are final. Retrying means building a new collector.

use crate::configuration::CoverageConfiguration;
use crate::exporter::{Exporter, LlvmExporter};
use crate::format::CoverageFormat;
use crate::raw::RawProfileOutput;
use crate::result::{CoverageError, CoverageResult, FailureKind};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Collector lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorState {
    /// Waiting for the run to finish
    Idle,
    /// Copying or converting
    Collecting,
    /// Artifacts written
    Succeeded(CoverageArtifact),
    /// Collection ended without artifacts
    Failed(FailureKind),
}

impl CollectorState {
    /// Whether the collector is done
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }
}

/// What a successful collection produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageArtifact {
    /// Format of the artifacts
    pub format: CoverageFormat,
    /// Coverage directory for `Raw`, the exported document for `Exported`
    pub path: PathBuf,
    /// Every file written, relative to the coverage directory, sorted
    pub files: Vec<PathBuf>,
}

/// Collects coverage for one configured run
#[derive(Debug)]
pub struct CoverageCollector<E = LlvmExporter> {
    config: CoverageConfiguration,
    exporter: E,
    state: CollectorState,
}

impl CoverageCollector<LlvmExporter> {
    /// Create a collector that exports with the LLVM tools found in the environment
    #[must_use]
    pub fn new(config: CoverageConfiguration) -> Self {
        Self::with_exporter(config, LlvmExporter::default())
    }
}

impl<E: Exporter> CoverageCollector<E> {
    /// Create a collector with a custom exporter
    #[must_use]
    pub const fn with_exporter(config: CoverageConfiguration, exporter: E) -> Self {
        Self {
            config,
            exporter,
            state: CollectorState::Idle,
        }
    }

    /// Collect coverage from a finished run
    ///
    /// # Errors
    ///
    /// - `NoData` if the run aborted or left no profiles
    /// - `Conversion` if exporting fails
    /// - `Io` if copying or writing fails
    /// - `InvalidState` if this collector already ran
    pub fn collect(&mut self, raw: &RawProfileOutput) -> CoverageResult<CoverageArtifact> {
        if self.state != CollectorState::Idle {
            return Err(CoverageError::invalid_state(format!(
                "collector already used (state: {:?})",
                self.state
            )));
        }

        self.state = CollectorState::Collecting;
        info!(
            directory = %self.config.coverage_directory().display(),
            format = %self.config.format(),
            root = %raw.root().display(),
            "collecting coverage"
        );

        let result = self.run(raw);
        self.state = match &result {
            Ok(artifact) => {
                info!(path = %artifact.path.display(), files = artifact.files.len(), "coverage collected");
                CollectorState::Succeeded(artifact.clone())
            }
            Err(e) => {
                warn!(error = %e, "coverage collection failed");
                CollectorState::Failed(e.kind())
            }
        };
        result
    }

    fn run(&self, raw: &RawProfileOutput) -> CoverageResult<CoverageArtifact> {
        let profiles = raw.require_profiles()?;
        match self.config.format() {
            CoverageFormat::Raw => self.copy_raw(raw),
            CoverageFormat::Exported => self.export(raw, &profiles),
        }
    }

    fn copy_raw(&self, raw: &RawProfileOutput) -> CoverageResult<CoverageArtifact> {
        let directory = self.config.coverage_directory();
        check_disjoint(raw.root(), directory)?;
        let mut files = Vec::new();

        for source in raw.files()? {
            let relative = raw.relative_path(&source);
            let target = directory.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&source, &target)?;
            files.push(relative);
        }
        files.sort();

        Ok(CoverageArtifact {
            format: CoverageFormat::Raw,
            path: directory.to_path_buf(),
            files,
        })
    }

    fn export(&self, raw: &RawProfileOutput, profiles: &[PathBuf]) -> CoverageResult<CoverageArtifact> {
        let directory = self.config.coverage_directory();
        let exported = self.exporter.export(raw, profiles, directory)?;

        if fs::metadata(&exported.document)?.len() == 0 {
            for written in exported.intermediates.iter().chain(std::iter::once(&exported.document)) {
                let _ = fs::remove_file(written);
            }
            return Err(CoverageError::conversion(format!(
                "exported document {} is empty",
                exported.document.display()
            )));
        }

        let mut files: Vec<PathBuf> = exported
            .intermediates
            .iter()
            .chain(std::iter::once(&exported.document))
            .map(|p| relative_to(p, directory))
            .collect();
        files.sort();

        Ok(CoverageArtifact {
            format: CoverageFormat::Exported,
            path: exported.document,
            files,
        })
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &CollectorState {
        &self.state
    }

    /// Configuration being served
    #[must_use]
    pub const fn config(&self) -> &CoverageConfiguration {
        &self.config
    }
}

/// Collect once with the default exporter
///
/// # Errors
///
/// See [`CoverageCollector::collect`].
pub fn collect(config: &CoverageConfiguration, raw: &RawProfileOutput) -> CoverageResult<CoverageArtifact> {
    CoverageCollector::new(config.clone()).collect(raw)
}

/// Raw copies must not read from the tree they write into.
fn check_disjoint(root: &Path, directory: &Path) -> CoverageResult<()> {
    let root_real = fs::canonicalize(root)?;
    let directory_real = fs::canonicalize(directory)?;
    let overlaps = if root_real.is_file() {
        root_real.parent() == Some(directory_real.as_path())
    } else {
        directory_real.starts_with(&root_real)
    };
    if overlaps {
        return Err(CoverageError::invalid_directory(
            directory,
            format!("overlaps the raw profile output {}", root.display()),
        ));
    }
    Ok(())
}

fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base).map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::exporter::{ExportedDocument, EXPORT_FILE_NAME};
    use crate::raw::RunTermination;
    use std::collections::BTreeMap;

    /// Writes a JSON document listing each profile's name and size.
    #[derive(Debug, Default)]
    struct ManifestExporter;

    impl Exporter for ManifestExporter {
        fn export(
            &self,
            raw: &RawProfileOutput,
            profiles: &[PathBuf],
            destination: &Path,
        ) -> CoverageResult<ExportedDocument> {
            let mut sizes = BTreeMap::new();
            for profile in profiles {
                let name = raw.relative_path(profile).to_string_lossy().to_string();
                sizes.insert(name, fs::metadata(profile)?.len());
            }
            let document = destination.join(EXPORT_FILE_NAME);
            fs::write(&document, serde_json::to_vec(&sizes)?)?;
            Ok(ExportedDocument {
                document,
                intermediates: Vec::new(),
            })
        }
    }

    #[derive(Debug, Default)]
    struct FailingExporter;

    impl Exporter for FailingExporter {
        fn export(&self, _: &RawProfileOutput, _: &[PathBuf], _: &Path) -> CoverageResult<ExportedDocument> {
            Err(CoverageError::conversion("llvm-cov exited with 1"))
        }
    }

    #[derive(Debug, Default)]
    struct EmptyDocumentExporter;

    impl Exporter for EmptyDocumentExporter {
        fn export(&self, _: &RawProfileOutput, _: &[PathBuf], destination: &Path) -> CoverageResult<ExportedDocument> {
            let document = destination.join(EXPORT_FILE_NAME);
            fs::write(&document, b"")?;
            Ok(ExportedDocument {
                document,
                intermediates: Vec::new(),
            })
        }
    }

    fn profile_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("100-abc.profraw"), b"\x81rfforpl-test").unwrap();
        fs::write(dir.path().join("app").join("200-def.profraw"), b"\x81rfforpl-app!!").unwrap();
        fs::write(dir.path().join("app").join("default.log"), b"runtime log").unwrap();
        dir
    }

    fn exited(root: &Path) -> RawProfileOutput {
        RawProfileOutput::new(root, RunTermination::Exited { code: 0 })
    }

    fn read_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        let raw = exited(root);
        raw.files()
            .unwrap()
            .into_iter()
            .map(|f| (raw.relative_path(&f), fs::read(&f).unwrap()))
            .collect()
    }

    #[test]
    fn test_new_collector_is_idle() {
        let out = tempfile::tempdir().unwrap();
        let config = CoverageConfiguration::new(out.path(), CoverageFormat::Raw).unwrap();
        let collector = CoverageCollector::new(config.clone());
        assert_eq!(collector.state(), &CollectorState::Idle);
        assert_eq!(collector.config(), &config);
        assert!(!collector.state().is_terminal());
    }

    #[test]
    fn test_raw_copy_is_byte_identical() {
        let input = profile_tree();
        let out = tempfile::tempdir().unwrap();
        let config = CoverageConfiguration::new(out.path(), CoverageFormat::Raw).unwrap();

        let mut collector = CoverageCollector::new(config);
        let artifact = collector.collect(&exited(input.path())).unwrap();

        assert_eq!(artifact.format, CoverageFormat::Raw);
        assert_eq!(artifact.path, out.path());
        assert_eq!(
            artifact.files,
            vec![
                PathBuf::from("100-abc.profraw"),
                PathBuf::from("app/200-def.profraw"),
                PathBuf::from("app/default.log"),
            ]
        );
        assert_eq!(read_tree(out.path()), read_tree(input.path()));
        assert_eq!(collector.state(), &CollectorState::Succeeded(artifact));
    }

    #[test]
    fn test_raw_copy_twice_into_distinct_directories() {
        let input = profile_tree();
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();

        for out in [&first, &second] {
            let config = CoverageConfiguration::new(out.path(), CoverageFormat::Raw).unwrap();
            collect(&config, &exited(input.path())).unwrap();
        }

        assert_eq!(read_tree(first.path()), read_tree(second.path()));
    }

    #[test]
    fn test_raw_single_file_handle() {
        let input = tempfile::tempdir().unwrap();
        let file = input.path().join("only.profraw");
        fs::write(&file, b"payload").unwrap();
        let out = tempfile::tempdir().unwrap();
        let config = CoverageConfiguration::new(out.path(), CoverageFormat::Raw).unwrap();

        let artifact = collect(&config, &exited(&file)).unwrap();
        assert_eq!(artifact.files, vec![PathBuf::from("only.profraw")]);
        assert_eq!(fs::read(out.path().join("only.profraw")).unwrap(), b"payload");
    }

    #[test]
    fn test_raw_root_equal_to_coverage_directory_is_rejected() {
        let dir = profile_tree();
        let before = read_tree(dir.path());
        let config = CoverageConfiguration::new(dir.path(), CoverageFormat::Raw).unwrap();
        let mut collector = CoverageCollector::new(config);

        let err = collector.collect(&exited(dir.path())).unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidDirectory);
        assert_eq!(collector.state(), &CollectorState::Failed(FailureKind::InvalidDirectory));
        assert_eq!(read_tree(dir.path()), before);
    }

    #[test]
    fn test_coverage_directory_inside_raw_root_is_rejected() {
        let input = profile_tree();
        let nested = input.path().join("app");
        let config = CoverageConfiguration::new(&nested, CoverageFormat::Raw).unwrap();

        let err = collect(&config, &exited(input.path())).unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidDirectory);
        assert!(!nested.join("app").exists());
    }

    #[test]
    fn test_single_file_already_in_coverage_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("only.profraw");
        fs::write(&file, b"payload").unwrap();
        let config = CoverageConfiguration::new(dir.path(), CoverageFormat::Raw).unwrap();

        let err = collect(&config, &exited(&file)).unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidDirectory);
    }

    #[test]
    fn test_raw_root_below_coverage_directory_is_copied_up() {
        let out = tempfile::tempdir().unwrap();
        let staging = out.path().join("staging");
        fs::create_dir(&staging).unwrap();
        fs::write(staging.join("1.profraw"), b"data").unwrap();
        let config = CoverageConfiguration::new(out.path(), CoverageFormat::Raw).unwrap();

        let artifact = collect(&config, &exited(&staging)).unwrap();
        assert_eq!(artifact.files, vec![PathBuf::from("1.profraw")]);
        assert_eq!(fs::read(out.path().join("1.profraw")).unwrap(), b"data");
    }

    #[cfg(unix)]
    #[test]
    fn test_exported_with_llvm_tools_lists_document_and_profdata() {
        use crate::exporter::{fake_tools, LlvmExporter, PROFDATA_FILE_NAME};

        let input = profile_tree();
        let tools = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let config = CoverageConfiguration::new(out.path(), CoverageFormat::Exported).unwrap();
        let exporter = LlvmExporter::new(fake_tools::toolchain(tools.path(), fake_tools::MERGE, fake_tools::EXPORT));

        let artifact = CoverageCollector::with_exporter(config, exporter)
            .collect(&exited(input.path()).with_binary("/bin/tests"))
            .unwrap();

        assert_eq!(artifact.path, out.path().join(EXPORT_FILE_NAME));
        assert_eq!(
            artifact.files,
            vec![PathBuf::from(EXPORT_FILE_NAME), PathBuf::from(PROFDATA_FILE_NAME)]
        );
        let document: serde_json::Value = serde_json::from_slice(&fs::read(&artifact.path).unwrap()).unwrap();
        assert_eq!(document["type"], "llvm.coverage.json.export");
    }

    #[test]
    fn test_exported_produces_non_empty_document() {
        let input = profile_tree();
        let out = tempfile::tempdir().unwrap();
        let config = CoverageConfiguration::new(out.path(), CoverageFormat::Exported).unwrap();

        let mut collector = CoverageCollector::with_exporter(config, ManifestExporter);
        let artifact = collector.collect(&exited(input.path())).unwrap();

        assert_eq!(artifact.format, CoverageFormat::Exported);
        assert_eq!(artifact.path, out.path().join(EXPORT_FILE_NAME));
        assert_eq!(artifact.files, vec![PathBuf::from(EXPORT_FILE_NAME)]);
        assert!(fs::metadata(&artifact.path).unwrap().len() > 0);
    }

    #[test]
    fn test_exported_is_deterministic() {
        let input = profile_tree();
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();

        let documents: Vec<serde_json::Value> = [&first, &second]
            .iter()
            .map(|out| {
                let config = CoverageConfiguration::new(out.path(), CoverageFormat::Exported).unwrap();
                let artifact = CoverageCollector::with_exporter(config, ManifestExporter)
                    .collect(&exited(input.path()))
                    .unwrap();
                serde_json::from_slice(&fs::read(artifact.path).unwrap()).unwrap()
            })
            .collect();

        assert_eq!(documents[0], documents[1]);
        // Non-profile files are not passed to the exporter.
        assert!(documents[0].get("app/default.log").is_none());
    }

    #[test]
    fn test_no_data_for_both_formats() {
        let empty = tempfile::tempdir().unwrap();
        for format in CoverageFormat::ALL {
            let out = tempfile::tempdir().unwrap();
            let config = CoverageConfiguration::new(out.path(), format).unwrap();
            let mut collector = CoverageCollector::with_exporter(config, ManifestExporter);

            let err = collector.collect(&exited(empty.path())).unwrap_err();
            assert!(err.is_no_data(), "{format}: {err}");
            assert_eq!(collector.state(), &CollectorState::Failed(FailureKind::NoData));
            assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
        }
    }

    #[test]
    fn test_aborted_run_is_no_data_for_both_formats() {
        let input = profile_tree();
        for format in CoverageFormat::ALL {
            let out = tempfile::tempdir().unwrap();
            let config = CoverageConfiguration::new(out.path(), format).unwrap();
            let raw = RawProfileOutput::new(
                input.path(),
                RunTermination::Aborted {
                    reason: "simulator crashed".to_string(),
                },
            );
            let err = CoverageCollector::with_exporter(config, ManifestExporter)
                .collect(&raw)
                .unwrap_err();
            assert!(err.is_no_data());
        }
    }

    #[test]
    fn test_conversion_failure_is_terminal() {
        let input = profile_tree();
        let out = tempfile::tempdir().unwrap();
        let config = CoverageConfiguration::new(out.path(), CoverageFormat::Exported).unwrap();
        let mut collector = CoverageCollector::with_exporter(config, FailingExporter);

        let err = collector.collect(&exited(input.path())).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Conversion);
        assert_eq!(collector.state(), &CollectorState::Failed(FailureKind::Conversion));

        // No internal retry: a second call is rejected and the state stays put.
        let again = collector.collect(&exited(input.path())).unwrap_err();
        assert_eq!(again.kind(), FailureKind::InvalidState);
        assert_eq!(collector.state(), &CollectorState::Failed(FailureKind::Conversion));
    }

    #[test]
    fn test_empty_exported_document_is_rejected() {
        let input = profile_tree();
        let out = tempfile::tempdir().unwrap();
        let config = CoverageConfiguration::new(out.path(), CoverageFormat::Exported).unwrap();
        let err = CoverageCollector::with_exporter(config, EmptyDocumentExporter)
            .collect(&exited(input.path()))
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Conversion);
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_succeeded_state_is_final() {
        let input = profile_tree();
        let out = tempfile::tempdir().unwrap();
        let config = CoverageConfiguration::new(out.path(), CoverageFormat::Raw).unwrap();
        let mut collector = CoverageCollector::new(config);

        collector.collect(&exited(input.path())).unwrap();
        assert!(collector.state().is_terminal());
        assert!(collector.collect(&exited(input.path())).is_err());
        assert!(matches!(collector.state(), CollectorState::Succeeded(_)));
    }

    #[test]
    fn test_parallel_collections_do_not_cross_contaminate() {
        let inputs: Vec<tempfile::TempDir> = (0..4)
            .map(|i| {
                let dir = tempfile::tempdir().unwrap();
                fs::write(dir.path().join(format!("{i}.profraw")), format!("run-{i}")).unwrap();
                dir
            })
            .collect();
        let outputs: Vec<tempfile::TempDir> = (0..4).map(|_| tempfile::tempdir().unwrap()).collect();

        std::thread::scope(|scope| {
            for (i, (input, output)) in inputs.iter().zip(&outputs).enumerate() {
                let format = if i % 2 == 0 {
                    CoverageFormat::Raw
                } else {
                    CoverageFormat::Exported
                };
                scope.spawn(move || {
                    let config = CoverageConfiguration::new(output.path(), format).unwrap();
                    CoverageCollector::with_exporter(config, ManifestExporter)
                        .collect(&exited(input.path()))
                        .unwrap();
                });
            }
        });

        for (i, output) in outputs.iter().enumerate() {
            if i % 2 == 0 {
                let tree = read_tree(output.path());
                assert_eq!(tree.len(), 1);
                assert_eq!(tree[&PathBuf::from(format!("{i}.profraw"))], format!("run-{i}").into_bytes());
            } else {
                let doc: BTreeMap<String, u64> =
                    serde_json::from_slice(&fs::read(output.path().join(EXPORT_FILE_NAME)).unwrap()).unwrap();
                assert_eq!(doc.keys().collect::<Vec<_>>(), vec![&format!("{i}.profraw")]);
            }
        }
    }
}
