//! Covkit: Code-Coverage Collection for Managed Test Runs
//!
//! A client states its intent with a [`CoverageRequest`]. Resolving that
//! request against an output directory yields an optional
//! [`CoverageConfiguration`]: no configuration means no collection. Once the
//! test run has exited, a [`CoverageCollector`] turns the run's
//! [`RawProfileOutput`] into artifacts inside the configured directory.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    COVKIT Pipeline                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  CoverageRequest ──resolve──► Option<CoverageConfiguration>     │
//! │                                        │                         │
//! │  test run exits ──► RawProfileOutput ──┴──► CoverageCollector   │
//! │                                              │                   │
//! │                         Raw: copy .profraw tree verbatim         │
//! │                         Exported: llvm-profdata + llvm-cov JSON  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use covkit::{CoverageCollector, CoverageFormat, CoverageRequest, RawProfileOutput, RunTermination};
//!
//! let request = CoverageRequest::new(true, CoverageFormat::Raw);
//! if let Some(config) = request.resolve_or_create("target/coverage")? {
//!     let raw = RawProfileOutput::new("/tmp/profiles", RunTermination::Exited { code: 0 });
//!     let artifact = CoverageCollector::new(config).collect(&raw)?;
//!     println!("coverage written to {}", artifact.path.display());
//! }
//! # Ok::<(), covkit::CoverageError>(())
//! ```

#![warn(missing_docs)]

mod collector;
mod configuration;
mod exporter;
mod format;
mod raw;
mod request;
mod result;
mod summary;
mod toolchain;

pub use collector::{collect, CollectorState, CoverageArtifact, CoverageCollector};
pub use configuration::CoverageConfiguration;
pub use exporter::{ExportedDocument, Exporter, LlvmExporter, EXPORT_FILE_NAME, PROFDATA_FILE_NAME};
pub use format::CoverageFormat;
pub use raw::{RawProfileOutput, RunTermination, PROFILE_ENV, PROFILE_EXTENSION, PROFILE_FILE_PATTERN};
pub use request::CoverageRequest;
pub use result::{CoverageError, CoverageResult, FailureKind};
pub use summary::{CoverageCounter, ExportSummary};
pub use toolchain::{LlvmToolchain, COV_ENV, PROFDATA_ENV};
