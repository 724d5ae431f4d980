//! Command handlers

pub mod collect;
pub mod run;
pub mod summary;

use crate::commands::CoverageArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::ProgressReporter;
use covkit::{
    CoverageArtifact, CoverageCollector, CoverageConfiguration, CoverageFormat, ExportSummary,
    LlvmExporter, LlvmToolchain, RawProfileOutput,
};

/// Reporter honoring the configured color and quiet settings
#[must_use]
pub fn reporter(config: &CliConfig) -> ProgressReporter {
    ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet())
}

/// Run one collection and report the outcome
pub fn collect_and_report(
    reporter: &mut ProgressReporter,
    configuration: CoverageConfiguration,
    raw: &RawProfileOutput,
    args: &CoverageArgs,
) -> CliResult<CoverageArtifact> {
    let toolchain = LlvmToolchain::resolve(args.llvm_profdata.clone(), args.llvm_cov.clone());
    let mut collector = CoverageCollector::with_exporter(configuration, LlvmExporter::new(toolchain));

    reporter.start_spinner("Collecting coverage...");
    let result = collector.collect(raw);
    reporter.finish();

    let artifact = result?;
    reporter.artifact(&artifact);

    if artifact.format == CoverageFormat::Exported {
        match ExportSummary::load(&artifact.path) {
            Ok(summary) => reporter.coverage_summary(&summary),
            Err(e) => reporter.warning(&format!("Could not summarise {}: {e}", artifact.path.display())),
        }
    }

    Ok(artifact)
}
