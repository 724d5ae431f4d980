//! Collect command handler

use super::{collect_and_report, reporter};
use crate::commands::CollectArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use covkit::{CoverageConfiguration, RawProfileOutput, RunTermination};

/// Execute the collect command
pub fn execute_collect(config: &CliConfig, args: &CollectArgs) -> CliResult<()> {
    let mut reporter = reporter(config);
    let coverage = &args.coverage_args;

    let configuration =
        CoverageConfiguration::create(&coverage.coverage_output_path, coverage.coverage_format.into())?;

    let termination = args.aborted.clone().map_or(
        RunTermination::Exited { code: 0 },
        |reason| RunTermination::Aborted { reason },
    );
    let raw = RawProfileOutput::new(&args.profiles, termination).with_binaries(coverage.binaries.iter().cloned());

    collect_and_report(&mut reporter, configuration, &raw, coverage)?;
    Ok(())
}
