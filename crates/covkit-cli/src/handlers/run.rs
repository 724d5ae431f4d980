//! Run command handler
//!
//! Runs a test command to completion. With `--coverage`, the command's
//! profiles are redirected into a staging directory and collected after it
//! exits.

use super::{collect_and_report, reporter};
use crate::commands::RunArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult, NO_DATA_EXIT_CODE};
use covkit::{CoverageFormat, CoverageRequest, RawProfileOutput, RunTermination, PROFILE_ENV, PROFILE_FILE_PATTERN};
use std::path::PathBuf;
use std::process::{Command, ExitCode};
use tracing::info;

/// Execute the run command
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<ExitCode> {
    let mut reporter = reporter(config);
    let coverage = &args.coverage_args;

    let request = CoverageRequest::new(args.coverage, coverage.coverage_format.into());
    check_exportable(&request, &coverage.binaries)?;
    let configuration = request.resolve_or_create(&coverage.coverage_output_path)?;
    let staging = if configuration.is_some() {
        Some(tempfile::Builder::new().prefix("covkit-profiles-").tempdir()?)
    } else {
        None
    };

    let (program, program_args) = args
        .command
        .split_first()
        .ok_or_else(|| CliError::invalid_argument("missing test command"))?;

    let mut command = Command::new(program);
    command.args(program_args);
    if let Some(staging) = &staging {
        command.env(PROFILE_ENV, staging.path().join(PROFILE_FILE_PATTERN));
    }

    info!(program = %program, coverage = request.collect(), "starting test command");
    let status = command
        .status()
        .map_err(|e| CliError::test_execution(format!("failed to start {program}: {e}")))?;
    let termination = RunTermination::from_status(status);

    match &termination {
        RunTermination::Exited { code: 0 } => reporter.success("Test command passed"),
        RunTermination::Exited { code } => reporter.failure(&format!("Test command exited with {code}")),
        RunTermination::Aborted { reason } => reporter.failure(&format!("Test command aborted: {reason}")),
    }

    let exit = exit_code_for(&termination);

    if let (Some(configuration), Some(staging)) = (configuration, staging) {
        let raw = RawProfileOutput::new(staging.path(), termination)
            .with_binaries(coverage.binaries.iter().cloned());
        if let Err(e) = collect_and_report(&mut reporter, configuration, &raw, coverage) {
            let no_data = matches!(&e, CliError::Coverage(c) if c.is_no_data());
            match (exit, no_data) {
                (0, true) => {
                    reporter.warning(&e.to_string());
                    return Ok(ExitCode::from(NO_DATA_EXIT_CODE));
                }
                (0, false) => return Err(e),
                // The test command's failure takes precedence.
                (_, true) => reporter.warning(&e.to_string()),
                (_, false) => reporter.failure(&e.to_string()),
            }
        }
    }

    Ok(ExitCode::from(exit))
}

/// Exported coverage needs instrumented binaries; catch that before the run
pub fn check_exportable(request: &CoverageRequest, binaries: &[PathBuf]) -> CliResult<()> {
    if request.collect() && request.format() == CoverageFormat::Exported && binaries.is_empty() {
        return Err(CliError::invalid_argument(
            "exported coverage needs at least one --binary (or use --coverage-format raw)",
        ));
    }
    Ok(())
}

/// Exit code mirroring how the test command ended
#[must_use]
pub fn exit_code_for(termination: &RunTermination) -> u8 {
    match termination {
        RunTermination::Exited { code } => u8::try_from(*code).unwrap_or(1),
        RunTermination::Aborted { .. } => 1,
    }
}
