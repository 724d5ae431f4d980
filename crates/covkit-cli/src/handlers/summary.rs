//! Summary command handler

use super::reporter;
use crate::commands::SummaryArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use covkit::ExportSummary;

/// Execute the summary command
pub fn execute_summary(config: &CliConfig, args: &SummaryArgs) -> CliResult<()> {
    let summary = ExportSummary::load(&args.document)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        reporter(config).coverage_summary(&summary);
    }

    Ok(())
}
