//! Covkit CLI: run tests with coverage and collect the results
//!
//! ## Usage
//!
//! ```bash
//! covkit run -- ./run-tests                                   # no coverage
//! covkit run --coverage --binary ./tests -- ./tests           # exported JSON
//! covkit run --coverage --coverage-format raw -- ./tests      # raw .profraw files
//! covkit collect --profiles /tmp/profiles --coverage-format raw
//! covkit summary target/covkit/coverage/coverage.json
//! ```

use clap::Parser;
use covkit_cli::{
    handlers, init_logging, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    init_logging(config.verbosity);

    match cli.command {
        Commands::Run(args) => handlers::run::execute_run(&config, &args),
        Commands::Collect(args) => {
            handlers::collect::execute_collect(&config, &args)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Summary(args) => {
            handlers::summary::execute_summary(&config, &args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.clone().into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}
