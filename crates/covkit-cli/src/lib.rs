//! Covkit CLI Library
//!
//! Command-line front end for the Covkit coverage pipeline.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod logging;
mod output;

pub use commands::{Cli, CollectArgs, ColorArg, Commands, CoverageArgs, FormatArg, RunArgs, SummaryArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult, NO_DATA_EXIT_CODE};
pub use logging::init_logging;
pub use output::ProgressReporter;
