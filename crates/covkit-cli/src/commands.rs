//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use covkit::CoverageFormat;
use std::path::PathBuf;

/// Covkit: run tests with coverage and collect raw or exported results
#[derive(Parser, Debug)]
#[command(name = "covkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a test command, optionally collecting coverage once it exits
    Run(RunArgs),

    /// Collect coverage from profiles an earlier run left behind
    Collect(CollectArgs),

    /// Print totals from an exported coverage document
    Summary(SummaryArgs),
}

/// Coverage destination and conversion options
#[derive(Args, Debug, Clone)]
pub struct CoverageArgs {
    /// Directory that receives coverage output (created if missing)
    #[arg(long, default_value = "target/covkit/coverage")]
    pub coverage_output_path: PathBuf,

    /// Format for coverage output
    ///
    /// exported: a JSON file as produced by `llvm-cov export`;
    /// raw: the .profraw files written by the instrumented processes
    #[arg(long, default_value = "exported")]
    pub coverage_format: FormatArg,

    /// Instrumented binary to export coverage for (repeatable)
    #[arg(long = "binary", value_name = "PATH")]
    pub binaries: Vec<PathBuf>,

    /// Path to llvm-profdata
    #[arg(long, env = "LLVM_PROFDATA")]
    pub llvm_profdata: Option<PathBuf>,

    /// Path to llvm-cov
    #[arg(long, env = "LLVM_COV")]
    pub llvm_cov: Option<PathBuf>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Collect coverage for this run
    #[arg(long)]
    pub coverage: bool,

    /// Coverage options
    #[command(flatten)]
    pub coverage_args: CoverageArgs,

    /// Test command and its arguments
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Arguments for the collect command
#[derive(Parser, Debug)]
pub struct CollectArgs {
    /// Raw profile output: a directory or a single .profraw file
    #[arg(long, value_name = "PATH")]
    pub profiles: PathBuf,

    /// Mark the producing run as aborted
    #[arg(long, value_name = "REASON")]
    pub aborted: Option<String>,

    /// Coverage options
    #[command(flatten)]
    pub coverage_args: CoverageArgs,
}

/// Arguments for the summary command
#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// Exported coverage document
    pub document: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Coverage format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// JSON as exported by llvm-cov
    #[default]
    Exported,
    /// Unprocessed .profraw files
    Raw,
}

impl From<FormatArg> for CoverageFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Exported => Self::Exported,
            FormatArg::Raw => Self::Raw,
        }
    }
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
