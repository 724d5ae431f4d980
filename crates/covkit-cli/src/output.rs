//! Output formatting and progress reporting

use console::{style, Term};
use covkit::{CoverageArtifact, CoverageCounter, ExportSummary};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter for coverage collection
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Show a spinner until [`finish`](Self::finish)
    pub fn start_spinner(&mut self, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(pb);
    }

    /// Clear the spinner
    pub fn finish(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "OK".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Report a written artifact
    pub fn artifact(&self, artifact: &CoverageArtifact) {
        self.success(&format!(
            "{} coverage written to {} ({} file{})",
            artifact.format,
            artifact.path.display(),
            artifact.files.len(),
            if artifact.files.len() == 1 { "" } else { "s" }
        ));
    }

    /// Print export totals to stdout
    pub fn coverage_summary(&self, summary: &ExportSummary) {
        if self.quiet {
            return;
        }

        let stdout = Term::stdout();
        let _ = stdout.write_line(&format!("Files:     {}", summary.files.len()));
        let _ = stdout.write_line(&self.metric_line("Lines", summary.lines));
        let _ = stdout.write_line(&self.metric_line("Functions", summary.functions));
        let _ = stdout.write_line(&self.metric_line("Regions", summary.regions));
    }

    fn metric_line(&self, label: &str, counter: CoverageCounter) -> String {
        let percent = format!("{:.2}%", counter.percent());
        let percent = if !self.use_color {
            percent
        } else if counter.percent() >= 80.0 {
            style(percent).green().to_string()
        } else if counter.percent() >= 50.0 {
            style(percent).yellow().to_string()
        } else {
            style(percent).red().to_string()
        };
        format!(
            "{:<10} {percent} ({}/{})",
            format!("{label}:"),
            counter.covered,
            counter.count
        )
    }
}
