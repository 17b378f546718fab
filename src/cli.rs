//! Terminal plumbing shared by the `verdict-ocr` and `verdict-rewrite` binaries.
//!
//! Logging goes to stderr through `tracing-subscriber`; the per-file console
//! lines go to stdout through [`CliProgress`], either above an `indicatif`
//! bar or as plain lines when the bar is disabled.

use crate::error::FileError;
use crate::output::{BatchReport, FileOutcome, FileResult};
use crate::progress::BatchProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

pub fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
pub fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
pub fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
pub fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Logging ──────────────────────────────────────────────────────────────────

/// Install the stderr `tracing` subscriber.
///
/// `RUST_LOG` wins when set. Otherwise library INFO logs are suppressed while
/// the progress bar is active, since the bar already reports every file.
pub fn init_logging(verbose: bool, quiet: bool, show_progress: bool) {
    let filter = if verbose {
        "debug"
    } else if quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();
}

// ── Console progress ─────────────────────────────────────────────────────────

/// Which batch the console lines describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Ocr,
    Rewrite,
}

/// Prints the per-file console log and, optionally, a progress bar.
pub struct CliProgress {
    kind: BatchKind,
    input_dir: String,
    output_dir: String,
    bar: Option<ProgressBar>,
}

impl CliProgress {
    pub fn new(kind: BatchKind, input_dir: &Path, output_dir: &Path, show_bar: bool) -> Arc<Self> {
        let bar = show_bar.then(|| {
            let bar = ProgressBar::new(0);
            let style = ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} files  \
                 ⏱ {elapsed_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
            bar.set_style(style);
            bar.set_prefix(match kind {
                BatchKind::Ocr => "OCR",
                BatchKind::Rewrite => "Rewriting",
            });
            bar
        });

        Arc::new(Self {
            kind,
            input_dir: input_dir.display().to_string(),
            output_dir: output_dir.display().to_string(),
            bar,
        })
    }

    fn line(&self, text: String) {
        match self.bar {
            Some(ref bar) => bar.suspend(|| println!("{text}")),
            None => println!("{text}"),
        }
    }

    fn colour(&self, paint: fn(&str) -> String, text: &str) -> String {
        if self.bar.is_some() {
            paint(text)
        } else {
            text.to_string()
        }
    }

    fn failure_lines(&self, error: &FileError) -> Vec<String> {
        match (self.kind, error) {
            (BatchKind::Ocr, FileError::NoText { .. }) => vec!["  Failed to extract text".into()],
            (BatchKind::Ocr, e) => vec![format!("  Error: {e}")],
            (BatchKind::Rewrite, e @ FileError::Io { .. }) => {
                vec![format!("  Error processing file: {e}")]
            }
            (BatchKind::Rewrite, FileError::EmptyReply) => vec!["  Failed to get response".into()],
            (BatchKind::Rewrite, e) => vec![
                format!("  Error calling API: {e}"),
                "  Failed to get response".into(),
            ],
        }
    }
}

impl BatchProgressCallback for CliProgress {
    fn on_batch_start(&self, total_files: usize) {
        if self.kind == BatchKind::Ocr && total_files == 0 {
            self.line(format!("No PDF files found in {}/", self.input_dir));
            return;
        }

        let found = match self.kind {
            BatchKind::Ocr => format!("Found {total_files} PDF(s) to process."),
            BatchKind::Rewrite => format!("Found {total_files} files to process."),
        };
        let output_dir = match self.kind {
            BatchKind::Ocr => format!("{}/", self.output_dir),
            BatchKind::Rewrite => self.output_dir.clone(),
        };
        self.line(self.colour(bold, &found));
        self.line(format!("Output directory: {output_dir}"));
        self.line("-".repeat(50));

        if let Some(ref bar) = self.bar {
            bar.set_length(total_files as u64);
            bar.enable_steady_tick(Duration::from_millis(80));
        }
    }

    fn on_file_start(&self, index: usize, total_files: usize, name: &str) {
        self.line(format!("[{index}/{total_files}] Processing {name}..."));
        if let Some(ref bar) = self.bar {
            bar.set_message(name.to_string());
        }
    }

    fn on_page_failed(&self, filename: &str, error: &str) {
        self.line(self.colour(red, &page_failure_line(filename, error)));
    }

    fn on_file_complete(&self, _total_files: usize, result: &FileResult) {
        match &result.outcome {
            FileOutcome::Written { path, .. } => {
                let text = match self.kind {
                    BatchKind::Ocr => {
                        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                        format!("  Success -> {name}")
                    }
                    BatchKind::Rewrite => "  Success".to_string(),
                };
                self.line(self.colour(green, &text));
            }
            FileOutcome::Skipped { reason } => {
                self.line(self.colour(dim, &format!("  Skipping ({reason})")));
            }
            FileOutcome::Failed { error } => {
                for text in self.failure_lines(error) {
                    self.line(self.colour(red, &text));
                }
            }
        }
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    fn on_batch_complete(&self, report: &BatchReport) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
        match self.kind {
            BatchKind::Ocr if report.total == 0 => {}
            BatchKind::Ocr => self.line("\nOCR processing complete.".into()),
            BatchKind::Rewrite => self.line("\nRewriting complete.".into()),
        }
    }
}

fn page_failure_line(filename: &str, error: &str) -> String {
    format!("  Error processing {filename}: {error}")
}

/// Pretty-print a batch report as JSON on stdout.
pub fn print_report_json(report: &BatchReport) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
