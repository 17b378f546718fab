//! CLI binary for the OCR batch.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `OcrConfig` and prints per-file results.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use verdict_pipeline::cli::{init_logging, print_report_json, BatchKind, CliProgress};
use verdict_pipeline::pipeline::ocr::DEFAULT_OCR_ENDPOINT;
use verdict_pipeline::{extract_all, BatchProgressCallback, OcrConfig, PageSelection, PipelineError};

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR every PDF in ./input into ./output
  verdict-ocr

  # Only the first five pages, two files at a time
  verdict-ocr --pages 1-5 --concurrency 2

  # Custom directories, machine-readable report
  verdict-ocr --input-dir scans --output-dir text --json > report.json

ENVIRONMENT VARIABLES:
  TYPHOON_API_KEY         OCR service API key (required)
  VERDICT_OCR_ENDPOINT    Override the OCR endpoint URL
  VERDICT_OCR_MODEL       Override the OCR model
  RUST_LOG                Override the log filter (e.g. verdict_pipeline=debug)

OUTPUT:
  Each input/<name>.pdf becomes output/<name>.txt holding the extracted text
  of every successful page joined by newlines. Files whose pages all fail
  produce no output; the batch carries on with the next file.
"#;

/// OCR court-verdict PDFs into plain text files.
#[derive(Parser, Debug)]
#[command(
    name = "verdict-ocr",
    version,
    about = "OCR court-verdict PDFs into plain text files",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory scanned for *.pdf.
    #[arg(long, env = "VERDICT_OCR_INPUT_DIR", default_value = "input")]
    input_dir: PathBuf,

    /// Directory receiving <stem>.txt.
    #[arg(long, env = "VERDICT_OCR_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// OCR endpoint URL.
    #[arg(long, env = "VERDICT_OCR_ENDPOINT", default_value = DEFAULT_OCR_ENDPOINT)]
    endpoint: String,

    /// OCR model identifier.
    #[arg(long, env = "VERDICT_OCR_MODEL", default_value = "typhoon-ocr")]
    model: String,

    /// Service task type.
    #[arg(long, env = "VERDICT_OCR_TASK_TYPE", default_value = "default")]
    task_type: String,

    /// Max tokens generated per page.
    #[arg(long, env = "VERDICT_OCR_MAX_TOKENS", default_value_t = 16384,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_tokens: u32,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "VERDICT_OCR_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Nucleus-sampling cut-off (0.0–1.0).
    #[arg(long, env = "VERDICT_OCR_TOP_P", default_value_t = 0.6)]
    top_p: f32,

    /// Repetition penalty.
    #[arg(long, env = "VERDICT_OCR_REPETITION_PENALTY", default_value_t = 1.2)]
    repetition_penalty: f32,

    /// Page selection: all, 5, 1-22, or 1,3,5.
    #[arg(long, env = "VERDICT_OCR_PAGES", default_value = "1-22")]
    pages: PageSelection,

    /// Number of files processed at once.
    #[arg(short, long, env = "VERDICT_OCR_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Per-request timeout in seconds (none by default).
    #[arg(long, env = "VERDICT_OCR_TIMEOUT",
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Print the batch report as JSON instead of per-file lines.
    #[arg(long, env = "VERDICT_OCR_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "VERDICT_OCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "VERDICT_OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "VERDICT_OCR_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.verbose;
    init_logging(cli.verbose, cli.quiet, show_progress);

    let mut builder = OcrConfig::builder()
        .endpoint(&cli.endpoint)
        .model(&cli.model)
        .task_type(&cli.task_type)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .top_p(cli.top_p)
        .repetition_penalty(cli.repetition_penalty)
        .pages(cli.pages.clone())
        .input_dir(&cli.input_dir)
        .output_dir(&cli.output_dir)
        .concurrency(cli.concurrency);

    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if !cli.quiet && !cli.json {
        let progress = CliProgress::new(BatchKind::Ocr, &cli.input_dir, &cli.output_dir, show_progress);
        builder = builder.progress_callback(progress as Arc<dyn BatchProgressCallback>);
    }

    let config = builder.build().context("Invalid configuration")?;

    let report = match extract_all(&config).await {
        Ok(report) => report,
        Err(e @ PipelineError::MissingApiKey { .. }) => {
            println!("Error: {e}");
            return Ok(());
        }
        Err(e) => return Err(anyhow::Error::new(e).context("OCR batch failed to start")),
    };

    if cli.json {
        print_report_json(&report).context("Failed to serialise report")?;
    }

    Ok(())
}
