//! CLI binary for the rewrite batch.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `RewriteConfig` and prints per-file results.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use verdict_pipeline::cli::{init_logging, print_report_json, BatchKind, CliProgress};
use verdict_pipeline::pipeline::chat::DEFAULT_CHAT_BASE_URL;
use verdict_pipeline::{rewrite_all, BatchProgressCallback, PipelineError, RewriteConfig};

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rewrite every OCR output in ./output into ./output_revised
  verdict-rewrite

  # Try the prompt on the first two files only
  verdict-rewrite --limit 2

  # Rewrite one file
  verdict-rewrite --file 1234-2566.txt

  # Use another OpenAI-compatible gateway and model
  verdict-rewrite --base-url http://localhost:11434/v1 --model llama3.1

ENVIRONMENT VARIABLES:
  OPENROUTER_API_KEY          Chat-completion API key (required)
  VERDICT_REWRITE_BASE_URL    Override the OpenAI-compatible base URL
  VERDICT_REWRITE_MODEL       Override the chat model
  RUST_LOG                    Override the log filter (e.g. verdict_pipeline=debug)

OUTPUT:
  Each output/<name>.txt becomes output_revised/<name>.txt with three
  sections: เรื่อง:, ประเด็นหลัก:, รายละเอียด:. Empty inputs are skipped
  without a request.
"#;

/// Restructure OCR'd verdict text with a chat model.
#[derive(Parser, Debug)]
#[command(
    name = "verdict-rewrite",
    version,
    about = "Restructure OCR'd verdict text with a chat model",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Maximum number of files to process (0 = unlimited).
    #[arg(long, env = "VERDICT_REWRITE_LIMIT", default_value_t = 0)]
    limit: usize,

    /// Process only this file from the input directory.
    #[arg(long, env = "VERDICT_REWRITE_FILE")]
    file: Option<String>,

    /// Directory scanned for *.txt.
    #[arg(long, env = "VERDICT_REWRITE_INPUT_DIR", default_value = "output")]
    input_dir: PathBuf,

    /// Directory receiving the rewritten files.
    #[arg(long, env = "VERDICT_REWRITE_OUTPUT_DIR", default_value = "output_revised")]
    output_dir: PathBuf,

    /// OpenAI-compatible base URL.
    #[arg(long, env = "VERDICT_REWRITE_BASE_URL", default_value = DEFAULT_CHAT_BASE_URL)]
    base_url: String,

    /// Chat model identifier.
    #[arg(long, env = "VERDICT_REWRITE_MODEL", default_value = "google/gemini-3-flash-preview")]
    model: String,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "VERDICT_REWRITE_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "VERDICT_REWRITE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Tidy replies before writing (strip fences, invisible characters, trailing spaces).
    #[arg(long, env = "VERDICT_REWRITE_CLEAN")]
    clean: bool,

    /// Number of files processed at once.
    #[arg(short, long, env = "VERDICT_REWRITE_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Per-request timeout in seconds (none by default).
    #[arg(long, env = "VERDICT_REWRITE_TIMEOUT",
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Print the batch report as JSON instead of per-file lines.
    #[arg(long, env = "VERDICT_REWRITE_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "VERDICT_REWRITE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "VERDICT_REWRITE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "VERDICT_REWRITE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.verbose;
    init_logging(cli.verbose, cli.quiet, show_progress);

    let config = build_config(&cli, show_progress).await?;

    let report = match rewrite_all(&config).await {
        Ok(report) => report,
        Err(e @ PipelineError::MissingApiKey { .. }) => {
            println!("Error: {e}");
            return Ok(());
        }
        Err(e @ PipelineError::InputNotFound { .. }) => {
            println!("{e}");
            return Ok(());
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Rewrite batch failed to start")),
    };

    if cli.json {
        print_report_json(&report).context("Failed to serialise report")?;
    }

    Ok(())
}

/// Map CLI args to `RewriteConfig`.
async fn build_config(cli: &Cli, show_progress: bool) -> Result<RewriteConfig> {
    let mut builder = RewriteConfig::builder()
        .base_url(&cli.base_url)
        .model(&cli.model)
        .temperature(cli.temperature)
        .input_dir(&cli.input_dir)
        .output_dir(&cli.output_dir)
        .limit(cli.limit)
        .concurrency(cli.concurrency)
        .clean_output(cli.clean);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref name) = cli.file {
        builder = builder.file(name);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if !cli.quiet && !cli.json {
        let progress =
            CliProgress::new(BatchKind::Rewrite, &cli.input_dir, &cli.output_dir, show_progress);
        builder = builder.progress_callback(progress as Arc<dyn BatchProgressCallback>);
    }

    builder.build().context("Invalid configuration")
}
