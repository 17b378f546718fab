//! # verdict-pipeline
//!
//! Batch tools that turn scanned Thai court verdicts into structured text.
//!
//! Two independent batches share this crate:
//!
//! ```text
//! input/*.pdf ──▶ [extract] ──▶ output/*.txt ──▶ [rewrite] ──▶ output_revised/*.txt
//!                    │                              │
//!               OCR endpoint               chat-completion endpoint
//! ```
//!
//! * [`extract_all`] uploads every PDF to a Typhoon-style OCR endpoint and
//!   writes the joined page text to `<stem>.txt`.
//! * [`rewrite_all`] sends every text file to an OpenAI-compatible chat model
//!   with the verdict prompt and writes the restructured reply under the same
//!   name.
//!
//! The rewrite batch only reads the OCR batch's output directory; there is no
//! in-process coupling between the two.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use verdict_pipeline::{rewrite_all, RewriteConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key read from OPENROUTER_API_KEY
//!     let config = RewriteConfig::builder().limit(2).build()?;
//!     let report = rewrite_all(&config).await?;
//!     eprintln!("{}/{} rewritten", report.succeeded, report.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `verdict-ocr` and `verdict-rewrite` binaries |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod rewrite;

#[cfg(feature = "cli")]
pub mod cli;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OcrConfig, OcrConfigBuilder, PageSelection, RewriteConfig, RewriteConfigBuilder};
pub use error::{FileError, PipelineError};
pub use extract::{extract_all, extract_text};
pub use output::{BatchReport, FileOutcome, FileResult};
pub use pipeline::chat::{ChatMessage, ChatOptions, ChatProvider, OpenAiCompatibleClient};
pub use pipeline::ocr::{OcrDocument, OcrParams, OcrProvider, PageContent, PageOutcome, TyphoonOcrClient};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use rewrite::{revise_verdict, rewrite_all, select_files};
