//! Error types for the verdict-pipeline library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PipelineError`] — **Fatal**: the batch cannot start at all (credential
//!   missing, output directory cannot be created, a `--file` target does not
//!   exist). Returned as `Err(PipelineError)` from the batch entry points
//!   before any file is touched.
//!
//! * [`FileError`] — **Non-fatal**: one file failed (HTTP error, unexpected
//!   response, unreadable input) but the rest of the batch carries on.
//!   Stored inside [`crate::output::FileOutcome::Failed`] so the caller can
//!   see exactly which files produced no output and why.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// All fatal errors returned by the verdict-pipeline library.
///
/// Per-file failures use [`FileError`] and never abort a batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Credential errors ─────────────────────────────────────────────────
    /// The API key environment variable is unset or empty.
    #[error("{var} environment variable is not set.\nPlease export it: export {var}='{hint}'")]
    MissingApiKey { var: String, hint: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// A single file was requested but does not exist.
    #[error("File not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// The input directory exists but could not be listed.
    #[error("Failed to read input directory '{}': {source}", path.display())]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The output directory could not be created.
    #[error("Failed to create output directory '{}': {source}", path.display())]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The shared HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// A non-fatal error for a single input file.
///
/// Serialisable so it can be carried in the JSON batch report.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum FileError {
    /// The request never produced a response (DNS, TLS, connection reset, timeout).
    #[error("request failed: {detail}")]
    Http { detail: String },

    /// The endpoint answered with a non-success status.
    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// The response body could not be decoded into the expected shape.
    #[error("unexpected response: {detail}")]
    Decode { detail: String },

    /// OCR finished but no page produced any text.
    #[error("no text extracted ({failed_pages} page(s) failed)")]
    NoText { failed_pages: usize },

    /// The language model returned an empty reply.
    #[error("empty reply from model")]
    EmptyReply,

    /// Reading the input or writing the output failed.
    #[error("I/O error on '{path}': {detail}")]
    Io { path: String, detail: String },
}

impl FileError {
    pub(crate) fn io(path: &Path, err: &std::io::Error) -> Self {
        FileError::Io {
            path: path.display().to_string(),
            detail: err.to_string(),
        }
    }

    pub(crate) fn http(err: &reqwest::Error) -> Self {
        FileError::Http {
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_mentions_export_hint() {
        let e = PipelineError::MissingApiKey {
            var: "OPENROUTER_API_KEY".into(),
            hint: "sk-or-...".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("OPENROUTER_API_KEY environment variable is not set"));
        assert!(msg.contains("export OPENROUTER_API_KEY='sk-or-...'"), "got: {msg}");
    }

    #[test]
    fn input_not_found_display() {
        let e = PipelineError::InputNotFound {
            path: PathBuf::from("output/missing.txt"),
        };
        assert_eq!(e.to_string(), "File not found: output/missing.txt");
    }

    #[test]
    fn status_error_names_code() {
        let e = FileError::Status {
            code: 401,
            body: "invalid key".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("401"), "got: {msg}");
        assert!(msg.contains("invalid key"));
    }

    #[test]
    fn no_text_display() {
        let e = FileError::NoText { failed_pages: 3 };
        assert!(e.to_string().contains("3 page(s) failed"));
    }

    #[test]
    fn file_error_round_trips_through_json() {
        let e = FileError::Io {
            path: "output/a.txt".into(),
            detail: "permission denied".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: FileError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
