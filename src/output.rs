//! Result types returned by the batch drivers.
//!
//! Every input file produces exactly one [`FileResult`]; the batch as a whole
//! produces a [`BatchReport`]. Both are `Serialize` so the CLI can print them
//! with `--json` and callers can persist them for later inspection.

use crate::error::FileError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Output was written to `path` (`bytes` long).
    Written { path: PathBuf, bytes: usize },
    /// The file was deliberately not sent (e.g. empty content).
    Skipped { reason: String },
    /// The file produced no output.
    Failed { error: FileError },
}

impl FileOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, FileOutcome::Written { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, FileOutcome::Skipped { .. })
    }
}

/// Outcome of one file, tagged with its position in the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResult {
    /// 1-indexed position in sorted processing order.
    pub index: usize,
    /// File name (no directory).
    pub name: String,
    pub outcome: FileOutcome,
}

/// Summary of a full batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Number of files selected for processing.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Per-file results in processing order.
    pub files: Vec<FileResult>,
    /// Wall-clock time for the whole batch.
    pub duration_ms: u64,
}

impl BatchReport {
    /// Build a report from per-file results, sorting them into processing order.
    pub fn from_results(mut files: Vec<FileResult>, duration_ms: u64) -> Self {
        files.sort_by_key(|f| f.index);
        Self {
            total: files.len(),
            succeeded: files.iter().filter(|f| f.outcome.is_written()).count(),
            failed: files.iter().filter(|f| f.outcome.is_failed()).count(),
            skipped: files.iter().filter(|f| f.outcome.is_skipped()).count(),
            files,
            duration_ms,
        }
    }

    /// Paths of every output file written during the batch.
    pub fn written_paths(&self) -> Vec<&PathBuf> {
        self.files
            .iter()
            .filter_map(|f| match &f.outcome {
                FileOutcome::Written { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }
}
