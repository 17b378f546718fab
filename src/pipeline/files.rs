//! File-system helpers shared by both batch drivers.
//!
//! Enumeration mirrors a shell glob: only regular, non-hidden files whose
//! extension matches exactly, sorted by file name. Outputs are written to a
//! hidden temporary sibling and renamed into place so a failed write never
//! replaces an existing output with a truncated one.

use crate::error::{FileError, PipelineError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// List `*.{extension}` files in `dir`, sorted by name.
///
/// A missing directory yields an empty list, the same as an empty one.
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Input directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(PipelineError::InputDirUnreadable {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            let name = file_name(path);
            !name.starts_with('.')
                && path.extension().and_then(|e| e.to_str()) == Some(extension)
        })
        .collect();

    files.sort();
    debug!("Found {} *.{} file(s) in {}", files.len(), extension, dir.display());
    Ok(files)
}

/// Create `dir` (and parents) if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(dir).map_err(|source| PipelineError::OutputDirFailed {
        path: dir.to_path_buf(),
        source,
    })
}

/// The final path component as a `String` (lossy for non-UTF-8 names).
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<stem>.txt` for an input document.
pub fn text_name_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}.txt")
}

/// Write `contents` to `path` atomically, returning the number of bytes written.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<usize, FileError> {
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name(path)));

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(|e| FileError::io(&tmp_path, &e))?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(FileError::io(path, &e));
    }

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(contents.len())
}
