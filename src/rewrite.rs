//! Rewrite batch: OCR text files are restructured by a chat model.
//!
//! Each `*.txt` in the input directory is sent with the verdict system prompt
//! and the reply is written under the same file name in the output directory.
//! Empty inputs are skipped without a request.

use crate::config::{api_key_from_env, RewriteConfig, CHAT_API_KEY_ENV};
use crate::error::{FileError, PipelineError};
use crate::output::{BatchReport, FileOutcome, FileResult};
use crate::pipeline::chat::{ChatMessage, ChatOptions, ChatProvider, OpenAiCompatibleClient};
use crate::pipeline::files::{ensure_dir, file_name, list_files, write_atomic};
use crate::pipeline::postprocess::clean_reply;
use crate::prompts::{verdict_user_message, VERDICT_SYSTEM_PROMPT};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Ask the model to restructure one verdict.
///
/// Returns the trimmed reply; an empty reply is an error.
pub async fn revise_verdict(
    provider: &dyn ChatProvider,
    options: &ChatOptions,
    system_prompt: &str,
    content: &str,
    filename: &str,
) -> Result<String, FileError> {
    let messages = [
        ChatMessage::system(system_prompt),
        ChatMessage::user(verdict_user_message(filename, content)),
    ];

    let reply = provider.chat(&messages, options).await.map_err(|e| {
        warn!("Error calling model for {}: {}", filename, e);
        e
    })?;

    let reply = reply.trim();
    if reply.is_empty() {
        return Err(FileError::EmptyReply);
    }
    Ok(reply.to_string())
}

/// The files a rewrite batch will process, in order.
///
/// With `config.file` set, only that file inside `input_dir` is selected and
/// it must exist. Otherwise every `*.txt` is listed and `config.limit`
/// (0 = unlimited) keeps the first N.
pub fn select_files(config: &RewriteConfig) -> Result<Vec<PathBuf>, PipelineError> {
    if let Some(ref name) = config.file {
        let path = config.input_dir.join(name);
        if !path.is_file() {
            return Err(PipelineError::InputNotFound { path });
        }
        return Ok(vec![path]);
    }

    let mut files = list_files(&config.input_dir, "txt")?;
    if config.limit > 0 {
        files.truncate(config.limit);
    }
    Ok(files)
}

fn resolve_provider(config: &RewriteConfig) -> Result<Arc<dyn ChatProvider>, PipelineError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }
    let api_key = match config.api_key {
        Some(ref key) => key.clone(),
        None => api_key_from_env(CHAT_API_KEY_ENV, "sk-or-...")?,
    };
    let client = OpenAiCompatibleClient::new(&config.base_url, api_key, config.request_timeout())?;
    Ok(Arc::new(client))
}

/// Rewrite every selected file from `config.input_dir` into `config.output_dir`.
///
/// # Errors
/// Returns `Err(PipelineError)` only when the batch cannot start: the API key
/// is missing, the output directory cannot be created, the `--file` target
/// does not exist, or the input directory cannot be listed.
pub async fn rewrite_all(config: &RewriteConfig) -> Result<BatchReport, PipelineError> {
    let start = Instant::now();
    let provider = resolve_provider(config)?;

    ensure_dir(&config.output_dir)?;
    let files = select_files(config)?;
    let total = files.len();

    info!("Found {} file(s) in {}", total, config.input_dir.display());
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let options = ChatOptions {
        model: config.model.clone(),
        temperature: config.temperature,
    };
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(VERDICT_SYSTEM_PROMPT);

    let results: Vec<FileResult> = stream::iter(files.into_iter().enumerate().map(|(i, path)| {
        let provider = Arc::clone(&provider);
        let options = &options;
        async move {
            let index = i + 1;
            let name = file_name(&path);
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_start(index, total, &name);
            }

            let outcome = process_file(provider.as_ref(), options, system_prompt, &path, config).await;
            if let FileOutcome::Failed { ref error } = outcome {
                warn!("{}: {}", name, error);
            }

            let result = FileResult { index, name, outcome };
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_complete(total, &result);
            }
            result
        }
    }))
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await;

    let report = BatchReport::from_results(results, start.elapsed().as_millis() as u64);
    info!(
        "Rewrite batch complete: {}/{} written, {} failed, {} skipped in {}ms",
        report.succeeded, report.total, report.failed, report.skipped, report.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(&report);
    }
    Ok(report)
}

async fn process_file(
    provider: &dyn ChatProvider,
    options: &ChatOptions,
    system_prompt: &str,
    path: &Path,
    config: &RewriteConfig,
) -> FileOutcome {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            return FileOutcome::Failed {
                error: FileError::io(path, &e),
            }
        }
    };

    let content = content.trim();
    if content.is_empty() {
        debug!("Skipping {} (empty content)", path.display());
        return FileOutcome::Skipped {
            reason: "empty content".into(),
        };
    }

    let name = file_name(path);
    let reply = match revise_verdict(provider, options, system_prompt, content, &name).await {
        Ok(reply) => reply,
        Err(error) => return FileOutcome::Failed { error },
    };
    let reply = if config.clean_output {
        clean_reply(&reply)
    } else {
        reply
    };

    let out_path = config.output_dir.join(&name);
    match write_atomic(&out_path, &reply).await {
        Ok(bytes) => FileOutcome::Written {
            path: out_path,
            bytes,
        },
        Err(error) => FileOutcome::Failed { error },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Recorder {
        reply: String,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatProvider for Recorder {
        async fn chat(&self, messages: &[ChatMessage], _: &ChatOptions) -> Result<String, FileError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }
    }

    fn options() -> ChatOptions {
        ChatOptions {
            model: "m".into(),
            temperature: 0.1,
        }
    }

    #[tokio::test]
    async fn revise_sends_system_then_user_and_trims() {
        let provider = Recorder {
            reply: "\n  เรื่อง: x  \n".into(),
            seen: Mutex::new(Vec::new()),
        };
        let out = revise_verdict(&provider, &options(), "SYS", "เนื้อหา", "a.txt")
            .await
            .unwrap();
        assert_eq!(out, "เรื่อง: x");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0][0], ChatMessage::system("SYS"));
        assert_eq!(seen[0][1].role, "user");
        assert_eq!(seen[0][1].content, "Filename: a.txt\n\nContent:\nเนื้อหา");
    }

    #[tokio::test]
    async fn whitespace_reply_is_empty_reply() {
        let provider = Recorder {
            reply: "   \n".into(),
            seen: Mutex::new(Vec::new()),
        };
        let err = revise_verdict(&provider, &options(), "SYS", "x", "a.txt")
            .await
            .unwrap_err();
        assert_eq!(err, FileError::EmptyReply);
    }

    #[test]
    fn select_applies_limit_in_sorted_order() {
        let tmp = TempDir::new().unwrap();
        for name in ["e.txt", "b.txt", "a.txt", "d.txt", "c.txt"] {
            std::fs::write(tmp.path().join(name), "x").unwrap();
        }
        let config = RewriteConfig::builder()
            .input_dir(tmp.path())
            .limit(2)
            .build()
            .unwrap();
        let names: Vec<String> = select_files(&config).unwrap().iter().map(|p| file_name(p)).collect();
        assert_eq!(names, ["a.txt", "b.txt"]);
    }

    #[test]
    fn select_single_file_must_exist() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "x").unwrap();

        let config = RewriteConfig::builder()
            .input_dir(tmp.path())
            .file("a.txt")
            .build()
            .unwrap();
        assert_eq!(select_files(&config).unwrap(), vec![tmp.path().join("a.txt")]);

        let config = RewriteConfig::builder()
            .input_dir(tmp.path())
            .file("missing.txt")
            .build()
            .unwrap();
        assert!(matches!(
            select_files(&config),
            Err(PipelineError::InputNotFound { .. })
        ));
    }
}
