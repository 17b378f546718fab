//! OCR batch: every `*.pdf` in the input directory becomes `<stem>.txt`.
//!
//! Files are processed in sorted name order. A file that fails (HTTP error,
//! no extractable text, write failure) is recorded in the report and the
//! batch moves on; only start-up problems abort it.

use crate::config::{api_key_from_env, OcrConfig, OCR_API_KEY_ENV};
use crate::error::{FileError, PipelineError};
use crate::output::{BatchReport, FileOutcome, FileResult};
use crate::pipeline::files::{ensure_dir, file_name, list_files, text_name_for, write_atomic};
use crate::pipeline::ocr::{OcrParams, OcrProvider, TyphoonOcrClient};
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run the OCR service on one PDF and return its joined page text.
///
/// Failed pages are logged and left out; the document only fails when the
/// joined text is empty.
pub async fn extract_text(
    provider: &dyn OcrProvider,
    pdf_path: &Path,
    params: &OcrParams,
) -> Result<String, FileError> {
    extract_reporting(provider, pdf_path, params, None).await
}

async fn extract_reporting(
    provider: &dyn OcrProvider,
    pdf_path: &Path,
    params: &OcrParams,
    callback: Option<&ProgressCallback>,
) -> Result<String, FileError> {
    let document = provider.extract(pdf_path, params).await?;

    for (filename, error) in document.failures() {
        warn!("Error processing {}: {}", filename, error);
        if let Some(cb) = callback {
            cb.on_page_failed(filename, error);
        }
    }

    match document.text() {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(FileError::NoText {
            failed_pages: document.failed_pages(),
        }),
    }
}

/// Request parameters derived from the batch configuration.
pub fn ocr_params(config: &OcrConfig) -> OcrParams {
    OcrParams {
        model: config.model.clone(),
        task_type: config.task_type.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
        repetition_penalty: config.repetition_penalty,
        pages: config.pages.to_page_list(),
    }
}

fn resolve_provider(config: &OcrConfig) -> Result<Arc<dyn OcrProvider>, PipelineError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }
    let api_key = match config.api_key {
        Some(ref key) => key.clone(),
        None => api_key_from_env(OCR_API_KEY_ENV, "<your-typhoon-key>")?,
    };
    let client = TyphoonOcrClient::new(&config.endpoint, api_key, config.request_timeout())?;
    Ok(Arc::new(client))
}

/// OCR every PDF in `config.input_dir` into `config.output_dir`.
///
/// # Errors
/// Returns `Err(PipelineError)` only when the batch cannot start: the API key
/// is missing, the output directory cannot be created, or the input
/// directory cannot be listed. A missing input directory is an empty batch.
pub async fn extract_all(config: &OcrConfig) -> Result<BatchReport, PipelineError> {
    let start = Instant::now();
    let provider = resolve_provider(config)?;

    ensure_dir(&config.output_dir)?;
    let pdfs = list_files(&config.input_dir, "pdf")?;
    let total = pdfs.len();

    info!(
        "Found {} PDF(s) in {}",
        total,
        config.input_dir.display()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let params = ocr_params(config);
    let results: Vec<FileResult> = stream::iter(pdfs.into_iter().enumerate().map(|(i, pdf)| {
        let provider = Arc::clone(&provider);
        let params = &params;
        async move {
            let index = i + 1;
            let name = file_name(&pdf);
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_start(index, total, &name);
            }

            let outcome = match process_pdf(provider.as_ref(), &pdf, config, params).await {
                Ok((path, bytes)) => FileOutcome::Written { path, bytes },
                Err(error) => {
                    warn!("{}: {}", name, error);
                    FileOutcome::Failed { error }
                }
            };

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
        "OCR batch complete: {}/{} written, {} failed in {}ms",
        report.succeeded, report.total, report.failed, report.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(&report);
    }
    Ok(report)
}

async fn process_pdf(
    provider: &dyn OcrProvider,
    pdf: &Path,
    config: &OcrConfig,
    params: &OcrParams,
) -> Result<(PathBuf, usize), FileError> {
    debug!("OCR {}", pdf.display());
    let text = extract_reporting(provider, pdf, params, config.progress_callback.as_ref()).await?;
    let out_path = config.output_dir.join(text_name_for(pdf));
    let bytes = write_atomic(&out_path, &text).await?;
    Ok((out_path, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ocr::{OcrDocument, PageContent, PageOutcome};
    use async_trait::async_trait;

    struct FixedDocument(OcrDocument);

    #[async_trait]
    impl OcrProvider for FixedDocument {
        async fn extract(&self, _: &Path, _: &OcrParams) -> Result<OcrDocument, FileError> {
            Ok(self.0.clone())
        }
    }

    fn params() -> OcrParams {
        ocr_params(&OcrConfig::default())
    }

    #[tokio::test]
    async fn pages_join_with_newline_skipping_failures() {
        let provider = FixedDocument(OcrDocument {
            pages: vec![
                PageOutcome::Extracted(PageContent::Plain("หน้า 1".into())),
                PageOutcome::Failed {
                    filename: "a.pdf".into(),
                    error: "timeout".into(),
                },
                PageOutcome::Extracted(PageContent::Structured {
                    natural_text: "หน้า 3".into(),
                }),
            ],
        });
        let text = extract_text(&provider, Path::new("a.pdf"), &params()).await.unwrap();
        assert_eq!(text, "หน้า 1\nหน้า 3");
    }

    #[tokio::test]
    async fn all_pages_failed_is_no_text() {
        let provider = FixedDocument(OcrDocument {
            pages: vec![PageOutcome::Failed {
                filename: "a.pdf".into(),
                error: "bad page".into(),
            }],
        });
        let err = extract_text(&provider, Path::new("a.pdf"), &params()).await.unwrap_err();
        assert_eq!(err, FileError::NoText { failed_pages: 1 });
    }

    #[tokio::test]
    async fn whitespace_only_text_is_still_written() {
        let provider = FixedDocument(OcrDocument {
            pages: vec![PageOutcome::Extracted(PageContent::Plain(" \n ".into()))],
        });
        let text = extract_text(&provider, Path::new("a.pdf"), &params()).await.unwrap();
        assert_eq!(text, " \n ");
    }

    #[tokio::test]
    async fn blank_pages_join_to_nothing() {
        let provider = FixedDocument(OcrDocument {
            pages: vec![PageOutcome::Extracted(PageContent::Plain(String::new()))],
        });
        let err = extract_text(&provider, Path::new("a.pdf"), &params()).await.unwrap_err();
        assert_eq!(err, FileError::NoText { failed_pages: 0 });
    }

    #[tokio::test]
    async fn empty_document_is_no_text() {
        let provider = FixedDocument(OcrDocument::default());
        let err = extract_text(&provider, Path::new("a.pdf"), &params()).await.unwrap_err();
        assert_eq!(err, FileError::NoText { failed_pages: 0 });
    }

    #[test]
    fn params_follow_config() {
        let config = OcrConfig::builder()
            .model("typhoon-ocr-preview")
            .pages(crate::config::PageSelection::Single(2))
            .build()
            .unwrap();
        let p = ocr_params(&config);
        assert_eq!(p.model, "typhoon-ocr-preview");
        assert_eq!(p.pages, Some(vec![2]));
        assert_eq!(p.max_tokens, 16384);
    }
}
