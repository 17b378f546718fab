//! OCR interaction: upload a PDF and decode the per-page results.
//!
//! The OCR service takes the whole PDF in one `multipart/form-data` request
//! and answers with one entry per processed page:
//!
//! ```json
//! {"results": [
//!   {"success": true,  "filename": "a.pdf", "message": {"choices": [{"message": {"content": "…"}}]}},
//!   {"success": false, "filename": "a.pdf", "error": "page out of range"}
//! ]}
//! ```
//!
//! A page's `content` is either plain text or a JSON document carrying the
//! text in a `natural_text` field; [`PageContent`] keeps the two apart.

use crate::error::{FileError, PipelineError};
use crate::pipeline::files::file_name;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Default OCR endpoint.
pub const DEFAULT_OCR_ENDPOINT: &str = "https://api.opentyphoon.ai/v1/ocr";

/// Request parameters sent alongside every uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrParams {
    pub model: String,
    pub task_type: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    /// 1-indexed pages to process; `None` lets the service decide.
    pub pages: Option<Vec<usize>>,
}

impl OcrParams {
    /// Scalar form fields in wire order, values rendered as decimal text.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("model", self.model.clone()),
            ("task_type", self.task_type.clone()),
            ("max_tokens", self.max_tokens.to_string()),
            ("temperature", self.temperature.to_string()),
            ("top_p", self.top_p.to_string()),
            ("repetition_penalty", self.repetition_penalty.to_string()),
        ];
        if let Some(pages) = self.pages.as_ref().filter(|p| !p.is_empty()) {
            let list = pages
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(",");
            fields.push(("pages", format!("[{list}]")));
        }
        fields
    }
}

// ── Response model ───────────────────────────────────────────────────────

/// Text of one successfully processed page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageContent {
    /// The model answered with a JSON document; this is its `natural_text`.
    Structured { natural_text: String },
    /// The model answered with plain text.
    Plain(String),
}

impl PageContent {
    /// Classify raw page content.
    ///
    /// Only a JSON object with a string `natural_text` counts as structured;
    /// anything else (plain text, other JSON values) is kept verbatim.
    pub fn classify(raw: &str) -> Self {
        if raw.trim_start().starts_with('{') {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
                if let Some(Value::String(text)) = map.get("natural_text") {
                    return PageContent::Structured {
                        natural_text: text.clone(),
                    };
                }
            }
        }
        PageContent::Plain(raw.to_string())
    }

    pub fn text(&self) -> &str {
        match self {
            PageContent::Structured { natural_text } => natural_text,
            PageContent::Plain(text) => text,
        }
    }
}

/// Outcome of one page as reported by the service.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Extracted(PageContent),
    Failed { filename: String, error: String },
}

/// Decoded OCR response for one document, pages in response order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrDocument {
    pub pages: Vec<PageOutcome>,
}

impl OcrDocument {
    /// Decode a response body.
    pub fn parse(body: &str) -> Result<Self, FileError> {
        let value: Value = serde_json::from_str(body).map_err(|e| FileError::Decode {
            detail: format!("body is not JSON: {e}"),
        })?;
        Self::from_json(&value)
    }

    /// Decode an already-parsed response body.
    ///
    /// A missing `results` key is an empty document. A success entry without
    /// `message.choices[0].message.content` becomes a failed page.
    pub fn from_json(body: &Value) -> Result<Self, FileError> {
        let results = match body.get("results") {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(FileError::Decode {
                    detail: format!("`results` is not an array: {other}"),
                })
            }
        };

        let pages = results.iter().map(decode_page).collect();
        Ok(Self { pages })
    }

    /// Number of pages the service reported as failed.
    pub fn failed_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(p, PageOutcome::Failed { .. }))
            .count()
    }

    /// Page failures as `(filename, error)` pairs.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pages.iter().filter_map(|p| match p {
            PageOutcome::Failed { filename, error } => Some((filename.as_str(), error.as_str())),
            PageOutcome::Extracted(_) => None,
        })
    }

    /// Newline-joined text of every extracted page.
    ///
    /// `None` when no page succeeded.
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .pages
            .iter()
            .filter_map(|p| match p {
                PageOutcome::Extracted(content) => Some(content.text()),
                PageOutcome::Failed { .. } => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }
}

fn decode_page(item: &Value) -> PageOutcome {
    let success = item.get("success").and_then(Value::as_bool).unwrap_or(false);
    let filename = string_field(item, "filename").unwrap_or_else(|| "unknown".to_string());

    if !success {
        return PageOutcome::Failed {
            filename,
            error: string_field(item, "error").unwrap_or_else(|| "Unknown error".to_string()),
        };
    }

    match item
        .pointer("/message/choices/0/message/content")
        .and_then(Value::as_str)
    {
        Some(content) => PageOutcome::Extracted(PageContent::classify(content)),
        None => PageOutcome::Failed {
            filename,
            error: "malformed page result: missing message.choices[0].message.content".into(),
        },
    }
}

/// A field rendered as text: strings verbatim, other non-null values as JSON.
fn string_field(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// ── Provider seam ────────────────────────────────────────────────────────

/// Anything that can turn a PDF on disk into an [`OcrDocument`].
///
/// The batch driver holds an `Arc<dyn OcrProvider>` so tests and embedding
/// applications can supply their own implementation.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    async fn extract(&self, pdf_path: &Path, params: &OcrParams) -> Result<OcrDocument, FileError>;
}

/// HTTP client for the Typhoon OCR endpoint.
#[derive(Clone)]
pub struct TyphoonOcrClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl TyphoonOcrClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, PipelineError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| PipelineError::HttpClient(e.to_string()))?;

        Ok(Self::with_http_client(client, endpoint, api_key))
    }

    /// Wrap an existing `reqwest::Client` (shared pools, custom proxies).
    pub fn with_http_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl OcrProvider for TyphoonOcrClient {
    async fn extract(&self, pdf_path: &Path, params: &OcrParams) -> Result<OcrDocument, FileError> {
        let bytes = tokio::fs::read(pdf_path)
            .await
            .map_err(|e| FileError::io(pdf_path, &e))?;
        debug!("Uploading {} ({} bytes)", pdf_path.display(), bytes.len());

        let part = Part::bytes(bytes)
            .file_name(file_name(pdf_path))
            .mime_str("application/pdf")
            .map_err(|e| FileError::http(&e))?;

        let form = params
            .form_fields()
            .into_iter()
            .fold(Form::new().part("file", part), |form, (name, value)| {
                form.text(name, value)
            });

        let response = self
            .client
            .post(self.endpoint.as_str())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| FileError::http(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| FileError::http(&e))?;

        if status != StatusCode::OK {
            warn!("OCR endpoint returned {} for {}", status.as_u16(), pdf_path.display());
            return Err(FileError::Status {
                code: status.as_u16(),
                body,
            });
        }

        OcrDocument::parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pages: Option<Vec<usize>>) -> OcrParams {
        OcrParams {
            model: "typhoon-ocr".into(),
            task_type: "default".into(),
            max_tokens: 16384,
            temperature: 0.1,
            top_p: 0.6,
            repetition_penalty: 1.2,
            pages,
        }
    }

    #[test]
    fn form_fields_render_decimal_text() {
        let fields = params(Some(vec![1, 2, 3])).form_fields();
        let get = |k: &str| fields.iter().find(|(n, _)| *n == k).map(|(_, v)| v.as_str());
        assert_eq!(get("model"), Some("typhoon-ocr"));
        assert_eq!(get("task_type"), Some("default"));
        assert_eq!(get("max_tokens"), Some("16384"));
        assert_eq!(get("temperature"), Some("0.1"));
        assert_eq!(get("top_p"), Some("0.6"));
        assert_eq!(get("repetition_penalty"), Some("1.2"));
        assert_eq!(get("pages"), Some("[1,2,3]"));
    }

    #[test]
    fn form_fields_omit_pages_when_unset() {
        assert!(params(None).form_fields().iter().all(|(n, _)| *n != "pages"));
        assert!(params(Some(vec![])).form_fields().iter().all(|(n, _)| *n != "pages"));
    }

    #[test]
    fn classify_structured_content() {
        let c = PageContent::classify(r#"{"natural_text": "ศาลฎีกา", "other": 1}"#);
        assert_eq!(
            c,
            PageContent::Structured {
                natural_text: "ศาลฎีกา".into()
            }
        );
        assert_eq!(c.text(), "ศาลฎีกา");
    }

    #[test]
    fn classify_plain_and_other_json() {
        assert_eq!(PageContent::classify("plain"), PageContent::Plain("plain".into()));
        let no_field = r#"{"text": "x"}"#;
        assert_eq!(PageContent::classify(no_field), PageContent::Plain(no_field.into()));
        let non_string = r#"{"natural_text": null}"#;
        assert_eq!(PageContent::classify(non_string), PageContent::Plain(non_string.into()));
        assert_eq!(PageContent::classify("[1, 2]"), PageContent::Plain("[1, 2]".into()));
        assert_eq!(PageContent::classify("{broken"), PageContent::Plain("{broken".into()));
    }

    fn ok_page(content: &str) -> Value {
        json!({"success": true, "filename": "a.pdf", "message": {"choices": [{"message": {"content": content}}]}})
    }

    #[test]
    fn document_joins_pages_in_order() {
        let body = json!({"results": [
            ok_page("page one"),
            {"success": false, "filename": "a.pdf", "error": "timeout"},
            ok_page(r#"{"natural_text": "page three"}"#),
        ]});
        let doc = OcrDocument::from_json(&body).unwrap();
        assert_eq!(doc.pages.len(), 3);
        assert_eq!(doc.failed_pages(), 1);
        assert_eq!(doc.failures().collect::<Vec<_>>(), vec![("a.pdf", "timeout")]);
        assert_eq!(doc.text().as_deref(), Some("page one\npage three"));
    }

    #[test]
    fn document_without_successes_has_no_text() {
        let body = json!({"results": [{"success": false}]});
        let doc = OcrDocument::from_json(&body).unwrap();
        assert_eq!(doc.text(), None);
        assert_eq!(doc.failures().collect::<Vec<_>>(), vec![("unknown", "Unknown error")]);

        assert_eq!(OcrDocument::from_json(&json!({})).unwrap().text(), None);
    }

    #[test]
    fn success_without_message_is_a_failed_page() {
        let body = json!({"results": [
            {"success": true, "filename": "a.pdf"},
            {"success": true, "filename": "a.pdf", "message": {"choices": []}},
            ok_page("kept"),
        ]});
        let doc = OcrDocument::from_json(&body).unwrap();
        assert_eq!(doc.failed_pages(), 2);
        assert_eq!(doc.text().as_deref(), Some("kept"));
    }

    #[test]
    fn results_of_wrong_type_is_decode_error() {
        let err = OcrDocument::from_json(&json!({"results": "nope"})).unwrap_err();
        assert!(matches!(err, FileError::Decode { .. }));
    }

    #[test]
    fn parse_rejects_non_json_body() {
        let err = OcrDocument::parse("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, FileError::Decode { .. }));
    }

    #[test]
    fn client_keeps_endpoint() {
        let client = TyphoonOcrClient::new(DEFAULT_OCR_ENDPOINT, "key", None).unwrap();
        assert_eq!(client.endpoint(), DEFAULT_OCR_ENDPOINT);
    }
}
