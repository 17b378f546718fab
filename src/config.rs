//! Configuration types for the OCR and rewrite batches.
//!
//! Each batch is controlled through one struct ([`OcrConfig`],
//! [`RewriteConfig`]) built via its builder. Defaults reproduce the fixed
//! parameters the pipeline has always used, so `OcrConfig::default()` is a
//! ready-to-run configuration once the API key is in the environment.

use crate::error::PipelineError;
use crate::pipeline::chat::{ChatProvider, DEFAULT_CHAT_BASE_URL};
use crate::pipeline::ocr::{OcrProvider, DEFAULT_OCR_ENDPOINT};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding the OCR service key.
pub const OCR_API_KEY_ENV: &str = "TYPHOON_API_KEY";

/// Environment variable holding the chat-completion key.
pub const CHAT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Largest number of pages a single [`PageSelection::Range`] may span.
pub const MAX_PAGE_RANGE: usize = 10_000;

/// Read an API key from `var`, treating empty values as unset.
pub fn api_key_from_env(var: &str, hint: &str) -> Result<String, PipelineError> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(PipelineError::MissingApiKey {
            var: var.to_string(),
            hint: hint.to_string(),
        }),
    }
}

fn redact(key: &Option<String>) -> Option<&'static str> {
    key.as_ref().map(|_| "<redacted>")
}

// ── OCR ──────────────────────────────────────────────────────────────────

/// Configuration for an OCR batch.
///
/// # Example
/// ```rust
/// use verdict_pipeline::{OcrConfig, PageSelection};
///
/// let config = OcrConfig::builder()
///     .input_dir("scans")
///     .pages(PageSelection::Range(1, 5))
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 16384);
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// OCR endpoint URL.
    pub endpoint: String,

    /// API key. If None, read from [`OCR_API_KEY_ENV`] when the batch starts.
    pub api_key: Option<String>,

    /// OCR model identifier. Default: `typhoon-ocr`.
    pub model: String,

    /// Service task type. Default: `default`.
    pub task_type: String,

    /// Maximum tokens generated per page. Default: 16384.
    pub max_tokens: u32,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Nucleus-sampling cut-off. Default: 0.6.
    pub top_p: f32,

    /// Repetition penalty. Default: 1.2.
    pub repetition_penalty: f32,

    /// Pages requested from the service. Default: pages 1–22.
    pub pages: PageSelection,

    /// Directory scanned for `*.pdf`. Default: `input`.
    pub input_dir: PathBuf,

    /// Directory receiving `<stem>.txt`. Default: `output`.
    pub output_dir: PathBuf,

    /// Files processed at once. Default: 1 (strictly sequential).
    pub concurrency: usize,

    /// Per-request timeout. Default: none.
    pub request_timeout_secs: Option<u64>,

    /// Pre-constructed provider. Takes precedence over endpoint + key.
    pub provider: Option<Arc<dyn OcrProvider>>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OCR_ENDPOINT.to_string(),
            api_key: None,
            model: "typhoon-ocr".to_string(),
            task_type: "default".to_string(),
            max_tokens: 16384,
            temperature: 0.1,
            top_p: 0.6,
            repetition_penalty: 1.2,
            pages: PageSelection::Range(1, 22),
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            concurrency: 1,
            request_timeout_secs: None,
            provider: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("task_type", &self.task_type)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("repetition_penalty", &self.repetition_penalty)
            .field("pages", &self.pages)
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("concurrency", &self.concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn OcrProvider>"))
            .finish()
    }
}

impl OcrConfig {
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn task_type(mut self, task_type: impl Into<String>) -> Self {
        self.config.task_type = task_type.into();
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn repetition_penalty(mut self, p: f32) -> Self {
        self.config.repetition_penalty = p;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn OcrProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, PipelineError> {
        let c = &self.config;
        if c.endpoint.trim().is_empty() && c.provider.is_none() {
            return Err(PipelineError::InvalidConfig("OCR endpoint must not be empty".into()));
        }
        if c.model.trim().is_empty() {
            return Err(PipelineError::InvalidConfig("OCR model must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(PipelineError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.repetition_penalty <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "repetition_penalty must be > 0, got {}",
                c.repetition_penalty
            )));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(PipelineError::InvalidConfig("request timeout must be ≥ 1s".into()));
        }
        if let PageSelection::Range(start, end) = c.pages {
            check_range(start, end)?;
        }
        Ok(self.config)
    }
}

// ── Rewrite ──────────────────────────────────────────────────────────────

/// Configuration for a rewrite batch.
#[derive(Clone)]
pub struct RewriteConfig {
    /// OpenAI-compatible base URL (`…/v1`).
    pub base_url: String,

    /// API key. If None, read from [`CHAT_API_KEY_ENV`] when the batch starts.
    pub api_key: Option<String>,

    /// Chat model identifier. Default: `google/gemini-3-flash-preview`.
    pub model: String,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Custom system prompt. If None, uses [`crate::prompts::VERDICT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Directory scanned for `*.txt`. Default: `output`.
    pub input_dir: PathBuf,

    /// Directory receiving revised files. Default: `output_revised`.
    pub output_dir: PathBuf,

    /// Maximum files to process; 0 means no limit.
    pub limit: usize,

    /// Process only this file name inside `input_dir`.
    pub file: Option<String>,

    /// Files processed at once. Default: 1 (strictly sequential).
    pub concurrency: usize,

    /// Per-request timeout. Default: none.
    pub request_timeout_secs: Option<u64>,

    /// Apply [`crate::pipeline::postprocess::clean_reply`] to replies. Default: false.
    pub clean_output: bool,

    /// Pre-constructed provider. Takes precedence over base URL + key.
    pub provider: Option<Arc<dyn ChatProvider>>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            api_key: None,
            model: "google/gemini-3-flash-preview".to_string(),
            temperature: 0.1,
            system_prompt: None,
            input_dir: PathBuf::from("output"),
            output_dir: PathBuf::from("output_revised"),
            limit: 0,
            file: None,
            concurrency: 1,
            request_timeout_secs: None,
            clean_output: false,
            provider: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RewriteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewriteConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("limit", &self.limit)
            .field("file", &self.file)
            .field("concurrency", &self.concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("clean_output", &self.clean_output)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn ChatProvider>"))
            .finish()
    }
}

impl RewriteConfig {
    pub fn builder() -> RewriteConfigBuilder {
        RewriteConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Builder for [`RewriteConfig`].
#[derive(Debug)]
pub struct RewriteConfigBuilder {
    config: RewriteConfig,
}

impl RewriteConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.config.limit = n;
        self
    }

    pub fn file(mut self, name: impl Into<String>) -> Self {
        self.config.file = Some(name.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn clean_output(mut self, v: bool) -> Self {
        self.config.clean_output = v;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RewriteConfig, PipelineError> {
        let c = &self.config;
        if c.base_url.trim().is_empty() && c.provider.is_none() {
            return Err(PipelineError::InvalidConfig("base URL must not be empty".into()));
        }
        if c.model.trim().is_empty() {
            return Err(PipelineError::InvalidConfig("model must not be empty".into()));
        }
        if let Some(ref name) = c.file {
            if name.trim().is_empty() {
                return Err(PipelineError::InvalidConfig("--file must name a file".into()));
            }
        }
        if c.request_timeout_secs == Some(0) {
            return Err(PipelineError::InvalidConfig("request timeout must be ≥ 1s".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which pages the OCR service should process.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Let the service process every page (no `pages` field is sent).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand into the sorted, deduplicated 1-indexed page list sent on the wire.
    ///
    /// `None` means "all pages".
    pub fn to_page_list(&self) -> Option<Vec<usize>> {
        let mut pages: Vec<usize> = match self {
            PageSelection::All => return None,
            PageSelection::Single(p) => vec![*p],
            PageSelection::Range(start, end) => {
                let start = (*start).max(1);
                let end = (*end).min(start.saturating_add(MAX_PAGE_RANGE - 1));
                (start..=end).collect()
            }
            PageSelection::Set(pages) => pages.clone(),
        };
        pages.retain(|&p| p >= 1);
        pages.sort_unstable();
        pages.dedup();
        Some(pages)
    }
}

impl FromStr for PageSelection {
    type Err = PipelineError;

    /// Parse `all`, `5`, `3-15` or `1,3,5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let invalid = |msg: String| PipelineError::InvalidConfig(msg);
        let page = |p: &str| -> Result<usize, PipelineError> {
            let n: usize = p
                .trim()
                .parse()
                .map_err(|_| invalid(format!("Invalid page number: '{}'", p.trim())))?;
            if n < 1 {
                return Err(invalid(format!("Pages are 1-indexed, minimum is 1 (got {n})")));
            }
            Ok(n)
        };

        if s == "all" {
            return Ok(PageSelection::All);
        }

        if let Some((start, end)) = s.split_once('-') {
            let (start, end) = (page(start)?, page(end)?);
            check_range(start, end)?;
            return Ok(PageSelection::Range(start, end));
        }

        if s.contains(',') {
            let pages = s.split(',').map(page).collect::<Result<Vec<_>, _>>()?;
            return Ok(PageSelection::Set(pages));
        }

        Ok(PageSelection::Single(page(&s)?))
    }
}

fn check_range(start: usize, end: usize) -> Result<(), PipelineError> {
    if start > end {
        return Err(PipelineError::InvalidConfig(format!(
            "Invalid page range '{start}-{end}': start must be <= end"
        )));
    }
    if end - start >= MAX_PAGE_RANGE {
        return Err(PipelineError::InvalidConfig(format!(
            "Page range '{start}-{end}' spans more than {MAX_PAGE_RANGE} pages"
        )));
    }
    Ok(())
}
