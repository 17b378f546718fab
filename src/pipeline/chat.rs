//! Chat-completion interaction for the rewrite stage.
//!
//! Speaks the OpenAI-compatible `/chat/completions` schema, which OpenRouter
//! and most hosted gateways accept. Only the fields the rewrite stage needs
//! are modelled: `model`, `messages`, `temperature` on the way out and
//! `choices[0].message.content` on the way back.

use crate::error::{FileError, PipelineError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default OpenAI-compatible base URL (OpenRouter).
pub const DEFAULT_CHAT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Per-request sampling options.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Extract `choices[0].message.content` from a response body.
///
/// `Ok(None)` when the body is well-formed but carries no content.
pub fn parse_chat_response(body: &str) -> Result<Option<String>, FileError> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|e| FileError::Decode {
        detail: format!("chat response: {e}"),
    })?;

    Ok(response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content))
}

// ── Provider seam ────────────────────────────────────────────────────────

/// Anything that can answer a list of chat messages with a reply.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send `messages` and return the raw reply content.
    async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<String, FileError>;
}

/// HTTP client for any OpenAI-compatible chat-completion endpoint.
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
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

        Ok(Self::with_http_client(client, base_url, api_key))
    }

    /// Wrap an existing `reqwest::Client` (shared pools, custom proxies).
    pub fn with_http_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Full URL of the completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleClient {
    async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> Result<String, FileError> {
        let request = ChatRequest {
            model: &options.model,
            messages,
            temperature: options.temperature,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| FileError::http(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| FileError::http(&e))?;

        if !status.is_success() {
            return Err(FileError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let content = parse_chat_response(&body)?.ok_or(FileError::EmptyReply)?;
        debug!("Chat reply: {} chars", content.chars().count());
        Ok(content)
    }
}
