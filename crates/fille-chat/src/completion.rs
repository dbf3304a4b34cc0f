//! Client for an OpenAI-compatible chat-completions endpoint (Groq by default).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use fille_core::config::{UpstreamSettings, API_KEY_ENV};

/// Every way the completion call can fail. None of these carry the upstream
/// body or the credential.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream returned HTTP {status}")]
    Status { status: u16 },

    #[error("upstream response malformed: {0}")]
    Malformed(String),

    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream transport failure: {0}")]
    Transport(String),
}

impl UpstreamError {
    /// Failures worth another attempt: network trouble, timeouts, 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status } => *status == 429 || *status >= 500,
            Self::Timeout | Self::Transport(_) => true,
            Self::Malformed(_) => false,
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e.without_url().to_string())
        }
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `prompt` as the only user turn and return the first choice's text.
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [RequestMessage<'a>; 1],
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
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

pub struct ChatCompletionsClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl ChatCompletionsClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>, timeout: Duration, connect_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout.min(timeout))
            .build()?;
        Ok(Self { http, endpoint: endpoint.into(), model: model.into(), api_key: api_key.into(), timeout })
    }

    pub fn from_settings(settings: &UpstreamSettings) -> anyhow::Result<Self> {
        let api_key = settings.api_key().ok_or_else(|| {
            fille_core::Error::InvalidConfig(format!("upstream.api_key is not set (export {API_KEY_ENV})"))
        })?;
        Self::new(
            settings.endpoint.clone(),
            settings.model.clone(),
            api_key,
            Duration::from_secs(settings.timeout_secs),
            Duration::from_secs(settings.connect_timeout_secs),
        )
    }

    pub fn model(&self) -> &str { &self.model }
    pub fn timeout(&self) -> Duration { self.timeout }
}

impl fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionsClient {
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: [RequestMessage { role: "user", content: prompt }],
        };
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), content_length = ?response.content_length(), "Completion API returned non-success status");
            return Err(UpstreamError::Status { status: status.as_u16() });
        }
        let text = response.text().await.map_err(UpstreamError::from_reqwest)?;

        let parsed: CompletionResponse = serde_json::from_str(&text)
            .map_err(|e| UpstreamError::Malformed(format!("body is not a completion response: {}", e)))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| UpstreamError::Malformed("missing choices[0].message.content".to_string()))
    }
}
