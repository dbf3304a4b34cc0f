use anyhow::anyhow;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use fille_core::types::{ChatRequest, ChatResponse, EntryId, FailureKind};
use fille_core::Embedder;
use fille_vector::SimilarityIndex;

use crate::completion::{CompletionClient, UpstreamError};
use crate::prompt::PromptComposer;

pub const VALIDATION_MESSAGE: &str = "Prompt is required!";
pub const UPSTREAM_FAILURE_MESSAGE: &str = "Error in fetching the data from the AI service";
pub const INTERNAL_FAILURE_MESSAGE: &str = "Something went wrong while preparing the answer";

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message is missing or blank")]
    Validation,

    #[error("retrieval failed: {0:#}")]
    Retrieval(anyhow::Error),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ChatError {
    /// Caller-facing payload. Internal detail stays in the logs.
    pub fn to_response(&self) -> ChatResponse {
        match self {
            Self::Validation => ChatResponse::failure(FailureKind::Validation, VALIDATION_MESSAGE),
            Self::Upstream(_) => ChatResponse::failure(FailureKind::Upstream, UPSTREAM_FAILURE_MESSAGE),
            Self::Retrieval(_) => ChatResponse::failure(FailureKind::Internal, INTERNAL_FAILURE_MESSAGE),
        }
    }
}

/// The corpus snippet chosen as context for a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    pub id: EntryId,
    pub text: String,
    pub score: f32,
}

/// Per-request pipeline over state that is fixed at startup.
///
/// Holds no mutable state, so one instance serves all concurrent requests.
/// Dropping a `handle` future (e.g. on client disconnect) abandons the
/// outbound call.
pub struct ChatOrchestrator {
    embedder: Arc<dyn Embedder>,
    index: Arc<SimilarityIndex>,
    composer: PromptComposer,
    client: Arc<dyn CompletionClient>,
    max_retries: u32,
    deadline: Option<Duration>,
}

impl ChatOrchestrator {
    /// # Panics
    /// If the embedder and index disagree on vector dimension.
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<SimilarityIndex>, composer: PromptComposer, client: Arc<dyn CompletionClient>) -> Self {
        assert_eq!(embedder.dim(), index.dim(), "embedder and index dimensions differ");
        Self { embedder, index, composer, client, max_retries: 0, deadline: None }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Upper bound on the completion step as a whole, retries and backoff
    /// included. Attempts still in flight when it expires are dropped.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn index(&self) -> &SimilarityIndex { &self.index }
    pub fn embedder(&self) -> &dyn Embedder { self.embedder.as_ref() }

    pub async fn handle(&self, request: ChatRequest) -> ChatResponse {
        match self.answer(&request).await {
            Ok(text) => ChatResponse::reply(text),
            Err(err) => {
                match &err {
                    ChatError::Validation => tracing::debug!("Rejected chat request with blank message"),
                    ChatError::Upstream(e) => tracing::warn!(error = %e, "Completion failed"),
                    ChatError::Retrieval(e) => {
                        let detail = format!("{e:#}");
                        tracing::error!(error = %detail, "Retrieval failed");
                    }
                }
                err.to_response()
            }
        }
    }

    pub async fn answer(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let message = request.validated_message().ok_or(ChatError::Validation)?;
        let retrieved = self.retrieve(message).await?;
        tracing::debug!(entry = retrieved.id, score = retrieved.score, "Retrieved context");
        let prompt = self.composer.compose(message, &retrieved.text);
        Ok(self.complete_within_deadline(&prompt).await?)
    }

    /// Encode `query` and find the closest corpus entry, off the async executor.
    pub async fn retrieve(&self, query: &str) -> Result<Retrieved, ChatError> {
        let embedder = Arc::clone(&self.embedder);
        let index = Arc::clone(&self.index);
        let query = query.to_string();
        tokio::task::spawn_blocking(move || -> anyhow::Result<Retrieved> {
            let vector = embedder.embed_text(&query)?;
            let hit = index.nearest(&vector);
            Ok(Retrieved { id: hit.id, text: hit.entry.text.clone(), score: hit.score })
        })
        .await
        .map_err(|e| ChatError::Retrieval(anyhow!("retrieval task failed: {e}")))?
        .map_err(ChatError::Retrieval)
    }

    async fn complete_within_deadline(&self, prompt: &str) -> Result<String, UpstreamError> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.complete_with_retry(prompt))
                .await
                .unwrap_or(Err(UpstreamError::Timeout)),
            None => self.complete_with_retry(prompt).await,
        }
    }

    async fn complete_with_retry(&self, prompt: &str) -> Result<String, UpstreamError> {
        let mut attempt = 0u32;
        loop {
            match self.client.complete(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = retry_delay(attempt);
                    tracing::warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "Retrying completion");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY.saturating_mul(1u32 << attempt.saturating_sub(1).min(8)).min(RETRY_MAX_DELAY)
}
