//! Domain types shared by the retrieval core and the HTTP layer.

use serde::{Deserialize, Serialize};

/// Positional identifier of a corpus snippet (its index in the loaded order).
pub type EntryId = usize;

/// An immutable snippet of the knowledge corpus.
///
/// Created once at startup by the corpus loader and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub id: EntryId,
    pub text: String,
}

impl CorpusEntry {
    pub fn new(id: EntryId, text: impl Into<String>) -> Self {
        Self { id, text: text.into() }
    }
}

/// Inbound chat body. `message` is optional at the wire level so a missing
/// field is rejected by validation rather than by the JSON extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: Some(message.into()) }
    }

    /// Returns the message if it is present and non-blank.
    pub fn validated_message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

/// Similarity function used by the retrieval index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Dot product over L2-normalized vectors.
    #[default]
    Cosine,
    /// Raw dot product, no normalization.
    Dot,
}

/// Which boundary produced a failure payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Upstream,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFailure {
    pub error: FailureKind,
    pub message: String,
}

/// Outbound chat body: `{"response": ...}` or `{"error": ..., "message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatResponse {
    Reply(ChatReply),
    Failure(ChatFailure),
}

impl ChatResponse {
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply(ChatReply { response: text.into() })
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure(ChatFailure { error: kind, message: message.into() })
    }

    pub fn as_reply(&self) -> Option<&str> {
        match self {
            Self::Reply(r) => Some(&r.response),
            Self::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&ChatFailure> {
        match self {
            Self::Reply(_) => None,
            Self::Failure(f) => Some(f),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Reply(_) => None,
            Self::Failure(f) => Some(f.error),
        }
    }
}
