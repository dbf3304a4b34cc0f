//! fille-chat
//!
//! Retrieval-augmented chat: encode the user's message, look up the closest
//! corpus snippet, compose an augmented prompt and relay the completion.

pub mod bootstrap;
pub mod completion;
pub mod orchestrator;
pub mod prompt;

pub use bootstrap::bootstrap;
pub use completion::{ChatCompletionsClient, CompletionClient, UpstreamError};
pub use orchestrator::{ChatError, ChatOrchestrator, Retrieved};
pub use prompt::PromptComposer;
