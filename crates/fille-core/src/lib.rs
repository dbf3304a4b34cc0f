#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{Config, Settings};
pub use error::{Error, Result};
pub use traits::Embedder;
pub use types::{ChatFailure, ChatReply, ChatRequest, ChatResponse, CorpusEntry, EntryId, FailureKind, Metric};
