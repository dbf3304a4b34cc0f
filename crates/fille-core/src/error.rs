use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Corpus at {0} contains no usable entries")]
    EmptyCorpus(String),

    #[error("Failed to read corpus {path}: {reason}")]
    Corpus { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
