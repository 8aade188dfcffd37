use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between reading a PDF and printing an answer.
#[derive(Debug, Error)]
pub enum RagError {
    /// A PDF or the folder holding it could not be read.
    #[error("cannot load {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    /// The embedding backend failed or returned vectors of the wrong shape.
    #[error("{provider} embedding failed: {message}")]
    Embedding { provider: String, message: String },

    /// The vector index rejected an operation.
    #[error("vector index: {0}")]
    Index(String),

    /// The chat model call failed or its reply was unusable.
    #[error("{provider} generation failed: {message}")]
    Generation { provider: String, message: String },

    /// Settings that cannot work together, caught before any I/O.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A pipeline stage failed; the message names the stage and the input.
    #[error("{0}")]
    Pipeline(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    pub(crate) fn embedding(provider: &str, message: impl Into<String>) -> Self {
        Self::Embedding { provider: provider.to_string(), message: message.into() }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
