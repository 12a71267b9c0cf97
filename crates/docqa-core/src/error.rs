//! Error types for docqa

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage that an embedding call belongs to.
pub type Stage = &'static str;

/// Core error types for the docqa pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Non-finite value in {0} vector")]
    NonFiniteVector(String),

    #[error("The corpus is empty. Load at least one document before asking.")]
    EmptyCorpus,

    #[error("Embedding failed during {stage}: {reason}")]
    EmbeddingFailure { stage: Stage, reason: String },

    #[error("Answer generation failed: {reason}")]
    GenerationFailure { reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported document: {0}")]
    UnsupportedDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an embedding failure for a pipeline stage.
    pub fn embedding(stage: Stage, reason: impl std::fmt::Display) -> Self {
        Error::EmbeddingFailure {
            stage,
            reason: reason.to_string(),
        }
    }

    /// Attribute an embedder error to a pipeline stage.
    ///
    /// Errors that already carry a stage keep it.
    pub fn into_embedding_failure(self, stage: Stage) -> Self {
        match self {
            err @ Error::EmbeddingFailure { .. } => err,
            other => Error::embedding(stage, other),
        }
    }

    /// Attribute a generator error to the generation stage.
    pub fn into_generation_failure(self) -> Self {
        match self {
            err @ Error::GenerationFailure { .. } => err,
            other => Error::GenerationFailure {
                reason: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
