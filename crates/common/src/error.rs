use std::path::{Path, PathBuf};

/// PaperSeek error types
#[derive(Debug, thiserror::Error)]
pub enum PaperSeekError {
    /// Vector length differs from the configured embedding dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Query against a vector store holding zero vectors
    #[error("Index is empty")]
    EmptyIndex,

    /// docId alignment between the facet stores and the record store is broken
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// Persisted index file is unreadable, truncated or tagged incorrectly
    #[error("Corrupt index {}: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    /// Fused docId has no record in the record store
    #[error("Record not found for docId {0}")]
    RecordNotFound(usize),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM / embedding service error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Metadata extraction response could not be parsed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PaperSeekError {
    /// Create dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create consistency error
    pub fn consistency<S: Into<String>>(msg: S) -> Self {
        Self::Consistency(msg.into())
    }

    /// Create corrupt index error
    pub fn corrupt_index<S: Into<String>>(path: &Path, reason: S) -> Self {
        Self::CorruptIndex {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create LLM error
    pub fn llm<S: Into<String>>(msg: S) -> Self {
        Self::Llm(msg.into())
    }

    /// Create extraction error
    pub fn extraction<S: Into<String>>(msg: S) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the error means the persisted or in-memory index state can no
    /// longer be trusted
    pub fn is_state_corruption(&self) -> bool {
        matches!(
            self,
            Self::Consistency(_) | Self::CorruptIndex { .. } | Self::RecordNotFound(_)
        )
    }
}
