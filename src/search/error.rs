//! Error types for the search layer.
//!
//! Only [`SearchError`] ever reaches a caller. Embedding and vector-store
//! failures are recovered inside the cascade and turned into a degraded
//! [`SearchMode`](super::types::SearchMode) for hybrid search.

/// Errors surfaced by the two search entry points.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("lexical search failed: {0}")]
    LexicalSearchFailure(#[from] LexicalError),

    #[error("neural search is disabled")]
    NeuralDisabled,

    #[error("semantic search unavailable: {0}")]
    SemanticUnavailable(String),
}

impl SearchError {
    /// HTTP-equivalent status code for the error.
    pub fn status_code(&self) -> u16 {
        match self {
            SearchError::InvalidRequest(_) => 400,
            SearchError::LexicalSearchFailure(_) => 500,
            SearchError::NeuralDisabled | SearchError::SemanticUnavailable(_) => 503,
        }
    }
}

/// Failures of the baseline lexical search.
#[derive(Debug, thiserror::Error)]
pub enum LexicalError {
    #[error("index error: {0}")]
    Index(String),

    #[error("search task failed: {0}")]
    Task(String),
}

impl From<tantivy::TantivyError> for LexicalError {
    fn from(err: tantivy::TantivyError) -> Self {
        LexicalError::Index(err.to_string())
    }
}

/// Query embedding failures. Always non-fatal for hybrid search.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedder unavailable: {0}")]
    Unavailable(String),

    #[error("invalid embedding input: {0}")]
    InvalidInput(String),
}

/// Vector store failures other than a timeout.
#[derive(Debug, Clone, thiserror::Error)]
pub enum VectorStoreError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector store unavailable: {0}")]
    Unavailable(String),
}
