//! Query embedder trait.
//!
//! An embedder turns query text into an [`EmbeddingVector`]. Implementations
//! may call out to a remote provider and are allowed to fail; the cascade
//! treats every [`EmbeddingError`] as a reason to degrade, never as a
//! request failure.
//!
//! # Implementations
//!
//! - **Hash embedder**: FNV-1a feature hashing (always available, deterministic)

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::error::EmbeddingError;
use super::types::EmbeddingVector;

pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

pub trait QueryEmbedder: Send + Sync {
    /// Stable identifier, e.g. `fnv1a-384`.
    fn id(&self) -> &str;

    /// Output dimension.
    fn dimension(&self) -> usize;

    /// Whether the embedding captures meaning rather than surface tokens.
    fn is_semantic(&self) -> bool;

    fn embed(&self, text: &str) -> impl Future<Output = EmbeddingResult<EmbeddingVector>> + Send;
}

impl<T: QueryEmbedder> QueryEmbedder for Arc<T> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn is_semantic(&self) -> bool {
        (**self).is_semantic()
    }

    fn embed(&self, text: &str) -> impl Future<Output = EmbeddingResult<EmbeddingVector>> + Send {
        (**self).embed(text)
    }
}

/// Metadata about an embedder for display and logging.
#[derive(Debug, Clone)]
pub struct EmbedderInfo {
    pub id: String,
    pub dimension: usize,
    pub is_semantic: bool,
}

impl EmbedderInfo {
    pub fn from_embedder(embedder: &impl QueryEmbedder) -> Self {
        Self {
            id: embedder.id().to_string(),
            dimension: embedder.dimension(),
            is_semantic: embedder.is_semantic(),
        }
    }
}

impl fmt::Display for EmbedderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_semantic {
            "semantic"
        } else {
            "lexical"
        };
        write!(f, "{} ({}, {} dims)", self.id, kind, self.dimension)
    }
}
