//! Search layer facade.
//!
//! - **[`cascade`]**: Fallback cascade that picks hybrid, bm25, bm25_fallback or neural.
//! - **[`fusion`]**: Weighted score fusion with dedup and deterministic ordering.
//! - **[`lexical`]**: Lexical client trait and the tantivy BM25 implementation.
//! - **[`tantivy`]**: Tantivy schema and index building from corpus documents.
//! - **[`vector`]**: Vector client trait and the time-bounded semantic lookup.
//! - **[`vector_index`]**: In-memory f16 vector store with SIMD scoring.
//! - **[`embedder`]**: Query embedder trait.
//! - **[`hash_embedder`]**: FNV-1a feature hashing embedder (deterministic fallback).
//! - **[`canonicalize`]**: Text preprocessing for consistent embedding input.
//! - **[`report`]**: Search mode and timing reporter.

pub mod canonicalize;
pub mod cascade;
pub mod embedder;
pub mod error;
pub mod fusion;
pub mod hash_embedder;
pub mod lexical;
pub mod report;
pub mod tantivy;
pub mod types;
pub mod vector;
pub mod vector_index;

pub use cascade::CascadeSearcher;
pub use embedder::{EmbedderInfo, QueryEmbedder};
pub use error::{EmbeddingError, LexicalError, SearchError, VectorStoreError};
pub use fusion::{FusedCandidates, FusionWeights, ScoreFusionEngine};
pub use lexical::{LexicalSearchClient, TantivyLexicalClient};
pub use types::{
    Candidate, EmbeddingVector, MatchSource, SearchMode, SearchQuery, SearchResult, SearchTimings,
};
pub use vector::{VectorOutcome, VectorSearchClient, bounded_vector_lookup};
pub use vector_index::InMemoryVectorStore;
