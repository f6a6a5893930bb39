//! FNV-1a feature hashing embedder.
//!
//! Each token of the canonicalized, lowercased input is hashed into one of
//! `dimension` buckets with a hash-derived sign, and the result is
//! L2-normalized. It captures no meaning, but it is deterministic, needs no
//! model files and is always available, which makes it the default embedder
//! for the CLI and for tests.

use std::future::Future;

use super::canonicalize::canonicalize_for_embedding;
use super::embedder::{EmbeddingResult, QueryEmbedder};
use super::error::EmbeddingError;
use super::types::EmbeddingVector;

/// Default output dimension.
pub const DEFAULT_DIMENSION: usize = 384;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            id: format!("fnv1a-{dimension}"),
        }
    }

    pub fn default_dimension() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }

    /// Embed synchronously; used when building the vector store.
    pub fn embed_sync(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let canonical = canonicalize_for_embedding(text).to_lowercase();
        let mut vector = vec![0.0f32; self.dimension];
        let mut tokens = 0usize;

        for token in canonical
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
            tokens += 1;
        }

        if tokens == 0 {
            return Err(EmbeddingError::InvalidInput(
                "text has no embeddable tokens".into(),
            ));
        }

        l2_normalize(&mut vector);
        Ok(vector)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::default_dimension()
    }
}

impl QueryEmbedder for HashEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_semantic(&self) -> bool {
        false
    }

    fn embed(&self, text: &str) -> impl Future<Output = EmbeddingResult<EmbeddingVector>> + Send {
        let result = self.embed_sync(text).map(EmbeddingVector::new);
        async move { result }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}
