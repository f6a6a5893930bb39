//! In-memory vector store with f16 quantized rows.
//!
//! Embeddings are stored row-major as `f16` to halve memory, and scored with a
//! SIMD dot product against the `f32` query. Rows are expected to be
//! L2-normalized, so the dot product is the cosine similarity; negative
//! similarity is clamped to 0 so scores land in [0, 1].
//!
//! The scan periodically yields to the async scheduler, which lets a caller's
//! timeout preempt a long lookup instead of waiting for it to finish.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use anyhow::{Result, bail};
use half::f16;
use tracing::debug;

use super::error::VectorStoreError;
use super::types::{Candidate, EmbeddingVector};
use super::vector::VectorSearchClient;

/// Rows scanned between scheduler yields.
const YIELD_EVERY_ROWS: usize = 1024;

/// Characters of document text carried on a vector candidate.
pub const SNIPPET_CHARS: usize = 240;

/// One document to be indexed.
#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub id: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    dimension: usize,
    /// Row-major embeddings.
    embeddings: Vec<f16>,
    ids: Vec<String>,
    snippets: Vec<String>,
    metadata: Vec<BTreeMap<String, String>>,
}

impl InMemoryVectorStore {
    /// Build a store from entries, rejecting any row of the wrong dimension.
    pub fn build(dimension: usize, entries: impl IntoIterator<Item = VectorEntry>) -> Result<Self> {
        let entries: Vec<VectorEntry> = entries.into_iter().collect();

        for (i, entry) in entries.iter().enumerate() {
            if entry.embedding.len() != dimension {
                bail!(
                    "embedding dimension mismatch at index {}: expected {}, got {}",
                    i,
                    dimension,
                    entry.embedding.len()
                );
            }
        }

        let mut store = Self {
            dimension,
            embeddings: Vec::with_capacity(entries.len() * dimension),
            ids: Vec::with_capacity(entries.len()),
            snippets: Vec::with_capacity(entries.len()),
            metadata: Vec::with_capacity(entries.len()),
        };

        for entry in entries {
            store
                .embeddings
                .extend(entry.embedding.iter().map(|&v| f16::from_f32(v)));
            store.snippets.push(snippet(&entry.text));
            store.ids.push(entry.id);
            store.metadata.push(entry.metadata);
        }

        debug!(
            rows = store.len(),
            dimension = store.dimension,
            "vector store built"
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn row(&self, idx: usize) -> &[f16] {
        let start = idx * self.dimension;
        &self.embeddings[start..start + self.dimension]
    }

    fn matches_filters(&self, idx: usize, filters: &BTreeMap<String, String>) -> bool {
        let meta = &self.metadata[idx];
        filters
            .iter()
            .all(|(k, v)| meta.get(k).is_some_and(|actual| actual == v))
    }

    async fn top_k(
        &self,
        query: &[f32],
        k: usize,
        filters: &BTreeMap<String, String>,
    ) -> Vec<ScoredEntry> {
        let k = k.min(self.len());
        let mut heap = BinaryHeap::with_capacity(k + 1);

        for idx in 0..self.len() {
            if idx > 0 && idx % YIELD_EVERY_ROWS == 0 {
                tokio::task::yield_now().await;
            }
            if !self.matches_filters(idx, filters) {
                continue;
            }
            let score = dot_product_f16(self.row(idx), query).clamp(0.0, 1.0);
            if score <= 0.0 {
                continue;
            }
            heap.push(std::cmp::Reverse(ScoredEntry { score, idx }));
            if heap.len() > k {
                heap.pop();
            }
        }

        heap.into_sorted_vec()
            .into_iter()
            .map(|std::cmp::Reverse(entry)| entry)
            .collect()
    }
}

impl VectorSearchClient for InMemoryVectorStore {
    async fn search(
        &self,
        vector: &EmbeddingVector,
        limit: usize,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<Candidate>, VectorStoreError> {
        if vector.dimension() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.dimension(),
            });
        }
        if self.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let scored = self.top_k(vector.as_slice(), limit, filters).await;
        Ok(scored
            .into_iter()
            .map(|entry| {
                Candidate::vector(
                    self.ids[entry.idx].clone(),
                    self.snippets[entry.idx].clone(),
                    entry.score,
                )
            })
            .collect())
    }
}

/// Scored entry for heap-based top-k search.
#[derive(Debug, Clone, Copy)]
struct ScoredEntry {
    score: f32,
    idx: usize,
}

impl PartialEq for ScoredEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredEntry {}

impl PartialOrd for ScoredEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredEntry {
    /// Higher score is greater; on ties the earlier row is greater.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((byte_idx, _)) => format!("{}…", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// SIMD-accelerated f16 · f32 dot product.
#[inline]
fn dot_product_f16(a: &[f16], b: &[f32]) -> f32 {
    use wide::f32x8;

    let len = a.len().min(b.len());
    let chunks = len / 8;
    let mut sum = f32x8::ZERO;

    for i in 0..chunks {
        let base = i * 8;
        let mut a_arr = [0.0f32; 8];
        let mut b_arr = [0.0f32; 8];
        for lane in 0..8 {
            a_arr[lane] = f32::from(a[base + lane]);
            b_arr[lane] = b[base + lane];
        }
        sum += f32x8::from(a_arr) * f32x8::from(b_arr);
    }

    let mut result: f32 = sum.reduce_add();
    for i in (chunks * 8)..len {
        result += f32::from(a[i]) * b[i];
    }
    result
}
