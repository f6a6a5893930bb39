//! Vector search client trait and the time-bounded semantic lookup.
//!
//! The semantic branch of a request is "embed the query, then ask the vector
//! store". [`bounded_vector_lookup`] runs that branch under a wall-clock
//! budget and reports the result as a [`VectorOutcome`] value instead of an
//! error, so the cascade can decide what to do with a plain `match`.
//!
//! ```text
//! query ──→ [QueryEmbedder] ──→ [VectorSearchClient] ──→ Settled(candidates)
//!               │                      │
//!               └── error ──┐          └── error ──→ Unavailable
//!                           ▼
//!                      Unavailable        (budget elapsed anywhere → TimedOut)
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use super::embedder::QueryEmbedder;
use super::error::{EmbeddingError, VectorStoreError};
use super::types::{Candidate, EmbeddingVector, SearchQuery};

/// Default budget for the whole semantic branch.
pub const DEFAULT_VECTOR_TIMEOUT: Duration = Duration::from_millis(100);

pub trait VectorSearchClient: Send + Sync {
    /// Nearest neighbours of `vector`, best first, similarity in [0, 1].
    fn search(
        &self,
        vector: &EmbeddingVector,
        limit: usize,
        filters: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<Vec<Candidate>, VectorStoreError>> + Send;
}

impl<T: VectorSearchClient> VectorSearchClient for Arc<T> {
    fn search(
        &self,
        vector: &EmbeddingVector,
        limit: usize,
        filters: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<Vec<Candidate>, VectorStoreError>> + Send {
        (**self).search(vector, limit, filters)
    }
}

/// Why the semantic branch produced no candidates.
#[derive(Debug, Clone)]
pub enum SemanticFailure {
    Embedding(EmbeddingError),
    Store(VectorStoreError),
}

impl fmt::Display for SemanticFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticFailure::Embedding(e) => write!(f, "embedding unavailable: {e}"),
            SemanticFailure::Store(e) => write!(f, "vector store failed: {e}"),
        }
    }
}

/// Terminal state of the semantic branch. Never partial.
#[derive(Debug, Clone)]
pub enum VectorOutcome {
    Settled(Vec<Candidate>),
    TimedOut { budget: Duration },
    Unavailable(SemanticFailure),
}

impl VectorOutcome {
    /// Short label for logs and the response's fallback reason.
    pub fn reason(&self) -> Option<String> {
        match self {
            VectorOutcome::Settled(_) => None,
            VectorOutcome::TimedOut { budget } => Some(format!(
                "vector search timed out after {}ms",
                budget.as_millis()
            )),
            VectorOutcome::Unavailable(failure) => Some(failure.to_string()),
        }
    }
}

/// Embed `query` and look it up, giving up after `budget`.
///
/// Hitting the budget drops the in-flight branch; nothing else is cancelled.
pub async fn bounded_vector_lookup<E, V>(
    embedder: &E,
    client: &V,
    query: &SearchQuery,
    fetch_limit: usize,
    budget: Duration,
) -> VectorOutcome
where
    E: QueryEmbedder,
    V: VectorSearchClient,
{
    let start = Instant::now();
    let branch = async {
        let vector = embedder
            .embed(query.text())
            .await
            .map_err(SemanticFailure::Embedding)?;
        debug!(
            embedder = embedder.id(),
            dimension = vector.dimension(),
            embed_ms = start.elapsed().as_millis() as u64,
            "query embedded"
        );
        client
            .search(&vector, fetch_limit, query.filters())
            .await
            .map_err(SemanticFailure::Store)
    };

    match tokio::time::timeout(budget, branch).await {
        Ok(Ok(candidates)) => {
            debug!(
                result_count = candidates.len(),
                latency_ms = start.elapsed().as_millis() as u64,
                "vector search settled"
            );
            VectorOutcome::Settled(candidates)
        }
        Ok(Err(failure)) => VectorOutcome::Unavailable(failure),
        Err(_elapsed) => VectorOutcome::TimedOut { budget },
    }
}
