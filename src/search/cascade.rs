//! Fallback cascade: picks the search mode for each request.
//!
//! ```text
//!                     ┌─ flag off ──────────────────────────────→ bm25
//! search(query) ──────┤
//!                     └─ flag on ─┬─ lexical ───────────┐
//!                                 └─ embed → vector ────┴─ Settled ─→ hybrid
//!                                      (bounded)           TimedOut ─→ bm25_fallback
//!                                                          Unavailable → bm25_fallback
//!
//! search_neural(query) ─ flag off → NeuralDisabled
//!                      └ flag on  → embed → vector ─ Settled → neural
//!                                                   otherwise → SemanticUnavailable
//! ```
//!
//! Only a lexical failure fails a hybrid request. Every degraded path returns
//! a normal [`SearchResult`] with the mode saying what happened.

use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use super::embedder::QueryEmbedder;
use super::error::{LexicalError, SearchError};
use super::fusion::ScoreFusionEngine;
use super::lexical::LexicalSearchClient;
use super::report::ModeReporter;
use super::types::{Candidate, SearchMode, SearchQuery, SearchResult};
use super::vector::{VectorOutcome, VectorSearchClient, bounded_vector_lookup};
use crate::config::HybridConfig;

#[derive(Debug)]
pub struct CascadeSearcher<L, E, V> {
    lexical: L,
    embedder: E,
    vector: V,
    config: HybridConfig,
    fusion: ScoreFusionEngine,
}

impl<L, E, V> CascadeSearcher<L, E, V>
where
    L: LexicalSearchClient,
    E: QueryEmbedder,
    V: VectorSearchClient,
{
    pub fn new(lexical: L, embedder: E, vector: V, config: HybridConfig) -> Self {
        let fusion = ScoreFusionEngine::new(config.weights);
        Self {
            lexical,
            embedder,
            vector,
            config,
            fusion,
        }
    }

    /// Hybrid/default search.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResult, SearchError> {
        query.validate(self.config.max_limit, self.config.max_query_chars)?;

        let mut reporter = ModeReporter::start();
        let fetch_limit = self.config.fetch_limit(query.limit());

        if !self.config.semantic_enabled {
            let (lexical, lexical_elapsed) = self.timed_lexical(query, fetch_limit).await?;
            reporter.record_lexical(lexical_elapsed);
            let fused = self.fusion.lexical_only(lexical, query.limit());
            return Ok(reporter.finish(SearchMode::Bm25, fused, None));
        }

        let semantic = async {
            let start = Instant::now();
            let outcome = bounded_vector_lookup(
                &self.embedder,
                &self.vector,
                query,
                fetch_limit,
                self.config.vector_timeout,
            )
            .await;
            Ok::<_, LexicalError>((outcome, start.elapsed()))
        };

        let ((lexical, lexical_elapsed), (outcome, semantic_elapsed)) =
            tokio::try_join!(self.timed_lexical(query, fetch_limit), semantic)?;
        reporter.record_lexical(lexical_elapsed);
        reporter.record_semantic(semantic_elapsed);

        match outcome {
            VectorOutcome::Settled(vector) => {
                let fusion_start = Instant::now();
                let fused = self.fusion.fuse(lexical, vector, query.limit());
                reporter.record_fusion(fusion_start.elapsed());
                Ok(reporter.finish(SearchMode::Hybrid, fused, None))
            }
            degraded => {
                let reason = degraded.reason().unwrap_or_default();
                warn!(
                    reason = %reason,
                    search_mode = SearchMode::Bm25Fallback.as_str(),
                    "semantic path degraded, serving lexical results"
                );
                let fused = self.fusion.lexical_only(lexical, query.limit());
                Ok(reporter.finish(SearchMode::Bm25Fallback, fused, Some(reason)))
            }
        }
    }

    /// Standalone vector-only search. Never falls back to lexical.
    pub async fn search_neural(&self, query: &SearchQuery) -> Result<SearchResult, SearchError> {
        if !self.config.semantic_enabled {
            debug!("neural search rejected, semantic path disabled");
            return Err(SearchError::NeuralDisabled);
        }
        query.validate(self.config.max_limit, self.config.max_query_chars)?;

        let mut reporter = ModeReporter::start();
        let start = Instant::now();
        let outcome = bounded_vector_lookup(
            &self.embedder,
            &self.vector,
            query,
            self.config.fetch_limit(query.limit()),
            self.config.vector_timeout,
        )
        .await;
        reporter.record_semantic(start.elapsed());

        match outcome {
            VectorOutcome::Settled(vector) => {
                let ranked = self.fusion.vector_only(vector, query.limit());
                Ok(reporter.finish(SearchMode::Neural, ranked, None))
            }
            failed => {
                let reason = failed.reason().unwrap_or_default();
                warn!(reason = %reason, "neural search unavailable");
                Err(SearchError::SemanticUnavailable(reason))
            }
        }
    }

    async fn timed_lexical(
        &self,
        query: &SearchQuery,
        fetch_limit: usize,
    ) -> Result<(Vec<Candidate>, Duration), LexicalError> {
        let start = Instant::now();
        let hits = self
            .lexical
            .search(query.text(), fetch_limit, query.filters())
            .await
            .inspect_err(|e| error!(error = %e, "lexical search failed"))?;
        Ok((hits, start.elapsed()))
    }
}
