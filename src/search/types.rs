//! Request and response types shared by every search path.
//!
//! All of these live for exactly one request: a [`SearchQuery`] comes in, the
//! paths produce [`Candidate`]s, and a [`SearchResult`] goes out.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::SearchError;

/// A single search request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
    limit: usize,
    filters: BTreeMap<String, String>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            limit,
            filters: BTreeMap::new(),
        }
    }

    /// Require documents whose metadata has `key` set to exactly `value`.
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn with_filters<I, K, V>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.filters
            .extend(filters.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    /// Reject malformed requests before any search path runs.
    pub fn validate(&self, max_limit: usize, max_query_chars: usize) -> Result<(), SearchError> {
        if self.text.trim().is_empty() {
            return Err(SearchError::InvalidRequest("query text is empty".into()));
        }
        let chars = self.text.chars().count();
        if chars > max_query_chars {
            return Err(SearchError::InvalidRequest(format!(
                "query is {chars} characters, maximum is {max_query_chars}"
            )));
        }
        if self.limit == 0 {
            return Err(SearchError::InvalidRequest(
                "limit must be at least 1".into(),
            ));
        }
        if self.limit > max_limit {
            return Err(SearchError::InvalidRequest(format!(
                "limit {} exceeds maximum of {max_limit}",
                self.limit
            )));
        }
        if self.filters.keys().any(|k| k.trim().is_empty()) {
            return Err(SearchError::InvalidRequest("filter key is empty".into()));
        }
        Ok(())
    }
}

/// Which path(s) produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Lexical,
    Vector,
    Both,
}

impl MatchSource {
    /// Combine the source of two records for the same identifier.
    pub fn merge(self, other: MatchSource) -> MatchSource {
        if self == other { self } else { MatchSource::Both }
    }
}

/// One ranked item. Identifiers are unique within a [`SearchResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    /// Snippet or source text for display.
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_score: Option<f32>,
    pub fused_score: f32,
    pub source: MatchSource,
}

impl Candidate {
    /// A raw lexical hit; `fused_score` is filled in by fusion.
    pub fn lexical(id: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            lexical_score: Some(score),
            vector_score: None,
            fused_score: 0.0,
            source: MatchSource::Lexical,
        }
    }

    /// A raw vector hit with similarity in [0, 1].
    pub fn vector(id: impl Into<String>, text: impl Into<String>, similarity: f32) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            lexical_score: None,
            vector_score: Some(similarity),
            fused_score: 0.0,
            source: MatchSource::Vector,
        }
    }
}

/// Query embedding. Owned by the request and dropped with it.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Retrieval strategy that actually produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Standalone vector-only endpoint.
    Neural,
    /// Lexical and vector results fused.
    Hybrid,
    /// Semantic path disabled by configuration.
    Bm25,
    /// Semantic path enabled but failed or timed out.
    Bm25Fallback,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::Neural => "neural",
            SearchMode::Hybrid => "hybrid",
            SearchMode::Bm25 => "bm25",
            SearchMode::Bm25Fallback => "bm25_fallback",
        }
    }

    /// True when the response came from a lower tier than requested.
    pub fn is_degraded(self) -> bool {
        matches!(self, SearchMode::Bm25Fallback)
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock time spent in each phase, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchTimings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_ms: Option<u64>,
    /// Embedding plus vector lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fusion_ms: Option<u64>,
}

/// Response for both entry points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub candidates: Vec<Candidate>,
    pub total_latency_ms: u64,
    /// Distinct identifiers seen across all paths before truncation.
    pub total_candidates: usize,
    pub search_mode: SearchMode,
    pub timings: SearchTimings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl SearchResult {
    pub fn ids(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.id.as_str()).collect()
    }
}
