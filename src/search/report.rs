//! Stamps the terminal search mode and timings onto a response.
//!
//! A [`ModeReporter`] is started when a request is accepted and consumed by
//! [`ModeReporter::finish`], so a request can only be assigned one mode.

use std::time::{Duration, Instant};

use tracing::info;

use super::fusion::FusedCandidates;
use super::types::{SearchMode, SearchResult, SearchTimings};

#[derive(Debug)]
pub struct ModeReporter {
    started: Instant,
    timings: SearchTimings,
}

impl ModeReporter {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            timings: SearchTimings::default(),
        }
    }

    pub fn record_lexical(&mut self, elapsed: Duration) {
        self.timings.lexical_ms = Some(as_ms(elapsed));
    }

    pub fn record_semantic(&mut self, elapsed: Duration) {
        self.timings.semantic_ms = Some(as_ms(elapsed));
    }

    pub fn record_fusion(&mut self, elapsed: Duration) {
        self.timings.fusion_ms = Some(as_ms(elapsed));
    }

    /// Build the response and emit the `search_complete` event.
    pub fn finish(
        self,
        mode: SearchMode,
        fused: FusedCandidates,
        fallback_reason: Option<String>,
    ) -> SearchResult {
        let total_latency_ms = as_ms(self.started.elapsed());

        info!(
            search_mode = mode.as_str(),
            latency_ms = total_latency_ms,
            candidates = fused.candidates.len(),
            total_considered = fused.total_considered,
            lexical_ms = self.timings.lexical_ms,
            semantic_ms = self.timings.semantic_ms,
            fusion_ms = self.timings.fusion_ms,
            degraded = mode.is_degraded(),
            "search_complete"
        );

        SearchResult {
            candidates: fused.candidates,
            total_latency_ms,
            total_candidates: fused.total_considered,
            search_mode: mode,
            timings: self.timings,
            fallback_reason,
        }
    }
}

fn as_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
