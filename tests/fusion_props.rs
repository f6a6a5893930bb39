//! Property tests for score fusion.

use std::collections::HashSet;

use hybrid_retrieval::search::fusion::normalize_scores;
use hybrid_retrieval::search::{Candidate, FusionWeights, MatchSource, ScoreFusionEngine};
use proptest::prelude::*;

const EPS: f32 = 1e-4;

fn lexical_list() -> impl Strategy<Value = Vec<Candidate>> {
    prop::collection::vec((0u8..24, 0.0f32..40.0), 0..30).prop_map(|hits| {
        hits.into_iter()
            .map(|(id, score)| Candidate::lexical(format!("d{id}"), "", score))
            .collect()
    })
}

fn vector_list() -> impl Strategy<Value = Vec<Candidate>> {
    prop::collection::vec((0u8..24, -0.5f32..1.5), 0..30).prop_map(|hits| {
        hits.into_iter()
            .map(|(id, sim)| Candidate::vector(format!("d{id}"), "", sim))
            .collect()
    })
}

proptest! {
    #[test]
    fn fused_output_is_sorted_unique_and_bounded(
        lexical in lexical_list(),
        vector in vector_list(),
        limit in 1usize..40,
    ) {
        let distinct: HashSet<String> = lexical
            .iter()
            .chain(vector.iter())
            .map(|c| c.id.clone())
            .collect();

        let fused = ScoreFusionEngine::default().fuse(lexical, vector, limit);

        prop_assert_eq!(fused.total_considered, distinct.len());
        prop_assert_eq!(fused.candidates.len(), distinct.len().min(limit));

        let ids: HashSet<&str> = fused.candidates.iter().map(|c| c.id.as_str()).collect();
        prop_assert_eq!(ids.len(), fused.candidates.len());

        for pair in fused.candidates.windows(2) {
            prop_assert!(pair[0].fused_score >= pair[1].fused_score);
        }

        for c in &fused.candidates {
            let v = c.vector_score.unwrap_or(0.0);
            let l = c.lexical_score.unwrap_or(0.0);
            prop_assert!((0.0..=1.0).contains(&v));
            prop_assert!((0.0..=1.0).contains(&l));
            prop_assert!((c.fused_score - (0.7 * v + 0.3 * l)).abs() < EPS);
            prop_assert!(c.fused_score <= 1.0 + EPS);
            let both = c.vector_score.is_some() && c.lexical_score.is_some();
            prop_assert_eq!(c.source == MatchSource::Both, both);
        }
    }

    #[test]
    fn fusion_is_deterministic(
        lexical in lexical_list(),
        vector in vector_list(),
        limit in 1usize..40,
    ) {
        let engine = ScoreFusionEngine::new(FusionWeights::new(0.6, 0.4));
        let a = engine.fuse(lexical.clone(), vector.clone(), limit);
        let b = engine.fuse(lexical, vector, limit);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn normalized_scores_stay_in_unit_range(scores in prop::collection::vec(-100.0f32..100.0, 0..50)) {
        let normalized = normalize_scores(&scores);
        prop_assert_eq!(normalized.len(), scores.len());
        for s in normalized {
            prop_assert!((0.0..=1.0).contains(&s));
        }
    }
}
