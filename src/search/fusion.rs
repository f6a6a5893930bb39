//! Weighted score fusion of lexical and vector candidates.
//!
//! ```text
//! fused(d) = w_vector * vector(d) + w_lexical * lexical_norm(d)
//! ```
//!
//! A component missing on one side counts as 0. Lexical scores are min-max
//! scaled into [0, 1] unless the whole set already lies in that range, in
//! which case they are used as given. Vector similarities are clamped to
//! [0, 1].
//!
//! Output is deduplicated by identifier and ordered by fused score, then
//! lexical score, then identifier, so equal inputs always produce the same
//! ranking.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::{Candidate, MatchSource};

/// Relative weights of the two components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub vector: f32,
    pub lexical: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            vector: 0.7,
            lexical: 0.3,
        }
    }
}

impl FusionWeights {
    pub fn new(vector: f32, lexical: f32) -> Self {
        Self { vector, lexical }
    }

    pub fn is_valid(&self) -> bool {
        self.vector.is_finite()
            && self.lexical.is_finite()
            && self.vector >= 0.0
            && self.lexical >= 0.0
            && self.vector + self.lexical > 0.0
    }
}

/// Fused, truncated candidates plus how many distinct ids went in.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedCandidates {
    pub candidates: Vec<Candidate>,
    pub total_considered: usize,
}

/// Stateless apart from its weights; safe to share across requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreFusionEngine {
    weights: FusionWeights,
}

impl ScoreFusionEngine {
    pub fn new(weights: FusionWeights) -> Self {
        Self { weights }
    }

    /// Merge both lists into one deduplicated ranking of at most `limit`.
    pub fn fuse(
        &self,
        lexical: Vec<Candidate>,
        vector: Vec<Candidate>,
        limit: usize,
    ) -> FusedCandidates {
        let lexical = normalize_lexical(dedup_best(lexical, |c| c.lexical_score));
        let vector = dedup_best(vector, |c| c.vector_score);

        let mut merged: HashMap<String, Candidate> =
            HashMap::with_capacity(lexical.len() + vector.len());

        for candidate in lexical {
            merged.insert(candidate.id.clone(), candidate);
        }

        for candidate in vector {
            let similarity = candidate.vector_score.unwrap_or(0.0).clamp(0.0, 1.0);
            merged
                .entry(candidate.id.clone())
                .and_modify(|existing| {
                    existing.vector_score = Some(similarity);
                    existing.source = existing.source.merge(MatchSource::Vector);
                    if existing.text.is_empty() {
                        existing.text = candidate.text.clone();
                    }
                })
                .or_insert_with(|| Candidate {
                    vector_score: Some(similarity),
                    ..candidate
                });
        }

        let total_considered = merged.len();
        let mut candidates: Vec<Candidate> = merged
            .into_values()
            .map(|mut c| {
                c.fused_score = self.weights.vector * c.vector_score.unwrap_or(0.0)
                    + self.weights.lexical * c.lexical_score.unwrap_or(0.0);
                c
            })
            .collect();

        sort_candidates(&mut candidates);
        candidates.truncate(limit);

        FusedCandidates {
            candidates,
            total_considered,
        }
    }

    /// Lexical-only ranking: fused score is the normalized lexical score.
    pub fn lexical_only(&self, lexical: Vec<Candidate>, limit: usize) -> FusedCandidates {
        rank_single(
            normalize_lexical(dedup_best(lexical, |c| c.lexical_score)),
            |c| c.lexical_score,
            limit,
        )
    }

    /// Vector-only ranking: fused score is the similarity itself.
    pub fn vector_only(&self, vector: Vec<Candidate>, limit: usize) -> FusedCandidates {
        let vector = dedup_best(vector, |c| c.vector_score)
            .into_iter()
            .map(|mut c| {
                c.vector_score = Some(c.vector_score.unwrap_or(0.0).clamp(0.0, 1.0));
                c
            })
            .collect();
        rank_single(vector, |c| c.vector_score, limit)
    }
}

fn rank_single(
    candidates: Vec<Candidate>,
    score: impl Fn(&Candidate) -> Option<f32>,
    limit: usize,
) -> FusedCandidates {
    let total_considered = candidates.len();
    let mut candidates: Vec<Candidate> = candidates
        .into_iter()
        .map(|mut c| {
            c.fused_score = score(&c).unwrap_or(0.0);
            c
        })
        .collect();
    sort_candidates(&mut candidates);
    candidates.truncate(limit);
    FusedCandidates {
        candidates,
        total_considered,
    }
}

/// Keep one candidate per id: the one with the highest `score`.
fn dedup_best(
    candidates: Vec<Candidate>,
    score: impl Fn(&Candidate) -> Option<f32>,
) -> Vec<Candidate> {
    let mut best: HashMap<String, Candidate> = HashMap::with_capacity(candidates.len());
    let mut order: Vec<String> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match best.get(&candidate.id) {
            Some(existing) if score(existing).unwrap_or(0.0) >= score(&candidate).unwrap_or(0.0) => {}
            Some(_) => {
                best.insert(candidate.id.clone(), candidate);
            }
            None => {
                order.push(candidate.id.clone());
                best.insert(candidate.id.clone(), candidate);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| best.remove(&id))
        .collect()
}

fn normalize_lexical(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    let raw: Vec<f32> = candidates
        .iter()
        .map(|c| c.lexical_score.unwrap_or(0.0))
        .collect();
    for (candidate, norm) in candidates.iter_mut().zip(normalize_scores(&raw)) {
        candidate.lexical_score = Some(norm);
    }
    candidates
}

/// Normalize scores to the [0, 1] range.
///
/// Sets already inside [0, 1] are returned unchanged. Otherwise min-max
/// scaling is applied; a set with no spread maps to 1.0.
pub fn normalize_scores(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }

    let sanitized: Vec<f32> = scores
        .iter()
        .map(|&s| if s.is_finite() { s } else { 0.0 })
        .collect();

    if sanitized.iter().all(|s| (0.0..=1.0).contains(s)) {
        return sanitized;
    }

    let min = sanitized.iter().copied().fold(f32::INFINITY, f32::min);
    let max = sanitized.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    if range.abs() < f32::EPSILON {
        return vec![1.0; sanitized.len()];
    }

    sanitized.iter().map(|&s| (s - min) / range).collect()
}

/// Fused score desc, lexical score desc, id asc.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                let la = a.lexical_score.unwrap_or(0.0);
                let lb = b.lexical_score.unwrap_or(0.0);
                lb.partial_cmp(&la).unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.id.cmp(&b.id))
    });
}
