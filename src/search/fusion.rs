//! Score fusion across the lexical and semantic legs.
//!
//! Candidates are keyed by document id. A document found by both legs becomes
//! a hybrid candidate whose weighted sum is multiplied by the corroboration
//! boost; a single-leg candidate keeps its leg's normalized score. Output is
//! sorted by fused score, descending, with ties left in insertion order
//! (lexical hits first, then new semantic hits) so identical inputs always
//! produce identical output.

use std::collections::HashMap;

use crate::search::types::{Provenance, ScoredCandidate};

/// Fusion weights and the multiplier for documents both legs agree on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub lexical: f64,
    pub semantic: f64,
    pub hybrid_boost: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            lexical: 0.5,
            semantic: 0.5,
            hybrid_boost: 1.1,
        }
    }
}

impl From<&crate::config::RetrievalConfig> for FusionWeights {
    fn from(config: &crate::config::RetrievalConfig) -> Self {
        Self {
            lexical: config.lexical_weight,
            semantic: config.semantic_weight,
            hybrid_boost: config.hybrid_boost,
        }
    }
}

/// Deduplicate by id, score, and sort.
pub fn fuse(
    lexical: Vec<ScoredCandidate>,
    semantic: Vec<ScoredCandidate>,
    weights: FusionWeights,
) -> Vec<ScoredCandidate> {
    let mut order: Vec<ScoredCandidate> = Vec::with_capacity(lexical.len() + semantic.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for candidate in lexical {
        match index.get(candidate.id()) {
            // A repeated lexical id keeps the first (best-ranked) hit
            Some(_) => continue,
            None => {
                index.insert(candidate.id().to_string(), order.len());
                order.push(candidate);
            }
        }
    }

    for candidate in semantic {
        match index.get(candidate.id()) {
            Some(&slot) => order[slot].merge_semantic(&candidate),
            None => {
                index.insert(candidate.id().to_string(), order.len());
                order.push(candidate);
            }
        }
    }

    for candidate in &mut order {
        let score = fused_score(candidate, weights);
        candidate.set_fused_score(score);
    }

    // sort_by is stable: equal scores keep insertion order
    order.sort_by(|a, b| {
        b.fused_score()
            .partial_cmp(&a.fused_score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

fn fused_score(candidate: &ScoredCandidate, weights: FusionWeights) -> f64 {
    let lexical = candidate.lexical_score().unwrap_or(0.0);
    let semantic = candidate.semantic_score().unwrap_or(0.0);
    match candidate.provenance() {
        Provenance::Hybrid { .. } => {
            (weights.lexical * lexical + weights.semantic * semantic) * weights.hybrid_boost
        }
        Provenance::Lexical { .. } => lexical,
        Provenance::Semantic { .. } => semantic,
    }
}

/// The `[offset, offset + limit)` window of `items`, clamped to its length.
pub fn paginate<T>(items: &[T], offset: usize, limit: usize) -> &[T] {
    let start = offset.min(items.len());
    let end = offset.saturating_add(limit).min(items.len());
    &items[start..end]
}
