//! Hybrid fusion: weighted Reciprocal Rank Fusion over a vector result list
//! and a lexical result list.
//!
//! `hybrid_score(d) = w_v / (k + rank_v(d)) + w_l / (k + rank_l(d))`
//!
//! Ranks are 1-based. A record missing from one list simply gets no term from
//! it. Only ranks matter, so the two sources need not share a score scale.

use crate::config;
use crate::error::{check_positive, IndexError, Result};
use crate::record::RecordId;
use crate::search::types::{FusedHit, LexicalHit, SearchHit};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Per-source weights. `(1, 1)` is plain RRF.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub vector: f64,
    pub lexical: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            vector: 1.0,
            lexical: 1.0,
        }
    }
}

#[derive(Default)]
struct Ranks {
    vector: Option<usize>,
    lexical: Option<usize>,
}

/// Merges two ranked lists into at most `limit` fused hits, ordered by
/// descending `hybrid_score` with ties broken by ascending id.
///
/// An id repeated within one list keeps its first (best) rank.
pub fn fuse(
    vector_hits: &[SearchHit],
    lexical_hits: &[LexicalHit],
    weights: FusionWeights,
    rrf_k: f64,
    limit: usize,
) -> Result<Vec<FusedHit>> {
    check_positive("limit", limit)?;
    check_non_negative("rrf_k", rrf_k)?;
    check_non_negative("vector_weight", weights.vector)?;
    check_non_negative("lexical_weight", weights.lexical)?;

    let mut ranks: HashMap<&RecordId, Ranks> =
        HashMap::with_capacity(vector_hits.len() + lexical_hits.len());
    for (i, hit) in vector_hits.iter().enumerate() {
        ranks.entry(&hit.id).or_default().vector.get_or_insert(i + 1);
    }
    for (i, hit) in lexical_hits.iter().enumerate() {
        ranks.entry(&hit.id).or_default().lexical.get_or_insert(i + 1);
    }

    let term = |weight: f64, rank: Option<usize>| {
        rank.map_or(0.0, |r| weight / (rrf_k + r as f64))
    };

    // Min-heap of size `limit`: the root is the lowest score, largest id
    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, Reverse<&RecordId>)>> =
        BinaryHeap::with_capacity(limit + 1);
    for (id, r) in &ranks {
        let score = term(weights.vector, r.vector) + term(weights.lexical, r.lexical);
        heap.push(Reverse((OrderedFloat(score), Reverse(*id))));
        if heap.len() > limit {
            heap.pop();
        }
    }

    let mut fused: Vec<FusedHit> = heap
        .into_iter()
        .map(|Reverse((score, Reverse(id)))| {
            let r = &ranks[id];
            FusedHit {
                id: id.clone(),
                hybrid_score: score.0,
                vector_rank: r.vector,
                lexical_rank: r.lexical,
            }
        })
        .collect();
    fused.sort_unstable_by(|a, b| {
        b.hybrid_score
            .total_cmp(&a.hybrid_score)
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(fused)
}

/// Default-parameter fusion: equal weights, `rrf_k = 50`.
pub fn rrf(
    vector_hits: &[SearchHit],
    lexical_hits: &[LexicalHit],
    limit: usize,
) -> Result<Vec<FusedHit>> {
    fuse(
        vector_hits,
        lexical_hits,
        FusionWeights::default(),
        config::RRF_K,
        limit,
    )
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(IndexError::InvalidParameter(format!(
            "{name} must be a finite non-negative number, got {value}"
        )));
    }
    Ok(())
}
