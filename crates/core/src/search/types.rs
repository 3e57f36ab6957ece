//! Ranked result types shared by the indexes, the fusion engine and the planner.

use crate::record::RecordId;
use serde::{Deserialize, Serialize};

/// One vector search result.
///
/// `similarity` is higher-is-better: 1.0 means identical for cosine and L2,
/// and is unbounded for inner product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Matched record.
    pub id: RecordId,
    /// Similarity to the query under the index metric.
    pub similarity: f64,
}

/// One lexical scorer result. The position in the list is its rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalHit {
    /// Matched record.
    pub id: RecordId,
    /// Scorer-defined relevance (higher is better).
    pub score: f64,
}

/// One fused hybrid result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedHit {
    /// Matched record.
    pub id: RecordId,
    /// Weighted Reciprocal Rank Fusion score.
    pub hybrid_score: f64,
    /// 1-based rank in the vector list, if the record appeared there.
    pub vector_rank: Option<usize>,
    /// 1-based rank in the lexical list, if the record appeared there.
    pub lexical_rank: Option<usize>,
}

/// Orders hits by descending similarity, ties by ascending id.
pub fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_unstable_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.id.cmp(&b.id))
    });
}
