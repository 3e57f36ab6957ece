//! Lexical (keyword) retrieval for the hybrid pipeline.
//!
//! The planner depends only on [`LexicalScorer`]; [`Bm25Index`] is the
//! in-memory Okapi BM25 implementation shipped with the crate.

/// Postings storage keyed by internal slot.
pub mod inverted_index;
/// Okapi BM25 scoring.
pub mod scorer;
/// Lowercasing, stop-word-filtering tokenizer.
pub mod tokenizer;

pub use scorer::Bm25Index;

use crate::search::types::LexicalHit;

/// A ranked keyword scorer. Output order is rank order, best first.
pub trait LexicalScorer: Send + Sync {
    /// Up to `limit` hits for `query`, best first.
    fn rank(&self, query: &str, limit: usize) -> Vec<LexicalHit>;
}
