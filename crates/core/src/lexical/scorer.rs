//! Okapi BM25 reference scorer.
//!
//! `score(d, q) = Σ idf(t) · tf·(k1 + 1) / (tf + k1·(1 − b + b·|d| / avgdl))`
//! with `idf(t) = ln((N − df + 0.5) / (df + 0.5) + 1)`.

use crate::config;
use crate::error::{IndexError, Result};
use crate::lexical::inverted_index::InvertedIndex;
use crate::lexical::tokenizer::tokenize;
use crate::lexical::LexicalScorer;
use crate::record::RecordId;
use crate::search::types::LexicalHit;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// In-memory BM25 index over caller-assigned record ids.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    index: InvertedIndex,
    slot_ids: Vec<RecordId>,
    id_to_slot: HashMap<RecordId, u32>,
    /// Vacated slots available for reuse.
    free: Vec<u32>,
    k1: f64,
    b: f64,
}

impl Default for Bm25Index {
    fn default() -> Self {
        Self::with_params(config::BM25_K1, config::BM25_B)
    }
}

impl Bm25Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom saturation (`k1`) and length normalization (`b`) parameters.
    pub fn with_params(k1: f64, b: f64) -> Self {
        Self {
            index: InvertedIndex::new(),
            slot_ids: Vec::new(),
            id_to_slot: HashMap::new(),
            free: Vec::new(),
            k1,
            b,
        }
    }

    pub fn len(&self) -> usize {
        self.id_to_slot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_slot.is_empty()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.id_to_slot.contains_key(id)
    }

    /// Indexes `text` under `id`. Fails with `DuplicateId` if already present.
    pub fn add(&mut self, id: RecordId, text: &str) -> Result<()> {
        if self.id_to_slot.contains_key(&id) {
            return Err(IndexError::DuplicateId(id));
        }
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slot_ids[slot as usize] = id.clone();
                slot
            }
            None => {
                self.slot_ids.push(id.clone());
                (self.slot_ids.len() - 1) as u32
            }
        };
        self.index.add(slot, text);
        self.id_to_slot.insert(id, slot);
        Ok(())
    }

    /// Removes `id`. Fails with `NotFound` if absent.
    pub fn remove(&mut self, id: &RecordId) -> Result<()> {
        let slot = self
            .id_to_slot
            .remove(id)
            .ok_or_else(|| IndexError::NotFound(id.clone()))?;
        self.index.remove(slot);
        self.free.push(slot);
        Ok(())
    }

    /// Top `limit` records by BM25 score, ties by ascending id.
    pub fn search(&self, query: &str, limit: usize) -> Vec<LexicalHit> {
        let terms = tokenize(query);
        if terms.is_empty() || limit == 0 || self.index.doc_count() == 0 {
            return Vec::new();
        }

        let n = self.index.doc_count() as f64;
        let avgdl = self.index.average_doc_length().max(f64::EPSILON);
        let mut scores: HashMap<u32, f64> = HashMap::new();
        for term in terms.iter() {
            let Some(postings) = self.index.postings(term) else {
                continue;
            };
            let df = postings.len() as f64;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            for p in postings {
                let tf = p.term_frequency as f64;
                let dl = self.index.doc_length(p.slot) as f64;
                let norm = tf + self.k1 * (1.0 - self.b + self.b * dl / avgdl);
                *scores.entry(p.slot).or_default() += idf * tf * (self.k1 + 1.0) / norm;
            }
        }

        // Min-heap of size `limit`: the root is the lowest score, largest id
        let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, Reverse<&RecordId>)>> =
            BinaryHeap::with_capacity(limit + 1);
        for (slot, score) in scores {
            heap.push(Reverse((OrderedFloat(score), Reverse(&self.slot_ids[slot as usize]))));
            if heap.len() > limit {
                heap.pop();
            }
        }
        // Ascending in `Reverse` order: best score first, then smallest id
        heap.into_sorted_vec()
            .into_iter()
            .map(|Reverse((score, Reverse(id)))| LexicalHit {
                id: id.clone(),
                score: score.0,
            })
            .collect()
    }
}

impl LexicalScorer for Bm25Index {
    fn rank(&self, query: &str, limit: usize) -> Vec<LexicalHit> {
        self.search(query, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Bm25Index {
        let mut idx = Bm25Index::new();
        let docs = [
            "rust programming systems language fast",
            "python programming scripting easy",
            "java enterprise programming verbose",
            "rust memory safety zero cost abstractions",
        ];
        for (i, text) in docs.iter().enumerate() {
            idx.add(RecordId::from(i as u64), text).unwrap();
        }
        idx
    }

    fn ids(hits: &[LexicalHit]) -> Vec<RecordId> {
        hits.iter().map(|h| h.id.clone()).collect()
    }

    #[test]
    fn test_finds_matching_docs() {
        let hits = corpus().search("rust", 10);
        let mut found = ids(&hits);
        found.sort();
        assert_eq!(found, vec![RecordId::from(0u64), RecordId::from(3u64)]);
        assert!(hits.iter().all(|h| h.score > 0.0));
    }

    #[test]
    fn test_term_frequency_ranks_higher() {
        let mut idx = Bm25Index::new();
        idx.add(RecordId::from("b"), "rust programming").unwrap();
        idx.add(RecordId::from("a"), "rust rust rust").unwrap();
        let hits = idx.search("rust", 10);
        assert_eq!(hits[0].id, RecordId::from("a"));
    }

    #[test]
    fn test_ordering_and_limit() {
        let hits = corpus().search("programming rust", 2);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        // Doc 0 matches both terms
        assert_eq!(hits[0].id, RecordId::from(0u64));
    }

    #[test]
    fn test_equal_scores_order_by_id() {
        let mut idx = Bm25Index::new();
        for id in [5u64, 1, 3] {
            idx.add(RecordId::from(id), "identical text").unwrap();
        }
        assert_eq!(
            ids(&idx.search("identical", 3)),
            vec![RecordId::from(1u64), RecordId::from(3u64), RecordId::from(5u64)]
        );
    }

    #[test]
    fn test_empty_cases() {
        assert!(corpus().search("", 10).is_empty());
        assert!(corpus().search("the of and", 10).is_empty());
        assert!(corpus().search("nonexistent", 10).is_empty());
        assert!(Bm25Index::new().search("rust", 10).is_empty());
        assert!(corpus().search("rust", 0).is_empty());
    }

    #[test]
    fn test_add_remove() {
        let mut idx = corpus();
        assert_eq!(
            idx.add(RecordId::from(0u64), "dup"),
            Err(IndexError::DuplicateId(RecordId::from(0u64)))
        );
        idx.remove(&RecordId::from(0u64)).unwrap();
        assert_eq!(ids(&idx.search("rust", 10)), vec![RecordId::from(3u64)]);
        assert_eq!(
            idx.remove(&RecordId::from(0u64)),
            Err(IndexError::NotFound(RecordId::from(0u64)))
        );
        // Vacated slot is reused
        idx.add(RecordId::from("new"), "rust again").unwrap();
        assert_eq!(idx.len(), 4);
        assert_eq!(idx.search("again", 1)[0].id, RecordId::from("new"));
    }
}
