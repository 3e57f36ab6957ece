//! Postings storage for the BM25 scorer.
//!
//! Documents are addressed by an internal `u32` slot. Each slot remembers its
//! distinct terms so removal touches only the postings it appears in.

use crate::lexical::tokenizer::tokenize;
use std::collections::HashMap;

/// One entry of a term's postings list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub slot: u32,
    pub term_frequency: u32,
}

#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<Posting>>,
    /// Token count per slot; 0 for vacant slots.
    doc_lengths: Vec<u32>,
    /// Distinct terms per slot; `None` for vacant slots.
    doc_terms: Vec<Option<Vec<String>>>,
    doc_count: usize,
    total_length: u64,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `text` under `slot`. The slot must be vacant.
    pub fn add(&mut self, slot: u32, text: &str) {
        let tokens = tokenize(text);
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for token in tokens.iter() {
            *counts.entry(token).or_default() += 1;
        }

        let idx = slot as usize;
        if idx >= self.doc_lengths.len() {
            self.doc_lengths.resize(idx + 1, 0);
            self.doc_terms.resize(idx + 1, None);
        }
        self.doc_lengths[idx] = tokens.len() as u32;
        self.doc_count += 1;
        self.total_length += tokens.len() as u64;

        let mut terms = Vec::with_capacity(counts.len());
        for (term, term_frequency) in counts {
            self.postings.entry(term.to_string()).or_default().push(Posting {
                slot,
                term_frequency,
            });
            terms.push(term.to_string());
        }
        self.doc_terms[idx] = Some(terms);
    }

    /// Drops every posting of `slot`. Unknown slots are ignored.
    pub fn remove(&mut self, slot: u32) {
        let idx = slot as usize;
        let Some(terms) = self.doc_terms.get_mut(idx).and_then(Option::take) else {
            return;
        };
        for term in terms {
            if let Some(list) = self.postings.get_mut(&term) {
                list.retain(|p| p.slot != slot);
                if list.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
        self.doc_count -= 1;
        self.total_length -= self.doc_lengths[idx] as u64;
        self.doc_lengths[idx] = 0;
    }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    pub fn doc_length(&self, slot: u32) -> u32 {
        self.doc_lengths.get(slot as usize).copied().unwrap_or(0)
    }

    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    pub fn average_doc_length(&self) -> f64 {
        if self.doc_count == 0 {
            return 0.0;
        }
        self.total_length as f64 / self.doc_count as f64
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }
}
