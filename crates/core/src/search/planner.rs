//! Query planner: runs the vector and lexical legs, applies the similarity
//! threshold and metadata predicates, fuses, and clamps the result count.
//!
//! Stage order:
//! 1. the similarity threshold drops weak vector hits before fusion
//!    (the lexical leg is never thresholded);
//! 2. metadata predicates restrict the vector traversal up front and filter
//!    the lexical list afterwards;
//! 3. the final count is clamped to `max_results` whatever the caller asked for.

use crate::config;
use crate::error::{check_positive, IndexError, Result};
use crate::index::{AnnIndex, SearchParams};
use crate::lexical::LexicalScorer;
use crate::record::{MetadataLookup, RecordId};
use crate::search::filter::{matches_filter, FilterClause};
use crate::search::fusion::{fuse, FusionWeights};
use crate::search::types::{FusedHit, LexicalHit, SearchHit};
use serde::{Deserialize, Serialize};

/// Fusion weights, threshold and result-count settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Weight of the vector leg in the fused score.
    pub vector_weight: f64,
    /// Weight of the lexical leg in the fused score.
    pub lexical_weight: f64,
    /// RRF damping constant.
    pub rrf_k: f64,
    /// Minimum similarity for a vector hit. `None` keeps every hit.
    pub match_threshold: Option<f64>,
    /// Result count when the query names none.
    pub match_count: usize,
    /// Hard cap on returned results.
    pub max_results: usize,
    /// Each leg fetches `limit * overfetch_factor` candidates.
    pub overfetch_factor: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            vector_weight: 1.0,
            lexical_weight: 1.0,
            rrf_k: config::RRF_K,
            match_threshold: None,
            match_count: config::DEFAULT_MATCH_COUNT,
            max_results: config::MAX_MATCH_COUNT,
            overfetch_factor: config::OVERFETCH_FACTOR,
        }
    }
}

impl PlannerConfig {
    pub fn weights(&self) -> FusionWeights {
        FusionWeights {
            vector: self.vector_weight,
            lexical: self.lexical_weight,
        }
    }

    /// Weights and `rrf_k` must be finite and non-negative, counts positive.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("vector_weight", self.vector_weight),
            ("lexical_weight", self.lexical_weight),
            ("rrf_k", self.rrf_k),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(IndexError::InvalidParameter(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if let Some(t) = self.match_threshold {
            if !t.is_finite() {
                return Err(IndexError::InvalidParameter(format!(
                    "match_threshold must be finite, got {t}"
                )));
            }
        }
        check_positive("match_count", self.match_count)?;
        check_positive("max_results", self.max_results)?;
        check_positive("overfetch_factor", self.overfetch_factor)
    }
}

/// One hybrid query. At least one of `text` and `embedding` must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HybridQuery {
    /// Keyword query for the lexical leg.
    #[serde(default)]
    pub text: Option<String>,
    /// Query vector for the ANN leg.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    /// Requested result count. Defaults to `match_count`.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Metadata predicates.
    #[serde(default)]
    pub filter: Option<FilterClause>,
}

impl HybridQuery {
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn filter(mut self, filter: FilterClause) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Stateless query planner over an index, a lexical scorer and a metadata store.
#[derive(Debug, Clone, Default)]
pub struct QueryPlanner {
    config: PlannerConfig,
    search: SearchParams,
}

impl QueryPlanner {
    /// Planner with default search parameters.
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            search: SearchParams::default(),
        }
    }

    /// Overrides the per-query `ef_search` / `probes` used by the vector leg.
    pub fn with_search_params(mut self, search: SearchParams) -> Self {
        self.search = search;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn search_params(&self) -> &SearchParams {
        &self.search
    }

    /// Vector-only search: filter as a traversal predicate, threshold, clamp.
    ///
    /// `EmptyIndex` propagates.
    pub fn vector_search<M: MetadataLookup + ?Sized>(
        &self,
        index: &AnnIndex,
        embedding: &[f32],
        limit: usize,
        filter: Option<&FilterClause>,
        metadata: &M,
    ) -> Result<Vec<SearchHit>> {
        let limit = self.clamp(limit)?;
        let predicate = |id: &RecordId| passes(metadata, filter, id);
        let mut hits = index.search_filtered(embedding, limit, &self.search, &predicate)?;
        self.apply_threshold(&mut hits);
        hits.truncate(limit);
        Ok(hits)
    }

    /// Full hybrid retrieval.
    ///
    /// Both legs over-fetch `limit * overfetch_factor`. When the query has
    /// text, an empty vector index only empties the vector leg.
    ///
    /// Lexical ranks are positions in the filtered lexical list, matching the
    /// vector leg, whose filter is applied during traversal.
    pub fn hybrid_search<L, M>(
        &self,
        index: &AnnIndex,
        lexical: &L,
        metadata: &M,
        query: &HybridQuery,
    ) -> Result<Vec<FusedHit>>
    where
        L: LexicalScorer + ?Sized,
        M: MetadataLookup + ?Sized,
    {
        let text = query.text.as_deref().map(str::trim).filter(|t| !t.is_empty());
        if text.is_none() && query.embedding.is_none() {
            return Err(IndexError::InvalidParameter(
                "query needs text, an embedding, or both".into(),
            ));
        }
        let limit = self.clamp(query.limit.unwrap_or(self.config.match_count))?;
        let fetch = limit.saturating_mul(self.config.overfetch_factor);
        let filter = query.filter.as_ref();

        let mut vector_hits = Vec::new();
        if let Some(embedding) = query.embedding.as_deref() {
            let predicate = |id: &RecordId| passes(metadata, filter, id);
            match index.search_filtered(embedding, fetch, &self.search, &predicate) {
                Ok(hits) => vector_hits = hits,
                Err(IndexError::EmptyIndex) if text.is_some() => {
                    tracing::debug!("vector index is empty, fusing lexical results only");
                }
                Err(e) => return Err(e),
            }
            self.apply_threshold(&mut vector_hits);
        }

        let mut lexical_hits: Vec<LexicalHit> = Vec::new();
        if let Some(text) = text {
            lexical_hits = lexical.rank(text, fetch);
            lexical_hits.retain(|hit| passes(metadata, filter, &hit.id));
        }

        tracing::debug!(
            vector = vector_hits.len(),
            lexical = lexical_hits.len(),
            limit,
            "fusing hybrid legs"
        );
        fuse(
            &vector_hits,
            &lexical_hits,
            self.config.weights(),
            self.config.rrf_k,
            limit,
        )
    }

    fn clamp(&self, limit: usize) -> Result<usize> {
        check_positive("limit", limit)?;
        Ok(limit.min(self.config.max_results))
    }

    fn apply_threshold(&self, hits: &mut Vec<SearchHit>) {
        if let Some(threshold) = self.config.match_threshold {
            hits.retain(|h| h.similarity >= threshold);
        }
    }
}

/// Records absent from the metadata store fail any non-empty filter.
fn passes<M: MetadataLookup + ?Sized>(
    metadata: &M,
    filter: Option<&FilterClause>,
    id: &RecordId,
) -> bool {
    match filter {
        Some(f) if !f.is_empty() => metadata.metadata(id).is_some_and(|m| matches_filter(m, f)),
        _ => true,
    }
}
