//! Configuration: compile-time defaults and the runtime [`EngineConfig`].
//!
//! The constants are the documented defaults for every tuning knob. The
//! [`EngineConfig`] struct is the recognized configuration surface; it
//! deserializes from JSON with every field optional.

use crate::distance::Metric;
use crate::error::{IndexError, Result};
use crate::index::{IndexParams, SearchParams};
use crate::search::planner::PlannerConfig;
use serde::{Deserialize, Serialize};

/// Default number of bidirectional links per HNSW node (layer 0 uses twice this).
///
/// Typical range: 8–48.
pub const HNSW_DEFAULT_M: usize = 16;

/// Default candidate list size during HNSW insertion.
///
/// Typical range: 32–200. Higher values build a better graph, slower.
pub const HNSW_DEFAULT_EF_CONSTRUCTION: usize = 64;

/// Default candidate list size during HNSW search.
///
/// Typical range: 10–200. Higher values improve recall at the cost of latency.
pub const HNSW_DEFAULT_EF_SEARCH: usize = 40;

/// Maximum number of layers in the HNSW graph.
pub const HNSW_DEFAULT_MAX_LAYERS: usize = 16;

/// Seed for the HNSW level generator. Fixed so identical insert sequences
/// produce identical graphs.
pub const HNSW_DEFAULT_SEED: u64 = 0x5eed_4a5e;

/// Default number of IVFFlat inverted lists.
pub const IVF_DEFAULT_LISTS: usize = 100;

/// Lower bound for [`crate::ivfflat::recommended_lists`].
pub const IVF_MIN_LISTS: usize = 10;

/// Default number of IVFFlat lists probed per query.
///
/// Typical range: 1–20.
pub const IVF_DEFAULT_PROBES: usize = 10;

/// Maximum Lloyd iterations during IVFFlat training.
pub const IVF_KMEANS_MAX_ITERATIONS: usize = 50;

/// Training stops once no centroid moves further than this (L2).
pub const IVF_KMEANS_TOLERANCE: f32 = 1e-4;

/// Seed for k-means++ initialization.
pub const IVF_DEFAULT_SEED: u64 = 20_240_921;

/// Reciprocal Rank Fusion constant `k` in `1 / (k + rank)`.
///
/// Typical range: 20–100. Larger flattens the score distribution.
pub const RRF_K: f64 = 50.0;

/// Default number of results returned by the planner.
pub const DEFAULT_MATCH_COUNT: usize = 10;

/// Hard cap on results per query regardless of the requested limit.
pub const MAX_MATCH_COUNT: usize = 200;

/// Each retrieval leg fetches `limit * OVERFETCH_FACTOR` candidates before fusion.
pub const OVERFETCH_FACTOR: usize = 2;

/// Maximum allowed embedding dimension.
pub const MAX_DIMENSION: usize = 4096;

/// BM25 Okapi term frequency saturation parameter.
pub const BM25_K1: f64 = 1.2;

/// BM25 Okapi document length normalization parameter.
pub const BM25_B: f64 = 0.75;

/// Complete runtime configuration for one retrieval engine instance.
///
/// ```json
/// {
///   "dimension": 384,
///   "metric": "cosine",
///   "index": { "kind": "hnsw", "m": 16, "ef_construction": 64 },
///   "search": { "ef_search": 40, "probes": 10 },
///   "planner": { "rrf_k": 50.0, "match_threshold": 0.2, "match_count": 10 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Embedding dimension shared by every record.
    pub dimension: usize,
    /// Distance metric.
    #[serde(default)]
    pub metric: Metric,
    /// Backing index and its build-time parameters.
    #[serde(default)]
    pub index: IndexParams,
    /// Default per-query search parameters.
    #[serde(default)]
    pub search: SearchParams,
    /// Fusion weights, threshold and result-count settings.
    #[serde(default)]
    pub planner: PlannerConfig,
}

impl EngineConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(text).map_err(|e| IndexError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 || self.dimension > MAX_DIMENSION {
            return Err(IndexError::Config(format!(
                "dimension must be in 1..={MAX_DIMENSION}, got {}",
                self.dimension
            )));
        }
        self.index
            .validate()
            .and_then(|_| self.search.validate())
            .and_then(|_| self.planner.validate())
            .map_err(|e| match e {
                IndexError::InvalidParameter(msg) => IndexError::Config(msg),
                other => other,
            })
    }
}
