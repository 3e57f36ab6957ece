//! HNSW graph structure and configuration.
//!
//! [`HnswConfig`] holds the build-time parameters (M, ef_construction, layer
//! cap, level seed). [`HnswIndex`] stores the graph in Struct-of-Arrays form:
//! one contiguous f32 arena for embeddings and parallel arrays for neighbor
//! lists, top layers, tombstones and record ids, all indexed by an internal
//! `u32` node id assigned in insertion order.

use crate::config;
use crate::distance::Metric;
use crate::error::{check_positive, IndexError, Result};
use crate::record::RecordId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Build-time parameters of an HNSW index. Fixed for the index lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswConfig {
    /// Neighbors per node on layers above 0. Layer 0 keeps up to `2 * m`.
    pub m: usize,
    /// Candidate list size while inserting.
    pub ef_construction: usize,
    /// Cap on the number of layers.
    pub max_layers: usize,
    /// Seed for the level generator.
    pub seed: u64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: config::HNSW_DEFAULT_M,
            ef_construction: config::HNSW_DEFAULT_EF_CONSTRUCTION,
            max_layers: config::HNSW_DEFAULT_MAX_LAYERS,
            seed: config::HNSW_DEFAULT_SEED,
        }
    }
}

impl HnswConfig {
    /// Maximum neighbors kept at layer 0.
    pub fn m_max0(&self) -> usize {
        self.m * 2
    }

    /// Rejects `m < 2`, a zero `ef_construction` and a layer cap outside 1..=255.
    pub fn validate(&self) -> Result<()> {
        if self.m < 2 {
            return Err(IndexError::InvalidParameter(format!(
                "m must be at least 2, got {}",
                self.m
            )));
        }
        check_positive("ef_construction", self.ef_construction)?;
        if self.max_layers == 0 || self.max_layers > u8::MAX as usize {
            return Err(IndexError::InvalidParameter(format!(
                "max_layers must be in 1..=255, got {}",
                self.max_layers
            )));
        }
        Ok(())
    }
}

/// Hierarchical Navigable Small World index over caller-assigned record ids.
///
/// Deleted nodes are tombstoned: they stay in the graph as navigation hops but
/// never appear in results. [`HnswIndex::rebuild`] drops them.
#[derive(Debug, Clone)]
pub struct HnswIndex {
    pub(crate) config: HnswConfig,
    pub(crate) metric: Metric,
    pub(crate) dimension: usize,
    // SoA: embedding arena, `dimension` floats per node
    pub(crate) vectors: Vec<f32>,
    // SoA: graph structure
    pub(crate) neighbors: Vec<Vec<Vec<u32>>>, // [node][layer][neighbor]
    pub(crate) layers: Vec<u8>,
    pub(crate) deleted: Vec<bool>,
    pub(crate) ids: Vec<RecordId>,
    /// Live nodes only. Tombstoned ids are removed so they can be re-inserted.
    pub(crate) id_to_node: HashMap<RecordId, u32>,
    pub(crate) entry_point: Option<u32>,
    pub(crate) max_layer: usize,
    rng: StdRng,
}

impl HnswIndex {
    /// Creates an empty graph. Fails with `InvalidParameter` on a zero or
    /// oversized dimension or out-of-range config.
    pub fn build(dimension: usize, metric: Metric, config: HnswConfig) -> Result<Self> {
        if dimension == 0 || dimension > config::MAX_DIMENSION {
            return Err(IndexError::InvalidParameter(format!(
                "dimension must be in 1..={}, got {dimension}",
                config::MAX_DIMENSION
            )));
        }
        config.validate()?;
        Ok(Self::empty(dimension, metric, config))
    }

    fn empty(dimension: usize, metric: Metric, config: HnswConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            metric,
            dimension,
            vectors: Vec::new(),
            neighbors: Vec::new(),
            layers: Vec::new(),
            deleted: Vec::new(),
            ids: Vec::new(),
            id_to_node: HashMap::new(),
            entry_point: None,
            max_layer: 0,
            rng,
        }
    }

    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of live (non-tombstoned) records.
    pub fn len(&self) -> usize {
        self.id_to_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_node.is_empty()
    }

    /// Total nodes in the graph, tombstones included.
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    /// Number of tombstoned nodes awaiting a rebuild.
    pub fn tombstone_count(&self) -> usize {
        self.node_count() - self.len()
    }

    /// Returns `true` if a live record has this id.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.id_to_node.contains_key(id)
    }

    /// Highest layer currently present in the graph.
    pub fn max_layer(&self) -> usize {
        self.max_layer
    }

    /// Record id of the current entry point (possibly tombstoned).
    pub fn entry_point_id(&self) -> Option<&RecordId> {
        self.entry_point.map(|ep| &self.ids[ep as usize])
    }

    /// Draws a top layer: `floor(-ln(U) / ln(m))` for `U` uniform in (0, 1],
    /// capped at `max_layers - 1`.
    pub(crate) fn random_level(&mut self) -> usize {
        let ml = 1.0 / (self.config.m as f64).ln();
        let r: f64 = 1.0 - self.rng.gen::<f64>();
        let level = (-r.ln() * ml).floor() as usize;
        level.min(self.config.max_layers - 1)
    }

    /// Embedding slice of an internal node.
    #[inline]
    pub(crate) fn vector(&self, node: u32) -> &[f32] {
        let start = node as usize * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    #[inline]
    pub(crate) fn is_deleted(&self, node: u32) -> bool {
        self.deleted[node as usize]
    }

    /// Neighbor cap at `layer`.
    #[inline]
    pub(crate) fn max_neighbors(&self, layer: usize) -> usize {
        if layer == 0 {
            self.config.m_max0()
        } else {
            self.config.m
        }
    }

    /// Tombstones the live node carrying `id`. Its edges stay in place.
    pub fn remove(&mut self, id: &RecordId) -> Result<()> {
        let node = self
            .id_to_node
            .remove(id)
            .ok_or_else(|| IndexError::NotFound(id.clone()))?;
        self.deleted[node as usize] = true;
        Ok(())
    }

    /// Builds a fresh graph from the live records, in original insertion
    /// order and with the original seed. Tombstoned nodes are dropped.
    pub fn rebuild(&self) -> HnswIndex {
        let mut fresh = HnswIndex::empty(self.dimension, self.metric, self.config.clone());
        for node in 0..self.ids.len() as u32 {
            if !self.is_deleted(node) {
                fresh.insert_node(self.ids[node as usize].clone(), self.vector(node));
            }
        }
        tracing::info!(
            live = fresh.len(),
            reclaimed = self.tombstone_count(),
            "rebuilt HNSW graph"
        );
        fresh
    }
}
