//! IVFFlat index: k-means centroids plus one inverted list of raw vectors per
//! centroid. Queries scan only the lists of the `probes` nearest centroids.

use crate::config;
use crate::distance::{normalize, Metric};
use crate::error::{check_dimension, check_positive, IndexError, Result};
use crate::ivfflat::kmeans::{kmeans, KMeansParams};
use crate::record::RecordId;
use crate::search::types::{sort_hits, SearchHit};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::{BinaryHeap, HashMap};

/// Build-time parameters of an IVFFlat index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IvfFlatConfig {
    /// Number of centroids / inverted lists.
    pub lists: usize,
    /// Lloyd iteration cap during training.
    pub max_iterations: usize,
    /// Convergence threshold on the largest centroid movement.
    pub tolerance: f32,
    /// Seed for k-means++ initialization.
    pub seed: u64,
}

impl Default for IvfFlatConfig {
    fn default() -> Self {
        Self {
            lists: config::IVF_DEFAULT_LISTS,
            max_iterations: config::IVF_KMEANS_MAX_ITERATIONS,
            tolerance: config::IVF_KMEANS_TOLERANCE,
            seed: config::IVF_DEFAULT_SEED,
        }
    }
}

impl IvfFlatConfig {
    /// Rejects zero `lists` or `max_iterations` and a negative or non-finite tolerance.
    pub fn validate(&self) -> Result<()> {
        check_positive("lists", self.lists)?;
        check_positive("max_iterations", self.max_iterations)?;
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(IndexError::InvalidParameter(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Inverted-file index with flat (uncompressed) storage.
///
/// Vectors live in slots of a contiguous arena. Removing a record unlinks its
/// slot from the inverted list; the slot itself is reclaimed by the next
/// [`IvfFlatIndex::train`].
#[derive(Debug, Clone)]
pub struct IvfFlatIndex {
    config: IvfFlatConfig,
    metric: Metric,
    dimension: usize,
    /// `lists * dimension` floats; empty until trained.
    centroids: Vec<f32>,
    /// Slot numbers per centroid.
    lists: Vec<Vec<u32>>,
    vectors: Vec<f32>,
    slot_ids: Vec<RecordId>,
    slot_list: Vec<u32>,
    id_to_slot: HashMap<RecordId, u32>,
}

impl IvfFlatIndex {
    /// Creates an untrained index.
    pub fn build(dimension: usize, metric: Metric, config: IvfFlatConfig) -> Result<Self> {
        if dimension == 0 || dimension > config::MAX_DIMENSION {
            return Err(IndexError::InvalidParameter(format!(
                "dimension must be in 1..={}, got {dimension}",
                config::MAX_DIMENSION
            )));
        }
        config.validate()?;
        Ok(Self::empty(dimension, metric, config))
    }

    fn empty(dimension: usize, metric: Metric, config: IvfFlatConfig) -> Self {
        Self {
            config,
            metric,
            dimension,
            centroids: Vec::new(),
            lists: Vec::new(),
            vectors: Vec::new(),
            slot_ids: Vec::new(),
            slot_list: Vec::new(),
            id_to_slot: HashMap::new(),
        }
    }

    pub fn config(&self) -> &IvfFlatConfig {
        &self.config
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.id_to_slot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_slot.is_empty()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.id_to_slot.contains_key(id)
    }

    pub fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }

    /// Member count of every inverted list, in centroid order.
    pub fn list_sizes(&self) -> Vec<usize> {
        self.lists.iter().map(Vec::len).collect()
    }

    /// Learns `lists` centroids from `samples`.
    ///
    /// Training (or re-training) clears every inverted list and stored
    /// vector; records must be inserted again afterwards.
    pub fn train<S: AsRef<[f32]>>(&mut self, samples: &[S]) -> Result<()> {
        let required = self.config.lists;
        if samples.len() < required {
            return Err(IndexError::InsufficientTrainingData {
                required,
                provided: samples.len(),
            });
        }
        let spherical = self.metric == Metric::Cosine;
        let mut data = Vec::with_capacity(samples.len() * self.dimension);
        for sample in samples {
            let sample = sample.as_ref();
            check_dimension(self.dimension, sample)?;
            let start = data.len();
            data.extend_from_slice(sample);
            if spherical {
                normalize(&mut data[start..]);
            }
        }

        let outcome = kmeans(
            &data,
            self.dimension,
            &KMeansParams {
                k: required,
                max_iterations: self.config.max_iterations,
                tolerance: self.config.tolerance,
                seed: self.config.seed,
                spherical,
            },
        );
        if !outcome.converged {
            tracing::warn!(
                lists = required,
                iterations = outcome.iterations,
                "k-means hit the iteration cap before converging"
            );
        }

        self.centroids = outcome.centroids;
        self.lists = vec![Vec::new(); required];
        self.vectors.clear();
        self.slot_ids.clear();
        self.slot_list.clear();
        self.id_to_slot.clear();

        tracing::info!(
            lists = required,
            samples = samples.len(),
            iterations = outcome.iterations,
            converged = outcome.converged,
            "trained IVFFlat centroids"
        );
        Ok(())
    }

    /// Assigns a new record to its nearest centroid.
    pub fn insert(&mut self, id: RecordId, embedding: &[f32]) -> Result<()> {
        self.check_insert(&id, embedding)?;
        self.insert_slot(id, embedding);
        Ok(())
    }

    /// Inserts or replaces. Returns `true` if a record was replaced.
    pub fn upsert(&mut self, id: RecordId, embedding: &[f32]) -> Result<bool> {
        if !self.is_trained() {
            return Err(IndexError::NotTrained);
        }
        check_dimension(self.dimension, embedding)?;
        let replaced = self.unlink(&id).is_some();
        self.insert_slot(id, embedding);
        Ok(replaced)
    }

    /// Unlinks the record from its inverted list.
    pub fn remove(&mut self, id: &RecordId) -> Result<()> {
        self.unlink(id)
            .map(|_| ())
            .ok_or_else(|| IndexError::NotFound(id.clone()))
    }

    /// Exact k-NN over the lists of the `probes` nearest centroids.
    /// `probes` above the list count scans everything.
    pub fn search(&self, query: &[f32], k: usize, probes: usize) -> Result<Vec<SearchHit>> {
        self.search_filtered(query, k, probes, &|_: &RecordId| true)
    }

    /// As [`IvfFlatIndex::search`], skipping records rejected by `predicate`.
    pub fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        probes: usize,
        predicate: &dyn Fn(&RecordId) -> bool,
    ) -> Result<Vec<SearchHit>> {
        check_dimension(self.dimension, query)?;
        check_positive("k", k)?;
        check_positive("probes", probes)?;
        if !self.is_trained() {
            return Err(IndexError::NotTrained);
        }
        if self.is_empty() {
            return Err(IndexError::EmptyIndex);
        }

        let mut ranked: Vec<(f64, usize)> = self
            .centroids
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(list, centroid)| (self.metric.distance(query, centroid), list))
            .collect();
        ranked.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        // Max-heap of the best `k` so far: (distance, slot)
        let mut best: BinaryHeap<(OrderedFloat<f64>, u32)> = BinaryHeap::with_capacity(k + 1);
        for &(_, list) in ranked.iter().take(probes) {
            for &slot in &self.lists[list] {
                if !predicate(&self.slot_ids[slot as usize]) {
                    continue;
                }
                let dist = self.metric.distance(query, self.vector(slot));
                if best.len() < k {
                    best.push((OrderedFloat(dist), slot));
                } else if best.peek().is_some_and(|top| dist < top.0 .0) {
                    best.pop();
                    best.push((OrderedFloat(dist), slot));
                }
            }
        }

        let mut hits: Vec<SearchHit> = best
            .into_iter()
            .map(|(dist, slot)| SearchHit {
                id: self.slot_ids[slot as usize].clone(),
                similarity: self.metric.similarity_from_distance(dist.0),
            })
            .collect();
        sort_hits(&mut hits);
        Ok(hits)
    }

    /// Copy with the same centroids and only live records, in slot order.
    /// Reclaims the slots orphaned by `remove` and `upsert`.
    pub fn rebuild(&self) -> IvfFlatIndex {
        let mut fresh = IvfFlatIndex {
            centroids: self.centroids.clone(),
            lists: vec![Vec::new(); self.lists.len()],
            vectors: Vec::with_capacity(self.len() * self.dimension),
            slot_ids: Vec::with_capacity(self.len()),
            slot_list: Vec::with_capacity(self.len()),
            id_to_slot: HashMap::with_capacity(self.len()),
            ..IvfFlatIndex::empty(self.dimension, self.metric, self.config.clone())
        };
        let mut live: Vec<u32> = self.id_to_slot.values().copied().collect();
        live.sort_unstable();
        for slot in live {
            fresh.insert_slot(self.slot_ids[slot as usize].clone(), self.vector(slot));
        }
        tracing::info!(
            live = fresh.len(),
            reclaimed = self.slot_ids.len() - fresh.len(),
            "rebuilt IVFFlat lists"
        );
        fresh
    }

    /// Validation half of [`IvfFlatIndex::insert`].
    pub(crate) fn check_insert(&self, id: &RecordId, embedding: &[f32]) -> Result<()> {
        if !self.is_trained() {
            return Err(IndexError::NotTrained);
        }
        check_dimension(self.dimension, embedding)?;
        if self.id_to_slot.contains_key(id) {
            return Err(IndexError::DuplicateId(id.clone()));
        }
        Ok(())
    }

    pub(crate) fn insert_slot(&mut self, id: RecordId, embedding: &[f32]) {
        let list = self.nearest_list(embedding);
        let slot = self.slot_ids.len() as u32;
        self.vectors.extend_from_slice(embedding);
        self.slot_list.push(list as u32);
        self.lists[list].push(slot);
        self.id_to_slot.insert(id.clone(), slot);
        self.slot_ids.push(id);
    }

    fn unlink(&mut self, id: &RecordId) -> Option<u32> {
        let slot = self.id_to_slot.remove(id)?;
        let list = self.slot_list[slot as usize] as usize;
        self.lists[list].retain(|&s| s != slot);
        Some(slot)
    }

    fn nearest_list(&self, embedding: &[f32]) -> usize {
        let mut best = 0;
        let mut best_dist = f64::MAX;
        for (list, centroid) in self.centroids.chunks_exact(self.dimension).enumerate() {
            let d = self.metric.distance(embedding, centroid);
            if d < best_dist {
                best_dist = d;
                best = list;
            }
        }
        best
    }

    #[inline]
    fn vector(&self, slot: u32) -> &[f32] {
        let start = slot as usize * self.dimension;
        &self.vectors[start..start + self.dimension]
    }
}
