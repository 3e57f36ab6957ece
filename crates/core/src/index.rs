//! ANN index facade and the shared, copy-on-write index handle.
//!
//! [`AnnIndex`] puts HNSW and IVFFlat behind one set of operations so callers
//! pick a backing strategy by configuration only:
//!
//! - **HNSW**: best recall/latency for up to roughly a million vectors and
//!   read-heavy workloads. No training step. Memory grows with `m`.
//! - **IVFFlat**: cheaper to build and lighter on memory for larger or
//!   write-heavy collections. Needs a representative `train` sample first;
//!   recall is tuned per query with `probes`.
//!
//! [`SharedIndex`] lets many threads search while one writer mutates. Readers
//! take an `Arc` snapshot and never observe a partial write. Small writes
//! (insert, upsert, remove) hold the write lock while they run, so a
//! `snapshot()` taken meanwhile waits for them; `train` and `rebuild` build
//! outside the lock and only block readers for the swap.

use crate::config::{self, EngineConfig};
use crate::distance::Metric;
use crate::error::{check_positive, IndexError, Result};
use crate::hnsw::{HnswConfig, HnswIndex};
use crate::ivfflat::{IvfFlatConfig, IvfFlatIndex};
use crate::record::{RecordId, VectorRecord};
use crate::search::types::SearchHit;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Backing index and its build-time parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexParams {
    Hnsw(HnswConfig),
    IvfFlat(IvfFlatConfig),
}

impl Default for IndexParams {
    fn default() -> Self {
        IndexParams::Hnsw(HnswConfig::default())
    }
}

impl IndexParams {
    /// Validates the parameters of the selected index kind.
    pub fn validate(&self) -> Result<()> {
        match self {
            IndexParams::Hnsw(c) => c.validate(),
            IndexParams::IvfFlat(c) => c.validate(),
        }
    }
}

/// Per-query search parameters. Each index reads only its own field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// HNSW layer-0 beam width.
    pub ef_search: usize,
    /// IVFFlat lists scanned per query.
    pub probes: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            ef_search: config::HNSW_DEFAULT_EF_SEARCH,
            probes: config::IVF_DEFAULT_PROBES,
        }
    }
}

impl SearchParams {
    /// Both `ef_search` and `probes` must be positive.
    pub fn validate(&self) -> Result<()> {
        check_positive("ef_search", self.ef_search)?;
        check_positive("probes", self.probes)
    }
}

/// Which algorithm backs an [`AnnIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Hnsw,
    IvfFlat,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Hnsw => f.write_str("hnsw"),
            IndexKind::IvfFlat => f.write_str("ivf_flat"),
        }
    }
}

/// An approximate nearest neighbor index of either kind.
#[derive(Debug, Clone)]
pub enum AnnIndex {
    Hnsw(HnswIndex),
    IvfFlat(IvfFlatIndex),
}

impl AnnIndex {
    /// Creates an empty index. IVFFlat indexes still need [`AnnIndex::train`].
    pub fn build(dimension: usize, metric: Metric, params: IndexParams) -> Result<Self> {
        Ok(match params {
            IndexParams::Hnsw(c) => AnnIndex::Hnsw(HnswIndex::build(dimension, metric, c)?),
            IndexParams::IvfFlat(c) => {
                AnnIndex::IvfFlat(IvfFlatIndex::build(dimension, metric, c)?)
            }
        })
    }

    /// Creates an empty index from a validated engine configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::build(config.dimension, config.metric, config.index.clone())
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            AnnIndex::Hnsw(_) => IndexKind::Hnsw,
            AnnIndex::IvfFlat(_) => IndexKind::IvfFlat,
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            AnnIndex::Hnsw(i) => i.dimension(),
            AnnIndex::IvfFlat(i) => i.dimension(),
        }
    }

    pub fn metric(&self) -> Metric {
        match self {
            AnnIndex::Hnsw(i) => i.metric(),
            AnnIndex::IvfFlat(i) => i.metric(),
        }
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        match self {
            AnnIndex::Hnsw(i) => i.len(),
            AnnIndex::IvfFlat(i) => i.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        match self {
            AnnIndex::Hnsw(i) => i.contains(id),
            AnnIndex::IvfFlat(i) => i.contains(id),
        }
    }

    pub fn insert(&mut self, id: RecordId, embedding: &[f32]) -> Result<()> {
        match self {
            AnnIndex::Hnsw(i) => i.insert(id, embedding),
            AnnIndex::IvfFlat(i) => i.insert(id, embedding),
        }
    }

    /// Inserts every record or none: the whole batch is validated (dimension,
    /// ids already indexed, ids repeated within the batch) before any insert.
    pub fn insert_batch(&mut self, records: &[VectorRecord]) -> Result<()> {
        let mut seen: HashSet<&RecordId> = HashSet::with_capacity(records.len());
        for r in records {
            match self {
                AnnIndex::Hnsw(i) => i.check_insert(&r.id, &r.embedding)?,
                AnnIndex::IvfFlat(i) => i.check_insert(&r.id, &r.embedding)?,
            }
            if !seen.insert(&r.id) {
                return Err(IndexError::DuplicateId(r.id.clone()));
            }
        }
        for r in records {
            match self {
                AnnIndex::Hnsw(i) => i.insert_node(r.id.clone(), &r.embedding),
                AnnIndex::IvfFlat(i) => i.insert_slot(r.id.clone(), &r.embedding),
            }
        }
        tracing::debug!(kind = %self.kind(), count = records.len(), "inserted batch");
        Ok(())
    }

    /// Inserts or replaces. Returns `true` if a record was replaced.
    pub fn upsert(&mut self, id: RecordId, embedding: &[f32]) -> Result<bool> {
        match self {
            AnnIndex::Hnsw(i) => i.upsert(id, embedding),
            AnnIndex::IvfFlat(i) => i.upsert(id, embedding),
        }
    }

    pub fn remove(&mut self, id: &RecordId) -> Result<()> {
        match self {
            AnnIndex::Hnsw(i) => i.remove(id),
            AnnIndex::IvfFlat(i) => i.remove(id),
        }
    }

    /// Trains IVFFlat centroids (clearing its lists). A no-op for HNSW.
    pub fn train<S: AsRef<[f32]>>(&mut self, samples: &[S]) -> Result<()> {
        match self {
            AnnIndex::Hnsw(_) => Ok(()),
            AnnIndex::IvfFlat(i) => i.train(samples),
        }
    }

    /// Compacted copy: HNSW drops tombstones, IVFFlat drops orphaned slots.
    pub fn rebuild(&self) -> AnnIndex {
        match self {
            AnnIndex::Hnsw(i) => AnnIndex::Hnsw(i.rebuild()),
            AnnIndex::IvfFlat(i) => AnnIndex::IvfFlat(i.rebuild()),
        }
    }

    /// Up to `k` nearest records, most similar first (ties by ascending id).
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        params: &SearchParams,
    ) -> Result<Vec<SearchHit>> {
        self.search_filtered(query, k, params, &|_: &RecordId| true)
    }

    /// As [`AnnIndex::search`], restricted to ids accepted by `predicate`.
    pub fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        params: &SearchParams,
        predicate: &dyn Fn(&RecordId) -> bool,
    ) -> Result<Vec<SearchHit>> {
        match self {
            AnnIndex::Hnsw(i) => i.search_filtered(query, k, params.ef_search, predicate),
            AnnIndex::IvfFlat(i) => i.search_filtered(query, k, params.probes, predicate),
        }
    }
}

/// Thread-safe handle to an [`AnnIndex`] with copy-on-write updates.
///
/// Cloning the handle shares the same index. Writers are serialized; each
/// write mutates the current index in place unless a reader still holds a
/// snapshot, in which case that snapshot is copied first. Batch inserts to
/// keep copying rare under heavy read load.
#[derive(Debug, Clone)]
pub struct SharedIndex {
    current: Arc<RwLock<Arc<AnnIndex>>>,
    writer: Arc<Mutex<()>>,
}

impl SharedIndex {
    /// Wraps `index` for shared use.
    pub fn new(index: AnnIndex) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(index))),
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Immutable view of the index as of now. Later writes never alter it.
    pub fn snapshot(&self) -> Arc<AnnIndex> {
        Arc::clone(&self.current.read())
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        params: &SearchParams,
    ) -> Result<Vec<SearchHit>> {
        self.snapshot().search(query, k, params)
    }

    pub fn insert(&self, id: RecordId, embedding: &[f32]) -> Result<()> {
        self.write(|index| index.insert(id, embedding))
    }

    /// All-or-nothing batch insert.
    pub fn insert_batch(&self, records: &[VectorRecord]) -> Result<()> {
        self.write(|index| index.insert_batch(records))
    }

    pub fn upsert(&self, id: RecordId, embedding: &[f32]) -> Result<bool> {
        self.write(|index| index.upsert(id, embedding))
    }

    pub fn remove(&self, id: &RecordId) -> Result<()> {
        self.write(|index| index.remove(id))
    }

    /// Trains a copy of the index off-lock and swaps it in. Searches keep
    /// using the previous index until the swap.
    pub fn train<S: AsRef<[f32]>>(&self, samples: &[S]) -> Result<()> {
        let _writer = self.writer.lock();
        let base = self.snapshot();
        if base.kind() == IndexKind::Hnsw {
            return Ok(());
        }
        let mut next = AnnIndex::clone(&base);
        drop(base);
        next.train(samples)?;
        self.swap(next);
        Ok(())
    }

    /// Compacts the index off-lock and swaps the result in.
    pub fn rebuild(&self) {
        let _writer = self.writer.lock();
        let next = self.snapshot().rebuild();
        self.swap(next);
    }

    /// Swaps in a prebuilt index wholesale.
    pub fn replace(&self, index: AnnIndex) {
        let _writer = self.writer.lock();
        self.swap(index);
    }

    fn swap(&self, next: AnnIndex) {
        let (kind, live) = (next.kind(), next.len());
        *self.current.write() = Arc::new(next);
        tracing::info!(%kind, live, "swapped in new index");
    }

    fn write<T>(&self, op: impl FnOnce(&mut AnnIndex) -> Result<T>) -> Result<T> {
        let _writer = self.writer.lock();
        let mut current = self.current.write();
        op(Arc::make_mut(&mut current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ivf_params(lists: usize) -> IndexParams {
        IndexParams::IvfFlat(IvfFlatConfig {
            lists,
            ..IvfFlatConfig::default()
        })
    }

    fn hnsw() -> AnnIndex {
        AnnIndex::build(2, Metric::L2, IndexParams::default()).unwrap()
    }

    fn records(n: u64) -> Vec<VectorRecord> {
        (0..n)
            .map(|i| VectorRecord::new(i, vec![(i % 10) as f32, (i / 10) as f32]))
            .collect()
    }

    #[test]
    fn test_kind_and_accessors() {
        let index = AnnIndex::build(3, Metric::L2, IndexParams::default()).unwrap();
        assert_eq!(index.kind(), IndexKind::Hnsw);
        assert_eq!(index.dimension(), 3);
        assert_eq!(index.metric(), Metric::L2);
        assert!(index.is_empty());
        let index = AnnIndex::build(3, Metric::Cosine, ivf_params(2)).unwrap();
        assert_eq!(index.kind().to_string(), "ivf_flat");
    }

    #[test]
    fn test_batch_is_atomic() {
        let mut index = AnnIndex::build(2, Metric::L2, IndexParams::default()).unwrap();
        index.insert(RecordId::from(100u64), &[0.0, 0.0]).unwrap();

        let mut batch = records(5);
        batch.push(VectorRecord::new(7u64, vec![1.0, 2.0, 3.0]));
        assert!(matches!(
            index.insert_batch(&batch),
            Err(IndexError::DimensionMismatch { .. })
        ));
        assert_eq!(index.len(), 1);

        let batch = vec![
            VectorRecord::new(1u64, vec![1.0, 1.0]),
            VectorRecord::new(1u64, vec![2.0, 2.0]),
        ];
        assert_eq!(
            index.insert_batch(&batch),
            Err(IndexError::DuplicateId(RecordId::from(1u64)))
        );
        assert_eq!(index.len(), 1);

        index.insert_batch(&records(5)).unwrap();
        assert_eq!(index.len(), 6);
    }

    #[test]
    fn test_ivf_through_facade() {
        let data = records(100);
        let samples: Vec<&[f32]> = data.iter().map(|r| r.embedding.as_slice()).collect();
        let mut index = AnnIndex::build(2, Metric::L2, ivf_params(4)).unwrap();
        assert_eq!(
            index.insert(RecordId::from(1u64), &[0.0, 0.0]),
            Err(IndexError::NotTrained)
        );
        index.train(&samples).unwrap();
        index.insert_batch(&data).unwrap();
        let params = SearchParams {
            probes: 4,
            ..SearchParams::default()
        };
        let hits = index.search(&[3.0, 4.0], 1, &params).unwrap();
        assert_eq!(hits[0].id, RecordId::from(43u64));
    }

    #[test]
    fn test_hnsw_train_is_noop() {
        let mut index = AnnIndex::build(2, Metric::L2, IndexParams::default()).unwrap();
        index.insert_batch(&records(3)).unwrap();
        index.train::<Vec<f32>>(&[]).unwrap();
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_params_serde() {
        let p: IndexParams = serde_json::from_str(r#"{"kind": "hnsw", "m": 8}"#).unwrap();
        assert!(matches!(p, IndexParams::Hnsw(ref c) if c.m == 8 && c.ef_construction == 64));
        let p: IndexParams = serde_json::from_str(r#"{"kind": "ivf_flat"}"#).unwrap();
        assert_eq!(p, IndexParams::IvfFlat(IvfFlatConfig::default()));
        assert!(serde_json::from_str::<IndexParams>(r#"{"kind": "lsh"}"#).is_err());
    }

    #[test]
    fn test_search_params_validate() {
        assert!(SearchParams::default().validate().is_ok());
        let bad = SearchParams {
            ef_search: 0,
            ..SearchParams::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_snapshot_is_isolated_from_writes() {
        let shared = SharedIndex::new(hnsw());
        shared.insert_batch(&records(10)).unwrap();
        let before = shared.snapshot();
        shared.insert(RecordId::from(500u64), &[50.0, 50.0]).unwrap();
        shared.remove(&RecordId::from(0u64)).unwrap();
        assert_eq!(before.len(), 10);
        assert!(before.contains(&RecordId::from(0u64)));
        assert!(!before.contains(&RecordId::from(500u64)));
        assert_eq!(shared.len(), 10);
        assert!(shared.snapshot().contains(&RecordId::from(500u64)));
    }

    #[test]
    fn test_shared_train_swaps() {
        let shared = SharedIndex::new(AnnIndex::build(2, Metric::L2, ivf_params(4)).unwrap());
        let data = records(40);
        let samples: Vec<Vec<f32>> = data.iter().map(|r| r.embedding.clone()).collect();
        let untrained = shared.snapshot();
        shared.train(&samples).unwrap();
        shared.insert_batch(&data).unwrap();
        assert!(matches!(&*untrained, AnnIndex::IvfFlat(i) if !i.is_trained()));
        assert_eq!(shared.len(), 40);

        let err = shared.train(&samples[..2]).unwrap_err();
        assert!(matches!(err, IndexError::InsufficientTrainingData { .. }));
        assert_eq!(shared.len(), 40, "failed training leaves the index in place");
    }

    #[test]
    fn test_shared_rebuild_and_replace() {
        let shared = SharedIndex::new(hnsw());
        shared.insert_batch(&records(20)).unwrap();
        for i in 0..5u64 {
            shared.remove(&RecordId::from(i)).unwrap();
        }
        shared.rebuild();
        match &*shared.snapshot() {
            AnnIndex::Hnsw(h) => assert_eq!(h.tombstone_count(), 0),
            other => panic!("unexpected kind {}", other.kind()),
        }
        assert_eq!(shared.len(), 15);

        shared.replace(hnsw());
        assert!(shared.is_empty());
        assert_eq!(
            shared.search(&[0.0, 0.0], 1, &SearchParams::default()),
            Err(IndexError::EmptyIndex)
        );
    }
}
