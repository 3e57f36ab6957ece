//! HNSW search: single-layer beam search and multi-layer k-NN.
//!
//! An `accept` predicate decides which nodes may enter the result set.
//! Rejected nodes (tombstones, filtered-out records) are still expanded, so
//! they keep serving as navigation hops.

use crate::error::{check_dimension, check_positive, IndexError, Result};
use crate::hnsw::graph::HnswIndex;
use crate::hnsw::visited::VisitedSet;
use crate::record::RecordId;
use crate::search::types::{sort_hits, SearchHit};
use ordered_float::OrderedFloat;
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

thread_local! {
    /// Per-thread visited set reused across queries.
    static SEARCH_VISITED: RefCell<VisitedSet> = RefCell::new(VisitedSet::default());
}

/// Heap key: (distance, node). Ties on distance resolve by node id so
/// traversal order is deterministic.
type Keyed = (OrderedFloat<f64>, u32);

/// Beam search within one layer.
///
/// Returns up to `ef` accepted nodes as `(distance, node)`, nearest first.
pub(crate) fn search_layer<F: Fn(u32) -> bool>(
    index: &HnswIndex,
    query: &[f32],
    entry_points: &[u32],
    ef: usize,
    layer: usize,
    visited: &mut VisitedSet,
    accept: &F,
) -> Vec<(f64, u32)> {
    visited.reset(index.node_count());
    // Min-heap of nodes to expand, max-heap of the current best `ef`
    let mut candidates: BinaryHeap<Reverse<Keyed>> = BinaryHeap::with_capacity(ef * 2);
    let mut results: BinaryHeap<Keyed> = BinaryHeap::with_capacity(ef + 1);
    let mut worst = f64::MAX;

    for &ep in entry_points {
        if !visited.visit(ep) {
            continue;
        }
        let dist = index.metric.distance(query, index.vector(ep));
        candidates.push(Reverse((OrderedFloat(dist), ep)));
        if accept(ep) {
            results.push((OrderedFloat(dist), ep));
            if results.len() > ef {
                results.pop();
            }
            if results.len() >= ef {
                worst = results.peek().map_or(f64::MAX, |r| r.0 .0);
            }
        }
    }

    while let Some(Reverse((OrderedFloat(c_dist), node))) = candidates.pop() {
        if results.len() >= ef && c_dist > worst {
            break;
        }
        let Some(neighbors) = index.neighbors[node as usize].get(layer) else {
            continue;
        };
        for &neighbor in neighbors {
            if !visited.visit(neighbor) {
                continue;
            }
            let dist = index.metric.distance(query, index.vector(neighbor));
            if results.len() < ef || dist < worst {
                candidates.push(Reverse((OrderedFloat(dist), neighbor)));
                if accept(neighbor) {
                    results.push((OrderedFloat(dist), neighbor));
                    if results.len() > ef {
                        results.pop();
                    }
                    if results.len() >= ef {
                        worst = results.peek().map_or(f64::MAX, |r| r.0 .0);
                    }
                }
            }
        }
    }

    results
        .into_sorted_vec()
        .into_iter()
        .map(|(d, node)| (d.0, node))
        .collect()
}

impl HnswIndex {
    /// Approximate k-NN over live records.
    ///
    /// `ef_search` is the layer-0 beam width (raised to `k` if smaller).
    /// Fails with `EmptyIndex` when no live records exist.
    pub fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Result<Vec<SearchHit>> {
        self.search_filtered(query, k, ef_search, &|_: &RecordId| true)
    }

    /// k-NN restricted to records accepted by `predicate`.
    ///
    /// The predicate is applied during layer-0 traversal. If fewer than `k`
    /// records survive, the beam is doubled (up to 4x) and the layer retried.
    pub fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
        predicate: &dyn Fn(&RecordId) -> bool,
    ) -> Result<Vec<SearchHit>> {
        check_dimension(self.dimension, query)?;
        check_positive("k", k)?;
        check_positive("ef_search", ef_search)?;
        let entry_point = match self.entry_point {
            Some(ep) if !self.is_empty() => ep,
            _ => return Err(IndexError::EmptyIndex),
        };

        let accept = |node: u32| !self.is_deleted(node) && predicate(&self.ids[node as usize]);
        // Taken out rather than borrowed: the predicate may itself run a search
        // on this thread, which then gets a fresh set.
        let mut visited = SEARCH_VISITED.with(RefCell::take);

        // Greedy descent through the upper layers, unfiltered
        let accept_all = |_: u32| true;
        let mut current_ep = entry_point;
        for layer in (1..=self.max_layer).rev() {
            let step = search_layer(
                self,
                query,
                std::slice::from_ref(&current_ep),
                1,
                layer,
                &mut visited,
                &accept_all,
            );
            if let Some(&(_, node)) = step.first() {
                current_ep = node;
            }
        }

        let base_ef = ef_search.max(k);
        let max_ef = (base_ef * 4).min(self.node_count()).max(base_ef);
        let mut ef = base_ef;
        let nearest = loop {
            let found = search_layer(
                self,
                query,
                std::slice::from_ref(&current_ep),
                ef,
                0,
                &mut visited,
                &accept,
            );
            if found.len() >= k || ef >= max_ef {
                break found;
            }
            ef = (ef * 2).min(max_ef);
        };
        SEARCH_VISITED.with(|cell| cell.replace(visited));

        let mut hits: Vec<SearchHit> = nearest
            .into_iter()
            .map(|(dist, node)| SearchHit {
                id: self.ids[node as usize].clone(),
                similarity: self.metric.similarity_from_distance(dist),
            })
            .collect();
        sort_hits(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Metric;
    use crate::hnsw::graph::HnswConfig;

    fn grid_index(metric: Metric) -> HnswIndex {
        let config = HnswConfig {
            m: 6,
            ef_construction: 40,
            ..HnswConfig::default()
        };
        let mut index = HnswIndex::build(2, metric, config).unwrap();
        for i in 0..100u64 {
            let x = (i % 10) as f32;
            let y = (i / 10) as f32;
            index.insert(RecordId::from(i), &[x, y]).unwrap();
        }
        index
    }

    #[test]
    fn test_empty_index_search_fails() {
        let index = HnswIndex::build(2, Metric::Cosine, HnswConfig::default()).unwrap();
        assert_eq!(index.search(&[1.0, 0.0], 3, 10), Err(IndexError::EmptyIndex));
    }

    #[test]
    fn test_all_tombstoned_is_empty() {
        let mut index = grid_index(Metric::L2);
        for i in 0..100u64 {
            index.remove(&RecordId::from(i)).unwrap();
        }
        assert_eq!(index.search(&[1.0, 1.0], 3, 10), Err(IndexError::EmptyIndex));
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let index = grid_index(Metric::L2);
        let hits = index.search(&[3.0, 4.0], 5, 50).unwrap();
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].id, RecordId::from(43u64));
        assert_eq!(hits[0].similarity, 1.0);
        for pair in hits.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity, "hits must be sorted");
        }
    }

    #[test]
    fn test_tombstoned_nodes_excluded_but_navigable() {
        let mut index = grid_index(Metric::L2);
        index.remove(&RecordId::from(43u64)).unwrap();
        let hits = index.search(&[3.0, 4.0], 4, 50).unwrap();
        assert!(hits.iter().all(|h| h.id != RecordId::from(43u64)));
        // The four grid neighbors at distance 1 are all still found
        assert!(hits.iter().all(|h| (h.similarity - 0.5).abs() < 1e-9));
    }

    #[test]
    fn test_filtered_search_only_returns_accepted() {
        let index = grid_index(Metric::L2);
        let even = |id: &RecordId| matches!(id, RecordId::Int(i) if i % 2 == 0);
        let hits = index.search_filtered(&[5.0, 5.0], 10, 20, &even).unwrap();
        assert_eq!(hits.len(), 10);
        assert!(hits.iter().all(|h| even(&h.id)));
    }

    #[test]
    fn test_invalid_search_params() {
        let index = grid_index(Metric::L2);
        assert!(matches!(
            index.search(&[1.0, 1.0], 0, 10),
            Err(IndexError::InvalidParameter(_))
        ));
        assert!(matches!(
            index.search(&[1.0, 1.0], 3, 0),
            Err(IndexError::InvalidParameter(_))
        ));
        assert_eq!(
            index.search(&[1.0], 3, 10),
            Err(IndexError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_predicate_may_search_on_same_thread() {
        let outer = grid_index(Metric::L2);
        let inner = grid_index(Metric::L2);
        // Accept only ids whose own grid point is its nearest neighbor in `inner`
        let nested = |id: &RecordId| {
            let RecordId::Int(i) = id else { return false };
            let point = [(i % 10) as f32, (i / 10) as f32];
            inner
                .search(&point, 1, 100)
                .is_ok_and(|hits| hits[0].id == *id && i % 3 == 0)
        };
        let hits = outer.search_filtered(&[4.0, 4.0], 3, 20, &nested).unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| matches!(h.id, RecordId::Int(i) if i % 3 == 0)));
        // The thread-local set still works afterwards
        assert_eq!(outer.search(&[3.0, 4.0], 1, 10).unwrap()[0].id, RecordId::from(43u64));
    }

    #[test]
    fn test_k_larger_than_index() {
        let mut index = HnswIndex::build(2, Metric::Cosine, HnswConfig::default()).unwrap();
        index.insert(RecordId::from(1u64), &[1.0, 0.0]).unwrap();
        index.insert(RecordId::from(2u64), &[0.0, 1.0]).unwrap();
        let hits = index.search(&[1.0, 0.1], 10, 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, RecordId::from(1u64));
    }
}
