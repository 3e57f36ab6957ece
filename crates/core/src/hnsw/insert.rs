//! HNSW insertion with bidirectional links and heuristic neighbor pruning
//! (Algorithm 4 of the HNSW paper).

use crate::error::{check_dimension, IndexError, Result};
use crate::hnsw::graph::HnswIndex;
use crate::hnsw::search::search_layer;
use crate::hnsw::visited::VisitedSet;
use crate::record::RecordId;

impl HnswIndex {
    /// Inserts a new record. Fails with `DimensionMismatch` or `DuplicateId`;
    /// on failure the graph is untouched.
    pub fn insert(&mut self, id: RecordId, embedding: &[f32]) -> Result<()> {
        self.check_insert(&id, embedding)?;
        self.insert_node(id, embedding);
        Ok(())
    }

    /// Inserts or replaces. An existing live node for `id` is tombstoned and a
    /// new node is linked in. Returns `true` if a record was replaced.
    pub fn upsert(&mut self, id: RecordId, embedding: &[f32]) -> Result<bool> {
        check_dimension(self.dimension, embedding)?;
        let replaced = match self.id_to_node.remove(&id) {
            Some(node) => {
                self.deleted[node as usize] = true;
                true
            }
            None => false,
        };
        self.insert_node(id, embedding);
        Ok(replaced)
    }

    /// Validation half of [`HnswIndex::insert`], usable ahead of a batch.
    pub(crate) fn check_insert(&self, id: &RecordId, embedding: &[f32]) -> Result<()> {
        check_dimension(self.dimension, embedding)?;
        if self.id_to_node.contains_key(id) {
            return Err(IndexError::DuplicateId(id.clone()));
        }
        Ok(())
    }

    /// Links a validated embedding into the graph.
    pub(crate) fn insert_node(&mut self, id: RecordId, embedding: &[f32]) {
        let internal_id = self.ids.len() as u32;
        let level = self.random_level();

        let Some(entry_point) = self.entry_point else {
            self.push_node(id, embedding, vec![Vec::new(); level + 1], level);
            self.entry_point = Some(internal_id);
            self.max_layer = level;
            return;
        };

        // Tombstoned nodes are accepted as neighbors so deletes never cut the graph.
        let accept_all = |_: u32| true;
        let mut visited = VisitedSet::new(self.ids.len());

        // Phase 1: greedy descent (ef = 1) down to the new node's top layer
        let mut current_ep = entry_point;
        for layer in (level + 1..=self.max_layer).rev() {
            let nearest = search_layer(
                self,
                embedding,
                std::slice::from_ref(&current_ep),
                1,
                layer,
                &mut visited,
                &accept_all,
            );
            if let Some(&(_, node)) = nearest.first() {
                current_ep = node;
            }
        }

        // Phase 2: beam search each shared layer and pick neighbors
        let top = level.min(self.max_layer);
        let mut node_neighbors: Vec<Vec<u32>> = vec![Vec::new(); level + 1];
        let mut layer_eps: Vec<u32> = vec![current_ep];
        for layer in (0..=top).rev() {
            let candidates = search_layer(
                self,
                embedding,
                &layer_eps,
                self.config.ef_construction,
                layer,
                &mut visited,
                &accept_all,
            );
            let selected =
                select_neighbors_heuristic(self, &candidates, self.max_neighbors(layer));
            node_neighbors[layer] = selected.iter().map(|&(_, node)| node).collect();

            layer_eps.clear();
            layer_eps.extend(candidates.iter().map(|&(_, node)| node));
            if layer_eps.is_empty() {
                layer_eps.push(entry_point);
            }
        }

        self.push_node(id, embedding, node_neighbors, level);

        // Phase 3: back links, re-pruning any neighbor pushed over capacity
        let metric = self.metric;
        for layer in 0..=top {
            let m_max = self.max_neighbors(layer);
            let mine = self.neighbors[internal_id as usize][layer].clone();
            for neighbor in mine {
                let nid = neighbor as usize;
                while self.neighbors[nid].len() <= layer {
                    self.neighbors[nid].push(Vec::new());
                }
                self.neighbors[nid][layer].push(internal_id);

                if self.neighbors[nid][layer].len() > m_max {
                    let base = self.vector(neighbor);
                    let candidates: Vec<(f64, u32)> = self.neighbors[nid][layer]
                        .iter()
                        .map(|&cid| (metric.distance(base, self.vector(cid)), cid))
                        .collect();
                    let pruned = select_neighbors_heuristic(self, &candidates, m_max);
                    self.neighbors[nid][layer] = pruned.into_iter().map(|(_, c)| c).collect();
                }
            }
        }

        if level > self.max_layer {
            tracing::debug!(
                id = %self.ids[internal_id as usize],
                level,
                "new HNSW entry point"
            );
            self.max_layer = level;
            self.entry_point = Some(internal_id);
        }
    }

    fn push_node(
        &mut self,
        id: RecordId,
        embedding: &[f32],
        neighbors: Vec<Vec<u32>>,
        level: usize,
    ) {
        let internal_id = self.ids.len() as u32;
        self.vectors.extend_from_slice(embedding);
        self.neighbors.push(neighbors);
        self.layers.push(level as u8);
        self.deleted.push(false);
        self.id_to_node.insert(id.clone(), internal_id);
        self.ids.push(id);
    }
}

/// Heuristic neighbor selection (Algorithm 4 of the HNSW paper).
///
/// A candidate is kept only if it is closer to the base node than to every
/// neighbor already kept, which spreads links across directions instead of
/// piling them into one tight cluster. Remaining slots are backfilled with the
/// nearest unused candidates.
fn select_neighbors_heuristic(
    index: &HnswIndex,
    candidates: &[(f64, u32)],
    m: usize,
) -> Vec<(f64, u32)> {
    let mut sorted = candidates.to_vec();
    sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let metric = index.metric;
    let mut selected: Vec<(f64, u32)> = Vec::with_capacity(m);
    for &(dist_to_base, cid) in &sorted {
        if selected.len() >= m {
            break;
        }
        let candidate = index.vector(cid);
        let is_diverse = selected
            .iter()
            .all(|&(_, sid)| dist_to_base <= metric.distance(candidate, index.vector(sid)));
        if is_diverse {
            selected.push((dist_to_base, cid));
        }
    }

    if selected.len() < m {
        for &(dist, cid) in &sorted {
            if selected.len() >= m {
                break;
            }
            if !selected.iter().any(|&(_, sid)| sid == cid) {
                selected.push((dist, cid));
            }
        }
    }

    selected
}
