//! Hierarchical Navigable Small World (HNSW) approximate nearest neighbor index.
//!
//! A layered proximity graph: every node lives on layer 0 and on a random
//! number of upper layers, exponentially sparser as they go up. Search descends
//! greedily from the entry point through the upper layers, then runs a beam
//! search of width `ef_search` on layer 0.
//!
//! Embeddings are stored as raw f32 in one contiguous arena; the graph uses a
//! Struct-of-Arrays layout keyed by an internal `u32` node id.

/// HNSW graph structure, configuration, removal and rebuild.
pub mod graph;
/// Insertion with bidirectional links and heuristic pruning.
pub mod insert;
/// Single-layer beam search and multi-layer k-NN.
pub mod search;
/// Epoch-stamped visited set for graph traversal.
pub mod visited;

pub use graph::{HnswConfig, HnswIndex};
