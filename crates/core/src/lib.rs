//! # vectorfuse-core
//!
//! In-process approximate nearest neighbor index and hybrid retrieval engine:
//! HNSW and IVFFlat vector indexes over cosine, inner product or L2 distance,
//! weighted Reciprocal Rank Fusion of vector and keyword results, and a query
//! planner that applies similarity thresholds, metadata filters and result
//! caps.
//!
//! The engine never computes embeddings and never persists anything; records
//! live in the caller's store and are looked up through
//! [`record::MetadataLookup`].

/// Compile-time defaults and the runtime `EngineConfig`.
pub mod config;
/// Cosine, inner product and L2 distance.
pub mod distance;
/// `IndexError` and the crate `Result` alias.
pub mod error;
/// HNSW graph index: structure, insertion, search, rebuild.
pub mod hnsw;
/// `AnnIndex` facade over both index kinds, plus the shared `SharedIndex` handle.
pub mod index;
/// IVFFlat index: k-means training, inverted lists, probe-limited search.
pub mod ivfflat;
/// `LexicalScorer` trait and the BM25 reference scorer.
pub mod lexical;
/// Record ids, metadata values and the metadata lookup trait.
pub mod record;
/// Result types, metadata filters, RRF fusion and the query planner.
pub mod search;

pub use config::EngineConfig;
pub use distance::Metric;
pub use error::{IndexError, Result};
pub use index::{AnnIndex, IndexKind, IndexParams, SearchParams, SharedIndex};
pub use record::{Metadata, MetadataLookup, MetadataValue, RecordId, VectorRecord};
