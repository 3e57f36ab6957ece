//! Query-time pipeline: result types, metadata predicates, rank fusion and the
//! query planner that ties them to an index and a lexical scorer.

/// `must` / `must_not` metadata predicates.
pub mod filter;
/// Weighted Reciprocal Rank Fusion.
pub mod fusion;
/// Threshold, filter, fuse and clamp.
pub mod planner;
/// `SearchHit`, `LexicalHit`, `FusedHit`.
pub mod types;

pub use filter::{matches_filter, FilterClause, FilterCondition, FilterOperator};
pub use fusion::{fuse, rrf, FusionWeights};
pub use planner::{HybridQuery, PlannerConfig, QueryPlanner};
pub use types::{FusedHit, LexicalHit, SearchHit};
