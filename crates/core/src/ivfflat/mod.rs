//! IVFFlat (inverted file, flat storage) approximate nearest neighbor index.
//!
//! The vector space is partitioned into `lists` Voronoi cells by k-means.
//! Each record is stored uncompressed in the list of its nearest centroid, and
//! a query scans only the `probes` cells whose centroids are closest to it.
//! Recall and cost both grow with `probes`; `probes == lists` is exact search.
//!
//! The index must be trained before any insert or search. Re-training
//! discards every list.

/// Inverted lists, training, insertion and search.
pub mod index;
mod kmeans;

pub use index::{IvfFlatConfig, IvfFlatIndex};

use crate::config::IVF_MIN_LISTS;

/// Suggested list count for an expected number of rows: `rows / 1000` up to
/// one million rows, `sqrt(rows)` beyond that, never below 10.
pub fn recommended_lists(expected_rows: usize) -> usize {
    let lists = if expected_rows <= 1_000_000 {
        expected_rows / 1000
    } else {
        (expected_rows as f64).sqrt() as usize
    };
    lists.max(IVF_MIN_LISTS)
}
