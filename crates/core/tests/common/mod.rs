#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vectorfuse_core::distance::distance;
use vectorfuse_core::{Metric, RecordId, VectorRecord};

/// `n` uniform vectors in [-1, 1)^dim, ids `0..n`.
pub fn random_records(n: usize, dim: usize, seed: u64) -> Vec<VectorRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n as u64)
        .map(|i| {
            let v: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
            VectorRecord::new(i, v)
        })
        .collect()
}

pub fn random_queries(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    random_records(n, dim, seed)
        .into_iter()
        .map(|r| r.embedding)
        .collect()
}

/// Exact top-`k` ids by linear scan.
pub fn brute_force(
    records: &[VectorRecord],
    query: &[f32],
    k: usize,
    metric: Metric,
) -> Vec<RecordId> {
    let mut scored: Vec<(f64, &RecordId)> = records
        .iter()
        .map(|r| (distance(metric, query, &r.embedding).unwrap(), &r.id))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(b.1)));
    scored.into_iter().take(k).map(|(_, id)| id.clone()).collect()
}

/// Fraction of `truth` present in `found`.
pub fn recall(found: &[RecordId], truth: &[RecordId]) -> f64 {
    let hits = truth.iter().filter(|id| found.contains(id)).count();
    hits as f64 / truth.len() as f64
}
