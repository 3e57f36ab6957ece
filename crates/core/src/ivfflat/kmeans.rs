//! K-means clustering with k-means++ seeding, used to train IVFFlat centroids.
//!
//! Operates on a contiguous arena of `n * dim` floats. Assignment uses squared
//! Euclidean distance; in spherical mode (cosine indexes) the caller passes
//! unit-normalized data and centroids are re-normalized after every update.

use crate::distance::{normalize, squared_l2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub(crate) struct KMeansParams {
    pub k: usize,
    pub max_iterations: usize,
    pub tolerance: f32,
    pub seed: u64,
    pub spherical: bool,
}

pub(crate) struct KMeansOutcome {
    /// `k * dim` floats.
    pub centroids: Vec<f32>,
    pub iterations: usize,
    pub converged: bool,
}

/// Clusters `data` into `params.k` centroids. Requires `n >= k >= 1`.
pub(crate) fn kmeans(data: &[f32], dim: usize, params: &KMeansParams) -> KMeansOutcome {
    let n = data.len() / dim;
    let k = params.k;
    debug_assert!(n >= k && k >= 1);
    let point = |i: usize| &data[i * dim..(i + 1) * dim];

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut centroids = seed_plus_plus(data, dim, k, &mut rng);

    let mut assignments = vec![0usize; n];
    let mut sums = vec![0.0f64; k * dim];
    let mut counts = vec![0usize; k];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < params.max_iterations {
        iterations += 1;

        for (i, slot) in assignments.iter_mut().enumerate() {
            *slot = nearest(&centroids, dim, point(i));
        }

        sums.fill(0.0);
        counts.fill(0);
        for (i, &c) in assignments.iter().enumerate() {
            counts[c] += 1;
            let acc = &mut sums[c * dim..(c + 1) * dim];
            for (a, &x) in acc.iter_mut().zip(point(i)) {
                *a += x as f64;
            }
        }

        let mut max_shift = 0.0f64;
        for c in 0..k {
            // Empty clusters keep their previous position
            if counts[c] == 0 {
                continue;
            }
            let inv = 1.0 / counts[c] as f64;
            let mut updated: Vec<f32> = sums[c * dim..(c + 1) * dim]
                .iter()
                .map(|&s| (s * inv) as f32)
                .collect();
            if params.spherical {
                normalize(&mut updated);
            }
            let current = &mut centroids[c * dim..(c + 1) * dim];
            max_shift = max_shift.max(squared_l2(current, &updated).sqrt());
            current.copy_from_slice(&updated);
        }

        if max_shift < params.tolerance as f64 {
            converged = true;
            break;
        }
    }

    KMeansOutcome {
        centroids,
        iterations,
        converged,
    }
}

/// Index of the centroid nearest to `v` by squared L2. Ties go to the lower index.
pub(crate) fn nearest(centroids: &[f32], dim: usize, v: &[f32]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::MAX;
    for (c, centroid) in centroids.chunks_exact(dim).enumerate() {
        let d = squared_l2(v, centroid);
        if d < best_dist {
            best_dist = d;
            best = c;
        }
    }
    best
}

/// k-means++ seeding: each next centroid is drawn with probability
/// proportional to its squared distance from the nearest centroid so far.
fn seed_plus_plus(data: &[f32], dim: usize, k: usize, rng: &mut StdRng) -> Vec<f32> {
    let n = data.len() / dim;
    let point = |i: usize| &data[i * dim..(i + 1) * dim];
    let mut centroids = Vec::with_capacity(k * dim);

    let first = rng.gen_range(0..n);
    centroids.extend_from_slice(point(first));

    let mut min_dists = vec![f64::MAX; n];
    for c in 1..k {
        let last = &centroids[(c - 1) * dim..c * dim];
        let mut total = 0.0f64;
        for (i, min_d) in min_dists.iter_mut().enumerate() {
            let d = squared_l2(point(i), last);
            if d < *min_d {
                *min_d = d;
            }
            total += *min_d;
        }

        // Every point coincides with an existing centroid
        if total <= f64::EPSILON {
            let idx = rng.gen_range(0..n);
            centroids.extend_from_slice(point(idx));
            continue;
        }

        let threshold = rng.gen::<f64>() * total;
        let mut cumulative = 0.0f64;
        let mut chosen = n - 1;
        for (i, &d) in min_dists.iter().enumerate() {
            cumulative += d;
            if cumulative >= threshold {
                chosen = i;
                break;
            }
        }
        centroids.extend_from_slice(point(chosen));
    }

    centroids
}
