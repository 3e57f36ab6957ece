//! Distance metrics: cosine, inner product and Euclidean (L2).
//!
//! Every metric has two views. `distance` is what the indexes minimize
//! (lower is better). `similarity` is what callers see (higher is better,
//! 1.0 means identical for cosine and L2). Both accumulate in f64.

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};

/// Distance metric used by an index instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// `distance = 1 - cos(a, b)`, `similarity = cos(a, b)`. Range \[-1, 1\].
    #[default]
    Cosine,
    /// `distance = -dot(a, b)`, `similarity = dot(a, b)`. Only meaningful for
    /// comparably-normalized vectors.
    InnerProduct,
    /// `distance = ||a - b||`, `similarity = 1 / (1 + distance)`. Range (0, 1\].
    L2,
}

impl Metric {
    /// Distance between two equal-length vectors. Lower = more similar.
    ///
    /// Callers must have validated the dimension; see [`distance`] for the
    /// checked variant.
    #[inline]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Metric::Cosine => 1.0 - cosine(a, b),
            Metric::InnerProduct => -dot(a, b),
            Metric::L2 => squared_l2(a, b).sqrt(),
        }
    }

    /// Converts a distance produced by [`Metric::distance`] into a similarity.
    #[inline]
    pub fn similarity_from_distance(&self, distance: f64) -> f64 {
        match self {
            Metric::Cosine => 1.0 - distance,
            Metric::InnerProduct => -distance,
            Metric::L2 => 1.0 / (1.0 + distance),
        }
    }
}

/// Checked distance: fails with `DimensionMismatch` on unequal lengths.
pub fn distance(metric: Metric, a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(IndexError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(metric.distance(a, b))
}

/// Checked similarity: fails with `DimensionMismatch` on unequal lengths.
pub fn similarity(metric: Metric, a: &[f32], b: &[f32]) -> Result<f64> {
    distance(metric, a, b).map(|d| metric.similarity_from_distance(d))
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| x as f64 * y as f64)
        .sum()
}

/// Cosine of the angle between `a` and `b`. A zero-norm operand yields 0.
#[inline]
fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (dot / denom).clamp(-1.0, 1.0)
}

#[inline]
pub(crate) fn squared_l2(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum()
}

/// Scales `v` to unit L2 norm in place. Zero vectors are left untouched.
pub(crate) fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|&x| x as f64 * x as f64).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x = (*x as f64 / norm) as f32;
        }
    }
}
