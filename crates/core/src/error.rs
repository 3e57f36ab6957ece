//! Error taxonomy shared by every index, the fusion engine and the planner.
//!
//! All errors are reported synchronously. Nothing here is retried internally:
//! every operation is local and deterministic, and each one either fully
//! applies or fully fails.

use crate::record::RecordId;
use thiserror::Error;

/// Errors returned by index construction, mutation, search and fusion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    /// Embedding length differs from the index dimension. Always a caller bug.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the index was built with.
        expected: usize,
        /// Length of the offending embedding.
        actual: usize,
    },

    /// Insert collided with a live record carrying the same id.
    #[error("duplicate id: {0}")]
    DuplicateId(RecordId),

    /// Remove targeted an id with no live record.
    #[error("id not found: {0}")]
    NotFound(RecordId),

    /// Search ran against an index with no live records.
    #[error("index contains no live records")]
    EmptyIndex,

    /// IVFFlat insert or search before `train`.
    #[error("index has not been trained")]
    NotTrained,

    /// IVFFlat `train` received fewer samples than requested lists.
    #[error("insufficient training data: need at least {required} samples, got {provided}")]
    InsufficientTrainingData {
        /// Minimum sample count (the configured number of lists).
        required: usize,
        /// Number of samples actually supplied.
        provided: usize,
    },

    /// A numeric parameter is out of range (zero `k`, zero `probes`, NaN weight, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Validates an embedding against the index dimension.
pub(crate) fn check_dimension(expected: usize, embedding: &[f32]) -> Result<()> {
    if embedding.len() != expected {
        return Err(IndexError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    if embedding.iter().any(|x| !x.is_finite()) {
        return Err(IndexError::InvalidParameter(
            "embedding contains NaN or infinite components".into(),
        ));
    }
    Ok(())
}

/// Rejects a zero-valued count parameter (`k`, `ef_search`, `probes`, `limit`).
pub(crate) fn check_positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(IndexError::InvalidParameter(format!(
            "{name} must be greater than zero"
        )));
    }
    Ok(())
}
