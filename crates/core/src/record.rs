//! Record identity and metadata types.
//!
//! A [`VectorRecord`] is owned by the caller's durable record store. Indexes
//! keep only a copy of the embedding and the [`RecordId`]; metadata is read
//! back through [`MetadataLookup`] when the planner applies filters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Caller-assigned record identifier.
///
/// Ordering is total: every integer id sorts before every string id, integers
/// numerically and strings lexicographically. Fusion relies on this ordering
/// to break score ties deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Unsigned integer id (e.g. a database primary key).
    Int(u64),
    /// String id (e.g. a UUID or slug).
    Str(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(i) => write!(f, "{i}"),
            RecordId::Str(s) => f.write_str(s),
        }
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        RecordId::Int(id)
    }
}

impl From<u32> for RecordId {
    fn from(id: u32) -> Self {
        RecordId::Int(id as u64)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Str(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId::Str(id)
    }
}

/// A scalar metadata value attached to a record, used only for filtering.
///
/// Untagged so that plain JSON scalars (`true`, `3`, `0.5`, `"en"`) map
/// directly onto a variant. Integers are tried before floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean value.
    Boolean(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating-point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
}

impl MetadataValue {
    /// Numeric view used by range predicates. `None` for booleans and strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Boolean(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Integer(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::String(v.to_string())
    }
}

/// Key/value metadata. Insertion order is irrelevant.
pub type Metadata = HashMap<String, MetadataValue>;

/// A record as held by the external store: id, embedding and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Unique, caller-assigned id.
    pub id: RecordId,
    /// Fixed-dimension embedding produced by the embedding provider.
    pub embedding: Vec<f32>,
    /// Filterable metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl VectorRecord {
    /// Creates a record with empty metadata.
    pub fn new(id: impl Into<RecordId>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            embedding,
            metadata: Metadata::new(),
        }
    }

    /// Adds one metadata entry, builder style.
    pub fn with_meta(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Read access to record metadata, implemented by the caller's record store.
pub trait MetadataLookup {
    /// Returns the metadata for `id`, or `None` if the store has no such record.
    fn metadata(&self, id: &RecordId) -> Option<&Metadata>;
}

impl MetadataLookup for HashMap<RecordId, Metadata> {
    fn metadata(&self, id: &RecordId) -> Option<&Metadata> {
        self.get(id)
    }
}

impl MetadataLookup for HashMap<RecordId, VectorRecord> {
    fn metadata(&self, id: &RecordId) -> Option<&Metadata> {
        self.get(id).map(|r| &r.metadata)
    }
}
