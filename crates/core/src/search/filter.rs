//! Metadata predicates for the query planner.
//!
//! A [`FilterClause`] holds `must` (AND) and `must_not` (AND-NOT) conditions.
//! Operators: `eq`, `ne`, `gt`, `lt`, `gte`, `lte`, `in`. A condition on a
//! field the record lacks is false; range operators only hold between numeric
//! values.

use crate::record::{Metadata, MetadataValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Metadata filter clause with `must` (AND) and `must_not` (AND-NOT) conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    #[serde(default)]
    pub must: Vec<FilterCondition>,
    #[serde(default)]
    pub must_not: Vec<FilterCondition>,
}

/// A single condition on one metadata field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOperator,
    /// Operand for every operator except `in`.
    #[serde(default)]
    pub value: Option<MetadataValue>,
    /// Operand list for `in`.
    #[serde(default)]
    pub values: Option<Vec<MetadataValue>>,
}

/// Comparison operator for filter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
}

impl FilterClause {
    /// Adds a `must` condition, builder style.
    pub fn must(mut self, field: &str, op: FilterOperator, value: impl Into<MetadataValue>) -> Self {
        self.must.push(FilterCondition::new(field, op, value));
        self
    }

    /// Adds a `must_not` condition, builder style.
    pub fn must_not(
        mut self,
        field: &str,
        op: FilterOperator,
        value: impl Into<MetadataValue>,
    ) -> Self {
        self.must_not.push(FilterCondition::new(field, op, value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty()
    }
}

impl FilterCondition {
    pub fn new(field: &str, op: FilterOperator, value: impl Into<MetadataValue>) -> Self {
        Self {
            field: field.to_string(),
            op,
            value: Some(value.into()),
            values: None,
        }
    }

    /// An `in` condition over `values`.
    pub fn one_of(field: &str, values: Vec<MetadataValue>) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOperator::In,
            value: None,
            values: Some(values),
        }
    }
}

/// Returns `true` if `metadata` satisfies every `must` condition and none of
/// the `must_not` conditions.
pub fn matches_filter(metadata: &Metadata, filter: &FilterClause) -> bool {
    filter.must.iter().all(|c| evaluate(metadata, c))
        && !filter.must_not.iter().any(|c| evaluate(metadata, c))
}

fn evaluate(metadata: &Metadata, cond: &FilterCondition) -> bool {
    let Some(field) = metadata.get(&cond.field) else {
        return false;
    };
    if cond.op == FilterOperator::In {
        return cond
            .values
            .as_ref()
            .is_some_and(|vals| vals.iter().any(|v| values_eq(field, v)));
    }
    let Some(operand) = cond.value.as_ref() else {
        return false;
    };
    match cond.op {
        FilterOperator::Eq => values_eq(field, operand),
        FilterOperator::Ne => !values_eq(field, operand),
        FilterOperator::Gt => numeric_cmp(field, operand) == Some(Ordering::Greater),
        FilterOperator::Lt => numeric_cmp(field, operand) == Some(Ordering::Less),
        FilterOperator::Gte => {
            matches!(numeric_cmp(field, operand), Some(Ordering::Greater | Ordering::Equal))
        }
        FilterOperator::Lte => {
            matches!(numeric_cmp(field, operand), Some(Ordering::Less | Ordering::Equal))
        }
        FilterOperator::In => false,
    }
}

/// Equality with integer/float cross-comparison.
fn values_eq(a: &MetadataValue, b: &MetadataValue) -> bool {
    match (a, b) {
        (MetadataValue::String(x), MetadataValue::String(y)) => x == y,
        (MetadataValue::Boolean(x), MetadataValue::Boolean(y)) => x == y,
        (MetadataValue::Integer(x), MetadataValue::Integer(y)) => x == y,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
            _ => false,
        },
    }
}

fn numeric_cmp(a: &MetadataValue, b: &MetadataValue) -> Option<Ordering> {
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}
