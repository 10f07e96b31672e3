//! Filter expressions: parse once, evaluate many times
//!
//! A raw `where` argument is converted into a closed [`FilterExpression`]
//! tree. Only one combinator is kept per node, with precedence
//! NOT > OR > AND > field conditions. Shapes that cannot be understood are
//! dropped while parsing; evaluation never fails and treats missing
//! properties or type mismatches as a false condition.

use super::entity::GraphEntity;
use crate::graph::PropertyValue;
use rayon::prelude::*;
use serde_json::{Map, Value as JsonValue};
use std::cmp::Ordering;
use std::fmt;

/// Candidate sets larger than this are filtered on the rayon pool
pub const PARALLEL_FILTER_THRESHOLD: usize = 4096;

const AND_KEY: &str = "AND";
const OR_KEY: &str = "OR";
const NOT_KEY: &str = "NOT";

/// Comparison operator of a single condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
    Contains,
    In,
    /// Unrecognized operator name; never matches
    Unknown(String),
}

impl FilterOp {
    pub fn parse(name: &str) -> Self {
        match name {
            "eq" => FilterOp::Eq,
            "gt" => FilterOp::Gt,
            "lt" => FilterOp::Lt,
            "gte" => FilterOp::Gte,
            "lte" => FilterOp::Lte,
            "contains" => FilterOp::Contains,
            "in" => FilterOp::In,
            other => FilterOp::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Gt => "gt",
            FilterOp::Lt => "lt",
            FilterOp::Gte => "gte",
            FilterOp::Lte => "lte",
            FilterOp::Contains => "contains",
            FilterOp::In => "in",
            FilterOp::Unknown(name) => name,
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Scalar(PropertyValue),
    List(Vec<PropertyValue>),
    /// null or object operands; every operator is false against them
    Unsupported,
}

impl Operand {
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Array(items) => {
                Operand::List(items.iter().filter_map(PropertyValue::from_json).collect())
            }
            other => PropertyValue::from_json(other)
                .map(Operand::Scalar)
                .unwrap_or(Operand::Unsupported),
        }
    }

    fn as_scalar(&self) -> Option<&PropertyValue> {
        match self {
            Operand::Scalar(value) => Some(value),
            _ => None,
        }
    }
}

impl From<PropertyValue> for Operand {
    fn from(value: PropertyValue) -> Self {
        Operand::Scalar(value)
    }
}

impl From<Vec<PropertyValue>> for Operand {
    fn from(values: Vec<PropertyValue>) -> Self {
        Operand::List(values)
    }
}

/// (field, operator, operand) triple
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOp,
    pub operand: Operand,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, op: FilterOp, operand: impl Into<Operand>) -> Self {
        Self {
            field: field.into(),
            op,
            operand: operand.into(),
        }
    }

    /// Evaluate against one entity; a missing field is false
    pub fn matches<E: GraphEntity + ?Sized>(&self, entity: &E) -> bool {
        match entity.field(&self.field) {
            Some(value) => apply_op(&value, &self.op, &self.operand),
            None => false,
        }
    }
}

/// Parsed filter tree; exactly one combinator per node
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    Not(Box<FilterExpression>),
    Or(Vec<FilterExpression>),
    And(Vec<FilterExpression>),
    /// Implicit AND over sibling field conditions; empty matches everything
    Conditions(Vec<FilterCondition>),
}

impl Default for FilterExpression {
    fn default() -> Self {
        FilterExpression::Conditions(Vec::new())
    }
}

impl FilterExpression {
    /// Expression that matches every entity
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Parse a `where` argument. Anything other than an object yields the
    /// match-all expression.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Object(map) => Self::from_map(map),
            _ => Self::match_all(),
        }
    }

    fn from_map(map: &Map<String, JsonValue>) -> Self {
        if let Some(JsonValue::Object(inner)) = map.get(NOT_KEY) {
            return FilterExpression::Not(Box::new(Self::from_map(inner)));
        }

        let branches = |key: &str| -> Vec<FilterExpression> {
            match map.get(key) {
                Some(JsonValue::Array(items)) => items
                    .iter()
                    .filter_map(|item| item.as_object().map(Self::from_map))
                    .collect(),
                _ => Vec::new(),
            }
        };

        let or = branches(OR_KEY);
        if !or.is_empty() {
            return FilterExpression::Or(or);
        }
        let and = branches(AND_KEY);
        if !and.is_empty() {
            return FilterExpression::And(and);
        }

        let mut conditions = Vec::new();
        for (field, ops) in map {
            if field == AND_KEY || field == OR_KEY || field == NOT_KEY {
                continue;
            }
            let Some(ops) = ops.as_object() else {
                continue;
            };
            for (op, operand) in ops {
                conditions.push(FilterCondition {
                    field: field.clone(),
                    op: FilterOp::parse(op),
                    operand: Operand::from_json(operand),
                });
            }
        }
        FilterExpression::Conditions(conditions)
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, FilterExpression::Conditions(c) if c.is_empty())
    }

    /// Evaluate the tree against one entity
    pub fn matches<E: GraphEntity + ?Sized>(&self, entity: &E) -> bool {
        match self {
            FilterExpression::Not(inner) => !inner.matches(entity),
            FilterExpression::Or(branches) => branches.iter().any(|b| b.matches(entity)),
            FilterExpression::And(branches) => branches.iter().all(|b| b.matches(entity)),
            FilterExpression::Conditions(conditions) => {
                conditions.iter().all(|c| c.matches(entity))
            }
        }
    }
}

/// `None` means no filter and matches everything
pub fn evaluate<E: GraphEntity + ?Sized>(entity: &E, expr: Option<&FilterExpression>) -> bool {
    expr.map_or(true, |expr| expr.matches(entity))
}

/// Keep the entities matching `expr`, preserving input order
pub fn filter_entities<T>(entities: &[T], expr: Option<&FilterExpression>) -> Vec<T>
where
    T: GraphEntity + Clone + Send + Sync,
{
    let expr = match expr {
        Some(expr) if !expr.is_match_all() => expr,
        _ => return entities.to_vec(),
    };

    if entities.len() > PARALLEL_FILTER_THRESHOLD {
        entities
            .par_iter()
            .filter(|entity| expr.matches(*entity))
            .cloned()
            .collect()
    } else {
        entities
            .iter()
            .filter(|entity| expr.matches(*entity))
            .cloned()
            .collect()
    }
}

fn apply_op(value: &PropertyValue, op: &FilterOp, operand: &Operand) -> bool {
    match op {
        FilterOp::Eq => operand.as_scalar().map_or(false, |o| value.loose_eq(o)),
        FilterOp::Gt => compare_numeric(value, operand) == Some(Ordering::Greater),
        FilterOp::Lt => compare_numeric(value, operand) == Some(Ordering::Less),
        FilterOp::Gte => matches!(
            compare_numeric(value, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::Lte => matches!(
            compare_numeric(value, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOp::Contains => match (value, operand.as_scalar()) {
            (PropertyValue::String(haystack), Some(PropertyValue::String(needle))) => {
                haystack.contains(needle.as_str())
            }
            _ => false,
        },
        FilterOp::In => match operand {
            Operand::List(items) => items.iter().any(|item| value.loose_eq(item)),
            _ => false,
        },
        FilterOp::Unknown(_) => false,
    }
}

/// Both sides widened to f64; `None` for non-numeric sides or NaN
fn compare_numeric(value: &PropertyValue, operand: &Operand) -> Option<Ordering> {
    let lhs = value.as_f64()?;
    let rhs = operand.as_scalar()?.as_f64()?;
    lhs.partial_cmp(&rhs)
}
