//! count / min / max / avg / sum over the numeric fields of a slice

use super::entity::GraphEntity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregates keyed by field name; all statistics are `f64`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Number of matching entities, numeric or not
    pub count: usize,
    pub min: BTreeMap<String, f64>,
    pub max: BTreeMap<String, f64>,
    pub avg: BTreeMap<String, f64>,
    pub sum: BTreeMap<String, f64>,
}

/// Running state for one field
#[derive(Debug, Clone, Copy)]
struct FieldAccumulator {
    min: f64,
    max: f64,
    sum: f64,
    count: usize,
}

impl FieldAccumulator {
    fn new(value: f64) -> Self {
        Self {
            min: value,
            max: value,
            sum: value,
            count: 1,
        }
    }

    fn update(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.count += 1;
    }
}

/// Aggregate every numeric field seen on at least one entity.
///
/// A field present on only some entities is summed and averaged over those
/// entities only.
pub fn aggregate<T: GraphEntity>(entities: &[T]) -> AggregateResult {
    let mut fields: BTreeMap<String, FieldAccumulator> = BTreeMap::new();

    for entity in entities {
        for (name, value) in entity.numeric_fields() {
            match fields.get_mut(name) {
                Some(acc) => acc.update(value),
                None => {
                    fields.insert(name.to_string(), FieldAccumulator::new(value));
                }
            }
        }
    }

    let mut result = AggregateResult {
        count: entities.len(),
        ..AggregateResult::default()
    };

    for (name, acc) in fields {
        result.min.insert(name.clone(), acc.min);
        result.max.insert(name.clone(), acc.max);
        result.sum.insert(name.clone(), acc.sum);
        result.avg.insert(name, acc.sum / acc.count as f64);
    }

    result
}
