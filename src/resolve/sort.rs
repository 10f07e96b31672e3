//! Single-key stable ordering of entity slices

use super::entity::GraphEntity;
use crate::graph::PropertyValue;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ASC" => Some(SortDirection::Asc),
            "DESC" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Sort key: one field and a direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parse `{"field": ..., "direction": "ASC" | "DESC"}`.
    ///
    /// Returns `None` (no sorting) for an empty field or any other direction.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let map = value.as_object()?;
        let field = map.get("field")?.as_str()?;
        if field.is_empty() {
            return None;
        }
        let direction = SortDirection::parse(map.get("direction")?.as_str()?)?;
        Some(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// Rank of a value kind; values of different kinds order by rank ascending
/// in both directions
fn kind_rank(value: &PropertyValue) -> u8 {
    match value {
        PropertyValue::Integer(_) | PropertyValue::Float(_) => 0,
        PropertyValue::String(_) => 1,
        PropertyValue::Boolean(_) => 2,
    }
}

fn compare_same_kind(a: &PropertyValue, b: &PropertyValue) -> Ordering {
    match (a, b) {
        (PropertyValue::Integer(x), PropertyValue::Integer(y)) => x.cmp(y),
        (PropertyValue::String(x), PropertyValue::String(y)) => x.cmp(y),
        (PropertyValue::Boolean(x), PropertyValue::Boolean(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
    }
}

/// Compare two extracted sort keys.
///
/// Missing values come first regardless of direction, then kinds in rank
/// order; the direction only flips comparisons within one kind.
pub fn compare_sort_keys(
    a: Option<&PropertyValue>,
    b: Option<&PropertyValue>,
    direction: SortDirection,
) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => match kind_rank(x).cmp(&kind_rank(y)) {
            Ordering::Equal => direction.apply(compare_same_kind(x, y)),
            other => other,
        },
    }
}

/// Order `entities` by `order_by`.
///
/// Without a sort key the input is returned borrowed, untouched. Otherwise
/// a sorted copy is produced with a stable sort, so equal keys keep their
/// input order.
pub fn sort_entities<'a, T>(entities: &'a [T], order_by: Option<&OrderBy>) -> Cow<'a, [T]>
where
    T: GraphEntity + Clone,
{
    let order_by = match order_by {
        Some(order_by) if entities.len() > 1 => order_by,
        _ => return Cow::Borrowed(entities),
    };

    let mut keyed: Vec<(Option<Cow<'a, PropertyValue>>, &'a T)> = entities
        .iter()
        .map(|entity| (entity.field(&order_by.field), entity))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| compare_sort_keys(a.as_deref(), b.as_deref(), order_by.direction));

    Cow::Owned(keyed.into_iter().map(|(_, entity)| entity.clone()).collect())
}
