//! Uniform field access over nodes and edges
//!
//! The filter, sort and aggregation engines work on anything implementing
//! [`GraphEntity`]. Edges expose their scalar `weight` as a synthetic field
//! that shadows any property of the same name.

use crate::graph::{Edge, Node, PropertyValue};
use std::borrow::Cow;
use std::sync::Arc;

/// Name of the synthetic edge field bound to `Edge::weight`
pub const WEIGHT_FIELD: &str = "weight";

pub trait GraphEntity {
    /// Value of a named field, or `None` when the entity lacks it
    fn field(&self, name: &str) -> Option<Cow<'_, PropertyValue>>;

    /// Every numeric field on the entity, widened to `f64`
    fn numeric_fields(&self) -> Vec<(&str, f64)>;
}

impl GraphEntity for Node {
    fn field(&self, name: &str) -> Option<Cow<'_, PropertyValue>> {
        self.properties.get(name).map(Cow::Borrowed)
    }

    fn numeric_fields(&self) -> Vec<(&str, f64)> {
        self.properties
            .iter()
            .filter_map(|(key, value)| value.as_f64().map(|v| (key.as_str(), v)))
            .collect()
    }
}

impl GraphEntity for Edge {
    fn field(&self, name: &str) -> Option<Cow<'_, PropertyValue>> {
        if name == WEIGHT_FIELD {
            return Some(Cow::Owned(PropertyValue::Float(self.weight)));
        }
        self.properties.get(name).map(Cow::Borrowed)
    }

    fn numeric_fields(&self) -> Vec<(&str, f64)> {
        let mut fields = Vec::with_capacity(self.properties.len() + 1);
        fields.push((WEIGHT_FIELD, self.weight));
        fields.extend(
            self.properties
                .iter()
                .filter(|(key, _)| key.as_str() != WEIGHT_FIELD)
                .filter_map(|(key, value)| value.as_f64().map(|v| (key.as_str(), v))),
        );
        fields
    }
}

impl<T: GraphEntity + ?Sized> GraphEntity for &T {
    fn field(&self, name: &str) -> Option<Cow<'_, PropertyValue>> {
        (**self).field(name)
    }

    fn numeric_fields(&self) -> Vec<(&str, f64)> {
        (**self).numeric_fields()
    }
}

impl<T: GraphEntity + ?Sized> GraphEntity for Arc<T> {
    fn field(&self, name: &str) -> Option<Cow<'_, PropertyValue>> {
        (**self).field(name)
    }

    fn numeric_fields(&self) -> Vec<(&str, f64)> {
        (**self).numeric_fields()
    }
}
