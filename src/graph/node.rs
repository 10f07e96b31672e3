//! Node implementation for the property graph
//!
//! A node carries a non-empty set of labels and a property bag. Nodes are
//! created and mutated by storage; resolvers only ever see snapshots.

use super::property::{PropertyMap, PropertyValue};
use super::types::{Label, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A node in the property graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Storage-assigned identifier
    pub id: NodeId,

    /// Labels, kept sorted so snapshots serialize deterministically
    pub labels: BTreeSet<Label>,

    /// Properties associated with this node
    pub properties: PropertyMap,
}

impl Node {
    /// Create a node with the given labels and properties
    pub fn new(id: NodeId, labels: impl IntoIterator<Item = Label>, properties: PropertyMap) -> Self {
        Node {
            id,
            labels: labels.into_iter().collect(),
            properties,
        }
    }

    /// Create a node with a single label and no properties
    pub fn with_label(id: NodeId, label: impl Into<Label>) -> Self {
        Node::new(id, [label.into()], PropertyMap::new())
    }

    /// Check if node has a specific label
    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains(label)
    }

    /// Set a property value, returning the previous one
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Option<PropertyValue> {
        self.properties.insert(key.into(), value.into())
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Overlay `updates` onto the existing bag; untouched keys survive
    pub fn merge_properties(&mut self, updates: PropertyMap) {
        self.properties.extend(updates);
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
