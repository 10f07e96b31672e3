//! Edge implementation for the property graph
//!
//! Edges are directed, typed and weighted. The weight is a scalar that
//! lives beside the property bag, not inside it.

use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, NodeId};
use serde::{Deserialize, Serialize};

/// Weight assigned when a caller does not supply one
pub const DEFAULT_EDGE_WEIGHT: f64 = 1.0;

/// A directed edge in the property graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge
    pub id: EdgeId,

    /// Source node (edge goes FROM this node)
    #[serde(rename = "fromNodeId")]
    pub source: NodeId,

    /// Target node (edge goes TO this node)
    #[serde(rename = "toNodeId")]
    pub target: NodeId,

    /// Type of relationship (e.g., "KNOWS", "WORKS_AT")
    #[serde(rename = "type")]
    pub edge_type: EdgeType,

    /// Scalar weight
    pub weight: f64,

    /// Properties associated with this edge
    pub properties: PropertyMap,
}

impl Edge {
    /// Create an edge with the default weight and no properties
    pub fn new(id: EdgeId, source: NodeId, target: NodeId, edge_type: impl Into<EdgeType>) -> Self {
        Edge {
            id,
            source,
            target,
            edge_type: edge_type.into(),
            weight: DEFAULT_EDGE_WEIGHT,
            properties: PropertyMap::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_properties(mut self, properties: PropertyMap) -> Self {
        self.properties = properties;
        self
    }

    /// Set a property value
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Check if this edge goes FROM a specific node
    pub fn starts_from(&self, node: NodeId) -> bool {
        self.source == node
    }

    /// Check if this edge goes TO a specific node
    pub fn ends_at(&self, node: NodeId) -> bool {
        self.target == node
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.starts_from(node) || self.ends_at(node)
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

impl std::hash::Hash for Edge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
