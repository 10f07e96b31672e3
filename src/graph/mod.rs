//! Property graph data model and the storage contract
//!
//! This module implements:
//! - Nodes with multiple labels and a property bag
//! - Directed, typed, weighted edges with their own property bag
//! - Typed property values (string, integer, float, boolean)
//! - The `GraphStorage` trait the resolution engine reads through, and an
//!   in-memory `GraphStore` implementing it

pub mod edge;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

// Re-export main types
pub use edge::{Edge, DEFAULT_EDGE_WEIGHT};
pub use node::Node;
pub use property::{property_map_from_json, PropertyMap, PropertyValue};
pub use store::{all_edges, GraphError, GraphResult, GraphStorage, GraphStore};
pub use types::{EdgeId, EdgeType, Label, NodeId};
