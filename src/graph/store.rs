//! Storage collaborator contract and an in-memory implementation
//!
//! The resolution engine never owns persistence. It talks to storage only
//! through [`GraphStorage`], which mirrors the operations a durable engine
//! exposes: id lookups, label scans, adjacency, and pass-through mutations.
//! [`GraphStore`] is a thread-safe in-memory implementation used by tests,
//! benchmarks and the demo binary.

use super::edge::{Edge, DEFAULT_EDGE_WEIGHT};
use super::node::Node;
use super::property::PropertyMap;
use super::types::{EdgeId, EdgeType, Label, NodeId};
use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),

    #[error("A node needs at least one label")]
    EmptyLabels,

    #[error("An edge needs a non-empty type")]
    EmptyEdgeType,
}

impl GraphError {
    /// True for single-entity lookup misses
    pub fn is_not_found(&self) -> bool {
        matches!(self, GraphError::NodeNotFound(_) | GraphError::EdgeNotFound(_))
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Operations consumed from the storage engine.
///
/// Implementations must be safe to call from several request tasks at once;
/// the batch loaders issue at most one call per accumulation window.
pub trait GraphStorage: Send + Sync {
    fn get_node(&self, id: NodeId) -> GraphResult<Node>;

    /// Nodes carrying `label`, in ascending id order
    fn find_nodes_by_label(&self, label: &Label) -> Vec<Node>;

    fn get_edge(&self, id: EdgeId) -> GraphResult<Edge>;

    /// Highest edge id ever allocated; ids run densely from 1
    fn edge_id_upper_bound(&self) -> u64;

    fn get_outgoing_edges(&self, node: NodeId) -> GraphResult<Vec<Edge>>;

    fn get_incoming_edges(&self, node: NodeId) -> GraphResult<Vec<Edge>>;

    fn all_labels(&self) -> Vec<Label>;

    fn create_node(&self, labels: Vec<Label>, properties: PropertyMap) -> GraphResult<Node>;

    /// Merge `properties` into the node's bag
    fn update_node(&self, id: NodeId, properties: PropertyMap) -> GraphResult<Node>;

    /// Delete the node and every edge touching it
    fn delete_node(&self, id: NodeId) -> GraphResult<()>;

    fn create_edge(
        &self,
        source: NodeId,
        target: NodeId,
        edge_type: EdgeType,
        properties: PropertyMap,
        weight: Option<f64>,
    ) -> GraphResult<Edge>;

    fn update_edge(
        &self,
        id: EdgeId,
        properties: Option<PropertyMap>,
        weight: Option<f64>,
    ) -> GraphResult<Edge>;

    fn delete_edge(&self, id: EdgeId) -> GraphResult<()>;
}

/// Enumerate every live edge by scanning ids `1..=upper_bound`.
///
/// Deleted ids are skipped; any other storage error aborts the scan.
/// Correct only while storage never recycles edge ids.
pub fn all_edges<S: GraphStorage + ?Sized>(storage: &S) -> GraphResult<Vec<Edge>> {
    let upper = storage.edge_id_upper_bound();
    let mut edges = Vec::new();
    for raw in 1..=upper {
        match storage.get_edge(EdgeId::new(raw)) {
            Ok(edge) => edges.push(edge),
            Err(e) if e.is_not_found() => continue,
            Err(e) => {
                warn!("Edge scan failed at id {}: {}", raw, e);
                return Err(e);
            }
        }
    }
    Ok(edges)
}

#[derive(Debug, Default)]
struct StoreInner {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    outgoing: HashMap<NodeId, Vec<EdgeId>>,
    incoming: HashMap<NodeId, Vec<EdgeId>>,
    label_index: HashMap<Label, BTreeSet<NodeId>>,
    last_node_id: u64,
    last_edge_id: u64,
}

impl StoreInner {
    fn edges_for(&self, ids: Option<&Vec<EdgeId>>) -> Vec<Edge> {
        ids.map(|ids| ids.iter().filter_map(|id| self.edges.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    fn unlink_edge(&mut self, edge: &Edge) {
        if let Some(adj) = self.outgoing.get_mut(&edge.source) {
            adj.retain(|&eid| eid != edge.id);
        }
        if let Some(adj) = self.incoming.get_mut(&edge.target) {
            adj.retain(|&eid| eid != edge.id);
        }
    }
}

/// In-memory graph storage
///
/// Hash maps for O(1) id lookups, adjacency lists per node, and a label
/// index kept in id order so label scans are deterministic. Ids are
/// allocated sequentially from 1 and never reused.
#[derive(Debug, Default)]
pub struct GraphStore {
    inner: RwLock<StoreInner>,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn node_count(&self) -> usize {
        self.read().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.read().edges.len()
    }
}

impl GraphStorage for GraphStore {
    fn get_node(&self, id: NodeId) -> GraphResult<Node> {
        self.read().nodes.get(&id).cloned().ok_or(GraphError::NodeNotFound(id))
    }

    fn find_nodes_by_label(&self, label: &Label) -> Vec<Node> {
        let inner = self.read();
        inner
            .label_index
            .get(label)
            .map(|ids| ids.iter().filter_map(|id| inner.nodes.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    fn get_edge(&self, id: EdgeId) -> GraphResult<Edge> {
        self.read().edges.get(&id).cloned().ok_or(GraphError::EdgeNotFound(id))
    }

    fn edge_id_upper_bound(&self) -> u64 {
        self.read().last_edge_id
    }

    fn get_outgoing_edges(&self, node: NodeId) -> GraphResult<Vec<Edge>> {
        let inner = self.read();
        if !inner.nodes.contains_key(&node) {
            return Err(GraphError::NodeNotFound(node));
        }
        Ok(inner.edges_for(inner.outgoing.get(&node)))
    }

    fn get_incoming_edges(&self, node: NodeId) -> GraphResult<Vec<Edge>> {
        let inner = self.read();
        if !inner.nodes.contains_key(&node) {
            return Err(GraphError::NodeNotFound(node));
        }
        Ok(inner.edges_for(inner.incoming.get(&node)))
    }

    fn all_labels(&self) -> Vec<Label> {
        let inner = self.read();
        let mut labels: Vec<Label> = inner
            .label_index
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(label, _)| label.clone())
            .collect();
        labels.sort();
        labels
    }

    fn create_node(&self, labels: Vec<Label>, properties: PropertyMap) -> GraphResult<Node> {
        if labels.is_empty() {
            return Err(GraphError::EmptyLabels);
        }

        let mut inner = self.write();
        inner.last_node_id += 1;
        let id = NodeId::new(inner.last_node_id);
        let node = Node::new(id, labels, properties);

        for label in &node.labels {
            inner.label_index.entry(label.clone()).or_default().insert(id);
        }
        inner.nodes.insert(id, node.clone());

        debug!("Created node {} with labels {:?}", id, node.labels);
        Ok(node)
    }

    fn update_node(&self, id: NodeId, properties: PropertyMap) -> GraphResult<Node> {
        let mut inner = self.write();
        let node = inner.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        node.merge_properties(properties);
        Ok(node.clone())
    }

    fn delete_node(&self, id: NodeId) -> GraphResult<()> {
        let mut inner = self.write();
        let node = inner.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;

        for label in &node.labels {
            if let Some(ids) = inner.label_index.get_mut(label) {
                ids.remove(&id);
            }
        }

        let mut incident: Vec<EdgeId> = inner.outgoing.remove(&id).unwrap_or_default();
        incident.extend(inner.incoming.remove(&id).unwrap_or_default());
        for edge_id in incident {
            if let Some(edge) = inner.edges.remove(&edge_id) {
                inner.unlink_edge(&edge);
            }
        }

        debug!("Deleted node {}", id);
        Ok(())
    }

    fn create_edge(
        &self,
        source: NodeId,
        target: NodeId,
        edge_type: EdgeType,
        properties: PropertyMap,
        weight: Option<f64>,
    ) -> GraphResult<Edge> {
        if edge_type.is_empty() {
            return Err(GraphError::EmptyEdgeType);
        }

        let mut inner = self.write();
        if !inner.nodes.contains_key(&source) {
            return Err(GraphError::InvalidEdgeSource(source));
        }
        if !inner.nodes.contains_key(&target) {
            return Err(GraphError::InvalidEdgeTarget(target));
        }

        inner.last_edge_id += 1;
        let id = EdgeId::new(inner.last_edge_id);
        let edge = Edge::new(id, source, target, edge_type)
            .with_weight(weight.unwrap_or(DEFAULT_EDGE_WEIGHT))
            .with_properties(properties);

        inner.outgoing.entry(source).or_default().push(id);
        inner.incoming.entry(target).or_default().push(id);
        inner.edges.insert(id, edge.clone());

        Ok(edge)
    }

    fn update_edge(
        &self,
        id: EdgeId,
        properties: Option<PropertyMap>,
        weight: Option<f64>,
    ) -> GraphResult<Edge> {
        let mut inner = self.write();
        let edge = inner.edges.get_mut(&id).ok_or(GraphError::EdgeNotFound(id))?;
        if let Some(properties) = properties {
            edge.properties.extend(properties);
        }
        if let Some(weight) = weight {
            edge.weight = weight;
        }
        Ok(edge.clone())
    }

    fn delete_edge(&self, id: EdgeId) -> GraphResult<()> {
        let mut inner = self.write();
        let edge = inner.edges.remove(&id).ok_or(GraphError::EdgeNotFound(id))?;
        inner.unlink_edge(&edge);
        Ok(())
    }
}
