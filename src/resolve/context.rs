//! Storage-backed batch functions and the per-request loader bundle

use super::loader::{BatchFn, BatchLoader, LoadError, LoadResult, LoaderConfig};
use crate::graph::{Edge, GraphError, GraphStorage, Node, NodeId};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

impl From<GraphError> for LoadError {
    fn from(err: GraphError) -> Self {
        if err.is_not_found() {
            LoadError::NotFound(err.to_string())
        } else {
            LoadError::Failed(err.to_string())
        }
    }
}

/// Nodes by id
pub struct NodeBatchFn<S: ?Sized> {
    storage: Arc<S>,
}

impl<S: ?Sized> NodeBatchFn<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<S: GraphStorage + ?Sized + 'static> BatchFn<NodeId, Node> for NodeBatchFn<S> {
    async fn load_batch(&self, keys: &[NodeId]) -> Vec<LoadResult<Node>> {
        keys.iter()
            .map(|id| self.storage.get_node(*id).map_err(LoadError::from))
            .collect()
    }
}

/// Outgoing edges by source node id
pub struct OutgoingEdgesBatchFn<S: ?Sized> {
    storage: Arc<S>,
}

impl<S: ?Sized> OutgoingEdgesBatchFn<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<S: GraphStorage + ?Sized + 'static> BatchFn<NodeId, Vec<Edge>> for OutgoingEdgesBatchFn<S> {
    async fn load_batch(&self, keys: &[NodeId]) -> Vec<LoadResult<Vec<Edge>>> {
        keys.iter()
            .map(|id| self.storage.get_outgoing_edges(*id).map_err(LoadError::from))
            .collect()
    }
}

/// Incoming edges by target node id
pub struct IncomingEdgesBatchFn<S: ?Sized> {
    storage: Arc<S>,
}

impl<S: ?Sized> IncomingEdgesBatchFn<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<S: GraphStorage + ?Sized + 'static> BatchFn<NodeId, Vec<Edge>> for IncomingEdgesBatchFn<S> {
    async fn load_batch(&self, keys: &[NodeId]) -> Vec<LoadResult<Vec<Edge>>> {
        keys.iter()
            .map(|id| self.storage.get_incoming_edges(*id).map_err(LoadError::from))
            .collect()
    }
}

/// Loaders and cancellation scope for one request.
///
/// Build a fresh context per request; the loaders cache for their whole
/// lifetime.
#[derive(Clone)]
pub struct RequestContext {
    pub nodes: BatchLoader<NodeId, Node>,
    pub outgoing: BatchLoader<NodeId, Vec<Edge>>,
    pub incoming: BatchLoader<NodeId, Vec<Edge>>,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new<S: GraphStorage + ?Sized + 'static>(storage: Arc<S>, config: LoaderConfig) -> Self {
        Self::with_cancellation(storage, config, CancellationToken::new())
    }

    /// Tie the loaders to an existing cancellation token, typically the
    /// one governing the whole request
    pub fn with_cancellation<S: GraphStorage + ?Sized + 'static>(
        storage: Arc<S>,
        config: LoaderConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            nodes: BatchLoader::new(Arc::new(NodeBatchFn::new(Arc::clone(&storage))), config),
            outgoing: BatchLoader::new(
                Arc::new(OutgoingEdgesBatchFn::new(Arc::clone(&storage))),
                config,
            ),
            incoming: BatchLoader::new(Arc::new(IncomingEdgesBatchFn::new(storage)), config),
            cancel,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel the request; waiting loads return `LoadError::Cancelled`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drop every cached entry, e.g. after a mutation in the same request
    pub fn clear_all(&self) {
        self.nodes.clear_all();
        self.outgoing.clear_all();
        self.incoming.clear_all();
    }
}
