//! Query resolver facade
//!
//! Each list query runs the same pipeline over a candidate set fetched from
//! storage: filter -> sort -> page (offset or cursor). Aggregates run
//! filter -> aggregate. Relationship fields go through the loaders of a
//! per-request [`RequestContext`].

use super::aggregate::{aggregate, AggregateResult};
use super::args::QueryArgs;
use super::complexity::ComplexityGuard;
use super::context::RequestContext;
use super::depth::DepthGuard;
use super::entity::GraphEntity;
use super::filter::filter_entities;
use super::pagination::{paginate_cursor, paginate_offset, Connection, LimitConfig};
use super::selection::Document;
use super::sort::sort_entities;
use super::{ResolveError, ResolveResult};
use crate::config::{ConfigResult, ResolverConfig};
use crate::graph::{
    all_edges, property_map_from_json, Edge, EdgeId, EdgeType, GraphStorage, Label, Node, NodeId,
    PropertyMap,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Outcome of a delete mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub success: bool,
    pub id: String,
}

pub struct QueryResolver<S: GraphStorage + ?Sized> {
    storage: Arc<S>,
    config: ResolverConfig,
    depth_guard: DepthGuard,
    complexity_guard: ComplexityGuard,
    limits: Option<LimitConfig>,
}

impl<S: GraphStorage + ?Sized + 'static> QueryResolver<S> {
    /// Build a resolver; the configuration is validated first
    pub fn new(storage: Arc<S>, config: ResolverConfig) -> ConfigResult<Self> {
        config.validate()?;
        let depth_guard = DepthGuard::new(config.max_depth)?;
        let complexity_guard = ComplexityGuard::new(config.max_complexity, config.default_list_limit)?;
        let limits = config.limit_config();

        info!(
            "Query resolver ready (max_depth={}, batch_size={}, limits={:?})",
            config.max_depth, config.batch_size, limits
        );

        Ok(Self {
            storage,
            config,
            depth_guard,
            complexity_guard,
            limits,
        })
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Depth and complexity checks; nothing is resolved if either fails
    pub fn check_request(&self, document: &Document) -> ResolveResult<()> {
        let depth = self.depth_guard.check(document)?;
        let complexity = self.complexity_guard.check(document)?;
        debug!("Request accepted (depth={}, complexity={})", depth, complexity);
        Ok(())
    }

    /// Fresh loaders for one request
    pub fn new_request_context(&self) -> RequestContext {
        RequestContext::new(Arc::clone(&self.storage), self.config.loader_config())
    }

    /// Fresh loaders tied to the request's cancellation token
    pub fn new_request_context_with(&self, cancel: CancellationToken) -> RequestContext {
        RequestContext::with_cancellation(
            Arc::clone(&self.storage),
            self.config.loader_config(),
            cancel,
        )
    }

    // ---- nodes ----

    /// Labels with at least one live node, sorted; each backs a list root
    pub fn labels(&self) -> Vec<Label> {
        self.storage.all_labels()
    }

    /// Single node by id; `None` when it exists but lacks `label`
    pub fn node(&self, label: &Label, id: &str) -> ResolveResult<Option<Node>> {
        let id = parse_node_id(id)?;
        let node = self.storage.get_node(id)?;
        Ok(node.has_label(label).then_some(node))
    }

    /// Filtered, sorted, offset-paged nodes carrying `label`
    pub fn nodes(&self, label: &Label, args: &QueryArgs) -> Vec<Node> {
        let candidates = self.storage.find_nodes_by_label(label);
        debug!("Resolving {} list over {} candidates", label, candidates.len());
        self.offset_page(&candidates, args)
    }

    pub fn nodes_connection(&self, label: &Label, args: &QueryArgs) -> ResolveResult<Connection<Node>> {
        let candidates = self.storage.find_nodes_by_label(label);
        debug!("Resolving {} connection over {} candidates", label, candidates.len());
        self.cursor_page(&candidates, args)
    }

    pub fn nodes_aggregate(&self, label: &Label, args: &QueryArgs) -> AggregateResult {
        let candidates = self.storage.find_nodes_by_label(label);
        aggregate(&filter_entities(&candidates, args.filter.as_ref()))
    }

    // ---- edges ----

    pub fn edge(&self, id: &str) -> ResolveResult<Edge> {
        let id = parse_edge_id(id)?;
        Ok(self.storage.get_edge(id)?)
    }

    pub fn edges(&self, args: &QueryArgs) -> ResolveResult<Vec<Edge>> {
        let candidates = all_edges(self.storage.as_ref())?;
        debug!("Resolving edge list over {} candidates", candidates.len());
        Ok(self.offset_page(&candidates, args))
    }

    pub fn edges_connection(&self, args: &QueryArgs) -> ResolveResult<Connection<Edge>> {
        let candidates = all_edges(self.storage.as_ref())?;
        self.cursor_page(&candidates, args)
    }

    pub fn edges_aggregate(&self, args: &QueryArgs) -> ResolveResult<AggregateResult> {
        let candidates = all_edges(self.storage.as_ref())?;
        Ok(aggregate(&filter_entities(&candidates, args.filter.as_ref())))
    }

    // ---- relationships, through the request's loaders ----

    pub async fn load_node(&self, ctx: &RequestContext, id: NodeId) -> ResolveResult<Node> {
        Ok(ctx.nodes.load_cancellable(id, ctx.cancellation_token()).await?)
    }

    pub async fn outgoing_edges(&self, ctx: &RequestContext, node: NodeId) -> ResolveResult<Vec<Edge>> {
        Ok(ctx.outgoing.load_cancellable(node, ctx.cancellation_token()).await?)
    }

    pub async fn incoming_edges(&self, ctx: &RequestContext, node: NodeId) -> ResolveResult<Vec<Edge>> {
        Ok(ctx.incoming.load_cancellable(node, ctx.cancellation_token()).await?)
    }

    // ---- mutations ----

    /// `properties` is the JSON object text supplied by the client
    pub fn create_node(&self, labels: &[String], properties: &str) -> ResolveResult<Node> {
        let properties = parse_properties(properties)?;
        let labels = labels.iter().map(|l| Label::new(l.as_str())).collect();
        Ok(self.storage.create_node(labels, properties)?)
    }

    pub fn update_node(&self, id: &str, properties: &str) -> ResolveResult<Node> {
        let id = parse_node_id(id)?;
        let properties = parse_properties(properties)?;
        Ok(self.storage.update_node(id, properties)?)
    }

    pub fn delete_node(&self, id: &str) -> ResolveResult<DeleteResult> {
        self.storage.delete_node(parse_node_id(id)?)?;
        Ok(DeleteResult {
            success: true,
            id: id.to_string(),
        })
    }

    pub fn create_edge(
        &self,
        from: &str,
        to: &str,
        edge_type: &str,
        properties: Option<&str>,
        weight: Option<f64>,
    ) -> ResolveResult<Edge> {
        let source = parse_node_id(from)?;
        let target = parse_node_id(to)?;
        let properties = properties.map(parse_properties).transpose()?.unwrap_or_default();
        Ok(self
            .storage
            .create_edge(source, target, EdgeType::new(edge_type), properties, weight)?)
    }

    pub fn update_edge(&self, id: &str, properties: Option<&str>, weight: Option<f64>) -> ResolveResult<Edge> {
        let id = parse_edge_id(id)?;
        let properties = properties.map(parse_properties).transpose()?;
        Ok(self.storage.update_edge(id, properties, weight)?)
    }

    pub fn delete_edge(&self, id: &str) -> ResolveResult<DeleteResult> {
        self.storage.delete_edge(parse_edge_id(id)?)?;
        Ok(DeleteResult {
            success: true,
            id: id.to_string(),
        })
    }

    // ---- pipeline ----

    fn offset_page<T>(&self, candidates: &[T], args: &QueryArgs) -> Vec<T>
    where
        T: GraphEntity + Clone + Send + Sync,
    {
        let filtered = filter_entities(candidates, args.filter.as_ref());
        let sorted = sort_entities(&filtered, args.order_by.as_ref());
        // without configured limits a missing limit means unbounded
        let limit = match &self.limits {
            Some(limits) => i64::try_from(limits.apply_limit(args.limit)).unwrap_or(i64::MAX),
            None => args.limit.unwrap_or(-1),
        };
        paginate_offset(&sorted[..], args.offset.unwrap_or(0), limit).to_vec()
    }

    fn cursor_page<T>(&self, candidates: &[T], args: &QueryArgs) -> ResolveResult<Connection<T>>
    where
        T: GraphEntity + Clone + Send + Sync,
    {
        let filtered = filter_entities(candidates, args.filter.as_ref());
        let sorted = sort_entities(&filtered, args.order_by.as_ref());
        Ok(paginate_cursor(&sorted[..], &args.connection)?)
    }
}

fn parse_node_id(raw: &str) -> ResolveResult<NodeId> {
    raw.parse()
        .map_err(|_| ResolveError::InvalidArgument(format!("invalid node id '{}'", raw)))
}

fn parse_edge_id(raw: &str) -> ResolveResult<EdgeId> {
    raw.parse()
        .map_err(|_| ResolveError::InvalidArgument(format!("invalid edge id '{}'", raw)))
}

/// Shape a JSON object text into a property bag
fn parse_properties(text: &str) -> ResolveResult<PropertyMap> {
    let value: JsonValue = serde_json::from_str(text)
        .map_err(|e| ResolveError::InvalidArgument(format!("invalid properties JSON: {}", e)))?;
    match value {
        JsonValue::Object(map) => Ok(property_map_from_json(&map)),
        JsonValue::Null => Ok(PropertyMap::new()),
        other => Err(ResolveError::InvalidArgument(format!(
            "properties must be a JSON object, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphError, GraphStore, PropertyValue};
    use crate::resolve::filter::FilterExpression;
    use crate::resolve::pagination::ConnectionArgs;
    use crate::resolve::sort::OrderBy;
    use serde_json::json;

    fn resolver_with(config: ResolverConfig) -> QueryResolver<GraphStore> {
        let store = Arc::new(GraphStore::new());
        for (name, age) in [("Alice", 30), ("Bob", 25), ("Carol", 35), ("Dave", 40)] {
            let mut props = PropertyMap::new();
            props.insert("name".to_string(), name.into());
            props.insert("age".to_string(), PropertyValue::Integer(age));
            store.create_node(vec![Label::new("Person")], props).unwrap();
        }
        store
            .create_node(vec![Label::new("Company")], PropertyMap::new())
            .unwrap();
        QueryResolver::new(store, config).unwrap()
    }

    fn resolver() -> QueryResolver<GraphStore> {
        resolver_with(ResolverConfig::default())
    }

    fn names(nodes: &[Node]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| n.get_property("name").unwrap().as_string().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let store = Arc::new(GraphStore::new());
        let config = ResolverConfig {
            max_depth: 0,
            ..Default::default()
        };
        assert!(QueryResolver::new(store, config).is_err());
    }

    #[test]
    fn test_node_by_id_and_label() {
        let resolver = resolver();
        let person = Label::new("Person");

        assert!(resolver.node(&person, "1").unwrap().is_some());
        assert!(resolver.node(&person, "5").unwrap().is_none());

        let err = resolver.node(&person, "42").unwrap_err();
        assert_eq!(err, ResolveError::Graph(GraphError::NodeNotFound(NodeId::new(42))));
        assert!(err.is_not_found());
        assert!(matches!(
            resolver.node(&person, "abc"),
            Err(ResolveError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_labels_track_live_nodes() {
        let resolver = resolver();
        assert_eq!(resolver.labels(), vec![Label::new("Company"), Label::new("Person")]);

        resolver.delete_node("5").unwrap();
        assert_eq!(resolver.labels(), vec![Label::new("Person")]);
    }

    #[test]
    fn test_nodes_pipeline() {
        let resolver = resolver();
        let args = QueryArgs::new()
            .with_filter(FilterExpression::from_json(&json!({"age": {"gte": 30}})))
            .with_order_by(OrderBy::desc("age"))
            .with_limit(2);

        let nodes = resolver.nodes(&Label::new("Person"), &args);
        assert_eq!(names(&nodes), vec!["Dave", "Carol"]);

        let args = args.with_offset(2);
        assert_eq!(names(&resolver.nodes(&Label::new("Person"), &args)), vec!["Alice"]);
    }

    #[test]
    fn test_lists_unbounded_without_configured_limits() {
        let store = Arc::new(GraphStore::new());
        for i in 0..150i64 {
            let mut props = PropertyMap::new();
            props.insert("n".to_string(), PropertyValue::Integer(i));
            store.create_node(vec![Label::new("Person")], props).unwrap();
        }
        let resolver = QueryResolver::new(store, ResolverConfig::default()).unwrap();
        let person = Label::new("Person");

        assert_eq!(resolver.nodes(&person, &QueryArgs::new()).len(), 150);
        assert_eq!(resolver.nodes(&person, &QueryArgs::new().with_limit(-1)).len(), 150);
        assert_eq!(resolver.nodes(&person, &QueryArgs::new().with_limit(120)).len(), 120);
        assert!(resolver.nodes(&person, &QueryArgs::new().with_limit(0)).is_empty());
    }

    #[test]
    fn test_configured_limits_apply_to_lists() {
        let resolver = resolver_with(ResolverConfig {
            limits: Some(LimitConfig::new(2, 3)),
            ..Default::default()
        });
        let person = Label::new("Person");

        assert_eq!(resolver.nodes(&person, &QueryArgs::new()).len(), 2);
        assert_eq!(resolver.nodes(&person, &QueryArgs::new().with_limit(10)).len(), 3);
        assert!(resolver.nodes(&person, &QueryArgs::new().with_limit(0)).is_empty());
    }

    #[test]
    fn test_nodes_connection_and_bad_cursor() {
        let resolver = resolver();
        let person = Label::new("Person");
        let args = QueryArgs::new()
            .with_order_by(OrderBy::asc("age"))
            .with_connection(ConnectionArgs::first(2));

        let conn = resolver.nodes_connection(&person, &args).unwrap();
        assert_eq!(names(&conn.nodes().cloned().collect::<Vec<_>>()), vec!["Bob", "Alice"]);
        assert!(conn.page_info.has_next_page);

        let bad = QueryArgs::new().with_connection(ConnectionArgs::first(2).after("%%%"));
        assert!(matches!(
            resolver.nodes_connection(&person, &bad),
            Err(ResolveError::InvalidCursor(_))
        ));
    }

    #[test]
    fn test_nodes_aggregate() {
        let resolver = resolver();
        let args = QueryArgs::from_json(&json!({"where": {"age": {"lt": 40}}}));
        let result = resolver.nodes_aggregate(&Label::new("Person"), &args);
        assert_eq!(result.count, 3);
        assert_eq!(result.sum["age"], 90.0);
        assert_eq!(result.avg["age"], 30.0);
    }

    #[test]
    fn test_edge_queries() {
        let resolver = resolver();
        resolver.create_edge("1", "2", "KNOWS", None, Some(0.5)).unwrap();
        resolver.create_edge("2", "3", "KNOWS", Some(r#"{"since": 2020}"#), None).unwrap();
        resolver.create_edge("3", "4", "KNOWS", None, Some(3.0)).unwrap();
        resolver.delete_edge("2").unwrap();

        let edges = resolver
            .edges(&QueryArgs::new().with_order_by(OrderBy::desc("weight")))
            .unwrap();
        let weights: Vec<f64> = edges.iter().map(|e| e.weight).collect();
        assert_eq!(weights, vec![3.0, 0.5]);

        let conn = resolver.edges_connection(&QueryArgs::new()).unwrap();
        assert_eq!(conn.len(), 2);

        let agg = resolver.edges_aggregate(&QueryArgs::new()).unwrap();
        assert_eq!(agg.sum["weight"], 3.5);

        assert!(resolver.edge("2").unwrap_err().is_not_found());
        assert_eq!(resolver.edge("3").unwrap().weight, 3.0);
    }

    #[test]
    fn test_node_mutations_shape_properties() {
        let resolver = resolver();
        let node = resolver
            .create_node(&["City".to_string()], r#"{"name": "Oslo", "population": 700000.0, "tags": ["a"]}"#)
            .unwrap();
        assert_eq!(node.get_property("population"), Some(&PropertyValue::Integer(700000)));
        assert_eq!(node.get_property("tags").unwrap().as_string(), Some("[\"a\"]"));

        let id = node.id.to_string();
        let updated = resolver.update_node(&id, r#"{"population": 710000}"#).unwrap();
        assert_eq!(updated.get_property("name").unwrap().as_string(), Some("Oslo"));
        assert_eq!(updated.get_property("population").unwrap().as_integer(), Some(710000));

        assert!(matches!(
            resolver.update_node(&id, "not json"),
            Err(ResolveError::InvalidArgument(_))
        ));
        assert!(matches!(
            resolver.update_node(&id, "[1]"),
            Err(ResolveError::InvalidArgument(_))
        ));

        let deleted = resolver.delete_node(&id).unwrap();
        assert!(deleted.success);
        assert!(resolver.delete_node(&id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_edge_weight() {
        let resolver = resolver();
        let edge = resolver.create_edge("1", "2", "KNOWS", None, None).unwrap();
        let updated = resolver
            .update_edge(&edge.id.to_string(), Some(r#"{"since": 1999}"#), Some(9.0))
            .unwrap();
        assert_eq!(updated.weight, 9.0);
        assert_eq!(updated.get_property("since").unwrap().as_integer(), Some(1999));
    }

    #[tokio::test(start_paused = true)]
    async fn test_relationship_loading_through_context() {
        let resolver = resolver();
        resolver.create_edge("1", "2", "KNOWS", None, None).unwrap();
        resolver.create_edge("1", "3", "KNOWS", None, None).unwrap();

        let ctx = resolver.new_request_context();
        let (out, inc) = tokio::join!(
            resolver.outgoing_edges(&ctx, NodeId::new(1)),
            resolver.incoming_edges(&ctx, NodeId::new(2))
        );
        assert_eq!(out.unwrap().len(), 2);
        assert_eq!(inc.unwrap().len(), 1);
        assert_eq!(
            resolver.load_node(&ctx, NodeId::new(3)).await.unwrap().id,
            NodeId::new(3)
        );
        assert!(resolver
            .load_node(&ctx, NodeId::new(77))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_request_context() {
        let resolver = resolver();
        let cancel = CancellationToken::new();
        let ctx = resolver.new_request_context_with(cancel.clone());
        cancel.cancel();

        let err = resolver.outgoing_edges(&ctx, NodeId::new(1)).await.unwrap_err();
        assert_eq!(err, ResolveError::Load(crate::resolve::LoadError::Cancelled));
    }
}
