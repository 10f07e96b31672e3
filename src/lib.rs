//! Samyama Resolver
//!
//! The request-resolution engine that sits between a declarative query
//! layer and property-graph storage. Given a candidate set of nodes or
//! edges it filters, orders, pages (by offset or by opaque cursor) and
//! aggregates them, and it collapses the per-entity relationship lookups of
//! a request into batched storage calls.
//!
//! # Components
//!
//! - `graph`: property graph model and the `GraphStorage` contract, with an
//!   in-memory `GraphStore`
//! - `resolve::filter`: `where` expressions (AND / OR / NOT, eq, gt, lt,
//!   gte, lte, contains, in)
//! - `resolve::sort`: stable single-key ordering
//! - `resolve::pagination`: offset/limit slicing and cursor connections
//! - `resolve::aggregate`: count, min, max, avg, sum
//! - `resolve::loader`: per-request batching and caching
//! - `resolve::depth` / `resolve::complexity`: pre-execution guards
//! - `config`: resolver settings, loadable from YAML
//!
//! ## Example Usage
//!
//! ```rust
//! use samyama_resolver::graph::{GraphStorage, GraphStore, Label, PropertyMap, PropertyValue};
//! use samyama_resolver::{QueryArgs, QueryResolver, ResolverConfig};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let store = Arc::new(GraphStore::new());
//! for score in [10i64, 20, 30] {
//!     let mut props = PropertyMap::new();
//!     props.insert("score".to_string(), PropertyValue::Integer(score));
//!     store.create_node(vec![Label::new("Person")], props).unwrap();
//! }
//!
//! let resolver = QueryResolver::new(store, ResolverConfig::default()).unwrap();
//! let args = QueryArgs::from_json(&json!({
//!     "where": {"score": {"gte": 20}},
//!     "orderBy": {"field": "score", "direction": "DESC"},
//!     "first": 1
//! }));
//!
//! let page = resolver.nodes_connection(&Label::new("Person"), &args).unwrap();
//! assert_eq!(page.edges.len(), 1);
//! assert!(page.page_info.has_next_page);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod graph;
pub mod resolve;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigResult, ResolverConfig};

pub use graph::{
    Edge, EdgeId, EdgeType, GraphError, GraphResult, GraphStorage, GraphStore, Label, Node,
    NodeId, PropertyMap, PropertyValue,
};

pub use resolve::{
    aggregate, decode_cursor, encode_cursor, evaluate, filter_entities, paginate_cursor,
    paginate_offset, sort_entities, AggregateResult, BatchFn, BatchLoader, ComplexityGuard,
    Connection, ConnectionArgs, CursorError, DepthGuard, Document, FilterExpression, LimitConfig,
    LoadError, LoaderConfig, OrderBy, PageInfo, QueryArgs, QueryResolver, RequestContext,
    ResolveError, ResolveResult, SortDirection,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.1.0");
    }
}
