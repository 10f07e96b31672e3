//! Request resolution engine
//!
//! Sits between a query-protocol execution layer and graph storage:
//! - `filter`: parse a `where` argument once, evaluate it per entity
//! - `sort`: stable single-key ordering
//! - `pagination`: offset slicing and cursor connections
//! - `aggregate`: count/min/max/avg/sum over numeric fields
//! - `loader`: per-request batching and caching of storage lookups
//! - `depth` / `complexity`: structural guards run before resolution
//! - `resolver`: the label/edge query facade tying these together
//!
//! Pure stages never fail on bad data. Hard failures are reserved for
//! malformed cursors, over-deep or over-complex requests, cancellation and
//! storage errors on single-entity lookups.

pub mod aggregate;
pub mod args;
pub mod complexity;
pub mod context;
pub mod depth;
pub mod entity;
pub mod filter;
pub mod loader;
pub mod pagination;
pub mod resolver;
pub mod selection;
pub mod sort;

pub use aggregate::{aggregate, AggregateResult};
pub use args::QueryArgs;
pub use complexity::ComplexityGuard;
pub use context::{IncomingEdgesBatchFn, NodeBatchFn, OutgoingEdgesBatchFn, RequestContext};
pub use depth::DepthGuard;
pub use entity::{GraphEntity, WEIGHT_FIELD};
pub use filter::{
    evaluate, filter_entities, FilterCondition, FilterExpression, FilterOp, Operand,
    PARALLEL_FILTER_THRESHOLD,
};
pub use loader::{
    BatchFn, BatchLoader, LoadError, LoadResult, LoaderConfig, LoaderPhase, LoaderStats,
};
pub use pagination::{
    decode_cursor, encode_cursor, paginate_cursor, paginate_offset, Connection, ConnectionArgs,
    ConnectionEdge, CursorError, LimitConfig, PageInfo,
};
pub use resolver::{DeleteResult, QueryResolver};
pub use selection::{Document, Field, Selection, SelectionSet};
pub use sort::{sort_entities, OrderBy, SortDirection};

use crate::graph::GraphError;
use thiserror::Error;

/// Request-level failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),

    #[error("query depth {depth} exceeds maximum allowed depth {max}")]
    DepthExceeded { depth: usize, max: usize },

    #[error("query complexity {complexity} exceeds maximum allowed complexity {max}")]
    ComplexityExceeded { complexity: usize, max: usize },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ResolveError {
    /// True for single-entity lookup misses, as opposed to failures
    pub fn is_not_found(&self) -> bool {
        match self {
            ResolveError::Graph(err) => err.is_not_found(),
            ResolveError::Load(LoadError::NotFound(_)) => true,
            _ => false,
        }
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;
