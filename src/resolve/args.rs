//! Argument bag for list and connection queries

use super::filter::FilterExpression;
use super::pagination::ConnectionArgs;
use super::sort::OrderBy;
use serde_json::Value as JsonValue;

/// Parsed `where` / `orderBy` / offset / cursor arguments.
///
/// Missing or ill-typed arguments are treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryArgs {
    pub filter: Option<FilterExpression>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub connection: ConnectionArgs,
}

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the argument object the execution layer resolved for a field
    pub fn from_json(args: &JsonValue) -> Self {
        let Some(map) = args.as_object() else {
            return Self::default();
        };

        let int = |key: &str| map.get(key).and_then(JsonValue::as_i64);
        let string = |key: &str| map.get(key).and_then(JsonValue::as_str).map(str::to_string);

        Self {
            filter: map.get("where").map(FilterExpression::from_json),
            order_by: map.get("orderBy").and_then(OrderBy::from_json),
            limit: int("limit"),
            offset: int("offset"),
            connection: ConnectionArgs {
                first: int("first"),
                after: string("after"),
                last: int("last"),
                before: string("before"),
            },
        }
    }

    pub fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_connection(mut self, connection: ConnectionArgs) -> Self {
        self.connection = connection;
        self
    }
}
