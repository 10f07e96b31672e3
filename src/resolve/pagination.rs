//! Offset and cursor pagination over an already filtered and sorted sequence
//!
//! Cursors are opaque tokens encoding a zero-based position in the sequence
//! as it looked when the page was computed. They are not storage keys: if
//! the underlying data changes between requests a cursor may point
//! somewhere else.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CURSOR_PREFIX: &str = "cursor:";

/// A cursor token that could not be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("invalid cursor encoding: {0}")]
    Encoding(String),

    #[error("invalid cursor format: {0}")]
    Format(String),
}

pub type CursorResult<T> = Result<T, CursorError>;

/// Encode a sequence position as an opaque cursor
pub fn encode_cursor(index: usize) -> String {
    STANDARD.encode(format!("{}{}", CURSOR_PREFIX, index))
}

/// Decode a cursor produced by [`encode_cursor`]
pub fn decode_cursor(cursor: &str) -> CursorResult<usize> {
    let bytes = STANDARD
        .decode(cursor)
        .map_err(|e| CursorError::Encoding(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|e| CursorError::Encoding(e.to_string()))?;
    let position = text
        .strip_prefix(CURSOR_PREFIX)
        .ok_or_else(|| CursorError::Format(format!("missing '{}' prefix", CURSOR_PREFIX)))?;
    position
        .parse::<usize>()
        .map_err(|e| CursorError::Format(format!("{}: {}", position, e)))
}

/// Offset/limit slicing.
///
/// A non-positive offset is ignored, a negative limit is unbounded and a
/// zero limit yields an empty page.
pub fn paginate_offset<T>(seq: &[T], offset: i64, limit: i64) -> &[T] {
    let start = if offset <= 0 {
        0
    } else {
        usize::try_from(offset).unwrap_or(usize::MAX).min(seq.len())
    };
    let remaining = &seq[start..];

    if limit < 0 {
        return remaining;
    }
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    &remaining[..limit.min(remaining.len())]
}

/// Default and ceiling for list result sizes, when a deployment opts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 1000,
        }
    }
}

impl LimitConfig {
    pub fn new(default_limit: usize, max_limit: usize) -> Self {
        Self {
            default_limit,
            max_limit,
        }
    }

    /// Effective limit for a request: absent or negative uses the default,
    /// zero stays zero, anything else is capped at the maximum
    pub fn apply_limit(&self, requested: Option<i64>) -> usize {
        match requested {
            None => self.default_limit,
            Some(limit) if limit < 0 => self.default_limit,
            Some(0) => 0,
            Some(limit) => usize::try_from(limit)
                .unwrap_or(usize::MAX)
                .min(self.max_limit),
        }
    }
}

/// Relay-style window arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionArgs {
    pub first: Option<i64>,
    pub after: Option<String>,
    pub last: Option<i64>,
    pub before: Option<String>,
}

impl ConnectionArgs {
    pub fn first(n: i64) -> Self {
        Self {
            first: Some(n),
            ..Self::default()
        }
    }

    pub fn last(n: i64) -> Self {
        Self {
            last: Some(n),
            ..Self::default()
        }
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEdge<T> {
    pub cursor: String,
    pub node: T,
}

/// One page of a cursor-paginated sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<ConnectionEdge<T>>,
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|edge| &edge.node)
    }
}

/// Cut a cursor window out of `seq`.
///
/// `after`/`before` bound the window, then `first` keeps its front and
/// `last` keeps its back. Page info is computed even for an empty window.
pub fn paginate_cursor<T: Clone>(seq: &[T], args: &ConnectionArgs) -> CursorResult<Connection<T>> {
    let total = seq.len();

    let mut start = match &args.after {
        Some(cursor) => decode_cursor(cursor)?.saturating_add(1),
        None => 0,
    };
    let mut end = match &args.before {
        Some(cursor) => decode_cursor(cursor)?,
        None => total,
    };

    start = start.min(total);
    end = end.min(total);
    if start > end {
        start = end;
    }

    let mut window = &seq[start..end];

    if let Some(first) = args.first {
        let first = usize::try_from(first.max(0)).unwrap_or(usize::MAX);
        window = &window[..first.min(window.len())];
    }

    if let Some(last) = args.last {
        let last = usize::try_from(last.max(0)).unwrap_or(usize::MAX);
        let before_trim = window.len();
        window = &window[before_trim - last.min(before_trim)..];
        // dropped elements came off the front
        start += before_trim - window.len();
    }

    let edges: Vec<ConnectionEdge<T>> = window
        .iter()
        .enumerate()
        .map(|(i, node)| ConnectionEdge {
            cursor: encode_cursor(start + i),
            node: node.clone(),
        })
        .collect();

    let page_info = PageInfo {
        has_next_page: start + window.len() < total,
        has_previous_page: start > 0,
        start_cursor: (!window.is_empty()).then(|| encode_cursor(start)),
        end_cursor: (!window.is_empty()).then(|| encode_cursor(start + window.len() - 1)),
    };

    Ok(Connection { edges, page_info })
}
