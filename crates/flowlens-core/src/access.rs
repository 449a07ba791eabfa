//! External capability traits
//!
//! flowlens consumes, and never owns, two capabilities: a query-execution
//! facility that can explain and run SQL, and a data-access facility that
//! counts and fetches rows from named collections. Both are treated as
//! potentially slow and potentially failing; flowlens never retries them.

use crate::{Record, Result, SortOrder, Value};
use async_trait::async_trait;

/// Plan-explain and raw execution capability of the SQL engine
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Retrieve the execution plan for a query, as the engine's raw
    /// EXPLAIN output (JSON plan tree)
    async fn explain(&self, query: &str, params: &[Value]) -> Result<serde_json::Value>;

    /// Execute a query and return its rows
    async fn execute(&self, query: &str, params: &[Value]) -> Result<Vec<Record>>;
}

/// Keyset position within an ordered listing
///
/// Produced by decoding a pagination cursor; the data-access implementation
/// applies it as a `(sort value, id)` comparison against the listing order.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorBoundary {
    /// Id of the last row already seen
    pub id: String,
    /// Sort field the listing is ordered by
    pub field: String,
    /// The last seen row's value for the sort field
    pub value: Value,
}

/// Row-fetch specification for [`DataAccess::find_many`]
#[derive(Debug, Clone, Default)]
pub struct FindSpec {
    /// Opaque filter, passed through to the data-access layer
    pub filter: Option<serde_json::Value>,
    /// Relations to include, passed through to the data-access layer
    pub include: Vec<String>,
    /// Rows to skip (offset pagination)
    pub skip: u64,
    /// Rows to return
    pub take: u32,
    /// Ordering, applied in sequence
    pub order_by: Vec<(String, SortOrder)>,
    /// Keyset continuation point (cursor pagination)
    pub after: Option<CursorBoundary>,
}

impl FindSpec {
    /// Create an empty spec
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the filter
    pub fn with_filter(mut self, filter: Option<serde_json::Value>) -> Self {
        self.filter = filter;
        self
    }

    /// Builder method: set included relations
    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }

    /// Builder method: set the offset
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Builder method: set the row count
    pub fn with_take(mut self, take: u32) -> Self {
        self.take = take;
        self
    }

    /// Builder method: append an ordering column
    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.push((field.into(), order));
        self
    }

    /// Builder method: set the keyset continuation point
    pub fn with_after(mut self, after: Option<CursorBoundary>) -> Self {
        self.after = after;
        self
    }
}

/// Count/fetch capability over named collections
#[async_trait]
pub trait DataAccess: Send + Sync {
    /// Count rows matching the filter
    async fn count(&self, collection: &str, filter: Option<&serde_json::Value>) -> Result<u64>;

    /// Fetch rows according to the spec
    async fn find_many(&self, collection: &str, spec: FindSpec) -> Result<Vec<Record>>;
}
