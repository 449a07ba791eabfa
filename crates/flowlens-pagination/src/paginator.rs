//! Pagination Orchestrator
//!
//! One interface over three listing modes: offset (page numbers, true
//! totals), cursor (keyset continuation, no counts), and hybrid (either a
//! page number or a cursor per request). All parameter validation happens
//! before any I/O; data-access failures propagate to the caller unmodified.

use crate::cursor::{CursorPayload, decode_cursor, encode_cursor};
use flowlens_core::{DataAccess, FindSpec, FlowlensError, Record, Result, SortOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Smallest accepted page size
pub const MIN_LIMIT: u32 = 1;
/// Largest accepted page size
pub const MAX_LIMIT: u32 = 100;
/// Page size used when options are built via `Default`
pub const DEFAULT_LIMIT: u32 = 20;

/// Options for offset pagination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageOptions {
    /// 1-based page number
    pub page: u32,
    /// Rows per page (1-100)
    pub limit: u32,
    /// Sort field; must be in the paginator's allow-list
    pub sort_by: String,
    /// Sort direction
    pub sort_order: SortOrder,
    /// Opaque filter, passed through to the data-access layer
    pub filter: Option<serde_json::Value>,
    /// Relations to include, passed through to the data-access layer
    pub include: Vec<String>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self::new(1, DEFAULT_LIMIT)
    }
}

impl PageOptions {
    /// Creates options for the given page, sorted by id ascending
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            sort_by: "id".to_string(),
            sort_order: SortOrder::Asc,
            filter: None,
            include: Vec::new(),
        }
    }

    /// Builder method: set the sort field and direction
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = field.into();
        self.sort_order = order;
        self
    }

    /// Builder method: set the filter
    pub fn with_filter(mut self, filter: serde_json::Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Builder method: set included relations
    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }
}

/// Options for cursor pagination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorOptions {
    /// Continuation cursor from a previous page, if any
    pub cursor: Option<String>,
    /// Rows per page (1-100)
    pub limit: u32,
    /// Sort field; must be in the paginator's allow-list
    pub sort_by: String,
    /// Sort direction
    pub sort_order: SortOrder,
    /// Opaque filter, passed through to the data-access layer
    pub filter: Option<serde_json::Value>,
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

impl CursorOptions {
    /// Creates options for the first page, sorted by id ascending
    pub fn new(limit: u32) -> Self {
        Self {
            cursor: None,
            limit,
            sort_by: "id".to_string(),
            sort_order: SortOrder::Asc,
            filter: None,
        }
    }

    /// Builder method: set the continuation cursor
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Builder method: set the sort field and direction
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = field.into();
        self.sort_order = order;
        self
    }

    /// Builder method: set the filter
    pub fn with_filter(mut self, filter: serde_json::Value) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Options for hybrid pagination: a page number or a cursor, never both
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridOptions {
    /// 1-based page number; defaults to 1 when neither page nor cursor is set
    pub page: Option<u32>,
    /// Continuation cursor from a previous response
    pub cursor: Option<String>,
    /// Rows per page (1-100)
    pub limit: u32,
    /// Sort field; must be in the paginator's allow-list
    pub sort_by: String,
    /// Sort direction
    pub sort_order: SortOrder,
    /// Opaque filter, passed through to the data-access layer
    pub filter: Option<serde_json::Value>,
    /// Pay for a true count and return totals in the meta
    pub include_total_count: bool,
}

impl Default for HybridOptions {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

impl HybridOptions {
    /// Creates options for the first page, sorted by id ascending
    pub fn new(limit: u32) -> Self {
        Self {
            page: None,
            cursor: None,
            limit,
            sort_by: "id".to_string(),
            sort_order: SortOrder::Asc,
            filter: None,
            include_total_count: false,
        }
    }

    /// Builder method: navigate to a page number
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Builder method: follow a cursor
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Builder method: set the sort field and direction
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = field.into();
        self.sort_order = order;
        self
    }

    /// Builder method: set the filter
    pub fn with_filter(mut self, filter: serde_json::Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Builder method: request a true total count
    pub fn with_total_count(mut self, include: bool) -> Self {
        self.include_total_count = include;
        self
    }
}

/// Pagination metadata returned alongside a page of rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Whether another page follows this one
    pub has_next: bool,
    /// Whether a page precedes this one
    pub has_previous: bool,
    /// Cursor for the next page, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Cursor for the previous page, when navigation came from a cursor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_cursor: Option<String>,
    /// Page size this page was served with
    pub limit: u32,
    /// Total matching rows (offset mode / include_total_count)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Total pages (offset mode / include_total_count)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    /// Current page number (offset navigation only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Rows in listing order
    pub data: Vec<Record>,
    /// Pagination metadata
    pub pagination: PaginationMeta,
}

/// Configuration for the paginator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatorConfig {
    /// Sort fields list endpoints may order by
    pub allowed_sort_fields: Vec<String>,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            allowed_sort_fields: vec![
                "id".to_string(),
                "created_at".to_string(),
                "updated_at".to_string(),
            ],
        }
    }
}

impl PaginatorConfig {
    /// Creates a config with the default sort-field allow-list
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: replace the sort-field allow-list
    pub fn with_allowed_sort_fields(mut self, fields: Vec<String>) -> Self {
        self.allowed_sort_fields = fields;
        self
    }

    /// Builder method: add one allowed sort field
    pub fn allow_sort_field(mut self, field: impl Into<String>) -> Self {
        self.allowed_sort_fields.push(field.into());
        self
    }
}

/// Pagination orchestrator over a data-access capability
pub struct Paginator {
    access: Arc<dyn DataAccess>,
    config: PaginatorConfig,
}

impl Paginator {
    /// Creates a paginator with the default config
    pub fn new(access: Arc<dyn DataAccess>) -> Self {
        Self::with_config(access, PaginatorConfig::default())
    }

    /// Creates a paginator with custom config
    pub fn with_config(access: Arc<dyn DataAccess>, config: PaginatorConfig) -> Self {
        Self { access, config }
    }

    /// Returns the paginator config
    pub fn config(&self) -> &PaginatorConfig {
        &self.config
    }

    /// Offset pagination: page numbers with true totals
    ///
    /// The count and fetch queries have no data dependency and are issued
    /// concurrently.
    pub async fn paginate(&self, collection: &str, options: PageOptions) -> Result<Page> {
        validate_limit(options.limit)?;
        validate_page(options.page)?;
        self.validate_sort_field(&options.sort_by)?;

        let spec = FindSpec::new()
            .with_filter(options.filter.clone())
            .with_include(options.include.clone())
            .with_skip((options.page as u64 - 1) * options.limit as u64)
            .with_take(options.limit)
            .order_by(options.sort_by.clone(), options.sort_order)
            .order_by("id", options.sort_order);

        let (total, rows) = tokio::join!(
            self.access.count(collection, options.filter.as_ref()),
            self.access.find_many(collection, spec),
        );
        let total = total?;
        let rows = rows?;

        let total_pages = total.div_ceil(options.limit as u64) as u32;
        let has_next = options.page < total_pages;
        let next_cursor = match (has_next, rows.last()) {
            (true, Some(last)) => Some(encode_cursor(last, &options.sort_by)?),
            _ => None,
        };

        tracing::debug!(
            collection,
            page = options.page,
            limit = options.limit,
            total,
            "offset page served"
        );

        Ok(Page {
            data: rows,
            pagination: PaginationMeta {
                has_next,
                has_previous: options.page > 1,
                next_cursor,
                previous_cursor: None,
                limit: options.limit,
                total: Some(total),
                total_pages: Some(total_pages),
                current_page: Some(options.page),
            },
        })
    }

    /// Cursor pagination: keyset continuation, never issues a count
    ///
    /// Fetches `limit + 1` rows ordered by `(sort_by, id)`; the id tiebreak
    /// guarantees a total order when the sort field has duplicate values.
    /// A malformed cursor, or one minted for a different sort field, is
    /// treated as absent and the listing restarts from the beginning.
    pub async fn paginate_with_cursor(
        &self,
        collection: &str,
        options: CursorOptions,
    ) -> Result<Page> {
        validate_limit(options.limit)?;
        self.validate_sort_field(&options.sort_by)?;

        let boundary = options
            .cursor
            .as_deref()
            .and_then(decode_cursor)
            .filter(|payload| payload.field == options.sort_by);
        let has_previous = boundary.is_some();

        let spec = FindSpec::new()
            .with_filter(options.filter.clone())
            .with_take(options.limit + 1)
            .order_by(options.sort_by.clone(), options.sort_order)
            .order_by("id", options.sort_order)
            .with_after(boundary.map(CursorPayload::into_boundary));

        let mut rows = self.access.find_many(collection, spec).await?;
        let has_next = rows.len() > options.limit as usize;
        if has_next {
            rows.truncate(options.limit as usize);
        }

        let next_cursor = match (has_next, rows.last()) {
            (true, Some(last)) => Some(encode_cursor(last, &options.sort_by)?),
            _ => None,
        };
        let previous_cursor = match (has_previous, rows.first()) {
            (true, Some(first)) => Some(encode_cursor(first, &options.sort_by)?),
            _ => None,
        };

        tracing::debug!(
            collection,
            limit = options.limit,
            continued = has_previous,
            "cursor page served"
        );

        Ok(Page {
            data: rows,
            pagination: PaginationMeta {
                has_next,
                has_previous,
                next_cursor,
                previous_cursor,
                limit: options.limit,
                total: None,
                total_pages: None,
                current_page: None,
            },
        })
    }

    /// Hybrid pagination: a page number or a cursor per request
    ///
    /// Mixing both in one request is rejected; within a listing session
    /// the expected flow is offset navigation until a response hands back
    /// a cursor, then cursor navigation from there on.
    pub async fn paginate_hybrid(&self, collection: &str, options: HybridOptions) -> Result<Page> {
        if options.page.is_some() && options.cursor.is_some() {
            return Err(FlowlensError::Validation(
                "hybrid pagination cannot mix page and cursor navigation in one request".into(),
            ));
        }

        if let Some(cursor) = options.cursor.clone() {
            let mut page = self
                .paginate_with_cursor(
                    collection,
                    CursorOptions {
                        cursor: Some(cursor),
                        limit: options.limit,
                        sort_by: options.sort_by.clone(),
                        sort_order: options.sort_order,
                        filter: options.filter.clone(),
                    },
                )
                .await?;
            // A supplied cursor means the caller already navigated past
            // the first page
            page.pagination.has_previous = true;
            return Ok(page);
        }

        let current_page = options.page.unwrap_or(1);

        if options.include_total_count {
            return self
                .paginate(
                    collection,
                    PageOptions {
                        page: current_page,
                        limit: options.limit,
                        sort_by: options.sort_by,
                        sort_order: options.sort_order,
                        filter: options.filter,
                        include: Vec::new(),
                    },
                )
                .await;
        }

        validate_limit(options.limit)?;
        validate_page(current_page)?;
        self.validate_sort_field(&options.sort_by)?;

        let spec = FindSpec::new()
            .with_filter(options.filter.clone())
            .with_skip((current_page as u64 - 1) * options.limit as u64)
            .with_take(options.limit)
            .order_by(options.sort_by.clone(), options.sort_order)
            .order_by("id", options.sort_order);

        let rows = self.access.find_many(collection, spec).await?;
        // Cheap check: a full page implies a likely next page
        let has_next = rows.len() == options.limit as usize;
        let next_cursor = match (has_next, rows.last()) {
            (true, Some(last)) => Some(encode_cursor(last, &options.sort_by)?),
            _ => None,
        };

        Ok(Page {
            data: rows,
            pagination: PaginationMeta {
                has_next,
                has_previous: current_page > 1,
                next_cursor,
                previous_cursor: None,
                limit: options.limit,
                total: None,
                total_pages: None,
                current_page: Some(current_page),
            },
        })
    }

    fn validate_sort_field(&self, field: &str) -> Result<()> {
        if self.config.allowed_sort_fields.iter().any(|f| f == field) {
            Ok(())
        } else {
            Err(FlowlensError::Validation(format!(
                "unknown sort field '{}'",
                field
            )))
        }
    }
}

fn validate_limit(limit: u32) -> Result<()> {
    if (MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        Ok(())
    } else {
        Err(FlowlensError::Validation(format!(
            "limit must be between {} and {}, got {}",
            MIN_LIMIT, MAX_LIMIT, limit
        )))
    }
}

fn validate_page(page: u32) -> Result<()> {
    if page >= 1 {
        Ok(())
    } else {
        Err(FlowlensError::Validation(format!(
            "page must be 1 or greater, got {}",
            page
        )))
    }
}
