//! Normalized Plan Model
//!
//! One [`PlanNode`] per operation in the engine's execution strategy,
//! flattened out of the nested EXPLAIN tree.

use serde::{Deserialize, Serialize};

/// Scan classification for a plan node
///
/// Engine node-type strings are an open, versioned vocabulary; they are
/// mapped to this closed set once, at the parser boundary, so rule logic
/// pattern-matches over a finite set instead of raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    /// Full table scan
    SequentialScan,
    /// Index scan (index lookup, then table read)
    IndexScan,
    /// Index-only scan (reads data directly from the index)
    IndexOnlyScan,
    /// Bitmap index or bitmap heap scan
    BitmapScan,
    /// Any non-scan or unrecognized operation
    Other,
}

impl ScanKind {
    /// Maps an engine node-type string to a scan kind
    ///
    /// Exact matches are tried first; "containing" matches catch variants
    /// like "Parallel Seq Scan" from newer engine versions.
    pub fn from_node_type(node_type: &str) -> Self {
        match node_type {
            "Seq Scan" => Self::SequentialScan,
            "Index Scan" => Self::IndexScan,
            "Index Only Scan" => Self::IndexOnlyScan,
            "Bitmap Index Scan" | "Bitmap Heap Scan" => Self::BitmapScan,
            _ if node_type.contains("Seq Scan") => Self::SequentialScan,
            _ if node_type.contains("Index Only Scan") => Self::IndexOnlyScan,
            _ if node_type.contains("Index Scan") => Self::IndexScan,
            _ => Self::Other,
        }
    }

    /// Returns true if this node reads a relation
    pub fn is_scan(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// One flattened row from the engine's plan tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    /// Engine node-type string (e.g. "Seq Scan", "Index Scan")
    pub node_type: String,
    /// Closed scan classification derived from `node_type`
    pub scan_kind: ScanKind,
    /// Relation/table name, if the node reports one
    pub relation: Option<String>,
    /// Total estimated cost; never negative
    pub total_cost: f64,
    /// Estimated rows produced by this node
    pub plan_rows: u64,
    /// Estimated width of each row in bytes
    pub plan_width: u32,
}

impl PlanNode {
    /// Creates a new plan node with the given engine node type
    pub fn new(node_type: impl Into<String>) -> Self {
        let node_type = node_type.into();
        let scan_kind = ScanKind::from_node_type(&node_type);
        Self {
            node_type,
            scan_kind,
            relation: None,
            total_cost: 0.0,
            plan_rows: 0,
            plan_width: 0,
        }
    }

    /// Sets the relation name
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// Sets the total cost, clamped to be non-negative
    pub fn with_cost(mut self, total_cost: f64) -> Self {
        self.total_cost = total_cost.max(0.0);
        self
    }

    /// Sets the estimated rows
    pub fn with_rows(mut self, plan_rows: u64) -> Self {
        self.plan_rows = plan_rows;
        self
    }

    /// Sets the row width
    pub fn with_width(mut self, plan_width: u32) -> Self {
        self.plan_width = plan_width;
        self
    }

    /// Returns true if this node is a full table scan
    pub fn is_sequential(&self) -> bool {
        self.scan_kind == ScanKind::SequentialScan
    }
}
