//! EXPLAIN Plan Normalization Module
//!
//! Turns the engine's raw plan tree (PostgreSQL `EXPLAIN (FORMAT JSON)`
//! shape) into a flat, pre-order sequence of [`PlanNode`] rows that the
//! advisory rules evaluate.
//!
//! # Example
//!
//! ```
//! use flowlens_analyzer::explain::{parse_plan, ScanKind};
//!
//! let raw = serde_json::json!([{
//!     "Plan": {
//!         "Node Type": "Seq Scan",
//!         "Relation Name": "leads",
//!         "Total Cost": 120.5,
//!         "Plan Rows": 5000,
//!         "Plan Width": 36
//!     }
//! }]);
//!
//! let nodes = parse_plan(&raw);
//! assert_eq!(nodes.len(), 1);
//! assert_eq!(nodes[0].scan_kind, ScanKind::SequentialScan);
//! ```

pub mod parser;
pub mod plan;

pub use parser::{MAX_PLAN_DEPTH, parse_plan};
pub use plan::{PlanNode, ScanKind};
