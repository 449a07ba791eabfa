//! EXPLAIN Output Parser
//!
//! Flattens the engine's `EXPLAIN (FORMAT JSON)` output into a pre-order
//! sequence of [`PlanNode`] rows. Malformed or empty input produces an
//! empty sequence, never an error: plan retrieval is best-effort and the
//! advisory rules still run their text-based checks without a plan.

use crate::explain::plan::PlanNode;
use serde_json::Value;

/// Hard bound on plan-tree depth
///
/// Traversal is iterative, but the bound also caps how much of a
/// pathological (cyclic-looking or deeply nested) plan is walked.
pub const MAX_PLAN_DEPTH: usize = 64;

/// Parses raw EXPLAIN output into a flat node list
///
/// Accepts the shapes PostgreSQL emits: a top-level array of
/// `{"Plan": ...}` wrappers, a bare `{"Plan": ...}` object, or a plan
/// node object directly. Nodes are emitted in pre-order: root first,
/// then children left to right.
pub fn parse_plan(raw: &Value) -> Vec<PlanNode> {
    match plan_root(raw) {
        Some(root) => flatten(root),
        None => Vec::new(),
    }
}

/// Locates the root plan node inside the EXPLAIN wrapper
fn plan_root(raw: &Value) -> Option<&Value> {
    if let Some(arr) = raw.as_array() {
        let first = arr.first()?;
        return first.get("Plan").or(Some(first));
    }
    if let Some(plan) = raw.get("Plan") {
        return Some(plan);
    }
    if raw.get("Node Type").is_some() {
        return Some(raw);
    }
    None
}

/// Pre-order traversal with an explicit stack and depth bound
fn flatten(root: &Value) -> Vec<PlanNode> {
    let mut nodes = Vec::new();
    let mut skipped = 0usize;
    let mut stack: Vec<(&Value, usize)> = vec![(root, 0)];

    while let Some((value, depth)) = stack.pop() {
        if depth >= MAX_PLAN_DEPTH {
            skipped += 1;
            continue;
        }
        let Some(node) = parse_node(value) else {
            continue;
        };
        nodes.push(node);

        if let Some(children) = value.get("Plans").and_then(|v| v.as_array()) {
            // Push in reverse so children are visited left to right
            for child in children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
    }

    if skipped > 0 {
        tracing::warn!(
            skipped,
            max_depth = MAX_PLAN_DEPTH,
            "plan tree exceeded depth bound, deep subtrees skipped"
        );
    }

    nodes
}

/// Parses a single node; returns `None` when the object has no node type
fn parse_node(value: &Value) -> Option<PlanNode> {
    let node_type = value.get("Node Type")?.as_str()?;
    let mut node = PlanNode::new(node_type);

    if let Some(rel) = value.get("Relation Name").and_then(|v| v.as_str()) {
        node.relation = Some(rel.to_string());
    }
    if let Some(cost) = value.get("Total Cost").and_then(|v| v.as_f64()) {
        node.total_cost = cost.max(0.0);
    }
    if let Some(rows) = value.get("Plan Rows").and_then(|v| v.as_u64()) {
        node.plan_rows = rows;
    }
    if let Some(width) = value.get("Plan Width").and_then(|v| v.as_u64()) {
        node.plan_width = width as u32;
    }

    Some(node)
}

#[cfg(test)]
mod tests;
