//! Tests for EXPLAIN output normalization

use super::*;
use crate::explain::ScanKind;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_parse_single_seq_scan() {
    let raw = json!([{
        "Plan": {
            "Node Type": "Seq Scan",
            "Relation Name": "leads",
            "Startup Cost": 0.0,
            "Total Cost": 120.5,
            "Plan Rows": 5000,
            "Plan Width": 36
        }
    }]);

    let nodes = parse_plan(&raw);
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].node_type, "Seq Scan");
    assert_eq!(nodes[0].scan_kind, ScanKind::SequentialScan);
    assert_eq!(nodes[0].relation, Some("leads".to_string()));
    assert_eq!(nodes[0].total_cost, 120.5);
    assert_eq!(nodes[0].plan_rows, 5000);
    assert_eq!(nodes[0].plan_width, 36);
}

#[test]
fn test_preorder_traversal() {
    let raw = json!([{
        "Plan": {
            "Node Type": "Hash Join",
            "Total Cost": 200.0,
            "Plans": [
                {
                    "Node Type": "Seq Scan",
                    "Relation Name": "orders",
                    "Total Cost": 80.0,
                    "Plans": [
                        { "Node Type": "Sort", "Total Cost": 20.0 }
                    ]
                },
                { "Node Type": "Index Scan", "Relation Name": "customers", "Total Cost": 40.0 }
            ]
        }
    }]);

    let nodes = parse_plan(&raw);
    let types: Vec<&str> = nodes.iter().map(|n| n.node_type.as_str()).collect();
    assert_eq!(types, vec!["Hash Join", "Seq Scan", "Sort", "Index Scan"]);
}

#[test]
fn test_accepts_bare_plan_object() {
    let raw = json!({
        "Plan": { "Node Type": "Index Scan", "Relation Name": "leads" }
    });

    let nodes = parse_plan(&raw);
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].scan_kind, ScanKind::IndexScan);
}

#[test]
fn test_accepts_naked_node() {
    let raw = json!({ "Node Type": "Seq Scan", "Plan Rows": 10 });

    let nodes = parse_plan(&raw);
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].plan_rows, 10);
}

#[test]
fn test_malformed_input_yields_empty_plan() {
    assert!(parse_plan(&json!(null)).is_empty());
    assert!(parse_plan(&json!("EXPLAIN failed")).is_empty());
    assert!(parse_plan(&json!([])).is_empty());
    assert!(parse_plan(&json!({})).is_empty());
    assert!(parse_plan(&json!({ "Plan": { "missing": "node type" } })).is_empty());
    assert!(parse_plan(&json!(42)).is_empty());
}

#[test]
fn test_negative_cost_clamped() {
    let raw = json!([{
        "Plan": { "Node Type": "Seq Scan", "Total Cost": -5.0, "Plan Rows": -3 }
    }]);

    let nodes = parse_plan(&raw);
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].total_cost, 0.0);
    // Negative row estimates do not parse as u64 and fall back to zero
    assert_eq!(nodes[0].plan_rows, 0);
}

#[test]
fn test_depth_bound_skips_deep_subtrees() {
    // Build a chain two levels deeper than the bound
    let mut node = json!({ "Node Type": "Seq Scan" });
    for _ in 0..(MAX_PLAN_DEPTH + 2) {
        node = json!({ "Node Type": "Nested Loop", "Plans": [node] });
    }
    let raw = json!([{ "Plan": node }]);

    let nodes = parse_plan(&raw);
    assert_eq!(nodes.len(), MAX_PLAN_DEPTH);
    assert!(nodes.iter().all(|n| n.node_type == "Nested Loop"));
}

#[test]
fn test_node_without_type_prunes_subtree() {
    let raw = json!([{
        "Plan": {
            "Node Type": "Hash Join",
            "Plans": [
                { "Plans": [ { "Node Type": "Seq Scan" } ] },
                { "Node Type": "Index Scan" }
            ]
        }
    }]);

    let nodes = parse_plan(&raw);
    let types: Vec<&str> = nodes.iter().map(|n| n.node_type.as_str()).collect();
    assert_eq!(types, vec!["Hash Join", "Index Scan"]);
}
