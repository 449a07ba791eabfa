//! Advisory Rule Engine
//!
//! Public entry point of the analyzer: runs a query through the engine's
//! plan-explain facility, evaluates text- and plan-based heuristics, and
//! produces a [`QueryReport`] with suggestions and index recommendations.
//! Plan retrieval is best-effort; a failing EXPLAIN degrades the report,
//! it never fails the call.

use crate::explain::{PlanNode, parse_plan};
use crate::frequency::{FrequencyEntry, FrequencyTracker, fingerprint};
use chrono::{DateTime, Utc};
use flowlens_core::{QueryExecutor, Result, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use uuid::Uuid;

/// Improvement score assigned to JSON-operator GIN recommendations
const JSON_INDEX_IMPROVEMENT: f64 = 75.0;

/// Improvement fallback when the plan carries no usable cost
const DEFAULT_SCAN_IMPROVEMENT: f64 = 50.0;

const SELECT_STAR_SUGGESTION: &str =
    "Replace SELECT * with specific column names to reduce data transfer.";
const ORDER_WITHOUT_LIMIT_SUGGESTION: &str =
    "Add a LIMIT clause to ORDER BY queries to reduce result set size.";
const LEADING_WILDCARD_SUGGESTION: &str =
    "Consider full-text search instead of LIKE with a leading wildcard.";

/// Advisory priority of an index recommendation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Returns the priority as a display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Index access method for a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Btree,
    Gin,
    Gist,
    Hash,
}

impl IndexType {
    /// Returns the index type as a display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Btree => "btree",
            Self::Gin => "gin",
            Self::Gist => "gist",
            Self::Hash => "hash",
        }
    }

    /// Returns the SQL USING-clause method name
    pub fn method(&self) -> &'static str {
        match self {
            Self::Btree => "BTREE",
            Self::Gin => "GIN",
            Self::Gist => "GIST",
            Self::Hash => "HASH",
        }
    }
}

/// A single index recommendation
///
/// Advisory only: flowlens never executes DDL. Column order is significant;
/// it determines the generated index column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecommendation {
    /// Table the index would be created on
    pub table: String,
    /// Index columns, in order
    pub columns: Vec<String>,
    /// Index access method
    pub index_type: IndexType,
    /// Why the index is recommended
    pub reason: String,
    /// Advisory priority
    pub priority: Priority,
    /// Heuristic improvement estimate (0-100); not a guarantee
    pub estimated_improvement: f64,
}

impl IndexRecommendation {
    /// Creates a new recommendation
    pub fn new(table: impl Into<String>, columns: Vec<String>, index_type: IndexType) -> Self {
        Self {
            table: table.into(),
            columns,
            index_type,
            reason: String::new(),
            priority: Priority::Low,
            estimated_improvement: 0.0,
        }
    }

    /// Sets the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Sets the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the estimated improvement, clamped to 0-100
    pub fn with_improvement(mut self, improvement: f64) -> Self {
        self.estimated_improvement = improvement.clamp(0.0, 100.0);
        self
    }
}

/// Result of one analysis call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryReport {
    /// Report id
    pub id: Uuid,
    /// When the analysis ran
    pub analyzed_at: DateTime<Utc>,
    /// The query as submitted
    pub original_query: String,
    /// Normalized plan nodes, pre-order; empty when plan retrieval failed
    pub query_plan: Vec<PlanNode>,
    /// Deduplicated suggestions, insertion order preserved
    pub suggestions: Vec<String>,
    /// Recommendations sorted by priority, then estimated improvement
    pub index_recommendations: Vec<IndexRecommendation>,
}

impl QueryReport {
    /// Creates an empty report for a query
    pub fn new(original_query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            analyzed_at: Utc::now(),
            original_query: original_query.into(),
            query_plan: Vec::new(),
            suggestions: Vec::new(),
            index_recommendations: Vec::new(),
        }
    }

    /// Adds a suggestion, dropping duplicates
    pub fn add_suggestion(&mut self, suggestion: impl Into<String>) {
        let suggestion = suggestion.into();
        if !self.suggestions.contains(&suggestion) {
            self.suggestions.push(suggestion);
        }
    }

    /// Returns true if the plan contains any sequential scans
    pub fn has_sequential_scans(&self) -> bool {
        self.query_plan.iter().any(|n| n.is_sequential())
    }
}

/// Configuration for the advisory engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Row estimate above which a sequential scan counts as "large table"
    pub large_table_threshold: u64,
    /// Capacity of the frequency table
    pub frequency_capacity: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            large_table_threshold: 1_000,
            frequency_capacity: crate::frequency::DEFAULT_FREQUENCY_CAPACITY,
        }
    }
}

impl AdvisorConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the large table threshold
    pub fn with_large_table_threshold(mut self, threshold: u64) -> Self {
        self.large_table_threshold = threshold;
        self
    }

    /// Sets the frequency table capacity
    pub fn with_frequency_capacity(mut self, capacity: usize) -> Self {
        self.frequency_capacity = capacity;
        self
    }
}

/// Query advisor: plan inspection, heuristic rules, frequency tracking
pub struct QueryAdvisor {
    executor: Arc<dyn QueryExecutor>,
    tracker: FrequencyTracker,
    config: AdvisorConfig,
}

impl QueryAdvisor {
    /// Creates an advisor with default config
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self::with_config(executor, AdvisorConfig::default())
    }

    /// Creates an advisor with custom config
    pub fn with_config(executor: Arc<dyn QueryExecutor>, config: AdvisorConfig) -> Self {
        Self {
            executor,
            tracker: FrequencyTracker::new(config.frequency_capacity),
            config,
        }
    }

    /// Returns the advisor config
    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Analyzes a query and returns a report
    ///
    /// The fingerprint is recorded before anything else, so frequency
    /// counting sees every call even when plan retrieval fails. A failing
    /// EXPLAIN is absorbed: the report then carries an empty plan and only
    /// text-rule findings. The only error path is a blank query.
    pub async fn analyze_query(&self, query_text: &str, params: &[Value]) -> Result<QueryReport> {
        self.tracker.record(&fingerprint(query_text))?;

        let mut report = QueryReport::new(query_text);

        match self.executor.explain(query_text, params).await {
            Ok(raw) => report.query_plan = parse_plan(&raw),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "plan retrieval failed, continuing with text rules only"
                );
            }
        }

        self.apply_text_rules(query_text, &mut report);
        self.apply_plan_rules(query_text, &mut report);

        let recommendations = std::mem::take(&mut report.index_recommendations);
        report.index_recommendations = rank_recommendations(dedup_recommendations(recommendations));

        tracing::debug!(
            report_id = %report.id,
            plan_nodes = report.query_plan.len(),
            suggestions = report.suggestions.len(),
            recommendations = report.index_recommendations.len(),
            "query analysis complete"
        );

        Ok(report)
    }

    /// Returns the most frequently observed query fingerprints
    pub fn frequent_queries(&self, limit: usize) -> Vec<FrequencyEntry> {
        self.tracker.top_n(limit)
    }

    /// Static text-pattern rules; run regardless of plan availability
    fn apply_text_rules(&self, query: &str, report: &mut QueryReport) {
        if contains_ci(query, "SELECT *") {
            report.add_suggestion(SELECT_STAR_SUGGESTION);
        }

        if contains_ci(query, "ORDER BY") && find_keyword(query, "LIMIT").is_none() {
            report.add_suggestion(ORDER_WITHOUT_LIMIT_SUGGESTION);
        }

        if contains_ci(query, "LIKE '%") {
            report.add_suggestion(LEADING_WILDCARD_SUGGESTION);
        }

        if let Some(clause) = where_clause(query)
            && clause.contains("->")
            && let Some(column) = json_path_column(clause)
            && let Some(table) = table_from_query(query)
        {
            report.index_recommendations.push(
                IndexRecommendation::new(table, vec![column], IndexType::Gin)
                    .with_reason("JSON operations")
                    .with_priority(Priority::High)
                    .with_improvement(JSON_INDEX_IMPROVEMENT),
            );
        }
    }

    /// Plan-based rules; no-op on an empty plan
    fn apply_plan_rules(&self, query: &str, report: &mut QueryReport) {
        let Some(root) = report.query_plan.first() else {
            return;
        };
        let root_cost = root.total_cost;

        let mut sequential_scans = 0usize;
        let mut recommendations = Vec::new();
        let mut scan_suggestions = Vec::new();

        for node in &report.query_plan {
            if !node.is_sequential() {
                continue;
            }
            sequential_scans += 1;

            if node.plan_rows < self.config.large_table_threshold {
                continue;
            }

            let Some(table) = node.relation.clone().or_else(|| table_from_query(query)) else {
                continue;
            };

            let columns = where_clause(query)
                .map(extract_where_columns)
                .unwrap_or_default();
            if columns.is_empty() {
                scan_suggestions.push(format!(
                    "Sequential scan on large table '{}' ({} rows); filter on indexed columns",
                    table, node.plan_rows
                ));
                continue;
            }

            // Cost share of the whole plan, as a 0-100 heuristic scalar
            let improvement = if root_cost > 0.0 {
                (node.total_cost / root_cost * 100.0).clamp(0.0, 100.0)
            } else {
                DEFAULT_SCAN_IMPROVEMENT
            };

            recommendations.push(
                IndexRecommendation::new(table, columns, IndexType::Btree)
                    .with_reason("Sequential scan detected on large table")
                    .with_priority(Priority::Medium)
                    .with_improvement(improvement),
            );
        }

        for suggestion in scan_suggestions {
            report.add_suggestion(suggestion);
        }

        if sequential_scans >= 3 {
            report.add_suggestion(format!(
                "Query performs {} sequential scans; consider adding indexes or restructuring joins.",
                sequential_scans
            ));
        }

        report.index_recommendations.extend(recommendations);
    }
}

/// Emits the CREATE INDEX statement for a recommendation
///
/// Pure function, no I/O. Index name is `idx_` + table + `_` +
/// underscore-joined columns, lower-cased. Non-btree methods emit a
/// single-column `USING <METHOD>` form.
pub fn generate_index_sql(recommendation: &IndexRecommendation) -> String {
    let table = recommendation.table.to_lowercase();
    let columns: Vec<String> = recommendation
        .columns
        .iter()
        .map(|c| c.to_lowercase())
        .collect();

    match recommendation.index_type {
        IndexType::Btree => format!(
            "CREATE INDEX CONCURRENTLY idx_{}_{} ON {} ({});",
            table,
            columns.join("_"),
            table,
            columns.join(", ")
        ),
        method => {
            let column = columns.first().cloned().unwrap_or_default();
            format!(
                "CREATE INDEX CONCURRENTLY idx_{}_{} ON {} USING {} ({});",
                table,
                column,
                table,
                method.method(),
                column
            )
        }
    }
}

/// Collapses duplicate recommendations on `(table, columns)`
///
/// Keeps the higher-priority entry, then the higher improvement, at the
/// first-seen position so insertion order stays stable.
fn dedup_recommendations(recommendations: Vec<IndexRecommendation>) -> Vec<IndexRecommendation> {
    let mut out: Vec<IndexRecommendation> = Vec::new();
    for rec in recommendations {
        match out
            .iter_mut()
            .find(|r| r.table == rec.table && r.columns == rec.columns)
        {
            Some(existing) => {
                let better = rec.priority > existing.priority
                    || (rec.priority == existing.priority
                        && rec.estimated_improvement > existing.estimated_improvement);
                if better {
                    *existing = rec;
                }
            }
            None => out.push(rec),
        }
    }
    out
}

/// Stable sort: priority descending, then estimated improvement descending
fn rank_recommendations(
    mut recommendations: Vec<IndexRecommendation>,
) -> Vec<IndexRecommendation> {
    recommendations.sort_by(|a, b| {
        b.priority.cmp(&a.priority).then_with(|| {
            b.estimated_improvement
                .partial_cmp(&a.estimated_improvement)
                .unwrap_or(Ordering::Equal)
        })
    });
    recommendations
}

/// ASCII case-insensitive substring test
fn contains_ci(haystack: &str, needle: &str) -> bool {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() {
        return false;
    }
    (0..=h.len() - n.len()).any(|i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Finds a standalone SQL keyword (identifier boundaries on both sides)
fn find_keyword(haystack: &str, keyword: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let k = keyword.as_bytes();
    if k.is_empty() || h.len() < k.len() {
        return None;
    }
    (0..=h.len() - k.len()).find(|&i| {
        h[i..i + k.len()].eq_ignore_ascii_case(k)
            && (i == 0 || !is_ident_byte(h[i - 1]))
            && (i + k.len() == h.len() || !is_ident_byte(h[i + k.len()]))
    })
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Extracts the WHERE clause body, if any
fn where_clause(query: &str) -> Option<&str> {
    let start = find_keyword(query, "WHERE")? + "WHERE".len();
    let rest = &query[start..];
    let end = ["ORDER", "GROUP", "HAVING", "LIMIT", "OFFSET"]
        .iter()
        .filter_map(|kw| find_keyword(rest, kw))
        .min()
        .unwrap_or(rest.len());
    let clause = rest[..end].trim();
    (!clause.is_empty()).then_some(clause)
}

/// Column on the left-hand side of the first JSON path operator
fn json_path_column(clause: &str) -> Option<String> {
    let idx = clause.find("->")?;
    let prefix = clause[..idx].trim_end();
    let ident: String = prefix
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let column = ident.rsplit('.').next().unwrap_or("").to_string();
    is_identifier(&column).then_some(column)
}

/// First table named after FROM
fn table_from_query(query: &str) -> Option<String> {
    let start = find_keyword(query, "FROM")? + "FROM".len();
    let rest = query[start..].trim_start();
    let raw: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.' || *c == '"')
        .collect();
    let table = raw
        .rsplit('.')
        .next()
        .unwrap_or("")
        .trim_matches('"')
        .to_string();
    is_identifier(&table).then_some(table)
}

/// Best-effort column extraction from a WHERE clause
///
/// Splits on AND/OR conjunctions and takes the identifier on the left of
/// the first comparison operator in each condition. JSON path expressions
/// are skipped; the GIN rule owns those.
fn extract_where_columns(clause: &str) -> Vec<String> {
    const OPERATORS: [&str; 7] = ["<>", "!=", ">=", "<=", "=", ">", "<"];
    const KEYWORD_OPERATORS: [&str; 4] = ["IS", "LIKE", "ILIKE", "IN"];

    let mut columns = Vec::new();
    for part in split_conditions(clause) {
        let condition = part.trim().trim_start_matches('(').trim_end_matches(')');

        let symbol_idx = OPERATORS.iter().filter_map(|op| condition.find(op)).min();
        let keyword_idx = KEYWORD_OPERATORS
            .iter()
            .filter_map(|kw| find_keyword(condition, kw))
            .min();
        let Some(idx) = [symbol_idx, keyword_idx].into_iter().flatten().min() else {
            continue;
        };

        let lhs = condition[..idx].trim();
        if lhs.is_empty() || lhs.contains("->") {
            continue;
        }
        let first = lhs.chars().next().unwrap_or(' ');
        if first == '\'' || first == '"' || first.is_ascii_digit() {
            continue;
        }

        let clean = lhs.rsplit('.').next().unwrap_or(lhs).trim().to_string();
        if is_identifier(&clean) && !columns.contains(&clean) {
            columns.push(clean);
        }
    }
    columns
}

/// Splits a WHERE clause on standalone AND/OR keywords
fn split_conditions(clause: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = clause;
    loop {
        let and_idx = find_keyword(rest, "AND");
        let or_idx = find_keyword(rest, "OR");
        let next = match (and_idx, or_idx) {
            (Some(a), Some(o)) => Some(a.min(o)),
            (a, None) => a,
            (None, o) => o,
        };
        match next {
            Some(i) => {
                parts.push(&rest[..i]);
                let keyword_len = if rest.as_bytes()[i..].len() >= 3
                    && rest.as_bytes()[i..i + 3].eq_ignore_ascii_case(b"AND")
                {
                    3
                } else {
                    2
                };
                rest = &rest[i + keyword_len..];
            }
            None => {
                parts.push(rest);
                break;
            }
        }
    }
    parts
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests;
