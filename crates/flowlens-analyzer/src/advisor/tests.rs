//! Tests for the advisory rule engine

use super::*;
use async_trait::async_trait;
use flowlens_core::{FlowlensError, Record};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Executor that returns a fixed plan for every query
struct StaticPlanExecutor {
    plan: serde_json::Value,
}

impl StaticPlanExecutor {
    fn new(plan: serde_json::Value) -> Arc<Self> {
        Arc::new(Self { plan })
    }

    fn empty() -> Arc<Self> {
        Self::new(json!([]))
    }
}

#[async_trait]
impl QueryExecutor for StaticPlanExecutor {
    async fn explain(&self, _query: &str, _params: &[Value]) -> Result<serde_json::Value> {
        Ok(self.plan.clone())
    }

    async fn execute(&self, _query: &str, _params: &[Value]) -> Result<Vec<Record>> {
        Ok(Vec::new())
    }
}

/// Executor whose explain always rejects
struct FailingExecutor;

#[async_trait]
impl QueryExecutor for FailingExecutor {
    async fn explain(&self, _query: &str, _params: &[Value]) -> Result<serde_json::Value> {
        Err(FlowlensError::Query(
            "relation \"missing\" does not exist".into(),
        ))
    }

    async fn execute(&self, _query: &str, _params: &[Value]) -> Result<Vec<Record>> {
        Err(FlowlensError::Query("unreachable".into()))
    }
}

fn seq_scan_plan(relation: &str, rows: u64) -> serde_json::Value {
    json!([{
        "Plan": {
            "Node Type": "Seq Scan",
            "Relation Name": relation,
            "Startup Cost": 0.0,
            "Total Cost": 150.0,
            "Plan Rows": rows,
            "Plan Width": 36
        }
    }])
}

mod analyze_query_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_seq_scan_on_large_table_recommends_btree_index() {
        let advisor = QueryAdvisor::new(StaticPlanExecutor::new(seq_scan_plan("leads", 5000)));

        let report = advisor
            .analyze_query("SELECT * FROM leads WHERE tenant_id = $1", &[])
            .await
            .unwrap();

        assert!(
            report
                .suggestions
                .iter()
                .any(|s| s.contains("SELECT *"))
        );
        assert_eq!(report.index_recommendations.len(), 1);
        let rec = &report.index_recommendations[0];
        assert_eq!(rec.table, "leads");
        assert_eq!(rec.columns, vec!["tenant_id"]);
        assert_eq!(rec.priority, Priority::Medium);
        assert_eq!(rec.index_type, IndexType::Btree);
        assert_eq!(rec.reason, "Sequential scan detected on large table");
    }

    #[tokio::test]
    async fn test_json_operator_recommends_gin_index() {
        let advisor = QueryAdvisor::new(StaticPlanExecutor::empty());

        let report = advisor
            .analyze_query("SELECT id FROM leads WHERE payload->'email' = 'x'", &[])
            .await
            .unwrap();

        assert!(report.query_plan.is_empty());
        assert_eq!(report.index_recommendations.len(), 1);
        let rec = &report.index_recommendations[0];
        assert_eq!(rec.index_type, IndexType::Gin);
        assert_eq!(rec.table, "leads");
        assert_eq!(rec.columns, vec!["payload"]);
        assert_eq!(rec.priority, Priority::High);
        assert_eq!(rec.reason, "JSON operations");
    }

    #[tokio::test]
    async fn test_small_table_scan_produces_no_recommendation() {
        let advisor = QueryAdvisor::new(StaticPlanExecutor::new(seq_scan_plan("leads", 50)));

        let report = advisor
            .analyze_query("SELECT id FROM leads WHERE tenant_id = $1", &[])
            .await
            .unwrap();

        assert!(report.index_recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_failing_explain_degrades_to_text_rules() {
        let advisor = QueryAdvisor::new(Arc::new(FailingExecutor));

        let report = advisor
            .analyze_query("SELECT * FROM leads WHERE tenant_id = $1", &[])
            .await
            .unwrap();

        assert!(report.query_plan.is_empty());
        assert!(!report.suggestions.is_empty());
        assert!(
            report
                .suggestions
                .iter()
                .any(|s| s.contains("SELECT *"))
        );
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected() {
        let advisor = QueryAdvisor::new(StaticPlanExecutor::empty());

        let result = advisor.analyze_query("   ", &[]).await;
        assert!(matches!(result, Err(FlowlensError::Validation(_))));
    }

    #[tokio::test]
    async fn test_analysis_is_deterministic() {
        let query = "SELECT * FROM leads WHERE payload->'email' = 'x' AND tenant_id = $1 ORDER BY created_at";
        let advisor = QueryAdvisor::new(StaticPlanExecutor::new(seq_scan_plan("leads", 9000)));

        let first = advisor.analyze_query(query, &[]).await.unwrap();
        let second = advisor.analyze_query(query, &[]).await.unwrap();

        assert_eq!(first.suggestions, second.suggestions);
        assert_eq!(first.index_recommendations, second.index_recommendations);
    }

    #[tokio::test]
    async fn test_high_priority_sorts_before_medium() {
        // GIN (high) is produced by the text rule, btree (medium) by the
        // plan rule; ranking must put high first regardless
        let advisor = QueryAdvisor::new(StaticPlanExecutor::new(seq_scan_plan("leads", 5000)));

        let report = advisor
            .analyze_query(
                "SELECT id FROM leads WHERE payload->'email' = 'x' AND tenant_id = $1",
                &[],
            )
            .await
            .unwrap();

        assert_eq!(report.index_recommendations.len(), 2);
        assert_eq!(report.index_recommendations[0].priority, Priority::High);
        assert_eq!(report.index_recommendations[0].index_type, IndexType::Gin);
        assert_eq!(report.index_recommendations[1].priority, Priority::Medium);
    }

    #[tokio::test]
    async fn test_order_by_without_limit_suggestion() {
        let advisor = QueryAdvisor::new(StaticPlanExecutor::empty());

        let report = advisor
            .analyze_query("SELECT id FROM leads ORDER BY created_at DESC", &[])
            .await
            .unwrap();
        assert!(report.suggestions.iter().any(|s| s.contains("LIMIT")));

        let report = advisor
            .analyze_query("SELECT id FROM leads ORDER BY created_at DESC LIMIT 20", &[])
            .await
            .unwrap();
        assert!(!report.suggestions.iter().any(|s| s.contains("LIMIT clause")));
    }

    #[tokio::test]
    async fn test_leading_wildcard_like_suggestion() {
        let advisor = QueryAdvisor::new(StaticPlanExecutor::empty());

        let report = advisor
            .analyze_query("SELECT id FROM leads WHERE email LIKE '%@gmail.com'", &[])
            .await
            .unwrap();
        assert!(
            report
                .suggestions
                .iter()
                .any(|s| s.contains("leading wildcard"))
        );
    }

    #[tokio::test]
    async fn test_multiple_seq_scans_suggestion() {
        let plan = json!([{
            "Plan": {
                "Node Type": "Nested Loop",
                "Total Cost": 300.0,
                "Plans": [
                    { "Node Type": "Seq Scan", "Relation Name": "a", "Total Cost": 50.0, "Plan Rows": 10 },
                    { "Node Type": "Seq Scan", "Relation Name": "b", "Total Cost": 50.0, "Plan Rows": 10 },
                    { "Node Type": "Seq Scan", "Relation Name": "c", "Total Cost": 50.0, "Plan Rows": 10 }
                ]
            }
        }]);
        let advisor = QueryAdvisor::new(StaticPlanExecutor::new(plan));

        let report = advisor
            .analyze_query("SELECT a.id FROM a, b, c", &[])
            .await
            .unwrap();
        assert!(
            report
                .suggestions
                .iter()
                .any(|s| s.contains("3 sequential scans"))
        );
    }

    #[tokio::test]
    async fn test_frequency_tracked_across_calls() {
        let advisor = QueryAdvisor::new(StaticPlanExecutor::empty());

        advisor
            .analyze_query("SELECT id FROM leads WHERE tenant_id = $1", &[])
            .await
            .unwrap();
        advisor
            .analyze_query("SELECT id  FROM leads WHERE tenant_id = $1", &[])
            .await
            .unwrap();

        let frequent = advisor.frequent_queries(10);
        assert_eq!(frequent.len(), 1);
        assert_eq!(frequent[0].frequency, 2);
    }

    #[tokio::test]
    async fn test_frequency_recorded_even_when_explain_fails() {
        let advisor = QueryAdvisor::new(Arc::new(FailingExecutor));

        advisor
            .analyze_query("SELECT id FROM leads", &[])
            .await
            .unwrap();

        let frequent = advisor.frequent_queries(10);
        assert_eq!(frequent.len(), 1);
        assert_eq!(frequent[0].frequency, 1);
    }
}

mod index_sql_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_btree_composite_index() {
        let rec = IndexRecommendation::new(
            "leads",
            vec!["tenant_id".to_string(), "status".to_string()],
            IndexType::Btree,
        );

        assert_eq!(
            generate_index_sql(&rec),
            "CREATE INDEX CONCURRENTLY idx_leads_tenant_id_status ON leads (tenant_id, status);"
        );
    }

    #[test]
    fn test_gin_single_column_index() {
        let rec = IndexRecommendation::new("leads", vec!["payload".to_string()], IndexType::Gin);

        assert_eq!(
            generate_index_sql(&rec),
            "CREATE INDEX CONCURRENTLY idx_leads_payload ON leads USING GIN (payload);"
        );
    }

    #[test]
    fn test_index_name_is_lowercased() {
        let rec = IndexRecommendation::new(
            "Leads",
            vec!["TenantId".to_string()],
            IndexType::Btree,
        );

        assert_eq!(
            generate_index_sql(&rec),
            "CREATE INDEX CONCURRENTLY idx_leads_tenantid ON leads (tenantid);"
        );
    }

    #[test]
    fn test_hash_index_uses_method_clause() {
        let rec = IndexRecommendation::new("leads", vec!["tenant_id".to_string()], IndexType::Hash);

        assert_eq!(
            generate_index_sql(&rec),
            "CREATE INDEX CONCURRENTLY idx_leads_tenant_id ON leads USING HASH (tenant_id);"
        );
    }
}

mod ranking_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rec(table: &str, column: &str, priority: Priority, improvement: f64) -> IndexRecommendation {
        IndexRecommendation::new(table, vec![column.to_string()], IndexType::Btree)
            .with_priority(priority)
            .with_improvement(improvement)
    }

    #[test]
    fn test_priority_ordering_ignores_insertion_order() {
        let ranked = rank_recommendations(vec![
            rec("a", "x", Priority::Medium, 90.0),
            rec("b", "y", Priority::High, 10.0),
            rec("c", "z", Priority::Low, 99.0),
        ]);

        let priorities: Vec<Priority> = ranked.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn test_improvement_breaks_priority_ties() {
        let ranked = rank_recommendations(vec![
            rec("a", "x", Priority::Medium, 30.0),
            rec("b", "y", Priority::Medium, 70.0),
        ]);

        assert_eq!(ranked[0].table, "b");
        assert_eq!(ranked[1].table, "a");
    }

    #[test]
    fn test_stable_on_full_ties() {
        let ranked = rank_recommendations(vec![
            rec("first", "x", Priority::Medium, 50.0),
            rec("second", "y", Priority::Medium, 50.0),
        ]);

        assert_eq!(ranked[0].table, "first");
        assert_eq!(ranked[1].table, "second");
    }

    #[test]
    fn test_dedup_keeps_higher_priority() {
        let deduped = dedup_recommendations(vec![
            rec("leads", "tenant_id", Priority::Medium, 40.0),
            rec("leads", "tenant_id", Priority::High, 20.0),
        ]);

        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].priority, Priority::High);
    }

    #[test]
    fn test_dedup_keeps_higher_improvement_on_equal_priority() {
        let deduped = dedup_recommendations(vec![
            rec("leads", "tenant_id", Priority::Medium, 40.0),
            rec("leads", "tenant_id", Priority::Medium, 80.0),
        ]);

        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].estimated_improvement, 80.0);
    }

    #[test]
    fn test_dedup_distinguishes_column_sets() {
        let deduped = dedup_recommendations(vec![
            rec("leads", "tenant_id", Priority::Medium, 40.0),
            rec("leads", "status", Priority::Medium, 40.0),
        ]);

        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn test_improvement_clamped_to_range() {
        let over = rec("a", "x", Priority::Low, 150.0);
        assert_eq!(over.estimated_improvement, 100.0);

        let under = rec("a", "x", Priority::Low, -5.0);
        assert_eq!(under.estimated_improvement, 0.0);
    }
}

mod text_helper_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_where_clause_extraction() {
        assert_eq!(
            where_clause("SELECT id FROM leads WHERE tenant_id = $1 ORDER BY id"),
            Some("tenant_id = $1")
        );
        assert_eq!(where_clause("SELECT id FROM leads"), None);
    }

    #[test]
    fn test_where_columns_with_conjunctions() {
        let columns =
            extract_where_columns("tenant_id = $1 AND status = 'active' OR source = 'web'");
        assert_eq!(columns, vec!["tenant_id", "status", "source"]);
    }

    #[test]
    fn test_where_columns_with_qualified_names() {
        let columns = extract_where_columns("leads.tenant_id = $1");
        assert_eq!(columns, vec!["tenant_id"]);
    }

    #[test]
    fn test_where_columns_skip_json_paths() {
        let columns = extract_where_columns("payload->'email' = 'x' AND tenant_id = $1");
        assert_eq!(columns, vec!["tenant_id"]);
    }

    #[test]
    fn test_table_from_query() {
        assert_eq!(
            table_from_query("SELECT * FROM leads WHERE id = 1"),
            Some("leads".to_string())
        );
        assert_eq!(
            table_from_query("SELECT * FROM public.leads"),
            Some("leads".to_string())
        );
        assert_eq!(table_from_query("SELECT 1"), None);
    }

    #[test]
    fn test_json_path_column() {
        assert_eq!(
            json_path_column("payload->'email' = 'x'"),
            Some("payload".to_string())
        );
        assert_eq!(
            json_path_column("payload ->> 'email' = 'x'"),
            Some("payload".to_string())
        );
        assert_eq!(json_path_column("tenant_id = 1"), None);
    }

    #[test]
    fn test_keyword_matching_respects_boundaries() {
        // "ORDER" must not match the "order" inside an identifier
        assert!(find_keyword("SELECT reorder_count FROM leads", "ORDER").is_none());
        assert!(find_keyword("SELECT x FROM leads ORDER BY x", "ORDER").is_some());
    }
}
