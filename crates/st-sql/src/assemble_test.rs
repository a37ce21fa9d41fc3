use super::*;
use crate::graph::LineageGraph;
use crate::lineage::LineageEngine;
use crate::options::LineageOptions;

fn graph(sql: &str) -> LineageGraph {
    LineageEngine::new(LineageOptions::default())
        .compute(sql, "bigquery", None)
        .unwrap()
        .graph
}

fn graph_with_width(sql: &str, width: usize) -> LineageGraph {
    let options = LineageOptions {
        join_label_width: width,
        ..LineageOptions::default()
    };
    LineageEngine::new(options)
        .compute(sql, "bigquery", None)
        .unwrap()
        .graph
}

#[test]
fn test_detect_aggregation() {
    let agg = detect_aggregation("sum(o.amount)").unwrap();
    assert_eq!(agg.function, "SUM");
    assert_eq!(agg.args, "o.amount");
    assert_eq!(agg.label(), "SUM(o.amount)");
    assert_eq!(agg.node_id(), "agg:SUM(o.amount)");

    assert_eq!(detect_aggregation("COUNT(DISTINCT id)").unwrap().args, "DISTINCT id");
    assert!(detect_aggregation("ROUND(SUM(a), 2)").is_none());
    assert!(detect_aggregation("a + b").is_none());
}

#[test]
fn test_detect_aggregation_requires_one_enclosing_call() {
    assert!(detect_aggregation("SUM(a) / SUM(b)").is_none());
    assert!(detect_aggregation("MAX(a) - MIN(a)").is_none());

    let nested = detect_aggregation("SUM(COALESCE(a, 0) * (1 - b))").unwrap();
    assert_eq!(nested.args, "COALESCE(a, 0) * (1 - b)");
    assert_eq!(detect_aggregation("COUNT(')')").unwrap().args, "')'");
}

#[test]
fn test_truncate_label() {
    assert_eq!(truncate_label("a.id = b.id", 48), "a.id = b.id");
    assert_eq!(truncate_label("abcdefghijkl", 8), "abcde...");
    assert_eq!(truncate_label("abcdefgh", 8), "abcdefgh");
}

#[test]
fn test_single_aggregation_node() {
    let g = graph("SELECT date AS x, SUM(amount) AS y FROM sales GROUP BY date");
    let aggs: Vec<_> = g.nodes_of_type("aggregation").collect();
    assert_eq!(aggs.len(), 1);
    assert_eq!(aggs[0].label, "SUM(amount)");
    assert!(g.has_edge("sales.amount", &aggs[0].id, EdgeKind::Measure));
    assert!(g.has_edge(&aggs[0].id, KPI_NODE_ID, EdgeKind::Derives));
    assert!(g.has_edge("sales.date", KPI_NODE_ID, EdgeKind::Dimension));
}

#[test]
fn test_exactly_one_kpi_node() {
    for sql in [
        "SELECT a FROM t",
        "SELECT COUNT(*) AS value, region AS label FROM t GROUP BY region",
    ] {
        assert_eq!(graph(sql).nodes_of_type("kpi").count(), 1);
    }
}

#[test]
fn test_kpi_detail() {
    let g = graph("SELECT region AS label, AVG(price) AS value FROM t GROUP BY region");
    match &g.node(KPI_NODE_ID).unwrap().detail {
        NodeDetail::Kpi {
            expression,
            dimensions,
            owner,
            ..
        } => {
            assert_eq!(expression.as_deref(), Some("AVG(price)"));
            assert_eq!(dimensions, &vec!["region".to_string()]);
            assert_eq!(owner, "unassigned");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_join_nodes_and_edges() {
    let g = graph(
        "SELECT c.country AS x, SUM(o.amount) AS y \
         FROM orders o JOIN customers c ON o.customer_id = c.id GROUP BY c.country",
    );
    let join = g.node("J1").unwrap();
    assert_eq!(join.label, "o.customer_id = c.id");
    assert!(g.has_edge("o.customer_id", "J1", EdgeKind::JoinInput));
    assert!(g.has_edge("c.id", "J1", EdgeKind::JoinInput));
    assert!(g.has_edge("J1", "customers", EdgeKind::JoinOutput));
    assert!(g.has_edge("orders", "customers", EdgeKind::JoinTable));
    assert!(g.has_edge("o.customer_id", "c.id", EdgeKind::Join));
    assert!(g.has_edge("J1", "agg:SUM(o.amount)", EdgeKind::JoinOutput));
    assert!(g.has_edge("orders", "o.amount", EdgeKind::Contains));
    assert!(g.has_edge("customers", "x", EdgeKind::Derives));
    assert!(g.has_edge("c.country", KPI_NODE_ID, EdgeKind::Dimension));
}

#[test]
fn test_join_label_truncated() {
    let g = graph_with_width(
        "SELECT * FROM orders o JOIN customers c ON o.customer_id = c.id AND o.region = c.region",
        12,
    );
    let join = g.node("J1").unwrap();
    assert_eq!(join.label, "o.custome...");
    match &join.detail {
        NodeDetail::Join { on, kind } => {
            assert_eq!(kind, "JOIN");
            assert_eq!(on, "o.customer_id = c.id AND o.region = c.region");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_cross_join_label_without_condition() {
    let g = graph("SELECT * FROM a CROSS JOIN b");
    assert_eq!(g.node("J1").unwrap().label, "CROSS JOIN b");
    assert!(g.has_edge("a", "b", EdgeKind::JoinTable));
}

#[test]
fn test_multi_base_cte_column_contained_in_every_base() {
    let g = graph(
        "WITH m AS (SELECT t1.id, t2.v FROM t1 JOIN t2 ON t1.id = t2.id) \
         SELECT m.v AS value FROM m",
    );
    assert!(g.has_edge("t1", "m.v", EdgeKind::Contains));
    assert!(g.has_edge("t2", "m.v", EdgeKind::Contains));
    assert!(g.has_edge("t1", "value", EdgeKind::Derives));
    assert!(g.has_edge("t2", "value", EdgeKind::Derives));
    match &g.node("m.v").unwrap().detail {
        NodeDetail::Column { table, .. } => assert!(table.is_none()),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_group_by_ordinal_and_alias() {
    let g = graph("SELECT o.region AS label, COUNT(*) AS value FROM orders o GROUP BY 1");
    assert!(g.has_edge("o.region", KPI_NODE_ID, EdgeKind::Dimension));

    let g = graph("SELECT LOWER(o.region) AS lbl, COUNT(*) AS value FROM orders o GROUP BY lbl");
    assert!(g.has_edge("o.region", KPI_NODE_ID, EdgeKind::Dimension));
}

#[test]
fn test_date_part_is_not_a_column() {
    let g = graph(
        "SELECT DATE_TRUNC(order_date, MONTH) AS x, SUM(amount) AS y FROM sales GROUP BY 1",
    );
    assert!(g.node("sales.MONTH").is_none());
    assert!(g.nodes.iter().all(|n| n.label != "MONTH"));
    assert!(g.has_edge("sales", "sales.order_date", EdgeKind::Contains));
    assert!(g.has_edge("sales.order_date", KPI_NODE_ID, EdgeKind::Dimension));
}

#[test]
fn test_output_alias_wins_over_same_named_column() {
    let g = graph("SELECT a AS b, b AS c FROM t JOIN u ON t.id = u.id");
    assert!(matches!(g.node("b").unwrap().detail, NodeDetail::Output));
    assert!(matches!(g.node("c").unwrap().detail, NodeDetail::Output));
    assert!(g.has_edge("a", "b", EdgeKind::Projection));
    assert!(g.nodes_of_type("column").all(|n| n.id != "b"));
}

#[test]
fn test_no_duplicate_ids() {
    let g = graph(
        "WITH r AS (SELECT * FROM raw.orders) \
         SELECT r.day AS x, SUM(r.amount) AS y FROM r JOIN raw.days d ON r.day = d.day GROUP BY r.day",
    );
    let mut ids: Vec<&str> = g.nodes.iter().map(|n| n.id.as_str()).collect();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);
    assert!(g.has_edge("raw.orders", "r.amount", EdgeKind::Contains));
}

#[test]
fn test_edges_reference_existing_nodes() {
    let g = graph(
        "SELECT s.k AS label, MAX(s.v) AS value \
         FROM (SELECT k, v FROM src) s LEFT JOIN dim ON s.k = dim.k GROUP BY s.k",
    );
    for edge in &g.edges {
        assert!(g.node(&edge.source).is_some(), "dangling source {}", edge.source);
        assert!(g.node(&edge.target).is_some(), "dangling target {}", edge.target);
    }
}
