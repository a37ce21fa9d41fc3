//! End-to-end properties of the lineage engine

use chrono::{TimeZone, Utc};
use st_sql::ast::adapt_statement;
use st_sql::qualify::Qualifier;
use st_sql::{
    compute_lineage, EdgeKind, LineageEngine, LineageOptions, LineageResult, SqlParser,
    TableDefaults,
};

fn engine() -> LineageEngine {
    LineageEngine::new(
        LineageOptions::default().with_now(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
    )
}

fn lineage(sql: &str) -> LineageResult {
    engine().compute(sql, "bigquery", None).unwrap()
}

const REPORT_SQL: &str = "\
WITH paid AS (
    SELECT o.order_id, o.customer_id, o.amount, o.created_at
    FROM `acme.shop.orders` o
    WHERE o.status = 'paid'
),
enriched AS (
    SELECT p.*, c.country
    FROM paid p
    LEFT JOIN `acme.crm.customers` c ON p.customer_id = c.id
)
SELECT e.country AS label, SUM(e.amount) AS value
FROM enriched e
JOIN acme.ref.countries k ON e.country = k.code AND k.active = TRUE
WHERE e.created_at >= '2024-01-01'
GROUP BY e.country
HAVING SUM(e.amount) > 0";

#[test]
fn determinism() {
    let first = serde_json::to_string(&lineage(REPORT_SQL)).unwrap();
    for _ in 0..5 {
        assert_eq!(serde_json::to_string(&lineage(REPORT_SQL)).unwrap(), first);
    }
}

#[test]
fn base_table_completeness() {
    let result = lineage(
        "WITH a AS (SELECT * FROM t1), b AS (SELECT * FROM a JOIN t2 ON a.id = t2.id) SELECT * FROM b",
    );
    assert_eq!(result.source_names(), vec!["t1", "t2"]);

    let report = lineage(REPORT_SQL);
    assert_eq!(
        report.source_names(),
        vec!["acme.crm.customers", "acme.ref.countries", "acme.shop.orders"]
    );
}

#[test]
fn cte_closure_reaches_root() {
    let res = engine()
        .resolve_ctes(
            "WITH c AS (SELECT * FROM t1), b AS (SELECT * FROM c), a AS (SELECT * FROM b) SELECT * FROM a",
            "bigquery",
        )
        .unwrap();
    let bases: Vec<&str> = res.bases("a").unwrap().iter().map(|t| t.as_str()).collect();
    assert_eq!(bases, vec!["t1"]);
}

#[test]
fn join_resolution() {
    let result = lineage("SELECT * FROM orders o JOIN customers c ON o.customer_id = c.id");
    assert_eq!(result.joins.len(), 1);
    let join = &result.joins[0];
    assert_eq!(join.left_table, "orders");
    assert_eq!(join.right_table, "customers");
    assert_eq!(
        join.equality_pairs,
        vec![("o.customer_id".to_string(), "c.id".to_string())]
    );

    let json = serde_json::to_value(join).unwrap();
    assert_eq!(json["id"], "J1");
    assert_eq!(json["equality_pairs"][0][0], "o.customer_id");
    assert_eq!(json["equality_pairs"][0][1], "c.id");
}

#[test]
fn output_alias_extraction() {
    let result = lineage("SELECT date AS x, SUM(amount) AS y FROM sales GROUP BY date");
    let outputs = result.outputs.as_ref().unwrap();
    assert_eq!(outputs.x.as_deref(), Some("date"));
    assert_eq!(outputs.y.as_deref(), Some("SUM(amount)"));
    assert_eq!(result.group_by, vec!["date"]);
    let aggs: Vec<_> = result.graph.nodes_of_type("aggregation").collect();
    assert_eq!(aggs.len(), 1);
    assert_eq!(aggs[0].label, "SUM(amount)");
}

#[test]
fn qualification_does_not_change_sources_or_joins() {
    let with = lineage(REPORT_SQL);
    let without = LineageEngine::new(LineageOptions {
        qualify_columns: false,
        ..LineageOptions::default()
    })
    .compute(REPORT_SQL, "bigquery", None)
    .unwrap();
    assert_eq!(with.sources, without.sources);
    assert_eq!(with.joins, without.joins);

    let stmt = SqlParser::bigquery().parse_single(REPORT_SQL).unwrap();
    let root = adapt_statement(&stmt);
    let defaults = TableDefaults::default();
    let once = Qualifier::new(&defaults, None).qualify(&root).unwrap();
    let twice = Qualifier::new(&defaults, None).qualify(&once).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn report_query_shape() {
    let result = lineage(REPORT_SQL);

    assert_eq!(result.joins.len(), 2);
    let left = &result.joins[0];
    assert_eq!(left.kind, "LEFT");
    assert_eq!(left.left_table, "acme.shop.orders");
    assert_eq!(left.right_table, "acme.crm.customers");

    // `enriched` reads two tables, so it stays a CTE operand
    let outer = &result.joins[1];
    assert_eq!(outer.left_table, "enriched");
    assert_eq!(outer.right_table, "acme.ref.countries");
    assert_eq!(outer.equality_pairs.len(), 2);
    assert_eq!(
        outer.equality_pairs[0],
        ("e.country".to_string(), "k.code".to_string())
    );
    assert!(result.graph.node("true").is_none());

    assert_eq!(
        result.filters,
        vec![
            "o.status = 'paid'",
            "e.created_at >= '2024-01-01'",
            "SUM(e.amount) > 0"
        ]
    );
    assert_eq!(result.group_by, vec!["e.country"]);

    let g = &result.graph;
    assert!(g.has_edge("database:acme", "schema:acme.shop", EdgeKind::Contains));
    assert!(g.has_edge("schema:acme.shop", "acme.shop.orders", EdgeKind::Contains));
    assert!(g.has_edge("acme.shop.orders", "e.amount", EdgeKind::Contains));
    assert!(g.has_edge("acme.crm.customers", "e.amount", EdgeKind::Contains));
    assert!(g.has_edge("J2", "acme.ref.countries", EdgeKind::JoinOutput));
    assert!(g.has_edge("e.country", "kpi", EdgeKind::Dimension));
    assert!(g.has_edge("e.amount", "agg:SUM(e.amount)", EdgeKind::Measure));

    assert_eq!(
        result.hierarchy.physical.len()
            + result.hierarchy.logical.len()
            + result.hierarchy.semantic.len(),
        g.nodes.len()
    );
    assert!(result.hierarchy.logical.contains(&"J1".to_string()));
    assert!(result.hierarchy.semantic.contains(&"kpi".to_string()));
}

#[test]
fn graceful_degradation() {
    let sqls = [
        "SELECT id, ROW_NUMBER() OVER (PARTITION BY region ORDER BY ts DESC) AS rn FROM events",
        "SELECT * FROM (SELECT * FROM (SELECT a FROM deep) x) y JOIN other o ON y.a = o.a",
        "SELECT u.id FROM users u, UNNEST(u.tags) AS tag",
        "SELECT a FROM t1 UNION ALL SELECT a FROM t2",
        "INSERT INTO target SELECT a FROM staging",
        "SELECT 1",
    ];
    for sql in sqls {
        let result = lineage(sql);
        let json = serde_json::to_value(&result).unwrap();
        for key in ["sources", "joins", "filters", "groupBy", "graph", "hierarchy", "governance"] {
            assert!(json.get(key).is_some(), "{}: missing {}", sql, key);
        }
        assert_eq!(result.graph.nodes_of_type("kpi").count(), 1, "{}", sql);
    }

    let nested = lineage(sqls[1]);
    assert_eq!(nested.source_names(), vec!["deep", "other"]);
    assert_eq!(nested.joins.len(), 1);
    assert_eq!(nested.joins[0].right_table, "other");

    let unnest = lineage(sqls[2]);
    assert_eq!(unnest.source_names(), vec!["users"]);
    assert_eq!(unnest.joins.len(), 1);
    assert_eq!(unnest.joins[0].kind, "CROSS");
    assert_eq!(unnest.joins[0].right_table, "tag");

    let union = lineage(sqls[3]);
    assert_eq!(union.source_names(), vec!["t1", "t2"]);

    let insert = lineage(sqls[4]);
    assert_eq!(insert.source_names(), vec!["staging"]);
}

#[test]
fn default_entry_point() {
    let result = compute_lineage("SELECT a AS x FROM t", "bigquery", None).unwrap();
    assert_eq!(result.governance.created_by, "strata");
    assert!(!result.governance.last_modified.is_empty());
}
