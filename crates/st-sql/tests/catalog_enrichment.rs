//! Lineage backed by a YAML catalog provider

use st_core::TableMetadataLookup;
use st_meta::{CachedLookup, Catalog};
use st_sql::{EdgeKind, LineageEngine, LineageOptions, NodeDetail};

const CATALOG: &str = r#"
projects:
  acme:
    shop:
      orders:
        row_count: 1200
        columns:
          order_id: { type: INT64 }
          customer_id: { type: INT64 }
          amount: { type: NUMERIC, description: Order total }
      customers:
        row_count: 80
        columns:
          id: { type: INT64 }
          email: { type: STRING, pii: true }
          country: { type: STRING }
"#;

const SQL: &str = "\
SELECT country AS label, SUM(amount) AS value
FROM orders o
JOIN customers c ON o.customer_id = c.id
GROUP BY country";

fn engine() -> LineageEngine {
    LineageEngine::new(
        LineageOptions::default().with_defaults(Some("acme".to_string()), Some("shop".to_string())),
    )
}

#[test]
fn catalog_resolves_ambiguous_columns() {
    let catalog = Catalog::from_yaml_str(CATALOG).unwrap();
    let result = engine().compute(SQL, "bigquery", Some(&catalog)).unwrap();

    let g = &result.graph;
    assert!(g.has_edge("c.country", "kpi", EdgeKind::Dimension));
    assert!(g.has_edge("o.amount", "agg:SUM(amount)", EdgeKind::Measure));
    assert!(g.has_edge("acme.shop.orders", "o.amount", EdgeKind::Contains));

    match &g.node("acme.shop.customers").unwrap().detail {
        NodeDetail::Table { row_count, .. } => assert_eq!(*row_count, Some(80)),
        other => panic!("unexpected {:?}", other),
    }
    match &g.node("o.amount").unwrap().detail {
        NodeDetail::Column {
            data_type,
            description,
            pii,
            ..
        } => {
            assert_eq!(data_type.as_deref(), Some("NUMERIC"));
            assert_eq!(description.as_deref(), Some("Order total"));
            assert!(!pii);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn without_catalog_ambiguous_columns_stay_bare() {
    let result = engine().compute(SQL, "bigquery", None).unwrap();
    assert!(result.graph.node("country").is_some());
    assert!(result.graph.node("c.country").is_none());
}

#[test]
fn cached_catalog_answers_each_table_once() {
    let cache = CachedLookup::new(Catalog::from_yaml_str(CATALOG).unwrap());
    let provider: &dyn TableMetadataLookup = &cache;

    let first = engine().compute(SQL, "bigquery", Some(provider)).unwrap();
    assert_eq!(cache.cached_entries(), 2);

    let second = engine()
        .compute(
            "SELECT c.email FROM customers c JOIN refunds r ON c.id = r.customer_id",
            "bigquery",
            Some(provider),
        )
        .unwrap();
    assert_eq!(cache.cached_entries(), 3);

    assert_eq!(first.sources.len(), 2);
    match &second.graph.node("c.email").unwrap().detail {
        NodeDetail::Column { pii, .. } => assert!(*pii),
        other => panic!("unexpected {:?}", other),
    }
}
