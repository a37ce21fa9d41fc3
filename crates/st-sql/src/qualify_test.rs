use super::*;
use crate::ast::adapt_statement;
use crate::parser::SqlParser;
use st_core::{ColumnMetadata, MetadataError};
use std::collections::BTreeMap;

fn adapt(sql: &str) -> AstNode {
    adapt_statement(&SqlParser::bigquery().parse_single(sql).unwrap())
}

fn column_texts(root: &AstNode) -> Vec<String> {
    root.find_all(NodeKind::Column)
        .iter()
        .map(|c| c.sql().to_string())
        .collect()
}

fn qualify(sql: &str) -> AstNode {
    let defaults = TableDefaults::default();
    Qualifier::new(&defaults, None).qualify(&adapt(sql)).unwrap()
}

/// Knows `shop.orders(id, amount, customer_id)` and `shop.customers(id, name)`
struct ShopMetadata;

impl TableMetadataLookup for ShopMetadata {
    fn lookup_table(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
    ) -> Result<TableMetadata, MetadataError> {
        let columns: &[&str] = match (project, dataset, table) {
            ("acme", "shop", "orders") => &["id", "amount", "customer_id"],
            ("acme", "shop", "customers") => &["id", "name"],
            _ => {
                return Err(MetadataError::NotFound {
                    project: project.to_string(),
                    dataset: dataset.to_string(),
                    table: table.to_string(),
                })
            }
        };
        Ok(TableMetadata {
            row_count: None,
            columns: columns
                .iter()
                .map(|c| {
                    (
                        c.to_string(),
                        ColumnMetadata {
                            data_type: "STRING".to_string(),
                            description: None,
                            pii: false,
                        },
                    )
                })
                .collect::<BTreeMap<_, _>>(),
        })
    }
}

#[test]
fn test_single_relation_uses_alias() {
    let root = qualify("SELECT amount AS y FROM orders o WHERE status = 'paid'");
    assert_eq!(column_texts(&root), vec!["o.amount", "o.status"]);
}

#[test]
fn test_single_relation_uses_short_name() {
    let root = qualify("SELECT date AS x, SUM(amount) AS y FROM ds.sales GROUP BY date");
    assert_eq!(
        column_texts(&root),
        vec!["sales.date", "sales.amount", "sales.date"]
    );
}

#[test]
fn test_projection_alias_not_qualified_outside_projection() {
    let root = qualify("SELECT region AS r, COUNT(*) AS n FROM t GROUP BY r");
    assert_eq!(column_texts(&root), vec!["t.region", "r"]);
}

#[test]
fn test_multiple_relations_without_metadata_untouched() {
    let root = qualify("SELECT amount, c.name FROM orders o JOIN customers c ON o.customer_id = c.id");
    assert!(column_texts(&root).contains(&"amount".to_string()));
}

#[test]
fn test_metadata_disambiguates() {
    let defaults = TableDefaults {
        project: Some("acme".to_string()),
        dataset: None,
    };
    let provider = ShopMetadata;
    let root = Qualifier::new(&defaults, Some(&provider))
        .qualify(&adapt(
            "SELECT amount, name, id FROM shop.orders o JOIN shop.customers c ON o.customer_id = c.id",
        ))
        .unwrap();
    let cols = column_texts(&root);
    assert!(cols.contains(&"o.amount".to_string()));
    assert!(cols.contains(&"c.name".to_string()));
    // `id` exists in both tables
    assert!(cols.contains(&"id".to_string()));
}

#[test]
fn test_nested_scopes_qualified_independently() {
    let root = qualify("SELECT total FROM (SELECT SUM(amount) AS total FROM orders) s");
    let cols = column_texts(&root);
    assert!(cols.contains(&"s.total".to_string()));
    assert!(cols.contains(&"orders.amount".to_string()));
}

#[test]
fn test_idempotent() {
    let once = qualify("SELECT a, b AS x FROM t JOIN u ON t.id = u.id WHERE c > 1");
    let defaults = TableDefaults::default();
    let twice = Qualifier::new(&defaults, None).qualify(&once).unwrap();
    assert_eq!(once, twice);

    let single = qualify("SELECT a, b AS x FROM t WHERE c > 1 GROUP BY x");
    let again = Qualifier::new(&defaults, None).qualify(&single).unwrap();
    assert_eq!(single, again);
}

#[test]
fn test_invalid_relation_is_error() {
    let defaults = TableDefaults::default();
    let root = adapt("SELECT a FROM p.d.s.t");
    let err = Qualifier::new(&defaults, None).qualify(&root).unwrap_err();
    assert!(matches!(err, QualifyError::InvalidRelation { .. }));
}
