//! Metadata enrichment of table and column nodes

use crate::graph::{LineageGraph, NodeDetail};
use st_core::{TableId, TableMetadata, TableMetadataLookup};
use std::collections::HashMap;

/// Decorate table nodes with row counts and column nodes with type,
/// description and PII flag. Lookups happen once per table; any failure
/// leaves the affected fields unset.
pub fn enrich_graph(graph: &mut LineageGraph, provider: &dyn TableMetadataLookup) {
    let mut cache: HashMap<String, Option<TableMetadata>> = HashMap::new();

    for node in &mut graph.nodes {
        match &mut node.detail {
            NodeDetail::Table { row_count, .. } => {
                if let Some(meta) = lookup(&mut cache, provider, &node.id) {
                    *row_count = meta.row_count;
                }
            }
            NodeDetail::Column {
                table: Some(table),
                data_type,
                description,
                pii,
            } => {
                let Some(meta) = lookup(&mut cache, provider, table) else {
                    continue;
                };
                if let Some(column) = meta.column(&node.label) {
                    *data_type = Some(column.data_type.clone());
                    *description = column.description.clone();
                    *pii = column.pii;
                }
            }
            _ => {}
        }
    }
}

fn lookup<'c>(
    cache: &'c mut HashMap<String, Option<TableMetadata>>,
    provider: &dyn TableMetadataLookup,
    table: &str,
) -> Option<&'c TableMetadata> {
    cache
        .entry(table.to_string())
        .or_insert_with(|| {
            let id = TableId::parse(table).ok()?;
            let (Some(project), Some(dataset)) = (id.project(), id.dataset()) else {
                log::debug!("Skipping metadata for {}: not project.dataset.table", table);
                return None;
            };
            match provider.lookup_table(project, dataset, id.short_name()) {
                Ok(meta) => Some(meta),
                Err(e) => {
                    log::debug!("Metadata unavailable for {}: {}", table, e);
                    None
                }
            }
        })
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use st_core::{ColumnMetadata, MetadataError};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
    }

    impl TableMetadataLookup for Counting {
        fn lookup_table(
            &self,
            project: &str,
            dataset: &str,
            table: &str,
        ) -> Result<TableMetadata, MetadataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if table != "orders" {
                return Err(MetadataError::Unavailable("backend down".to_string()));
            }
            assert_eq!((project, dataset), ("p", "d"));
            let mut columns = BTreeMap::new();
            columns.insert(
                "email".to_string(),
                ColumnMetadata {
                    data_type: "STRING".to_string(),
                    description: Some("Buyer email".to_string()),
                    pii: true,
                },
            );
            Ok(TableMetadata {
                row_count: Some(1200),
                columns,
            })
        }
    }

    fn graph() -> LineageGraph {
        let mut b = GraphBuilder::new(true);
        for t in ["p.d.orders", "p.d.refunds", "local"] {
            b.add_node(
                t,
                t,
                NodeDetail::Table {
                    database: None,
                    schema: None,
                    row_count: None,
                },
            );
        }
        b.add_node(
            "o.email",
            "email",
            NodeDetail::Column {
                table: Some("p.d.orders".to_string()),
                data_type: None,
                description: None,
                pii: false,
            },
        );
        b.add_node(
            "r.reason",
            "reason",
            NodeDetail::Column {
                table: Some("p.d.refunds".to_string()),
                data_type: None,
                description: None,
                pii: false,
            },
        );
        b.build()
    }

    #[test]
    fn test_enrich_tables_and_columns() {
        let provider = Counting {
            calls: AtomicUsize::new(0),
        };
        let mut g = graph();
        enrich_graph(&mut g, &provider);

        match &g.node("p.d.orders").unwrap().detail {
            NodeDetail::Table { row_count, .. } => assert_eq!(*row_count, Some(1200)),
            other => panic!("unexpected {:?}", other),
        }
        match &g.node("o.email").unwrap().detail {
            NodeDetail::Column {
                data_type,
                description,
                pii,
                ..
            } => {
                assert_eq!(data_type.as_deref(), Some("STRING"));
                assert_eq!(description.as_deref(), Some("Buyer email"));
                assert!(*pii);
            }
            other => panic!("unexpected {:?}", other),
        }
        // orders and refunds looked up once each; `local` is never looked up
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failures_leave_fields_unset() {
        let provider = Counting {
            calls: AtomicUsize::new(0),
        };
        let mut g = graph();
        enrich_graph(&mut g, &provider);
        match &g.node("r.reason").unwrap().detail {
            NodeDetail::Column { data_type, pii, .. } => {
                assert!(data_type.is_none());
                assert!(!*pii);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
