//! Column-level lineage: projection and join-equality edges

use crate::ast::{AstNode, NodeData, NodeKind};
use crate::joins::JoinRecord;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Column references, named outputs and the edges between them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLineage {
    /// Column ids in discovery order
    pub columns: Vec<String>,
    /// Output names in projection order
    pub outputs: Vec<String>,
    /// `(column, output)`
    pub projection_edges: Vec<(String, String)>,
    /// `(left column, right column)` for each join equality
    pub join_edges: Vec<(String, String)>,
}

impl ColumnLineage {
    fn add_column(&mut self, id: &str, seen: &mut BTreeSet<String>) {
        if seen.insert(id.to_string()) {
            self.columns.push(id.to_string());
        }
    }
}

/// Whether `text` renders a column reference rather than a literal or expression
fn is_column_text(text: &str) -> bool {
    if ["true", "false", "null"]
        .iter()
        .any(|kw| text.eq_ignore_ascii_case(kw))
    {
        return false;
    }
    static COLUMN: OnceLock<Regex> = OnceLock::new();
    COLUMN
        .get_or_init(|| {
            Regex::new(r#"^(?:[A-Za-z_][\w-]*|`[^`]+`|"[^"]+")(?:\.(?:[A-Za-z_]\w*|`[^`]+`|"[^"]+"))*$"#)
                .expect("valid regex")
        })
        .is_match(text)
}

/// Link the columns of each named projection of the outermost SELECT to
/// its output name, and the operands of every join equality to each other.
///
/// A projection is named by its alias, or by the column it selects. A bare
/// column whose text equals its own name contributes no edge.
pub fn build_column_lineage(root: &AstNode, joins: &[JoinRecord]) -> ColumnLineage {
    let mut lineage = ColumnLineage::default();
    let mut seen = BTreeSet::new();

    if let Some(select) = root.main_select() {
        for projection in select.children.iter().filter(|c| c.kind() == NodeKind::Projection) {
            let NodeData::Projection { name: Some(name), .. } = &projection.data else {
                continue;
            };
            for column in projection.find_all_in_scope(NodeKind::Column) {
                let id = column.sql();
                if id == name {
                    continue;
                }
                lineage.add_column(id, &mut seen);
                lineage
                    .projection_edges
                    .push((id.to_string(), name.clone()));
            }
            if !lineage.outputs.contains(name) {
                lineage.outputs.push(name.clone());
            }
        }
    }

    for join in joins {
        for (left, right) in &join.equality_pairs {
            if !is_column_text(left) || !is_column_text(right) {
                continue;
            }
            lineage.add_column(left, &mut seen);
            lineage.add_column(right, &mut seen);
            lineage.join_edges.push((left.clone(), right.clone()));
        }
    }

    lineage
}
