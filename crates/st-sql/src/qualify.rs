//! Column qualification pass
//!
//! Rewrites unqualified column references to `qualifier.column` wherever the
//! owning relation of a SELECT scope can be determined: the scope has a
//! single relation, or metadata shows exactly one relation owns the column.
//! Projection aliases of the scope are left alone outside the projection
//! list, and already-qualified columns are never touched, so the pass is
//! idempotent.

use crate::ast::{AstNode, NodeData, NodeKind};
use crate::error::QualifyError;
use crate::options::TableDefaults;
use st_core::{TableId, TableMetadata, TableMetadataLookup};
use std::collections::{BTreeSet, HashMap};

/// A relation visible in one SELECT scope
#[derive(Debug, Clone)]
struct ScopeRelation {
    /// Alias, or the table's short name
    qualifier: String,
    /// Physical table behind the relation; `None` for subqueries
    table: Option<TableId>,
}

/// Qualifies columns, consulting `provider` to disambiguate multi-relation scopes.
pub struct Qualifier<'a> {
    defaults: &'a TableDefaults,
    provider: Option<&'a dyn TableMetadataLookup>,
    metadata: HashMap<TableId, Option<TableMetadata>>,
}

impl<'a> Qualifier<'a> {
    pub fn new(defaults: &'a TableDefaults, provider: Option<&'a dyn TableMetadataLookup>) -> Self {
        Self {
            defaults,
            provider,
            metadata: HashMap::new(),
        }
    }

    /// Return a qualified copy of `root`.
    pub fn qualify(&mut self, root: &AstNode) -> Result<AstNode, QualifyError> {
        let mut tree = root.clone();
        self.walk(&mut tree)?;
        Ok(tree)
    }

    fn walk(&mut self, node: &mut AstNode) -> Result<(), QualifyError> {
        if node.kind() == NodeKind::Select {
            self.qualify_scope(node)?;
        }
        for child in &mut node.children {
            self.walk(child)?;
        }
        Ok(())
    }

    fn qualify_scope(&mut self, select: &mut AstNode) -> Result<(), QualifyError> {
        let relations = scope_relations(select, self.defaults)?;
        if relations.is_empty() {
            return Ok(());
        }
        let aliases = projection_aliases(select);

        for child in &mut select.children {
            let in_projection = child.kind() == NodeKind::Projection;
            let mut columns = Vec::new();
            collect_unqualified_mut(child, &mut columns);
            for column in columns {
                let NodeData::Column { parts } = &column.data else {
                    continue;
                };
                let Some(name) = parts.first().cloned() else {
                    continue;
                };
                if !in_projection && aliases.contains(&name.to_lowercase()) {
                    continue;
                }
                if let Some(qualifier) = self.owner_of(&name, &relations) {
                    let sql = format!("{}.{}", qualifier, column.sql());
                    column.set_column_parts(vec![qualifier, name], sql);
                }
            }
        }
        Ok(())
    }

    /// Qualifier of the relation owning an unqualified column, when unique.
    fn owner_of(&mut self, column: &str, relations: &[ScopeRelation]) -> Option<String> {
        if let [only] = relations {
            return (!only.qualifier.is_empty()).then(|| only.qualifier.clone());
        }
        if self.provider.is_none() {
            return None;
        }

        let mut owners = relations.iter().filter_map(|rel| {
            let table = rel.table.as_ref()?;
            let has_column = self.table_metadata(table)?.column(column).is_some();
            has_column.then(|| rel.qualifier.clone())
        });
        let first = owners.next()?;
        match owners.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    fn table_metadata(&mut self, table: &TableId) -> Option<&TableMetadata> {
        let provider = self.provider;
        self.metadata
            .entry(table.clone())
            .or_insert_with(|| {
                let provider = provider?;
                let project = table.project()?;
                let dataset = table.dataset()?;
                match provider.lookup_table(project, dataset, table.short_name()) {
                    Ok(meta) => Some(meta),
                    Err(e) => {
                        log::debug!("No metadata for {} while qualifying: {}", table, e);
                        None
                    }
                }
            })
            .as_ref()
    }
}

/// Relations of a SELECT's own FROM clause, nested queries excluded.
fn scope_relations(
    select: &AstNode,
    defaults: &TableDefaults,
) -> Result<Vec<ScopeRelation>, QualifyError> {
    let Some(from) = select.child(NodeKind::From) else {
        return Ok(Vec::new());
    };
    let mut relations = Vec::new();
    for node in from.find_all_in_scope(NodeKind::Table) {
        let NodeData::Table { path, alias } = &node.data else {
            continue;
        };
        let table = TableId::from_segments(path).map_err(|reason| QualifyError::InvalidRelation {
            name: path.join("."),
            reason,
        })?;
        relations.push(ScopeRelation {
            qualifier: alias
                .clone()
                .unwrap_or_else(|| table.short_name().to_string()),
            table: Some(table.qualify(defaults.project.as_deref(), defaults.dataset.as_deref())),
        });
    }
    for node in from.find_all_in_scope(NodeKind::Subquery) {
        if let NodeData::Subquery { alias } = &node.data {
            // Anonymous subqueries still count towards ambiguity
            relations.push(ScopeRelation {
                qualifier: alias.clone().unwrap_or_default(),
                table: None,
            });
        }
    }
    Ok(relations)
}

/// Lowercased aliases of the SELECT's projections
fn projection_aliases(select: &AstNode) -> BTreeSet<String> {
    select
        .children
        .iter()
        .filter_map(|c| match &c.data {
            NodeData::Projection {
                alias: Some(alias), ..
            } => Some(alias.to_lowercase()),
            _ => None,
        })
        .collect()
}

/// Unqualified column nodes below `node`, not entering nested queries.
fn collect_unqualified_mut<'n>(node: &'n mut AstNode, out: &mut Vec<&'n mut AstNode>) {
    if node.kind() == NodeKind::Column {
        if matches!(&node.data, NodeData::Column { parts } if parts.len() == 1) {
            out.push(node);
        }
        return;
    }
    for child in &mut node.children {
        if child.kind() == NodeKind::Query {
            continue;
        }
        collect_unqualified_mut(child, out);
    }
}

#[cfg(test)]
#[path = "qualify_test.rs"]
mod tests;
