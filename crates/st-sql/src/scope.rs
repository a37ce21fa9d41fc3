//! Source tables, alias map and column-to-table inference

use crate::ast::{AstNode, NodeData, NodeKind};
use crate::cte::{cte_key, CteResolution};
use crate::options::TableDefaults;
use st_core::{CteName, TableId};
use std::collections::{BTreeMap, BTreeSet};

/// What a short identifier in the query refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    Table(TableId),
    /// A CTE that does not collapse to a single base table
    Cte(CteName),
}

/// Owner of a column reference as far as it can be inferred
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnOwner {
    Table(TableId),
    Cte(CteName),
    Unresolved,
}

/// Every physical table read by the statement, CTE names excluded.
pub fn collect_sources(
    root: &AstNode,
    ctes: &CteResolution,
    defaults: &TableDefaults,
) -> BTreeSet<TableId> {
    let mut sources = BTreeSet::new();
    for table in root.find_all(NodeKind::Table) {
        let NodeData::Table { path, .. } = &table.data else {
            continue;
        };
        if cte_key(path, &ctes.base_deps).is_some() {
            continue;
        }
        if let Some(id) = defaults.resolve(path) {
            sources.insert(id);
        }
    }
    sources
}

/// Lowercased short identifier to the table or CTE it stands for.
///
/// Built once per statement. Explicit aliases take precedence, then CTE
/// names, then the short names of source tables.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    entries: BTreeMap<String, AliasTarget>,
}

impl AliasMap {
    pub fn build(
        root: &AstNode,
        sources: &BTreeSet<TableId>,
        ctes: &CteResolution,
        defaults: &TableDefaults,
    ) -> Self {
        let mut entries = BTreeMap::new();

        for table in root.find_all(NodeKind::Table) {
            let NodeData::Table {
                path,
                alias: Some(alias),
            } = &table.data
            else {
                continue;
            };
            let target = match cte_key(path, &ctes.base_deps) {
                Some(key) => cte_target(&key, ctes),
                None => defaults.resolve(path).map(AliasTarget::Table),
            };
            if let Some(target) = target {
                entries.insert(alias.to_lowercase(), target);
            }
        }

        for key in ctes.base_deps.keys() {
            if let Some(target) = cte_target(key, ctes) {
                entries.entry(key.clone()).or_insert(target);
            }
        }

        for source in sources {
            entries
                .entry(source.short_name().to_lowercase())
                .or_insert_with(|| AliasTarget::Table(source.clone()));
        }

        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&AliasTarget> {
        self.entries.get(&key.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name a table operand as written (`cte`, `table`, `ds.table`) by the
    /// table it reads, seeing through single-base CTEs. Multi-base CTEs keep
    /// their name; unresolvable paths come back as written.
    pub fn resolve_relation(
        &self,
        path: &[String],
        ctes: &CteResolution,
        defaults: &TableDefaults,
    ) -> String {
        if let Some(key) = cte_key(path, &ctes.base_deps) {
            return match cte_target(&key, ctes) {
                Some(AliasTarget::Table(id)) => id.into_inner(),
                Some(AliasTarget::Cte(name)) => name.into_inner(),
                None => path.join("."),
            };
        }
        defaults
            .resolve(path)
            .map(TableId::into_inner)
            .unwrap_or_else(|| path.join("."))
    }

    /// Infer the table a column reference belongs to.
    ///
    /// `project.dataset.table.col` and `dataset.table.col` name the table
    /// directly; `alias.col` goes through the alias map, falling back to a
    /// bare table name. Unqualified columns are never guessed.
    pub fn infer_table_from_column(&self, column: &str, defaults: &TableDefaults) -> ColumnOwner {
        let cleaned: String = column.chars().filter(|c| *c != '`' && *c != '"').collect();
        let parts: Vec<String> = cleaned.split('.').map(|p| p.trim().to_string()).collect();
        if parts.iter().any(String::is_empty) {
            return ColumnOwner::Unresolved;
        }

        let table_path: &[String] = match parts.len() {
            0 | 1 => return ColumnOwner::Unresolved,
            2 => {
                if let Some(target) = self.get(&parts[0]) {
                    return match target {
                        AliasTarget::Table(id) => ColumnOwner::Table(id.clone()),
                        AliasTarget::Cte(name) => ColumnOwner::Cte(name.clone()),
                    };
                }
                &parts[..1]
            }
            3 => &parts[..2],
            _ => &parts[..3],
        };

        match defaults.resolve(table_path) {
            Some(id) => ColumnOwner::Table(id),
            None => ColumnOwner::Unresolved,
        }
    }

    /// Base tables a column could have been read from. A column owned by a
    /// multi-source CTE is attributed to every base of that CTE.
    pub fn base_tables_for_column(
        &self,
        column: &str,
        ctes: &CteResolution,
        defaults: &TableDefaults,
    ) -> Vec<TableId> {
        match self.infer_table_from_column(column, defaults) {
            ColumnOwner::Table(id) => vec![id],
            ColumnOwner::Cte(name) => ctes
                .bases(&name)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default(),
            ColumnOwner::Unresolved => Vec::new(),
        }
    }
}

fn cte_target(key: &str, ctes: &CteResolution) -> Option<AliasTarget> {
    if let Some(base) = ctes.single_base(key) {
        return Some(AliasTarget::Table(base.clone()));
    }
    ctes.cte_name(key).cloned().map(AliasTarget::Cte)
}

#[cfg(test)]
#[path = "scope_test.rs"]
mod tests;
