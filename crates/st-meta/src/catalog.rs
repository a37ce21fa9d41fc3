//! YAML table catalog
//!
//! ```yaml
//! projects:
//!   acme:
//!     shop:
//!       orders:
//!         row_count: 1200
//!         columns:
//!           amount: { type: NUMERIC, description: Order total }
//!           email: { type: STRING, pii: true }
//! ```

use crate::error::{MetaError, MetaResult};
use serde::{Deserialize, Serialize};
use st_core::{MetadataError, TableMetadata, TableMetadataLookup};
use std::collections::BTreeMap;
use std::path::Path;

type Tables = BTreeMap<String, TableMetadata>;
type Datasets = BTreeMap<String, Tables>;

/// Table metadata keyed by project, dataset, and table name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    #[serde(default)]
    projects: BTreeMap<String, Datasets>,
}

impl Catalog {
    /// Load a catalog from a YAML file
    pub fn load(path: &Path) -> MetaResult<Self> {
        if !path.exists() {
            return Err(MetaError::CatalogNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| MetaError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let catalog = Self::from_yaml_str(&content)?;
        log::debug!(
            "Loaded catalog from {} ({} tables)",
            path.display(),
            catalog.table_count()
        );
        Ok(catalog)
    }

    /// Parse a catalog from YAML text
    pub fn from_yaml_str(content: &str) -> MetaResult<Self> {
        let catalog: Catalog = serde_yaml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Register (or replace) one table.
    pub fn insert(&mut self, project: &str, dataset: &str, table: &str, meta: TableMetadata) {
        self.projects
            .entry(project.to_string())
            .or_default()
            .entry(dataset.to_string())
            .or_default()
            .insert(table.to_string(), meta);
    }

    /// Number of tables across all projects
    pub fn table_count(&self) -> usize {
        self.projects
            .values()
            .flat_map(|datasets| datasets.values())
            .map(|tables| tables.len())
            .sum()
    }

    /// Fully qualified names of every table, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .projects
            .iter()
            .flat_map(|(p, datasets)| {
                datasets.iter().flat_map(move |(d, tables)| {
                    tables.keys().map(move |t| format!("{}.{}.{}", p, d, t))
                })
            })
            .collect();
        names.sort();
        names
    }

    /// Find a table, ignoring ASCII case on every segment.
    pub fn get(&self, project: &str, dataset: &str, table: &str) -> Option<&TableMetadata> {
        let datasets = get_ignore_case(&self.projects, project)?;
        let tables = get_ignore_case(datasets, dataset)?;
        get_ignore_case(tables, table)
    }

    fn validate(&self) -> MetaResult<()> {
        check_keys(self.projects.keys(), "")?;
        for (project, datasets) in &self.projects {
            check_keys(datasets.keys(), project)?;
            for (dataset, tables) in datasets {
                check_keys(tables.keys(), &format!("{}.{}", project, dataset))?;
            }
        }
        Ok(())
    }
}

impl TableMetadataLookup for Catalog {
    fn lookup_table(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
    ) -> Result<TableMetadata, MetadataError> {
        self.get(project, dataset, table)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound {
                project: project.to_string(),
                dataset: dataset.to_string(),
                table: table.to_string(),
            })
    }
}

fn get_ignore_case<'a, V>(map: &'a BTreeMap<String, V>, key: &str) -> Option<&'a V> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// Identifiers must be single non-empty segments, unique ignoring case.
fn check_keys<'a>(keys: impl Iterator<Item = &'a String>, parent: &str) -> MetaResult<()> {
    let mut seen: Vec<String> = Vec::new();
    for key in keys {
        let entry = if parent.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", parent, key)
        };
        if key.trim().is_empty() {
            return Err(MetaError::InvalidEntry {
                entry,
                reason: "empty identifier".to_string(),
            });
        }
        if key.contains('.') {
            return Err(MetaError::InvalidEntry {
                entry,
                reason: "identifier must not contain '.'".to_string(),
            });
        }
        let folded = key.to_ascii_lowercase();
        if seen.contains(&folded) {
            return Err(MetaError::InvalidEntry {
                entry,
                reason: "duplicate identifier (case-insensitive)".to_string(),
            });
        }
        seen.push(folded);
    }
    Ok(())
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
