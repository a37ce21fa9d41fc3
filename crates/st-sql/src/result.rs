//! Lineage result model

use crate::clauses::Outputs;
use crate::graph::{Hierarchy, LineageGraph};
use crate::joins::JoinRecord;
use serde::{Deserialize, Serialize};
use st_core::TableId;
use std::collections::BTreeMap;

/// The terminal artifact of a lineage computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageResult {
    /// Physical tables read, sorted
    pub sources: Vec<TableId>,
    pub joins: Vec<JoinRecord>,
    /// WHERE then HAVING predicates
    pub filters: Vec<String>,
    pub group_by: Vec<String>,
    /// `null` when no projection uses an output alias
    pub outputs: Option<Outputs>,
    pub graph: LineageGraph,
    pub hierarchy: Hierarchy,
    pub governance: Governance,
    /// Every CTE with its resolved base tables
    #[serde(default)]
    pub ctes: BTreeMap<String, Vec<TableId>>,
}

/// Provenance stamp of a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Governance {
    pub created_by: String,
    /// RFC 3339, UTC
    pub last_modified: String,
    pub lineage_version: String,
}

impl LineageResult {
    /// Generate DOT graph output for visualization
    pub fn to_dot(&self) -> String {
        self.graph.to_dot()
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.as_str()).collect()
    }
}
