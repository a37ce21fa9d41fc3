//! CTE collection and base-table resolution
//!
//! Every CTE's body is scanned for table references, split into physical
//! tables and references to other CTEs, and the physical sets are closed
//! over CTE-to-CTE references by fixpoint expansion. Reference cycles
//! (recursive CTEs) are reported but still converge.

use crate::ast::{AstNode, NodeData, NodeKind};
use crate::options::TableDefaults;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use st_core::{CteName, TableId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Resolved dependency information for every CTE of a statement.
///
/// Keys are lowercased CTE names; [`cte_name`](Self::cte_name) recovers the
/// spelling used in the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CteResolution {
    names: BTreeMap<String, CteName>,

    /// Physical tables each CTE ultimately reads
    pub base_deps: BTreeMap<String, BTreeSet<TableId>>,

    /// CTEs each CTE references directly
    pub cte_refs: BTreeMap<String, BTreeSet<String>>,

    /// CTEs participating in a reference cycle
    pub cyclic: Vec<CteName>,
}

/// Map of lowercased CTE name to its definition node, in definition order
/// of first occurrence.
pub fn collect_ctes(root: &AstNode) -> BTreeMap<String, &AstNode> {
    let mut out = BTreeMap::new();
    for node in root.find_all(NodeKind::Cte) {
        if let NodeData::Cte { name } = &node.data {
            out.entry(name.to_lowercase()).or_insert(node);
        }
    }
    out
}

/// If `path` names a CTE in `ctes`, return its lowercased key.
pub(crate) fn cte_key<V>(path: &[String], ctes: &BTreeMap<String, V>) -> Option<String> {
    match path {
        [single] => {
            let key = single.to_lowercase();
            ctes.contains_key(&key).then_some(key)
        }
        _ => None,
    }
}

impl CteResolution {
    /// Collect and resolve the CTEs defined anywhere in `root`.
    pub fn resolve(root: &AstNode, defaults: &TableDefaults) -> Self {
        let ctes = collect_ctes(root);
        let mut names = BTreeMap::new();
        let mut base_deps: BTreeMap<String, BTreeSet<TableId>> = BTreeMap::new();
        let mut cte_refs: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (key, node) in &ctes {
            if let NodeData::Cte { name } = &node.data {
                if let Some(cte_name) = CteName::try_new(name.clone()) {
                    names.insert(key.clone(), cte_name);
                }
            }

            let mut bases = BTreeSet::new();
            let mut refs = BTreeSet::new();
            for body in &node.children {
                for table in body.find_all(NodeKind::Table) {
                    let NodeData::Table { path, .. } = &table.data else {
                        continue;
                    };
                    match cte_key(path, &ctes) {
                        Some(referenced) => {
                            refs.insert(referenced);
                        }
                        None => {
                            if let Some(id) = defaults.resolve(path) {
                                bases.insert(id);
                            }
                        }
                    }
                }
            }
            base_deps.insert(key.clone(), bases);
            cte_refs.insert(key.clone(), refs);
        }

        expand_to_fixpoint(&mut base_deps, &cte_refs);
        let cyclic = find_cycles(&cte_refs)
            .into_iter()
            .filter_map(|key| names.get(&key).cloned())
            .collect::<Vec<_>>();
        if !cyclic.is_empty() {
            let listed: Vec<&str> = cyclic.iter().map(|c| c.as_str()).collect();
            log::warn!(
                "CTE reference cycle among [{}]; base tables are a best-effort closure",
                listed.join(", ")
            );
        }

        Self {
            names,
            base_deps,
            cte_refs,
            cyclic,
        }
    }

    /// True when `name` (any case) is a CTE of this statement
    pub fn is_cte(&self, name: &str) -> bool {
        self.base_deps.contains_key(&name.to_lowercase())
    }

    /// Query spelling of a CTE name
    pub fn cte_name(&self, name: &str) -> Option<&CteName> {
        self.names.get(&name.to_lowercase())
    }

    /// Physical tables a CTE ultimately reads
    pub fn bases(&self, name: &str) -> Option<&BTreeSet<TableId>> {
        self.base_deps.get(&name.to_lowercase())
    }

    /// The base table of a CTE that reads exactly one physical table
    pub fn single_base(&self, name: &str) -> Option<&TableId> {
        self.bases(name).and_then(|set| match set.len() {
            1 => set.iter().next(),
            _ => None,
        })
    }

    /// Whether the CTE is part of a reference cycle
    pub fn is_cyclic(&self, name: &str) -> bool {
        let key = name.to_lowercase();
        self.cyclic.iter().any(|c| c.to_lowercase() == key)
    }

    /// `{cte name: sorted base tables}` using query spelling
    pub fn summary(&self) -> BTreeMap<String, Vec<TableId>> {
        self.base_deps
            .iter()
            .map(|(key, bases)| {
                let name = self
                    .names
                    .get(key)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| key.clone());
                (name, bases.iter().cloned().collect())
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.base_deps.is_empty()
    }
}

/// Union each CTE's referenced CTEs' bases into its own until nothing grows.
fn expand_to_fixpoint(
    base_deps: &mut BTreeMap<String, BTreeSet<TableId>>,
    cte_refs: &BTreeMap<String, BTreeSet<String>>,
) {
    loop {
        let mut changed = false;
        for (name, refs) in cte_refs {
            let mut incoming = BTreeSet::new();
            for r in refs {
                if let Some(deps) = base_deps.get(r) {
                    incoming.extend(deps.iter().cloned());
                }
            }
            if let Some(own) = base_deps.get_mut(name) {
                let before = own.len();
                own.extend(incoming);
                changed |= own.len() != before;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Keys of CTEs in a strongly connected component of size > 1 or with a self-reference.
fn find_cycles(cte_refs: &BTreeMap<String, BTreeSet<String>>) -> BTreeSet<String> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for name in cte_refs.keys() {
        index.insert(name.as_str(), graph.add_node(name.as_str()));
    }
    for (name, refs) in cte_refs {
        for r in refs {
            if let (Some(&from), Some(&to)) = (index.get(name.as_str()), index.get(r.as_str())) {
                graph.add_edge(from, to, ());
            }
        }
    }

    let mut cyclic = BTreeSet::new();
    for component in tarjan_scc(&graph) {
        let self_loop = component.len() == 1 && graph.contains_edge(component[0], component[0]);
        if component.len() > 1 || self_loop {
            cyclic.extend(component.iter().map(|idx| graph[*idx].to_string()));
        }
    }
    cyclic
}

#[cfg(test)]
#[path = "cte_test.rs"]
mod tests;
