//! Lineage graph model: typed nodes, typed edges, hierarchy layers

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A graph node. `id` is the only cross-reference key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub detail: NodeDetail,
}

/// Kind-specific node metadata, serialized with a `type` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeDetail {
    Table {
        database: Option<String>,
        schema: Option<String>,
        #[serde(rename = "rowCount", default)]
        row_count: Option<u64>,
    },
    Column {
        /// Owning base table, when exactly one is known
        table: Option<String>,
        #[serde(rename = "dataType", default)]
        data_type: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        pii: bool,
    },
    Output,
    Join {
        kind: String,
        on: String,
    },
    Aggregation {
        function: String,
        expression: String,
    },
    Kpi {
        expression: Option<String>,
        dimensions: Vec<String>,
        owner: String,
        #[serde(rename = "updatedAt")]
        updated_at: String,
    },
    Database,
    Schema,
}

impl NodeDetail {
    /// Tag used in the serialized `type` field
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeDetail::Table { .. } => "table",
            NodeDetail::Column { .. } => "column",
            NodeDetail::Output => "output",
            NodeDetail::Join { .. } => "join",
            NodeDetail::Aggregation { .. } => "aggregation",
            NodeDetail::Kpi { .. } => "kpi",
            NodeDetail::Database => "database",
            NodeDetail::Schema => "schema",
        }
    }

    pub fn layer(&self) -> Layer {
        match self {
            NodeDetail::Table { .. }
            | NodeDetail::Column { .. }
            | NodeDetail::Database
            | NodeDetail::Schema => Layer::Physical,
            NodeDetail::Join { .. } | NodeDetail::Aggregation { .. } => Layer::Logical,
            NodeDetail::Kpi { .. } | NodeDetail::Output => Layer::Semantic,
        }
    }
}

/// Hierarchy layer of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Physical,
    Logical,
    Semantic,
}

/// Edge kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Contains,
    Projection,
    Join,
    JoinInput,
    JoinOutput,
    JoinTable,
    Derives,
    Dimension,
    Measure,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Projection => "projection",
            EdgeKind::Join => "join",
            EdgeKind::JoinInput => "join_input",
            EdgeKind::JoinOutput => "join_output",
            EdgeKind::JoinTable => "join_table",
            EdgeKind::Derives => "derives",
            EdgeKind::Dimension => "dimension",
            EdgeKind::Measure => "measure",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, typed edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

/// Nodes and edges of a lineage result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineageGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl LineageGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Nodes with the given `type` tag
    pub fn nodes_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a GraphNode> {
        self.nodes
            .iter()
            .filter(move |n| n.detail.type_name() == type_name)
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    pub fn has_edge(&self, source: &str, target: &str, kind: EdgeKind) -> bool {
        self.edges
            .iter()
            .any(|e| e.kind == kind && e.source == source && e.target == target)
    }

    /// Partition node ids into hierarchy layers
    pub fn hierarchy(&self) -> Hierarchy {
        let mut hierarchy = Hierarchy::default();
        for node in &self.nodes {
            let bucket = match node.detail.layer() {
                Layer::Physical => &mut hierarchy.physical,
                Layer::Logical => &mut hierarchy.logical,
                Layer::Semantic => &mut hierarchy.semantic,
            };
            bucket.push(node.id.clone());
        }
        hierarchy
    }

    /// Generate DOT graph output for visualization
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph lineage {\n  rankdir=LR;\n  node [shape=box];\n");

        for (layer, name) in [
            (Layer::Physical, "physical"),
            (Layer::Logical, "logical"),
            (Layer::Semantic, "semantic"),
        ] {
            dot.push_str(&format!(
                "\n  subgraph cluster_{} {{\n    label=\"{}\";\n",
                name, name
            ));
            for node in self.nodes.iter().filter(|n| n.detail.layer() == layer) {
                dot.push_str(&format!(
                    "    \"{}\" [label=\"{}\", shape={}];\n",
                    escape_dot(&node.id),
                    escape_dot(&node.label),
                    dot_shape(&node.detail)
                ));
            }
            dot.push_str("  }\n");
        }

        dot.push('\n');
        for edge in &self.edges {
            dot.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\"];\n",
                escape_dot(&edge.source),
                escape_dot(&edge.target),
                edge.kind
            ));
        }

        dot.push_str("}\n");
        dot
    }
}

fn dot_shape(detail: &NodeDetail) -> &'static str {
    match detail {
        NodeDetail::Table { .. } => "cylinder",
        NodeDetail::Database | NodeDetail::Schema => "folder",
        NodeDetail::Column { .. } => "box",
        NodeDetail::Join { .. } => "diamond",
        NodeDetail::Aggregation { .. } => "hexagon",
        NodeDetail::Output => "ellipse",
        NodeDetail::Kpi { .. } => "doubleoctagon",
    }
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Node ids grouped by layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub physical: Vec<String>,
    pub logical: Vec<String>,
    pub semantic: Vec<String>,
}

/// Accumulates nodes and edges. The first node registered under an id wins;
/// edges repeating a `(source, target, kind)` triple are dropped when
/// deduplication is on.
#[derive(Debug)]
pub struct GraphBuilder {
    nodes: Vec<GraphNode>,
    index: HashMap<String, usize>,
    edges: Vec<GraphEdge>,
    seen_edges: HashSet<GraphEdge>,
    dedupe: bool,
}

impl GraphBuilder {
    pub fn new(dedupe: bool) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            seen_edges: HashSet::new(),
            dedupe,
        }
    }

    /// Register a node; returns false when the id is already taken.
    pub fn add_node(&mut self, id: impl Into<String>, label: impl Into<String>, detail: NodeDetail) -> bool {
        let id = id.into();
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(GraphNode {
            id,
            label: label.into(),
            detail,
        });
        true
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Add an edge between two registered nodes. Edges touching unknown ids
    /// are dropped.
    pub fn add_edge(&mut self, source: &str, target: &str, kind: EdgeKind) {
        if !self.has_node(source) || !self.has_node(target) {
            log::debug!("Dropping {} edge {} -> {}: unknown endpoint", kind, source, target);
            return;
        }
        let edge = GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            kind,
        };
        if self.dedupe && !self.seen_edges.insert(edge.clone()) {
            return;
        }
        self.edges.push(edge);
    }

    pub fn build(self) -> LineageGraph {
        LineageGraph {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
