//! Graph assembly
//!
//! Turns the outputs of the earlier stages into the final node/edge graph:
//! physical containment (database, schema, table, column), column lineage,
//! join nodes, aggregation detection and the single KPI node.

use crate::ast::{AstNode, NodeData, NodeKind};
use crate::clauses::Outputs;
use crate::columns::ColumnLineage;
use crate::cte::CteResolution;
use crate::graph::{EdgeKind, GraphBuilder, LineageGraph, NodeDetail};
use crate::joins::JoinRecord;
use crate::options::TableDefaults;
use crate::scope::AliasMap;
use regex::Regex;
use st_core::{GovernanceConfig, TableId};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Id of the single KPI node
pub const KPI_NODE_ID: &str = "kpi";

/// Everything graph assembly reads
pub struct AssemblyInput<'a> {
    pub sources: &'a BTreeSet<TableId>,
    pub joins: &'a [JoinRecord],
    pub outputs: &'a Outputs,
    pub group_by: &'a [String],
    pub columns: &'a ColumnLineage,
    /// Qualified tree, used for aggregation operands and GROUP BY columns
    pub tree: &'a AstNode,
    pub aliases: &'a AliasMap,
    pub ctes: &'a CteResolution,
    pub defaults: &'a TableDefaults,
    pub governance: &'a GovernanceConfig,
    pub join_label_width: usize,
    pub dedupe_edges: bool,
    /// RFC 3339 timestamp for KPI ownership fields
    pub timestamp: &'a str,
}

/// A detected `FUNC(args)` measure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub function: String,
    pub args: String,
}

impl Aggregation {
    pub fn label(&self) -> String {
        format!("{}({})", self.function, self.args)
    }

    pub fn node_id(&self) -> String {
        format!("agg:{}", self.label())
    }
}

/// Match `AVG|SUM|COUNT|MIN|MAX(args)` over a whole expression, case-insensitively.
///
/// The call must span the expression: `SUM(a) / SUM(b)` is not an aggregation.
pub fn detect_aggregation(expression: &str) -> Option<Aggregation> {
    static AGGREGATE: OnceLock<Regex> = OnceLock::new();
    let re = AGGREGATE.get_or_init(|| {
        Regex::new(r"(?is)^\s*(AVG|SUM|COUNT|MIN|MAX)\s*\((.*)\)\s*$").expect("valid regex")
    });
    let caps = re.captures(expression)?;
    let args = caps.get(2)?.as_str();
    if !parens_balanced(args) {
        return None;
    }
    Some(Aggregation {
        function: caps.get(1)?.as_str().to_uppercase(),
        args: args.trim().to_string(),
    })
}

/// True when no `)` closes more than was opened and every `(` is closed.
/// Parentheses inside string literals and quoted identifiers are ignored.
fn parens_balanced(text: &str) -> bool {
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

/// Cut `text` to `width` characters, marking the cut with `...`
pub fn truncate_label(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Last segment of a column reference, unquoted
fn column_label(id: &str) -> String {
    id.rsplit('.')
        .next()
        .unwrap_or(id)
        .trim_matches(|c| c == '`' || c == '"')
        .to_string()
}

struct Assembler<'a> {
    input: &'a AssemblyInput<'a>,
    builder: GraphBuilder,
}

/// Build the lineage graph.
pub fn assemble_graph(input: &AssemblyInput<'_>) -> LineageGraph {
    let mut asm = Assembler {
        input,
        builder: GraphBuilder::new(input.dedupe_edges),
    };
    asm.add_tables();
    asm.add_columns();
    asm.add_joins();
    asm.add_kpi();
    asm.builder.build()
}

impl<'a> Assembler<'a> {
    fn add_tables(&mut self) {
        for table in self.input.sources {
            self.builder.add_node(
                table.as_str(),
                table.short_name(),
                NodeDetail::Table {
                    database: table.project().map(str::to_string),
                    schema: table.dataset().map(str::to_string),
                    row_count: None,
                },
            );
        }

        for table in self.input.sources {
            let Some(dataset) = table.dataset() else {
                continue;
            };
            let schema_id = match table.project() {
                Some(project) => {
                    let database_id = format!("database:{}", project);
                    let schema_id = format!("schema:{}.{}", project, dataset);
                    self.builder
                        .add_node(database_id.as_str(), project, NodeDetail::Database);
                    self.builder
                        .add_node(schema_id.as_str(), dataset, NodeDetail::Schema);
                    self.builder
                        .add_edge(&database_id, &schema_id, EdgeKind::Contains);
                    schema_id
                }
                None => {
                    let schema_id = format!("schema:{}", dataset);
                    self.builder
                        .add_node(schema_id.as_str(), dataset, NodeDetail::Schema);
                    schema_id
                }
            };
            self.builder
                .add_edge(&schema_id, table.as_str(), EdgeKind::Contains);
        }
    }

    /// Base tables owning a column, restricted to tables present in the graph
    fn owners_of(&self, column: &str) -> Vec<TableId> {
        self.input
            .aliases
            .base_tables_for_column(column, self.input.ctes, self.input.defaults)
            .into_iter()
            .filter(|t| self.builder.has_node(t.as_str()))
            .collect()
    }

    /// Register a column node with its `contains` edges. Returns false when
    /// the id already belongs to another kind of node.
    fn ensure_column(&mut self, id: &str) -> bool {
        if let Some(existing) = self.builder.node(id) {
            return matches!(existing.detail, NodeDetail::Column { .. });
        }
        let owners = self.owners_of(id);
        let table = match owners.as_slice() {
            [only] => Some(only.to_string()),
            _ => None,
        };
        self.builder.add_node(
            id,
            column_label(id),
            NodeDetail::Column {
                table,
                data_type: None,
                description: None,
                pii: false,
            },
        );
        for owner in &owners {
            self.builder.add_edge(owner.as_str(), id, EdgeKind::Contains);
        }
        true
    }

    fn add_columns(&mut self) {
        let columns = self.input.columns;
        // Outputs first: a column reference spelled like another projection's
        // alias must not take over the output id
        for output in &columns.outputs {
            self.builder.add_node(output.as_str(), output.as_str(), NodeDetail::Output);
        }
        for id in &columns.columns {
            if !self.ensure_column(id) {
                log::debug!("Column {} collides with an existing node id", id);
            }
        }
        for (column, output) in &columns.projection_edges {
            self.builder.add_edge(column, output, EdgeKind::Projection);
            for owner in self.owners_of(column) {
                self.builder.add_edge(owner.as_str(), output, EdgeKind::Derives);
            }
        }
        for (left, right) in &columns.join_edges {
            self.builder.add_edge(left, right, EdgeKind::Join);
        }
    }

    /// Graph nodes standing for a table operand: the node itself, or every
    /// base of a multi-source CTE.
    fn table_nodes(&self, name: &str) -> Vec<String> {
        if self.builder.has_node(name) {
            return vec![name.to_string()];
        }
        self.input
            .ctes
            .bases(name)
            .map(|bases| {
                bases
                    .iter()
                    .filter(|t| self.builder.has_node(t.as_str()))
                    .map(|t| t.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn add_joins(&mut self) {
        for join in self.input.joins {
            let text = if join.on_condition_text.is_empty() {
                format!("{} JOIN {}", join.kind, join.right_table)
            } else {
                join.on_condition_text.clone()
            };
            self.builder.add_node(
                join.id.as_str(),
                truncate_label(&text, self.input.join_label_width),
                NodeDetail::Join {
                    kind: join.kind.clone(),
                    on: join.on_condition_text.clone(),
                },
            );

            for (left, right) in &join.equality_pairs {
                self.builder.add_edge(left, &join.id, EdgeKind::JoinInput);
                self.builder.add_edge(right, &join.id, EdgeKind::JoinInput);
            }

            let rights = self.table_nodes(&join.right_table);
            for right in &rights {
                self.builder.add_edge(&join.id, right, EdgeKind::JoinOutput);
            }
            for left in self.table_nodes(&join.left_table) {
                for right in &rights {
                    self.builder.add_edge(&left, right, EdgeKind::JoinTable);
                }
            }
        }
    }

    fn add_kpi(&mut self) {
        let outputs = self.input.outputs;
        let measure = outputs.measure().map(str::to_string);
        self.builder.add_node(
            KPI_NODE_ID,
            measure.clone().unwrap_or_else(|| KPI_NODE_ID.to_string()),
            NodeDetail::Kpi {
                expression: measure,
                dimensions: self.input.group_by.to_vec(),
                owner: self.input.governance.owner.clone(),
                updated_at: self.input.timestamp.to_string(),
            },
        );

        let main = self.input.tree.main_select();
        let mut detected = BTreeSet::new();
        for (slot, expression) in [("value", &outputs.value), ("y", &outputs.y)] {
            let Some(expression) = expression else {
                continue;
            };
            let Some(agg) = detect_aggregation(expression) else {
                continue;
            };
            let agg_id = agg.node_id();
            if !detected.insert(agg_id.clone()) {
                continue;
            }
            self.builder.add_node(
                agg_id.as_str(),
                agg.label(),
                NodeDetail::Aggregation {
                    function: agg.function.clone(),
                    expression: agg.args.clone(),
                },
            );

            let measured = main
                .and_then(|select| projection_for_slot(select, slot))
                .and_then(|p| p.find(NodeKind::Column))
                .map(|c| c.sql().to_string());
            if let Some(column) = measured {
                if self.ensure_column(&column) {
                    self.builder.add_edge(&column, &agg_id, EdgeKind::Measure);
                }
            }

            for join in self.input.joins {
                self.builder.add_edge(&join.id, &agg_id, EdgeKind::JoinOutput);
            }
            self.builder.add_edge(&agg_id, KPI_NODE_ID, EdgeKind::Derives);
        }

        if let Some(select) = main {
            self.add_dimensions(select);
        }
    }

    /// `dimension` edges from every GROUP BY column of the outermost SELECT.
    /// Ordinals and projection aliases go through the projection they name.
    fn add_dimensions(&mut self, select: &AstNode) {
        let Some(group) = select.child(NodeKind::Group) else {
            return;
        };
        let projections: Vec<&AstNode> = select
            .children
            .iter()
            .filter(|c| c.kind() == NodeKind::Projection)
            .collect();

        for expr in &group.children {
            let projection = group_target(expr, &projections);
            let target = projection.unwrap_or(expr);
            let columns: Vec<String> = target
                .find_all_in_scope(NodeKind::Column)
                .iter()
                .map(|c| c.sql().to_string())
                .collect();

            let mut linked = false;
            for column in columns {
                if self.ensure_column(&column) {
                    self.builder.add_edge(&column, KPI_NODE_ID, EdgeKind::Dimension);
                    linked = true;
                }
            }
            if linked {
                continue;
            }
            if let Some(NodeData::Projection { name: Some(name), .. }) = projection.map(|p| &p.data) {
                if self.builder.has_node(name) {
                    self.builder.add_edge(name, KPI_NODE_ID, EdgeKind::Dimension);
                }
            }
        }
    }
}

fn projection_for_slot<'n>(select: &'n AstNode, slot: &str) -> Option<&'n AstNode> {
    select.children.iter().find(|c| {
        matches!(&c.data, NodeData::Projection { alias: Some(alias), .. } if alias.eq_ignore_ascii_case(slot))
    })
}

/// The projection a GROUP BY item refers to by ordinal (`GROUP BY 1`) or by alias.
fn group_target<'n>(expr: &AstNode, projections: &[&'n AstNode]) -> Option<&'n AstNode> {
    let text = expr.sql().trim();
    if let Ok(ordinal) = text.parse::<usize>() {
        return ordinal.checked_sub(1).and_then(|i| projections.get(i)).copied();
    }
    let NodeData::Column { parts } = &expr.data else {
        return None;
    };
    let [name] = parts.as_slice() else {
        return None;
    };
    projections.iter().copied().find(|p| {
        matches!(&p.data, NodeData::Projection { alias: Some(alias), .. } if alias.eq_ignore_ascii_case(name))
    })
}

#[cfg(test)]
#[path = "assemble_test.rs"]
mod tests;
