//! Join extraction

use crate::ast::{AstNode, ExprShape, JoinConstraintData, NodeData, NodeKind};
use crate::cte::CteResolution;
use crate::options::TableDefaults;
use crate::scope::AliasMap;
use serde::{Deserialize, Serialize};

/// One JOIN clause of the statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRecord {
    /// `J1`, `J2`, ... in discovery order
    pub id: String,
    pub left_table: String,
    pub right_table: String,
    pub right_alias: Option<String>,
    /// INNER, LEFT, RIGHT, FULL, CROSS, or JOIN when unspecified
    pub kind: String,
    /// ON predicate or `USING (...)` list as written; empty when absent
    pub on_condition_text: String,
    pub equality_pairs: Vec<(String, String)>,
    /// False when the left operand was taken positionally rather than from
    /// the FROM clause's base relation
    pub resolved: bool,
}

/// A relation operand as written in the FROM clause
#[derive(Debug, Clone)]
struct Operand {
    /// Resolved table id, CTE name, or the raw text
    table: String,
    /// Last segment of the name as written
    short: String,
    alias: Option<String>,
    is_table: bool,
}

/// Extract every join of the statement, subqueries and CTE bodies included.
pub fn analyze_joins(
    root: &AstNode,
    aliases: &AliasMap,
    ctes: &CteResolution,
    defaults: &TableDefaults,
) -> Vec<JoinRecord> {
    let mut joins = Vec::new();
    for from in root.find_all(NodeKind::From) {
        let mut previous: Option<Operand> = None;
        let mut base_is_table = false;
        let mut first_join = true;

        for (idx, child) in from.children.iter().enumerate() {
            let NodeData::Join { kind, constraint } = &child.data else {
                let operand = operand_of(child, aliases, ctes, defaults);
                if idx == 0 {
                    base_is_table = operand.as_ref().is_some_and(|o| o.is_table);
                }
                if operand.is_some() {
                    previous = operand;
                }
                continue;
            };

            let Some(right) = child
                .children
                .first()
                .and_then(|r| operand_of(r, aliases, ctes, defaults))
            else {
                log::debug!("Join without a relation operand: {}", child.sql());
                continue;
            };

            let resolved = first_join && base_is_table && previous.is_some();
            let left = previous.clone();
            first_join = false;

            let (on_condition_text, equality_pairs) = match constraint {
                JoinConstraintData::On => match child.children.get(1) {
                    Some(expr) => (expr.sql().to_string(), top_level_equalities(expr)),
                    None => (String::new(), Vec::new()),
                },
                JoinConstraintData::Using(columns) => {
                    let text = child
                        .children
                        .get(1)
                        .map(|n| n.sql().to_string())
                        .unwrap_or_else(|| format!("USING ({})", columns.join(", ")));
                    let right_prefix = right.alias.clone().unwrap_or_else(|| right.short.clone());
                    let pairs = match &left {
                        Some(l) => columns
                            .iter()
                            .map(|c| (format!("{}.{}", l.short, c), format!("{}.{}", right_prefix, c)))
                            .collect(),
                        None => Vec::new(),
                    };
                    (text, pairs)
                }
                JoinConstraintData::Natural | JoinConstraintData::None => (String::new(), Vec::new()),
            };

            joins.push(JoinRecord {
                id: format!("J{}", joins.len() + 1),
                left_table: left.map(|l| l.table).unwrap_or_default(),
                right_table: right.table.clone(),
                right_alias: right.alias.clone(),
                kind: kind.clone(),
                on_condition_text,
                equality_pairs,
                resolved,
            });
            previous = Some(right);
        }
    }
    joins
}

fn operand_of(
    node: &AstNode,
    aliases: &AliasMap,
    ctes: &CteResolution,
    defaults: &TableDefaults,
) -> Option<Operand> {
    match &node.data {
        NodeData::Table { path, alias } => Some(Operand {
            table: aliases.resolve_relation(path, ctes, defaults),
            short: path.last().cloned().unwrap_or_default(),
            alias: alias.clone(),
            is_table: true,
        }),
        NodeData::Subquery { alias } => {
            let name = alias.clone().unwrap_or_else(|| node.sql().to_string());
            Some(Operand {
                table: name.clone(),
                short: name,
                alias: alias.clone(),
                is_table: false,
            })
        }
        // Parenthesized join: the most recent table inside stands in for it
        NodeData::From => node
            .find_all_in_scope(NodeKind::Table)
            .last()
            .and_then(|t| operand_of(t, aliases, ctes, defaults))
            .map(|o| Operand {
                is_table: false,
                ..o
            }),
        _ => None,
    }
}

/// `=` comparisons reachable from the predicate root through AND and parentheses only.
pub(crate) fn top_level_equalities(expr: &AstNode) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    collect_equalities(expr, &mut pairs);
    pairs
}

fn collect_equalities(expr: &AstNode, out: &mut Vec<(String, String)>) {
    match &expr.data {
        NodeData::BinaryEquality => {
            if let [left, right] = expr.children.as_slice() {
                out.push((left.sql().to_string(), right.sql().to_string()));
            }
        }
        NodeData::Expr {
            shape: ExprShape::Conjunction | ExprShape::Nested,
        } => {
            for child in &expr.children {
                collect_equalities(child, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "joins_test.rs"]
mod tests;
