//! Closed AST over the node kinds the lineage engine consumes
//!
//! sqlparser statements are adapted once, at the boundary, into a tree of
//! [`AstNode`]s. Every later stage pattern-matches on [`NodeData`] and never
//! touches sqlparser types, so parser upgrades only ripple through this file.

use sqlparser::ast::{
    BinaryOperator, Cte, Expr, Function, FunctionArg, FunctionArgExpr, FunctionArguments,
    GroupByExpr, Join, JoinConstraint, JoinOperator, ObjectName, ObjectNamePart, Query, Select,
    SelectItem, SetExpr, Statement, TableFactor, TableWithJoins, Visit, Visitor,
};
use std::ops::ControlFlow;

/// Discriminant of [`NodeData`], used for [`AstNode::find_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Query,
    Select,
    Projection,
    From,
    Table,
    Subquery,
    Join,
    Where,
    Having,
    Group,
    Cte,
    Column,
    BinaryEquality,
    Identifier,
    Expr,
}

/// Shape of an otherwise opaque expression node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprShape {
    /// `a AND b`; children are the two operands
    Conjunction,
    /// `( ... )`; single child
    Nested,
    /// UNION / INTERSECT / EXCEPT; children are the two operands
    SetOperation,
    /// Anything else; children are the column references and subqueries found inside
    Other,
}

/// How a JOIN constrains its operands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinConstraintData {
    /// `ON <expr>`; the expression is the join node's second child
    On,
    /// `USING (a, b)`; the column names, also present as identifier children
    Using(Vec<String>),
    /// `NATURAL JOIN`
    Natural,
    /// No constraint (CROSS JOIN, comma joins, APPLY, ...)
    None,
}

/// Kind-specific payload of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// Children: CTE definitions in order, then the body.
    Query,
    /// Children: projections, then FROM, WHERE, GROUP BY, HAVING when present.
    Select,
    /// One SELECT item; single child holding the expression.
    Projection {
        alias: Option<String>,
        /// Alias, or the column name for bare column references
        name: Option<String>,
    },
    /// Children: relations (tables, subqueries, nested FROMs) and joins in source order.
    From,
    /// A physical or CTE table reference.
    Table {
        path: Vec<String>,
        alias: Option<String>,
    },
    /// A derived table or other non-table relation.
    Subquery { alias: Option<String> },
    /// Children: the joined relation, then the ON expression or USING identifiers.
    Join {
        kind: String,
        constraint: JoinConstraintData,
    },
    /// Single child: the predicate.
    Where,
    /// Single child: the predicate.
    Having,
    /// Children: one per grouping expression.
    Group,
    /// Single child: the CTE body query.
    Cte { name: String },
    /// A column reference, split into unquoted path parts.
    Column { parts: Vec<String> },
    /// `left = right`; exactly two children.
    BinaryEquality,
    /// A bare identifier outside expression position (USING column lists).
    Identifier { value: String },
    /// Any other expression.
    Expr { shape: ExprShape },
}

/// One node of the adapted tree
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub data: NodeData,
    sql: String,
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(data: NodeData, sql: impl Into<String>, children: Vec<AstNode>) -> Self {
        Self {
            data,
            sql: sql.into(),
            children,
        }
    }

    /// The node's kind
    pub fn kind(&self) -> NodeKind {
        match &self.data {
            NodeData::Query => NodeKind::Query,
            NodeData::Select => NodeKind::Select,
            NodeData::Projection { .. } => NodeKind::Projection,
            NodeData::From => NodeKind::From,
            NodeData::Table { .. } => NodeKind::Table,
            NodeData::Subquery { .. } => NodeKind::Subquery,
            NodeData::Join { .. } => NodeKind::Join,
            NodeData::Where => NodeKind::Where,
            NodeData::Having => NodeKind::Having,
            NodeData::Group => NodeKind::Group,
            NodeData::Cte { .. } => NodeKind::Cte,
            NodeData::Column { .. } => NodeKind::Column,
            NodeData::BinaryEquality => NodeKind::BinaryEquality,
            NodeData::Identifier { .. } => NodeKind::Identifier,
            NodeData::Expr { .. } => NodeKind::Expr,
        }
    }

    /// SQL text of this node as rendered by the parser.
    ///
    /// For WHERE/HAVING this is the predicate alone, for GROUP the
    /// comma-separated expression list.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Every node of `kind` in this subtree, pre-order, including `self`.
    pub fn find_all(&self, kind: NodeKind) -> Vec<&AstNode> {
        let mut out = Vec::new();
        self.collect_kind(kind, true, &mut out);
        out
    }

    /// Like [`find_all`](Self::find_all) but does not enter nested queries
    /// below `self`, so the result stays within one SELECT scope.
    pub fn find_all_in_scope(&self, kind: NodeKind) -> Vec<&AstNode> {
        let mut out = Vec::new();
        self.collect_kind(kind, false, &mut out);
        out
    }

    /// First node of `kind` in pre-order.
    pub fn find(&self, kind: NodeKind) -> Option<&AstNode> {
        if self.kind() == kind {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(kind))
    }

    fn collect_kind<'a>(&'a self, kind: NodeKind, cross_queries: bool, out: &mut Vec<&'a AstNode>) {
        if self.kind() == kind {
            out.push(self);
        }
        for child in &self.children {
            if !cross_queries && child.kind() == NodeKind::Query {
                continue;
            }
            child.collect_kind(kind, cross_queries, out);
        }
    }

    /// The outermost SELECT of a query: follows the body of nested queries
    /// and the left operand of set operations.
    pub fn main_select(&self) -> Option<&AstNode> {
        match &self.data {
            NodeData::Select => Some(self),
            NodeData::Query => self.children.last().and_then(AstNode::main_select),
            NodeData::Expr {
                shape: ExprShape::SetOperation,
            } => self.children.first().and_then(AstNode::main_select),
            _ => None,
        }
    }

    /// Direct child of the given kind.
    pub fn child(&self, kind: NodeKind) -> Option<&AstNode> {
        self.children.iter().find(|c| c.kind() == kind)
    }

    /// Rendered column text for a column node, e.g. `o.customer_id`.
    pub(crate) fn set_column_parts(&mut self, parts: Vec<String>, sql: String) {
        self.data = NodeData::Column { parts };
        self.sql = sql;
    }
}

/// Adapt a parsed statement into the closed tree.
///
/// Queries are adapted structurally. Other statements (INSERT ... SELECT,
/// CREATE TABLE AS, CREATE VIEW) contribute the queries they contain; their
/// write targets are not relations read by the statement.
pub fn adapt_statement(statement: &Statement) -> AstNode {
    match statement {
        Statement::Query(query) => adapt_query(query),
        other => {
            let children = collect_opaque(other);
            AstNode::new(NodeData::Query, other.to_string(), children)
        }
    }
}

fn adapt_query(query: &Query) -> AstNode {
    let mut children = Vec::new();
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            children.push(adapt_cte(cte));
        }
    }
    children.push(adapt_set_expr(&query.body));
    AstNode::new(NodeData::Query, query.to_string(), children)
}

fn adapt_cte(cte: &Cte) -> AstNode {
    AstNode::new(
        NodeData::Cte {
            name: cte.alias.name.value.clone(),
        },
        cte.to_string(),
        vec![adapt_query(&cte.query)],
    )
}

fn adapt_set_expr(set_expr: &SetExpr) -> AstNode {
    match set_expr {
        SetExpr::Select(select) => adapt_select(select),
        SetExpr::Query(query) => adapt_query(query),
        SetExpr::SetOperation { left, right, .. } => AstNode::new(
            NodeData::Expr {
                shape: ExprShape::SetOperation,
            },
            set_expr.to_string(),
            vec![adapt_set_expr(left), adapt_set_expr(right)],
        ),
        other => AstNode::new(
            NodeData::Expr {
                shape: ExprShape::Other,
            },
            other.to_string(),
            collect_opaque(other),
        ),
    }
}

fn adapt_select(select: &Select) -> AstNode {
    let mut children: Vec<AstNode> = select.projection.iter().map(adapt_projection).collect();

    if !select.from.is_empty() {
        children.push(adapt_from(&select.from));
    }

    if let Some(selection) = &select.selection {
        children.push(AstNode::new(
            NodeData::Where,
            selection.to_string(),
            vec![adapt_expr(selection)],
        ));
    }

    if let GroupByExpr::Expressions(exprs, _) = &select.group_by {
        if !exprs.is_empty() {
            let text = exprs
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            children.push(AstNode::new(
                NodeData::Group,
                text,
                exprs.iter().map(adapt_expr).collect(),
            ));
        }
    }

    if let Some(having) = &select.having {
        children.push(AstNode::new(
            NodeData::Having,
            having.to_string(),
            vec![adapt_expr(having)],
        ));
    }

    AstNode::new(NodeData::Select, select.to_string(), children)
}

fn adapt_projection(item: &SelectItem) -> AstNode {
    match item {
        SelectItem::UnnamedExpr(expr) => {
            let name = match expr {
                Expr::Identifier(ident) => Some(ident.value.clone()),
                Expr::CompoundIdentifier(idents) => idents.last().map(|i| i.value.clone()),
                _ => None,
            };
            AstNode::new(
                NodeData::Projection { alias: None, name },
                item.to_string(),
                vec![adapt_expr(expr)],
            )
        }
        SelectItem::ExprWithAlias { expr, alias } => AstNode::new(
            NodeData::Projection {
                alias: Some(alias.value.clone()),
                name: Some(alias.value.clone()),
            },
            item.to_string(),
            vec![adapt_expr(expr)],
        ),
        SelectItem::QualifiedWildcard(..) | SelectItem::Wildcard(_) => AstNode::new(
            NodeData::Projection {
                alias: None,
                name: None,
            },
            item.to_string(),
            vec![AstNode::new(
                NodeData::Expr {
                    shape: ExprShape::Other,
                },
                item.to_string(),
                Vec::new(),
            )],
        ),
    }
}

fn adapt_from(from: &[TableWithJoins]) -> AstNode {
    let mut children = Vec::new();
    for (idx, twj) in from.iter().enumerate() {
        if idx == 0 {
            push_table_with_joins(twj, &mut children);
            continue;
        }
        // `FROM a, b` is a cross join of b onto everything before it
        children.push(AstNode::new(
            NodeData::Join {
                kind: "CROSS".to_string(),
                constraint: JoinConstraintData::None,
            },
            format!(", {}", twj.relation),
            vec![adapt_relation(&twj.relation)],
        ));
        for join in &twj.joins {
            children.push(adapt_join(join));
        }
    }
    let text = from
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    AstNode::new(NodeData::From, text, children)
}

fn push_table_with_joins(twj: &TableWithJoins, out: &mut Vec<AstNode>) {
    out.push(adapt_relation(&twj.relation));
    for join in &twj.joins {
        out.push(adapt_join(join));
    }
}

fn adapt_relation(factor: &TableFactor) -> AstNode {
    match factor {
        TableFactor::Table { name, alias, .. } => AstNode::new(
            NodeData::Table {
                path: object_name_parts(name),
                alias: alias.as_ref().map(|a| a.name.value.clone()),
            },
            factor.to_string(),
            Vec::new(),
        ),
        TableFactor::Derived {
            subquery, alias, ..
        } => AstNode::new(
            NodeData::Subquery {
                alias: alias.as_ref().map(|a| a.name.value.clone()),
            },
            factor.to_string(),
            vec![adapt_query(subquery)],
        ),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => {
            let mut children = Vec::new();
            push_table_with_joins(table_with_joins, &mut children);
            AstNode::new(NodeData::From, factor.to_string(), children)
        }
        TableFactor::UNNEST { alias, .. } => AstNode::new(
            NodeData::Subquery {
                alias: alias.as_ref().map(|a| a.name.value.clone()),
            },
            factor.to_string(),
            collect_opaque(factor),
        ),
        other => AstNode::new(
            NodeData::Subquery { alias: None },
            other.to_string(),
            collect_opaque(other),
        ),
    }
}

fn adapt_join(join: &Join) -> AstNode {
    let (kind, constraint) = join_kind_and_constraint(&join.join_operator);
    let mut children = vec![adapt_relation(&join.relation)];
    let constraint_data = match constraint {
        Some(JoinConstraint::On(expr)) => {
            children.push(adapt_expr(expr));
            JoinConstraintData::On
        }
        Some(JoinConstraint::Using(columns)) => {
            let names: Vec<String> = columns
                .iter()
                .map(|c| object_name_parts(c).join("."))
                .collect();
            let identifiers = names
                .iter()
                .map(|n| AstNode::new(NodeData::Identifier { value: n.clone() }, n.clone(), Vec::new()))
                .collect();
            children.push(AstNode::new(
                NodeData::Expr {
                    shape: ExprShape::Other,
                },
                format!("USING ({})", names.join(", ")),
                identifiers,
            ));
            JoinConstraintData::Using(names)
        }
        Some(JoinConstraint::Natural) => JoinConstraintData::Natural,
        Some(JoinConstraint::None) | None => JoinConstraintData::None,
    };
    AstNode::new(
        NodeData::Join {
            kind,
            constraint: constraint_data,
        },
        join.to_string(),
        children,
    )
}

/// Normalized upper-case join kind plus the constraint, when the operator has one.
fn join_kind_and_constraint(op: &JoinOperator) -> (String, Option<&JoinConstraint>) {
    match op {
        JoinOperator::Join(c) => ("JOIN".to_string(), Some(c)),
        JoinOperator::Inner(c) => ("INNER".to_string(), Some(c)),
        JoinOperator::Left(c) | JoinOperator::LeftOuter(c) => ("LEFT".to_string(), Some(c)),
        JoinOperator::Right(c) | JoinOperator::RightOuter(c) => ("RIGHT".to_string(), Some(c)),
        JoinOperator::FullOuter(c) => ("FULL".to_string(), Some(c)),
        JoinOperator::CrossJoin(c) => ("CROSS".to_string(), Some(c)),
        other => {
            let debug = format!("{:?}", other);
            let name: String = debug
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect();
            (name.to_uppercase(), None)
        }
    }
}

fn adapt_expr(expr: &Expr) -> AstNode {
    match expr {
        Expr::Identifier(ident) => AstNode::new(
            NodeData::Column {
                parts: vec![ident.value.clone()],
            },
            expr.to_string(),
            Vec::new(),
        ),
        Expr::CompoundIdentifier(idents) => AstNode::new(
            NodeData::Column {
                parts: idents.iter().map(|i| i.value.clone()).collect(),
            },
            expr.to_string(),
            Vec::new(),
        ),
        Expr::BinaryOp {
            left,
            op: BinaryOperator::Eq,
            right,
        } => AstNode::new(
            NodeData::BinaryEquality,
            expr.to_string(),
            vec![adapt_expr(left), adapt_expr(right)],
        ),
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => AstNode::new(
            NodeData::Expr {
                shape: ExprShape::Conjunction,
            },
            expr.to_string(),
            vec![adapt_expr(left), adapt_expr(right)],
        ),
        Expr::BinaryOp { left, right, .. } => AstNode::new(
            NodeData::Expr {
                shape: ExprShape::Other,
            },
            expr.to_string(),
            vec![adapt_expr(left), adapt_expr(right)],
        ),
        Expr::Nested(inner) => AstNode::new(
            NodeData::Expr {
                shape: ExprShape::Nested,
            },
            expr.to_string(),
            vec![adapt_expr(inner)],
        ),
        Expr::Subquery(query) => AstNode::new(
            NodeData::Expr {
                shape: ExprShape::Other,
            },
            expr.to_string(),
            vec![adapt_query(query)],
        ),
        other => AstNode::new(
            NodeData::Expr {
                shape: ExprShape::Other,
            },
            other.to_string(),
            collect_opaque(other),
        ),
    }
}

/// Split an object name into unquoted parts, expanding dotted identifiers
/// such as BigQuery's `` `project.dataset.table` ``.
fn object_name_parts(name: &ObjectName) -> Vec<String> {
    name.0
        .iter()
        .flat_map(|part| {
            let value = match part {
                ObjectNamePart::Identifier(ident) => ident.value.clone(),
                other => other.to_string(),
            };
            value.split('.').map(str::to_string).collect::<Vec<_>>()
        })
        .collect()
}

/// Pieces found while walking an opaque subtree
enum Found {
    Column(Expr),
    Query(Query),
}

/// Unquoted keywords BigQuery accepts as a date part argument, e.g. the
/// `MONTH` in `DATE_TRUNC(d, MONTH)` or the `MONDAY` in `WEEK(MONDAY)`.
const DATE_PARTS: &[&str] = &[
    "MICROSECOND",
    "MILLISECOND",
    "SECOND",
    "MINUTE",
    "HOUR",
    "DAY",
    "DAYOFWEEK",
    "DAYOFYEAR",
    "WEEK",
    "ISOWEEK",
    "MONTH",
    "QUARTER",
    "YEAR",
    "ISOYEAR",
    "SUNDAY",
    "MONDAY",
    "TUESDAY",
    "WEDNESDAY",
    "THURSDAY",
    "FRIDAY",
    "SATURDAY",
];

fn is_date_part(expr: &Expr) -> bool {
    match expr {
        Expr::Identifier(ident) => {
            ident.quote_style.is_none()
                && DATE_PARTS
                    .iter()
                    .any(|part| part.eq_ignore_ascii_case(&ident.value))
        }
        _ => false,
    }
}

/// Arguments of `function` sitting where BigQuery expects a date part:
/// any argument after the first, and the argument of `WEEK(...)`.
fn date_part_arguments(function: &Function) -> Vec<&Expr> {
    let FunctionArguments::List(list) = &function.args else {
        return Vec::new();
    };
    let skip = if function.name.to_string().eq_ignore_ascii_case("WEEK") {
        0
    } else {
        1
    };
    list.args
        .iter()
        .skip(skip)
        .filter_map(|arg| match arg {
            FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => Some(expr),
            _ => None,
        })
        .filter(|expr| is_date_part(expr))
        .collect()
}

/// Collects column references and outermost subqueries of an opaque subtree.
#[derive(Default)]
struct OpaqueCollector {
    found: Vec<Found>,
    query_depth: usize,
    /// Date part arguments seen so far, by address; they are not columns
    date_parts: Vec<*const Expr>,
}

impl Visitor for OpaqueCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if self.query_depth == 0 {
            self.found.push(Found::Query(query.clone()));
        }
        self.query_depth += 1;
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.query_depth = self.query_depth.saturating_sub(1);
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if self.query_depth > 0 {
            return ControlFlow::Continue(());
        }
        match expr {
            Expr::Function(function) => {
                let parts = date_part_arguments(function);
                self.date_parts.extend(parts.into_iter().map(|e| e as *const Expr));
            }
            Expr::Identifier(ident)
                if self.date_parts.iter().any(|p| std::ptr::eq(*p, expr)) =>
            {
                log::trace!("Skipping date part argument {}", ident.value);
            }
            Expr::Identifier(_) | Expr::CompoundIdentifier(_) => {
                self.found.push(Found::Column(expr.clone()));
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

fn collect_opaque<V: Visit>(node: &V) -> Vec<AstNode> {
    let mut collector = OpaqueCollector::default();
    let _ = node.visit(&mut collector);
    collector
        .found
        .iter()
        .map(|f| match f {
            Found::Column(expr) => adapt_expr(expr),
            Found::Query(query) => adapt_query(query),
        })
        .collect()
}

#[cfg(test)]
#[path = "ast_test.rs"]
mod tests;
