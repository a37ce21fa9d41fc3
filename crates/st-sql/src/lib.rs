//! st-sql - SQL lineage engine for Strata
//!
//! This crate parses one SQL statement with sqlparser-rs, adapts it into a
//! closed AST, resolves CTEs to their base tables, analyses joins, and
//! assembles a typed provenance graph of tables, columns, joins,
//! aggregations and outputs.

pub mod assemble;
pub mod ast;
pub mod clauses;
pub mod columns;
pub mod cte;
pub mod dialect;
pub mod enrich;
pub mod error;
pub mod graph;
pub mod joins;
pub mod lineage;
pub mod options;
pub mod parser;
pub mod qualify;
pub mod result;
pub mod scope;

pub use ast::{adapt_statement, AstNode, NodeData, NodeKind};
pub use clauses::Outputs;
pub use cte::CteResolution;
pub use dialect::{BigQueryDialect, DuckDbDialect, GenericDialect, SnowflakeDialect, SqlDialect};
pub use error::{ErrorPayload, LineageError, QualifyError, SqlResult};
pub use graph::{EdgeKind, GraphEdge, GraphNode, Hierarchy, LineageGraph, NodeDetail};
pub use joins::JoinRecord;
pub use lineage::{compute_lineage, LineageEngine};
pub use options::{LineageOptions, LineageRequest, TableDefaults};
pub use parser::SqlParser;
pub use result::{Governance, LineageResult};
