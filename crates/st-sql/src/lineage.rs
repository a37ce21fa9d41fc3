//! Lineage engine entry points
//!
//! Parsing is the only fatal step. Everything after it degrades: a failed
//! qualification pass falls back to the unqualified tree, unresolvable
//! operands keep their raw names, and metadata failures leave fields unset.

use crate::assemble::{assemble_graph, AssemblyInput};
use crate::ast::{adapt_statement, AstNode};
use crate::clauses::{collect_filters, collect_group_by, collect_outputs};
use crate::columns::build_column_lineage;
use crate::cte::CteResolution;
use crate::enrich::enrich_graph;
use crate::error::SqlResult;
use crate::joins::analyze_joins;
use crate::options::{LineageOptions, LineageRequest};
use crate::parser::SqlParser;
use crate::qualify::Qualifier;
use crate::result::{Governance, LineageResult};
use crate::scope::{collect_sources, AliasMap};
use chrono::{SecondsFormat, Utc};
use st_core::TableMetadataLookup;
use std::borrow::Cow;

/// Compute lineage with default options.
pub fn compute_lineage(
    sql: &str,
    dialect: &str,
    provider: Option<&dyn TableMetadataLookup>,
) -> SqlResult<LineageResult> {
    LineageEngine::default().compute(sql, dialect, provider)
}

/// Stateless lineage engine; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct LineageEngine {
    options: LineageOptions,
}

impl LineageEngine {
    pub fn new(options: LineageOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LineageOptions {
        &self.options
    }

    /// Compute lineage for a request
    pub fn compute_request(
        &self,
        request: &LineageRequest,
        provider: Option<&dyn TableMetadataLookup>,
    ) -> SqlResult<LineageResult> {
        self.compute(&request.sql, &request.dialect, provider)
    }

    /// Compute lineage for the first statement of `sql`.
    pub fn compute(
        &self,
        sql: &str,
        dialect: &str,
        provider: Option<&dyn TableMetadataLookup>,
    ) -> SqlResult<LineageResult> {
        let root = self.parse(sql, dialect)?;
        let defaults = &self.options.defaults;

        let qualified = self.qualify(&root, provider);

        let ctes = CteResolution::resolve(&root, defaults);
        let sources = collect_sources(&root, &ctes, defaults);
        let aliases = AliasMap::build(&root, &sources, &ctes, defaults);
        let joins = analyze_joins(&root, &aliases, &ctes, defaults);
        let filters = collect_filters(&root);
        let group_by = collect_group_by(&root);
        let outputs = collect_outputs(&root);
        let columns = build_column_lineage(&qualified, &joins);

        let timestamp = self
            .options
            .now
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut graph = assemble_graph(&AssemblyInput {
            sources: &sources,
            joins: &joins,
            outputs: &outputs,
            group_by: &group_by,
            columns: &columns,
            tree: &qualified,
            aliases: &aliases,
            ctes: &ctes,
            defaults,
            governance: &self.options.governance,
            join_label_width: self.options.join_label_width,
            dedupe_edges: self.options.dedupe_edges,
            timestamp: &timestamp,
        });
        if let Some(provider) = provider {
            enrich_graph(&mut graph, provider);
        }
        let hierarchy = graph.hierarchy();

        log::debug!(
            "Lineage: {} sources, {} joins, {} nodes, {} edges",
            sources.len(),
            joins.len(),
            graph.nodes.len(),
            graph.edges.len()
        );

        Ok(LineageResult {
            sources: sources.into_iter().collect(),
            joins,
            filters,
            group_by,
            outputs: (!outputs.is_empty()).then_some(outputs),
            graph,
            hierarchy,
            governance: Governance {
                created_by: self.options.governance.created_by.clone(),
                last_modified: timestamp,
                lineage_version: self.options.governance.lineage_version.clone(),
            },
            ctes: ctes.summary(),
        })
    }

    /// Resolve the CTEs of the first statement of `sql` without building a graph.
    pub fn resolve_ctes(&self, sql: &str, dialect: &str) -> SqlResult<CteResolution> {
        let root = self.parse(sql, dialect)?;
        Ok(CteResolution::resolve(&root, &self.options.defaults))
    }

    fn parse(&self, sql: &str, dialect: &str) -> SqlResult<AstNode> {
        let parser = SqlParser::from_dialect_name(dialect)?;
        let statement = parser.parse_single(sql)?;
        Ok(adapt_statement(&statement))
    }

    fn qualify<'t>(
        &self,
        root: &'t AstNode,
        provider: Option<&dyn TableMetadataLookup>,
    ) -> Cow<'t, AstNode> {
        if !self.options.qualify_columns {
            return Cow::Borrowed(root);
        }
        match Qualifier::new(&self.options.defaults, provider).qualify(root) {
            Ok(tree) => Cow::Owned(tree),
            Err(e) => {
                log::debug!("Column qualification skipped: {}", e);
                Cow::Borrowed(root)
            }
        }
    }
}

#[cfg(test)]
#[path = "lineage_test.rs"]
mod tests;
