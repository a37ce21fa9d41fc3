//! SQL parser wrapper

use crate::dialect::{BigQueryDialect, DuckDbDialect, GenericDialect, SnowflakeDialect, SqlDialect};
use crate::error::{LineageError, SqlResult};
use sqlparser::ast::Statement;
use st_core::Dialect;

/// SQL parser that wraps sqlparser-rs with dialect support
pub struct SqlParser {
    dialect: Box<dyn SqlDialect>,
}

impl SqlParser {
    /// Create a new parser with BigQuery dialect
    pub fn bigquery() -> Self {
        Self {
            dialect: Box::new(BigQueryDialect::new()),
        }
    }

    /// Create a new parser with DuckDB dialect
    pub fn duckdb() -> Self {
        Self {
            dialect: Box::new(DuckDbDialect::new()),
        }
    }

    /// Create a new parser with Snowflake dialect
    pub fn snowflake() -> Self {
        Self {
            dialect: Box::new(SnowflakeDialect::new()),
        }
    }

    /// Create a new parser with the generic dialect
    pub fn generic() -> Self {
        Self {
            dialect: Box::new(GenericDialect::new()),
        }
    }

    /// Create a parser for a configured dialect
    pub fn for_dialect(dialect: Dialect) -> Self {
        match dialect {
            Dialect::BigQuery => Self::bigquery(),
            Dialect::DuckDb => Self::duckdb(),
            Dialect::Snowflake => Self::snowflake(),
            Dialect::Generic => Self::generic(),
        }
    }

    /// Create a parser from dialect name
    pub fn from_dialect_name(name: &str) -> SqlResult<Self> {
        Dialect::from_name(name)
            .map(Self::for_dialect)
            .ok_or_else(|| LineageError::UnknownDialect(name.to_string()))
    }

    /// Parse SQL into AST statements
    pub fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(LineageError::EmptySql);
        }

        self.dialect.parse(sql)
    }

    /// Parse SQL and return the first statement
    pub fn parse_single(&self, sql: &str) -> SqlResult<Statement> {
        let stmts = self.parse(sql)?;
        if stmts.len() > 1 {
            log::warn!(
                "{} statements supplied; only the first is analysed",
                stmts.len()
            );
        }
        stmts.into_iter().next().ok_or(LineageError::EmptySql)
    }

    /// Get the dialect name
    pub fn dialect_name(&self) -> &'static str {
        self.dialect.name()
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::bigquery()
    }
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
