//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Strata - table and column lineage for BigQuery SQL
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: ./strata.yml when present)
    #[arg(short, long, global = true, env = "STRATA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override SQL dialect
    #[arg(short, long, global = true)]
    pub dialect: Option<String>,

    /// Override the default project used to lengthen table names
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Override the default dataset used to lengthen table names
    #[arg(long, global = true)]
    pub dataset: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the full lineage result for one query
    Lineage(LineageArgs),

    /// List the physical tables a query reads
    Sources(SourcesArgs),

    /// Show each CTE with the base tables it resolves to
    Ctes(CtesArgs),
}

/// Where the SQL text comes from: a file, `--sql`, or stdin
#[derive(Args, Debug, Clone)]
pub struct SqlInput {
    /// SQL file to analyse (reads stdin when neither FILE nor --sql is given)
    pub file: Option<PathBuf>,

    /// Inline SQL text
    #[arg(long, conflicts_with = "file")]
    pub sql: Option<String>,
}

/// Arguments for the lineage command
#[derive(Args, Debug)]
pub struct LineageArgs {
    #[command(flatten)]
    pub input: SqlInput,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub output: LineageOutput,
}

/// Lineage output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineageOutput {
    /// Full result as pretty JSON
    Json,
    /// Graphviz DOT of the lineage graph
    Dot,
    /// Human-readable summary
    Table,
}

/// Arguments for the sources command
#[derive(Args, Debug)]
pub struct SourcesArgs {
    #[command(flatten)]
    pub input: SqlInput,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: ListOutput,
}

/// Arguments for the ctes command
#[derive(Args, Debug)]
pub struct CtesArgs {
    #[command(flatten)]
    pub input: SqlInput,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: ListOutput,
}

/// Output formats for list-style commands
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutput {
    /// Plain text, one entry per line
    Text,
    /// JSON array
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
