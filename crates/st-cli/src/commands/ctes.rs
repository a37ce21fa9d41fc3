//! CTEs command implementation

use anyhow::Result;
use serde::Serialize;
use st_core::TableId;
use st_sql::CteResolution;

use crate::cli::{CtesArgs, GlobalArgs, ListOutput};
use crate::commands::common::{read_sql, CommandContext};

/// One CTE and the physical tables behind it
#[derive(Debug, Serialize)]
struct CteRow {
    name: String,
    bases: Vec<TableId>,
    cyclic: bool,
}

/// Execute the ctes command
pub(crate) fn execute(args: &CtesArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    let sql = read_sql(&args.input)?;
    let resolution = ctx.engine.resolve_ctes(&sql, &ctx.dialect)?;
    let rows = cte_rows(&resolution);

    match args.output {
        ListOutput::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        ListOutput::Text => {
            if rows.is_empty() {
                println!("No CTEs found.");
                return Ok(());
            }
            println!("{:<24} {:<7} BASE TABLES", "CTE", "CYCLIC");
            println!("{}", "-".repeat(72));
            for row in &rows {
                let bases: Vec<&str> = row.bases.iter().map(|b| b.as_str()).collect();
                println!(
                    "{:<24} {:<7} {}",
                    row.name,
                    if row.cyclic { "yes" } else { "no" },
                    if bases.is_empty() {
                        "-".to_string()
                    } else {
                        bases.join(", ")
                    }
                );
            }
        }
    }
    Ok(())
}

fn cte_rows(resolution: &CteResolution) -> Vec<CteRow> {
    resolution
        .summary()
        .into_iter()
        .map(|(name, bases)| CteRow {
            cyclic: resolution.is_cyclic(&name),
            name,
            bases,
        })
        .collect()
}
