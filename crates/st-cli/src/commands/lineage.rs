//! Lineage command implementation

use anyhow::Result;
use st_sql::LineageResult;
use std::collections::BTreeMap;

use crate::cli::{GlobalArgs, LineageArgs, LineageOutput};
use crate::commands::common::{read_sql, CommandContext};

/// Execute the lineage command
pub(crate) fn execute(args: &LineageArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    let sql = read_sql(&args.input)?;
    let result = ctx.engine.compute(&sql, &ctx.dialect, ctx.provider())?;

    match args.output {
        LineageOutput::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        LineageOutput::Dot => print!("{}", result.to_dot()),
        LineageOutput::Table => print_table(&result),
    }
    Ok(())
}

/// Print a human-readable summary of the result
fn print_table(result: &LineageResult) {
    println!("Sources ({}):", result.sources.len());
    for source in &result.sources {
        println!("  {}", source);
    }

    if !result.ctes.is_empty() {
        println!("\nCTEs:");
        for (name, bases) in &result.ctes {
            let bases: Vec<&str> = bases.iter().map(|b| b.as_str()).collect();
            println!("  {:<20} {}", name, bases.join(", "));
        }
    }

    if !result.joins.is_empty() {
        println!(
            "\n{:<5} {:<8} {:<30} {:<30} ON",
            "ID", "KIND", "LEFT", "RIGHT"
        );
        println!("{}", "-".repeat(100));
        for join in &result.joins {
            let on = if join.on_condition_text.is_empty() {
                "-"
            } else {
                join.on_condition_text.as_str()
            };
            println!(
                "{:<5} {:<8} {:<30} {:<30} {}",
                join.id, join.kind, join.left_table, join.right_table, on
            );
        }
    }

    print_list("Filters", &result.filters);
    print_list("Group by", &result.group_by);

    if let Some(outputs) = &result.outputs {
        println!("\nOutputs:");
        for (slot, expr) in [
            ("x", &outputs.x),
            ("y", &outputs.y),
            ("label", &outputs.label),
            ("value", &outputs.value),
        ] {
            if let Some(expr) = expr {
                println!("  {:<6} {}", slot, expr);
            }
        }
    }

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for node in &result.graph.nodes {
        *by_type.entry(node.detail.type_name()).or_default() += 1;
    }
    let counts: Vec<String> = by_type
        .iter()
        .map(|(ty, n)| format!("{} {}", n, ty))
        .collect();
    println!(
        "\n{} node(s), {} edge(s): {}",
        result.graph.nodes.len(),
        result.graph.edges.len(),
        counts.join(", ")
    );
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("\n{}:", title);
    for item in items {
        println!("  {}", item);
    }
}
