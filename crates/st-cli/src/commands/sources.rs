//! Sources command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, ListOutput, SourcesArgs};
use crate::commands::common::{read_sql, CommandContext};

/// Execute the sources command
pub(crate) fn execute(args: &SourcesArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = CommandContext::load(global)?;
    let sql = read_sql(&args.input)?;
    let result = ctx.engine.compute(&sql, &ctx.dialect, ctx.provider())?;

    match args.output {
        ListOutput::Text => {
            for source in &result.sources {
                println!("{}", source);
            }
        }
        ListOutput::Json => println!("{}", serde_json::to_string_pretty(&result.sources)?),
    }
    Ok(())
}
