//! Strata CLI - table and column lineage for BigQuery SQL

use clap::Parser;
use st_sql::LineageError;
use std::process::ExitCode;

mod cli;
mod commands;
mod logging;

use cli::Cli;
use commands::{ctes, lineage, sources};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.global.verbose);

    let result = match &cli.command {
        cli::Commands::Lineage(args) => lineage::execute(args, &cli.global),
        cli::Commands::Sources(args) => sources::execute(args, &cli.global),
        cli::Commands::Ctes(args) => ctes::execute(args, &cli.global),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Input errors are reported in the engine's wire form.
            if let Some(lineage_err) = err.downcast_ref::<LineageError>() {
                match serde_json::to_string(&lineage_err.payload()) {
                    Ok(payload) => eprintln!("{}", payload),
                    Err(_) => eprintln!("{}", lineage_err),
                }
                return ExitCode::from(2);
            }
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
