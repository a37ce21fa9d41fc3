//! Log output for the CLI
//!
//! Library crates log through the `log` facade; the fmt subscriber picks
//! those records up and writes them to stderr so stdout stays parseable.

use std::io::IsTerminal;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Install the subscriber. `RUST_LOG` wins over the `--verbose` default.
pub(crate) fn init(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .without_time()
        .try_init();
}
