//! cachepull - build step that restores a build cache archive.

mod cli;
mod commands;
mod error;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let debug = matches!(&cli.command, cli::Commands::Restore(args) if args.debug);
    init_logging(cli.quiet, cli.verbose || debug);

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);

    match &cli.command {
        cli::Commands::Restore(args) => commands::restore::execute(args, &*formatter, cli.quiet),
        cli::Commands::Inspect(args) => commands::inspect::execute(args, &*formatter),
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the level chosen by flags.
fn init_logging(quiet: bool, verbose: bool) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cachepull_core={level},cachepull={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
