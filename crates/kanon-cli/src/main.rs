//! kanon CLI - k-anonymization for tabular datasets.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Anonymize {
            config,
            input,
            output,
            terms,
            k,
            strategy,
            report,
        } => commands::anonymize::run(config, input, output, terms, k, strategy, report),

        Commands::Partition {
            config,
            input,
            terms,
            k,
            strategy,
        } => commands::partition::run(config, input, terms, k, strategy),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
