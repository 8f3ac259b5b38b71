//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kanon: k-anonymization for tabular datasets
#[derive(Parser)]
#[command(name = "kanon")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Anonymize a data file and report the information loss
    Anonymize {
        /// Path to the configuration file (JSON)
        #[arg(short, long, value_name = "CONFIG")]
        config: PathBuf,

        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output path for the anonymized data (default: <file>.anon.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sensitive term index (JSON), required for the gdf strategy
        #[arg(short, long)]
        terms: Option<PathBuf>,

        /// Override the configured minimum group size
        #[arg(short, long)]
        k: Option<usize>,

        /// Override the configured partitioning strategy
        #[arg(short, long)]
        strategy: Option<String>,

        /// Write the loss report as JSON to this path
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Partition only and print partition statistics (dry run)
    Partition {
        /// Path to the configuration file (JSON)
        #[arg(short, long, value_name = "CONFIG")]
        config: PathBuf,

        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Sensitive term index (JSON), required for the gdf strategy
        #[arg(short, long)]
        terms: Option<PathBuf>,

        /// Override the configured minimum group size
        #[arg(short, long)]
        k: Option<usize>,

        /// Override the configured partitioning strategy
        #[arg(short, long)]
        strategy: Option<String>,
    },
}
