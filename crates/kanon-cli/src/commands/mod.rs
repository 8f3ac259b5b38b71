//! Command implementations.

pub mod anonymize;
pub mod partition;

use std::fs;
use std::path::{Path, PathBuf};

use kanon::{coerce_table, Config, Kanon, Parser, RecordTable, TermIndex};

/// Shared setup: load the configuration (with overrides applied), parse and
/// coerce the input file, and load the optional term index.
pub fn prepare(
    config_path: &Path,
    input: &Path,
    terms: Option<&PathBuf>,
    k: Option<usize>,
    strategy: Option<String>,
) -> Result<(Kanon, RecordTable), Box<dyn std::error::Error>> {
    let mut config = Config::from_path(config_path)?;
    if let Some(k) = k {
        config.k = k;
    }
    if let Some(strategy) = strategy {
        config.strategy = strategy;
    }

    let (raw, metadata) = Parser::new().parse_file(input)?;
    tracing::info!(
        file = metadata.file.as_str(),
        rows = metadata.row_count,
        columns = metadata.column_count,
        format = metadata.format.as_str(),
        "parsed input"
    );
    let table = coerce_table(&raw, &config.schema)?;

    let engine = match terms {
        Some(path) => {
            let contents = fs::read_to_string(path)?;
            let index: TermIndex = serde_json::from_str(&contents)?;
            Kanon::with_terms(config, index)
        }
        None => Kanon::new(config),
    };
    Ok((engine, table))
}
