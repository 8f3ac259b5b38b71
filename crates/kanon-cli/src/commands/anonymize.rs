//! Anonymize a data file and report the information loss.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;
use kanon::stats::{mean_partition_size, split_share, std_partition_size};
use kanon::RecordTable;

pub fn run(
    config: PathBuf,
    input: PathBuf,
    output: Option<PathBuf>,
    terms: Option<PathBuf>,
    k: Option<usize>,
    strategy: Option<String>,
    report: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut engine, mut table) = super::prepare(&config, &input, terms.as_ref(), k, strategy)?;

    engine.remove_direct_identifiers(&mut table);
    let outcome = engine.anonymize(&table)?;
    let loss = engine.score(&table, &outcome.table)?;

    let output = output.unwrap_or_else(|| input.with_extension("anon.csv"));
    write_csv(&outcome.table, &output)?;

    println!("{}", "Anonymization complete".bold().green());
    println!("  output:          {}", output.display());
    println!("  partitions:      {}", outcome.partitions.len());
    println!(
        "  partition size:  {:.2} ± {:.2}",
        mean_partition_size(&outcome.partitions),
        std_partition_size(&outcome.partitions)
    );
    if let Some(statistics) = &outcome.split_statistics {
        let (relational, textual) = split_share(statistics, &engine.config().textual_mapping);
        println!("  splits:          {} relational, {} textual", relational, textual);
    }
    println!();
    println!("{}", "Information loss (NCP)".bold());
    println!("  total:           {:.4}", loss.total);
    println!("  relational:      {:.4}", loss.relational);
    if let Some(textual) = &loss.textual {
        println!("  textual:         {:.4}", textual.total);
        for (attribute, detail) in &textual.attributes {
            println!("    {}: {:.4}", attribute, detail.total);
        }
    }

    if let Some(path) = report {
        fs::write(&path, serde_json::to_string_pretty(&loss)?)?;
        println!();
        println!("Loss report written to {}", path.display());
    }
    Ok(())
}

/// Write a record table as CSV, one generalized value per cell.
fn write_csv(table: &RecordTable, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    let headers: Vec<&str> = table.column_names().collect();
    writer.write_record(&headers)?;
    for index in 0..table.row_count() {
        let row: Vec<String> = headers
            .iter()
            .map(|name| {
                table
                    .get(name, index)
                    .map(ToString::to_string)
                    .unwrap_or_default()
            })
            .collect();
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
