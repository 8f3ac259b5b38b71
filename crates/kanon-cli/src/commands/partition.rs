//! Dry run: partition only and print partition statistics.

use std::path::PathBuf;

use colored::Colorize;
use kanon::stats::{mean_partition_size, split_share, std_partition_size};

pub fn run(
    config: PathBuf,
    input: PathBuf,
    terms: Option<PathBuf>,
    k: Option<usize>,
    strategy: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut engine, mut table) = super::prepare(&config, &input, terms.as_ref(), k, strategy)?;

    engine.remove_direct_identifiers(&mut table);
    let (partitions, split_statistics) = engine.partition(&table)?;

    let k = engine.config().k;
    let smallest = partitions.iter().map(Vec::len).min().unwrap_or(0);

    println!("{}", "Partitioning summary".bold());
    println!("  records:         {}", table.row_count());
    println!("  partitions:      {}", partitions.len());
    println!(
        "  partition size:  {:.2} ± {:.2}",
        mean_partition_size(&partitions),
        std_partition_size(&partitions)
    );
    if smallest >= k {
        println!("  smallest:        {} (k = {})", smallest, k);
    } else {
        let note = format!("(below k = {}, irreducible remainder)", k);
        println!("  smallest:        {} {}", smallest, note.as_str().yellow());
    }
    if let Some(statistics) = &split_statistics {
        let (relational, textual) = split_share(statistics, &engine.config().textual_mapping);
        println!("  splits:          {} relational, {} textual", relational, textual);
        for (attribute, count) in statistics {
            if *count > 0 {
                println!("    {}: {}", attribute, count);
            }
        }
    }
    Ok(())
}
