//! Statistics over finished partitions and split bookkeeping.

use indexmap::IndexMap;

use crate::kernel::Partition;

/// Mean partition size.
pub fn mean_partition_size(partitions: &[Partition]) -> f64 {
    if partitions.is_empty() {
        return 0.0;
    }
    let total: usize = partitions.iter().map(Vec::len).sum();
    total as f64 / partitions.len() as f64
}

/// Population standard deviation of the partition sizes.
pub fn std_partition_size(partitions: &[Partition]) -> f64 {
    if partitions.is_empty() {
        return 0.0;
    }
    let mean = mean_partition_size(partitions);
    let variance: f64 = partitions
        .iter()
        .map(|p| {
            let diff = p.len() as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / partitions.len() as f64;
    variance.sqrt()
}

/// Split the per-attribute split counters into relational and textual
/// shares, using the textual attribute mapping to recognize entity-derived
/// helper attributes.
pub fn split_share(
    split_statistics: &IndexMap<String, usize>,
    textual_mapping: &IndexMap<String, Vec<String>>,
) -> (usize, usize) {
    let textual_attributes: Vec<&String> = textual_mapping.values().flatten().collect();
    let mut relational_splits = 0;
    let mut textual_splits = 0;
    for (attribute, count) in split_statistics {
        if textual_attributes.iter().any(|a| *a == attribute) {
            textual_splits += count;
        } else {
            relational_splits += count;
        }
    }
    (relational_splits, textual_splits)
}
