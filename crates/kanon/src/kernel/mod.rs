//! The anonymization kernel: span computation, partitioning and recoding.

mod partition;
mod recode;
mod span;
mod util;

pub use partition::{partition_gdf, partition_mondrian, Partition, TermIndex};
pub use recode::{
    recode_dates, recode_nominal, recode_ordinal, recode_partition_value, recode_range,
    recode_range_hierarchical, recode_strings, recode_table, recode_tokens,
};
pub use span::{attribute_span, attribute_spans};
