//! kanon: k-anonymization engine for tabular datasets with mixed
//! relational and free-text attributes.
//!
//! The engine partitions a record table into groups of at least `k`
//! records, generalizes each group's quasi-identifying values into one
//! shared representative per attribute, and scores the resulting
//! information loss with the Normalized Certainty Penalty.
//!
//! # Core Principles
//!
//! - **Declared types**: attribute semantics come from configuration; the
//!   kernel never infers them.
//! - **Non-destructive**: the original table is read-only; anonymization
//!   produces a new table with the same shape and row order.
//! - **Deterministic**: identical inputs produce identical partitions,
//!   generalized values and split statistics.
//!
//! # Example
//!
//! ```no_run
//! use kanon::{Config, Kanon, Parser, coerce_table};
//!
//! let config = Config::from_path("config.json").unwrap();
//! let (raw, _meta) = Parser::new().parse_file("records.csv").unwrap();
//! let table = coerce_table(&raw, &config.schema).unwrap();
//!
//! let mut engine = Kanon::new(config);
//! let outcome = engine.anonymize(&table).unwrap();
//! let report = engine.score(&table, &outcome.table).unwrap();
//! println!("information loss: {:.4}", report.total);
//! ```

pub mod config;
pub mod error;
pub mod hierarchy;
pub mod input;
pub mod kernel;
pub mod loss;
pub mod schema;
pub mod stats;
pub mod table;
pub mod value;

mod anonymizer;

pub use anonymizer::{AnonymizationOutcome, Kanon};
pub use config::Config;
pub use error::{KanonError, Result};
pub use hierarchy::{Hierarchy, HierarchySpec};
pub use input::{coerce_table, Parser, RawTable, SourceMetadata};
pub use kernel::{partition_gdf, partition_mondrian, recode_table, Partition, TermIndex};
pub use loss::{calculate_ncp, LossReport, TextualLoss};
pub use schema::{
    AnonymizationType, AttributeSchema, AttributeType, ElementType, RecodingRule, TableSchema,
};
pub use table::RecordTable;
pub use value::{EntitySpan, IntRange, Period, Value};
