//! Thin ingestion layer: CSV parsing and type coercion.

mod coerce;
mod parser;
mod source;

pub use coerce::coerce_table;
pub use parser::{Parser, ParserConfig};
pub use source::{RawTable, SourceMetadata};
