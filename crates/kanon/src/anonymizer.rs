//! Main anonymization engine and public API.

use indexmap::IndexMap;
use tracing::info;

use crate::config::Config;
use crate::error::{KanonError, Result};
use crate::kernel::{partition_gdf, partition_mondrian, recode_table, Partition, TermIndex};
use crate::loss::{calculate_ncp, LossReport};
use crate::table::RecordTable;

/// Result of one anonymization run.
#[derive(Debug, Clone)]
pub struct AnonymizationOutcome {
    /// The generalized table, same shape and row order as the input.
    pub table: RecordTable,
    /// The finished partitions.
    pub partitions: Vec<Partition>,
    /// Per-attribute split counts; only the space-partitioning strategy
    /// reports these.
    pub split_statistics: Option<IndexMap<String, usize>>,
}

/// The anonymization engine: wraps a configuration and the sensitive term
/// index produced by the upstream entity-recognition collaborator.
pub struct Kanon {
    config: Config,
    terms: TermIndex,
}

impl Kanon {
    /// Create an engine without a term index (space-partitioning only).
    pub fn new(config: Config) -> Self {
        Self {
            config,
            terms: TermIndex::new(),
        }
    }

    /// Create an engine with a sensitive term index.
    pub fn with_terms(config: Config, terms: TermIndex) -> Self {
        Self { config, terms }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Drop attributes declared as direct identifiers.
    pub fn remove_direct_identifiers(&self, table: &mut RecordTable) {
        let identifiers = self.config.schema.direct_identifiers();
        if identifiers.is_empty() {
            return;
        }
        let joined = identifiers.join(", ");
        info!(attributes = joined.as_str(), "dropping direct identifiers");
        table.drop_columns(&identifiers);
    }

    /// Partition the table with the configured strategy.
    ///
    /// The term index is narrowed in place when the term-driven strategy
    /// runs, so a fresh engine is needed for a second run over the same
    /// data.
    pub fn partition(
        &mut self,
        table: &RecordTable,
    ) -> Result<(Vec<Partition>, Option<IndexMap<String, usize>>)> {
        let k = self.config.k;
        match self.config.strategy.as_str() {
            "mondrian" => {
                let ordered = ordered_quasi_identifiers(
                    &self.config.quasi_identifiers(),
                    &self.config.entity_attributes(),
                    self.config.relational_weight,
                );
                let joined = ordered.join(", ");
                info!(attributes = joined.as_str(), k, "partitioning dataset with mondrian");
                let (partitions, statistics) = partition_mondrian(
                    table,
                    &self.config.schema,
                    &ordered,
                    k,
                    &self.config.biases(),
                    self.config.relational_weight,
                )?;
                Ok((partitions, Some(statistics)))
            }
            "gdf" => {
                info!(k, "partitioning dataset with gdf");
                Ok((partition_gdf(table, k, &mut self.terms), None))
            }
            other => Err(KanonError::UnsupportedStrategy(other.to_string())),
        }
    }

    /// Anonymize the quasi-identifying attributes of a table by
    /// partitioning and recoding.
    pub fn anonymize(&mut self, table: &RecordTable) -> Result<AnonymizationOutcome> {
        let (partitions, split_statistics) = self.partition(table)?;

        let mut attributes = self.config.quasi_identifiers();
        attributes.extend(self.config.entity_attributes());
        let anonymized = recode_table(table, &self.config.schema, &partitions, &attributes)?;

        Ok(AnonymizationOutcome {
            table: anonymized,
            partitions,
            split_statistics,
        })
    }

    /// Score the information loss of an anonymized table against its
    /// original.
    pub fn score(&self, original: &RecordTable, anonymized: &RecordTable) -> Result<LossReport> {
        calculate_ncp(
            original,
            anonymized,
            &self.config.schema,
            &self.config.quasi_identifiers(),
            &self.config.textual_mapping,
        )
    }
}

/// Attribute ordering for the space-partitioning strategy: the relational
/// weight decides whether relational attributes, entity attributes or both
/// participate, and which family is tried first on priority ties.
fn ordered_quasi_identifiers(
    quasi_identifiers: &[String],
    entity_attributes: &[String],
    relational_weight: f64,
) -> Vec<String> {
    if relational_weight == 0.0 {
        entity_attributes.to_vec()
    } else if relational_weight == 1.0 {
        quasi_identifiers.to_vec()
    } else if relational_weight >= 0.5 {
        let mut ordered = quasi_identifiers.to_vec();
        ordered.extend_from_slice(entity_attributes);
        ordered
    } else {
        let mut ordered = entity_attributes.to_vec();
        ordered.extend_from_slice(quasi_identifiers);
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_ordering_by_relational_weight() {
        let relational = names(&["age", "zip"]);
        let entity = names(&["notes_person"]);

        assert_eq!(
            ordered_quasi_identifiers(&relational, &entity, 0.0),
            names(&["notes_person"])
        );
        assert_eq!(
            ordered_quasi_identifiers(&relational, &entity, 1.0),
            names(&["age", "zip"])
        );
        assert_eq!(
            ordered_quasi_identifiers(&relational, &entity, 0.7),
            names(&["age", "zip", "notes_person"])
        );
        assert_eq!(
            ordered_quasi_identifiers(&relational, &entity, 0.3),
            names(&["notes_person", "age", "zip"])
        );
    }

    #[test]
    fn test_unsupported_strategy_is_fatal() {
        let config = Config::from_json(r#"{ "parameters": { "strategy": "cluster" } }"#).unwrap();
        let table = RecordTable::new();
        let mut engine = Kanon::new(config);
        assert!(matches!(
            engine.anonymize(&table),
            Err(KanonError::UnsupportedStrategy(_))
        ));
    }
}
