//! Configuration for the anonymization tool.
//!
//! A configuration is a JSON document with global parameters, per-attribute
//! declarations and the mapping from free-text attributes to their derived
//! entity helper attributes:
//!
//! ```json
//! {
//!   "parameters": { "k": 5, "strategy": "mondrian", "relational_weight": 0.5 },
//!   "attributes": {
//!     "name": { "anonymization_type": "direct_identifier" },
//!     "age": {
//!       "type": "numerical",
//!       "anonymization_type": "quasi_identifier",
//!       "bias": 0.4,
//!       "recoding_strategy": "hierarchy",
//!       "hierarchy": { "name": "0-100", "children": [ { "name": "0-49" } ] }
//!     },
//!     "notes": { "type": "text", "anonymization_type": "text" }
//!   },
//!   "entities": { "notes": ["notes_person", "notes_location"] }
//! }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{KanonError, Result};
use crate::hierarchy::{Hierarchy, HierarchySpec};
use crate::schema::{
    AnonymizationType, AttributeSchema, AttributeType, ElementType, RecodingRule, TableSchema,
};

pub const DEFAULT_K: usize = 10;
pub const DEFAULT_STRATEGY: &str = "mondrian";
pub const DEFAULT_RELATIONAL_WEIGHT: f64 = 0.5;
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ParametersSection {
    k: usize,
    strategy: String,
    relational_weight: f64,
}

impl Default for ParametersSection {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            strategy: DEFAULT_STRATEGY.to_string(),
            relational_weight: DEFAULT_RELATIONAL_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttributeSection {
    #[serde(rename = "type")]
    attr_type: Option<String>,
    anonymization_type: Option<String>,
    bias: Option<f64>,
    format: Option<String>,
    order: Option<Vec<String>>,
    recoding_strategy: Option<String>,
    hierarchy: Option<HierarchySpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    parameters: ParametersSection,
    #[serde(default)]
    attributes: IndexMap<String, AttributeSection>,
    #[serde(default)]
    entities: IndexMap<String, Vec<String>>,
}

/// Validated configuration consumed by the anonymization engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum group size.
    pub k: usize,
    /// Partitioning strategy name; validated when dispatched.
    pub strategy: String,
    /// Trade-off between relational and textual attribute influence.
    pub relational_weight: f64,
    /// Declared attribute schemas, including entity helper attributes.
    pub schema: TableSchema,
    /// Free-text attribute → derived entity helper attributes.
    pub textual_mapping: IndexMap<String, Vec<String>>,
}

impl Config {
    /// Load a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| KanonError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json)?;
        Self::from_file(file)
    }

    fn from_file(file: ConfigFile) -> Result<Self> {
        if file.parameters.k == 0 {
            return Err(KanonError::Config("k must be at least 1".to_string()));
        }

        let mut schema = TableSchema::new();
        for (name, section) in &file.attributes {
            schema.push(build_attribute(name, section)?);
        }
        for helpers in file.entities.values() {
            for helper in helpers {
                if schema.get(helper).is_none() {
                    schema.push(AttributeSchema::new(helper.clone(), AttributeType::Tokens));
                }
            }
        }

        Ok(Self {
            k: file.parameters.k,
            strategy: file.parameters.strategy,
            relational_weight: file.parameters.relational_weight,
            schema,
            textual_mapping: file.entities,
        })
    }

    /// Explicit bias per declared quasi-identifier, used by the
    /// space-partitioning strategy. Entity helper attributes have no entry.
    pub fn biases(&self) -> IndexMap<String, f64> {
        self.schema
            .attributes
            .iter()
            .filter(|a| {
                a.anonymization_type == AnonymizationType::QuasiIdentifier
                    && a.attr_type != AttributeType::Tokens
            })
            .map(|a| (a.name.clone(), a.bias))
            .collect()
    }

    /// Quasi-identifier names in declaration order.
    pub fn quasi_identifiers(&self) -> Vec<String> {
        self.schema
            .quasi_identifiers()
            .into_iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Entity helper attribute names.
    pub fn entity_attributes(&self) -> Vec<String> {
        self.schema
            .entity_attributes()
            .into_iter()
            .map(ToString::to_string)
            .collect()
    }
}

fn build_attribute(name: &str, section: &AttributeSection) -> Result<AttributeSchema> {
    let attr_type = parse_attr_type(name, section.attr_type.as_deref().unwrap_or("nominal"))?;
    let anonymization_type = parse_anonymization_type(
        name,
        section
            .anonymization_type
            .as_deref()
            .unwrap_or("insensitive_attribute"),
    )?;
    let recoding = parse_recoding(name, section.recoding_strategy.as_deref().unwrap_or("grouping"))?;

    let bias = section.bias.unwrap_or(0.0);
    if !(0.0..=1.0).contains(&bias) {
        return Err(KanonError::Config(format!(
            "Invalid bias {} for attribute {}. Bias must be between 0 and 1.",
            bias, name
        )));
    }

    let mut attribute = AttributeSchema::new(name, attr_type)
        .with_anonymization_type(anonymization_type)
        .with_recoding(recoding)
        .with_bias(bias);

    if attr_type == AttributeType::Date {
        attribute.date_format = Some(
            section
                .format
                .clone()
                .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string()),
        );
    }
    if let Some(order) = &section.order {
        attribute.order = Some(order.clone());
    }
    if let Some(spec) = &section.hierarchy {
        attribute.hierarchy = Some(Arc::new(Hierarchy::from_spec(spec)?));
    }
    Ok(attribute)
}

fn parse_attr_type(name: &str, value: &str) -> Result<AttributeType> {
    match value {
        "nominal" => Ok(AttributeType::Nominal),
        "ordinal" => Ok(AttributeType::Ordinal),
        "numerical" => Ok(AttributeType::Numeric),
        "date" => Ok(AttributeType::Date),
        "text" => Ok(AttributeType::Text),
        "tokens" => Ok(AttributeType::Tokens),
        "set" => Ok(AttributeType::SetValued(ElementType::Categorical)),
        "set_numerical" => Ok(AttributeType::SetValued(ElementType::Numeric)),
        "set_date" => Ok(AttributeType::SetValued(ElementType::Date)),
        other => Err(KanonError::Config(format!(
            "Unsupported data type '{}' for attribute {}",
            other, name
        ))),
    }
}

fn parse_anonymization_type(name: &str, value: &str) -> Result<AnonymizationType> {
    match value {
        "direct_identifier" => Ok(AnonymizationType::DirectIdentifier),
        "quasi_identifier" => Ok(AnonymizationType::QuasiIdentifier),
        "insensitive_attribute" => Ok(AnonymizationType::InsensitiveAttribute),
        "text" => Ok(AnonymizationType::Text),
        other => Err(KanonError::Config(format!(
            "Unsupported anonymization type '{}' for attribute {}",
            other, name
        ))),
    }
}

fn parse_recoding(name: &str, value: &str) -> Result<RecodingRule> {
    match value {
        "grouping" => Ok(RecodingRule::Grouping),
        "hierarchy" => Ok(RecodingRule::Hierarchy),
        "string_reduction" => Ok(RecodingRule::StringReduction),
        other => Err(KanonError::Config(format!(
            "Unsupported recoding strategy '{}' for attribute {}",
            other, name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "parameters": { "k": 5, "strategy": "mondrian", "relational_weight": 0.7 },
        "attributes": {
            "name": { "anonymization_type": "direct_identifier" },
            "age": {
                "type": "numerical",
                "anonymization_type": "quasi_identifier",
                "bias": 0.4,
                "recoding_strategy": "hierarchy",
                "hierarchy": { "name": "0-100", "children": [ { "name": "0-49" }, { "name": "50-100" } ] }
            },
            "zip": {
                "type": "nominal",
                "anonymization_type": "quasi_identifier",
                "recoding_strategy": "string_reduction"
            },
            "admitted": { "type": "date", "anonymization_type": "quasi_identifier" },
            "notes": { "type": "text", "anonymization_type": "text" }
        },
        "entities": { "notes": ["notes_person", "notes_location"] }
    }"#;

    #[test]
    fn test_parse_sample_config() {
        let config = Config::from_json(SAMPLE).unwrap();
        assert_eq!(config.k, 5);
        assert_eq!(config.strategy, "mondrian");
        assert_eq!(config.relational_weight, 0.7);
        assert_eq!(config.quasi_identifiers(), vec!["age", "zip", "admitted"]);
        assert_eq!(
            config.entity_attributes(),
            vec!["notes_person", "notes_location"]
        );

        let age = config.schema.get("age").unwrap();
        assert_eq!(age.attr_type, AttributeType::Numeric);
        assert_eq!(age.recoding, RecodingRule::Hierarchy);
        assert!(age.hierarchy.is_some());

        let admitted = config.schema.get("admitted").unwrap();
        assert_eq!(admitted.date_format.as_deref(), Some(DEFAULT_DATE_FORMAT));
    }

    #[test]
    fn test_defaults_apply() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.k, DEFAULT_K);
        assert_eq!(config.strategy, DEFAULT_STRATEGY);
        assert_eq!(config.relational_weight, DEFAULT_RELATIONAL_WEIGHT);
        assert!(config.schema.attributes.is_empty());
    }

    #[test]
    fn test_invalid_bias_rejected() {
        let json = r#"{ "attributes": { "age": { "type": "numerical", "bias": 1.5 } } }"#;
        assert!(matches!(
            Config::from_json(json),
            Err(KanonError::Config(_))
        ));
    }

    #[test]
    fn test_biases_exclude_entity_helpers() {
        let config = Config::from_json(SAMPLE).unwrap();
        let biases = config.biases();
        assert_eq!(biases.len(), 3);
        assert_eq!(biases["age"], 0.4);
        assert!(!biases.contains_key("notes_person"));
    }

    #[test]
    fn test_zero_k_rejected() {
        let json = r#"{ "parameters": { "k": 0 } }"#;
        assert!(Config::from_json(json).is_err());
    }
}
