//! Attribute and table schema definitions.

use std::sync::Arc;

use crate::hierarchy::Hierarchy;

use super::types::{AnonymizationType, AttributeType, RecodingRule};

/// Declared schema for a single attribute.
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    /// Attribute name (column header).
    pub name: String,
    /// Declared semantic type.
    pub attr_type: AttributeType,
    /// Role during anonymization.
    pub anonymization_type: AnonymizationType,
    /// Recoding rule used by the recoding engine.
    pub recoding: RecodingRule,
    /// Split-priority bias in `[0, 1]`.
    pub bias: f64,
    /// Date parse format for [`AttributeType::Date`] attributes.
    pub date_format: Option<String>,
    /// Category order for [`AttributeType::Ordinal`] attributes.
    pub order: Option<Vec<String>>,
    /// Generalization hierarchy, shared by reference.
    pub hierarchy: Option<Arc<Hierarchy>>,
}

impl AttributeSchema {
    /// Create a schema with defaults for everything but name and type.
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            anonymization_type: AnonymizationType::default(),
            recoding: RecodingRule::default(),
            bias: 0.0,
            date_format: None,
            order: None,
            hierarchy: None,
        }
    }

    pub fn with_anonymization_type(mut self, anonymization_type: AnonymizationType) -> Self {
        self.anonymization_type = anonymization_type;
        self
    }

    pub fn with_recoding(mut self, recoding: RecodingRule) -> Self {
        self.recoding = recoding;
        self
    }

    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_order(mut self, order: Vec<String>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_hierarchy(mut self, hierarchy: Arc<Hierarchy>) -> Self {
        self.hierarchy = Some(hierarchy);
        self
    }
}

/// Schema for an entire table: an ordered list of attribute declarations.
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    pub attributes: Vec<AttributeSchema>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attributes(attributes: Vec<AttributeSchema>) -> Self {
        Self { attributes }
    }

    pub fn push(&mut self, attribute: AttributeSchema) {
        self.attributes.push(attribute);
    }

    /// Get an attribute schema by name.
    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    /// Attributes declared as direct identifiers.
    pub fn direct_identifiers(&self) -> Vec<&str> {
        self.with_role(AnonymizationType::DirectIdentifier)
    }

    /// Attributes declared as quasi-identifiers, in declaration order.
    pub fn quasi_identifiers(&self) -> Vec<&str> {
        self.with_role(AnonymizationType::QuasiIdentifier)
    }

    /// Free-text attributes.
    pub fn textual_attributes(&self) -> Vec<&str> {
        self.with_role(AnonymizationType::Text)
    }

    /// Entity-span helper attributes derived from free text.
    pub fn entity_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.attr_type == AttributeType::Tokens)
            .map(|a| a.name.as_str())
            .collect()
    }

    fn with_role(&self, role: AnonymizationType) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.anonymization_type == role)
            .map(|a| a.name.as_str())
            .collect()
    }
}
