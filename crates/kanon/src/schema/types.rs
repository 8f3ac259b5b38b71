//! Core type definitions for attribute declarations.

use serde::{Deserialize, Serialize};

/// Element type of a multi-valued attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Numeric,
    Date,
    Categorical,
}

/// Declared semantic type of an attribute.
///
/// Types are fixed input from configuration; the kernel never infers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// Continuous or integer numeric values.
    Numeric,
    /// Date or timestamp values.
    Date,
    /// Unordered categorical values.
    Nominal,
    /// Ordered categorical values.
    Ordinal,
    /// Free text carried through the kernel untouched.
    Text,
    /// Recognized entity spans derived from a free-text attribute.
    Tokens,
    /// Multi-valued category or number set.
    SetValued(ElementType),
}

impl AttributeType {
    /// Returns true for the nominal/ordinal family.
    pub fn is_categorical(&self) -> bool {
        matches!(self, AttributeType::Nominal | AttributeType::Ordinal)
    }

    /// Returns true if values must be flattened to element granularity
    /// before span computation, splitting or generalization.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, AttributeType::Tokens | AttributeType::SetValued(_))
    }
}

/// How an attribute participates in anonymization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnonymizationType {
    /// Dropped before anonymization.
    DirectIdentifier,
    /// Participates in partitioning and is generalized.
    QuasiIdentifier,
    /// Carried through unchanged.
    InsensitiveAttribute,
    /// Free-text attribute whose derived entity columns are generalized.
    Text,
}

impl Default for AnonymizationType {
    fn default() -> Self {
        AnonymizationType::InsensitiveAttribute
    }
}

/// Recoding rule applied when generalizing an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecodingRule {
    /// Ranges for numbers and dates, value sets for categories.
    Grouping,
    /// Numeric generalization through a configured hierarchy of brackets.
    Hierarchy,
    /// Stepwise masking of string values.
    StringReduction,
}

impl Default for RecodingRule {
    fn default() -> Self {
        RecodingRule::Grouping
    }
}
