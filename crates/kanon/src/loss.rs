//! Normalized Certainty Penalty for heterogeneous datasets.
//!
//! Compares the original table with its generalized counterpart and scores
//! how much specificity each quasi-identifying attribute lost, normalized
//! to `[0, 1]`: 0 when nothing was generalized, 1 when an attribute was
//! generalized to its full domain.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::error::{KanonError, Result};
use crate::kernel::recode_range_hierarchical;
use crate::schema::{AttributeSchema, AttributeType, ElementType, TableSchema};
use crate::table::RecordTable;
use crate::value::{normalize_to_day, Value};

/// Loss detail for one original textual attribute.
#[derive(Debug, Clone, Serialize)]
pub struct TextualAttributeLoss {
    /// Loss per derived entity-type helper attribute.
    pub entities: IndexMap<String, f64>,
    /// Combined loss over the union of the attribute's token lists.
    pub total: f64,
}

/// Loss detail across all textual attributes.
#[derive(Debug, Clone, Serialize)]
pub struct TextualLoss {
    pub attributes: IndexMap<String, TextualAttributeLoss>,
    /// Mean of the per-attribute combined losses.
    pub total: f64,
}

/// Information loss scores produced by [`calculate_ncp`].
#[derive(Debug, Clone, Serialize)]
pub struct LossReport {
    /// Average of relational and textual loss when textual attributes
    /// exist, otherwise equal to the relational loss.
    pub total: f64,
    /// Mean loss over the relational quasi-identifiers.
    pub relational: f64,
    /// Textual loss detail, present only when a textual mapping was given.
    pub textual: Option<TextualLoss>,
}

/// Calculate the Normalized Certainty Penalty of an anonymized table.
pub fn calculate_ncp(
    original: &RecordTable,
    anonymized: &RecordTable,
    schema: &TableSchema,
    relational_attributes: &[String],
    textual_mapping: &IndexMap<String, Vec<String>>,
) -> Result<LossReport> {
    let mut relational = 0.0;
    for name in relational_attributes {
        let (Some(attribute), Some(orig), Some(anon)) = (
            schema.get(name),
            original.column(name),
            anonymized.column(name),
        ) else {
            continue;
        };
        let ncp = ncp_attribute(attribute, orig, anon)?;
        debug!(attribute = name.as_str(), ncp, "attribute information loss");
        relational += ncp;
    }
    if !relational_attributes.is_empty() {
        relational /= relational_attributes.len() as f64;
    }

    if textual_mapping.is_empty() {
        return Ok(LossReport {
            total: relational,
            relational,
            textual: None,
        });
    }

    let mut attributes: IndexMap<String, TextualAttributeLoss> = IndexMap::new();
    let mut accumulated = 0.0;
    for (textual_attribute, helpers) in textual_mapping {
        let mut entities: IndexMap<String, f64> = IndexMap::new();
        for helper in helpers {
            let (Some(orig), Some(anon)) = (original.column(helper), anonymized.column(helper))
            else {
                continue;
            };
            let loss = ncp_tokens(orig, anon);
            debug!(entity = helper.as_str(), loss, "entity information loss");
            entities.insert(helper.clone(), loss);
        }

        let rows = original.row_count();
        let mut orig_combined: Vec<Value> = Vec::with_capacity(rows);
        let mut anon_combined: Vec<Value> = Vec::with_capacity(rows);
        for index in 0..rows {
            orig_combined.push(combine_tokens(original, helpers, index));
            anon_combined.push(combine_tokens(anonymized, helpers, index));
        }
        let total = ncp_tokens(&orig_combined, &anon_combined);
        debug!(
            attribute = textual_attribute.as_str(),
            total, "textual attribute information loss"
        );
        accumulated += total;
        attributes.insert(textual_attribute.clone(), TextualAttributeLoss { entities, total });
    }

    let textual_total = accumulated / textual_mapping.len() as f64;
    Ok(LossReport {
        total: (relational + textual_total) / 2.0,
        relational,
        textual: Some(TextualLoss {
            attributes,
            total: textual_total,
        }),
    })
}

/// Union of a record's token lists across the given helper attributes.
fn combine_tokens(table: &RecordTable, helpers: &[String], index: usize) -> Value {
    let mut combined = Vec::new();
    for helper in helpers {
        if let Some(Value::Tokens(spans)) = table.get(helper, index) {
            combined.extend(spans.iter().cloned());
        }
    }
    if combined.is_empty() {
        Value::Null
    } else {
        Value::Tokens(combined)
    }
}

fn ncp_attribute(attribute: &AttributeSchema, orig: &[Value], anon: &[Value]) -> Result<f64> {
    match attribute.attr_type {
        AttributeType::SetValued(element_type) => {
            ncp_set_valued(attribute, element_type, orig, anon)
        }
        AttributeType::Tokens => Ok(ncp_tokens(orig, anon)),
        AttributeType::Numeric => {
            if anon.iter().any(|v| matches!(v, Value::Node(_))) {
                ncp_numeric_hierarchy(orig, anon)
            } else {
                Ok(ncp_numeric(orig, anon))
            }
        }
        AttributeType::Date => Ok(ncp_date(orig, anon)),
        AttributeType::Nominal | AttributeType::Ordinal => Ok(ncp_categorical(orig, anon)),
        AttributeType::Text => Err(KanonError::Usage(format!(
            "No information loss rule for free-text attribute '{}'",
            attribute.name
        ))),
    }
}

/// Mean over records of `generalized_range_size / dataset_domain_size`.
fn ncp_numeric(orig: &[Value], anon: &[Value]) -> f64 {
    let numbers: Vec<f64> = orig.iter().filter_map(Value::as_number).collect();
    let Some(domain) = numeric_domain(&numbers) else {
        return 0.0;
    };
    let mut accumulated = 0.0;
    for value in anon {
        if let Value::Range(range) = value {
            accumulated += range.len() as f64 / domain;
        }
    }
    mean_over(accumulated, anon.len())
}

/// Same ratio, but numerator and denominator are hierarchy bracket sizes;
/// the denominator is the bracket that would cover the entire original
/// attribute range.
fn ncp_numeric_hierarchy(orig: &[Value], anon: &[Value]) -> Result<f64> {
    let hierarchy = anon
        .iter()
        .find_map(|v| match v {
            Value::Node(node) => Some(node.hierarchy.clone()),
            _ => None,
        })
        .ok_or_else(|| KanonError::Usage("No hierarchy node in anonymized series".to_string()))?;

    let numbers: Vec<f64> = orig.iter().filter_map(Value::as_number).collect();
    let minimum = numbers.iter().copied().fold(f64::INFINITY, f64::min);
    let maximum = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let worst = recode_range_hierarchical(minimum, maximum, &hierarchy);
    let worst_len = hierarchy.node(worst).range.len() as f64;

    let mut accumulated = 0.0;
    for value in anon {
        if let Value::Node(node) = value {
            accumulated += node.range().len() as f64 / worst_len;
        }
    }
    Ok(mean_over(accumulated, anon.len()))
}

/// Mean over records of `|generalized set| / |distinct categories|`;
/// records that kept a single value contribute 0.
fn ncp_categorical(orig: &[Value], anon: &[Value]) -> f64 {
    let distinct: BTreeSet<&str> = orig.iter().filter_map(Value::as_text).collect();
    if distinct.is_empty() {
        return 0.0;
    }
    let categories = distinct.len() as f64;
    let mut accumulated = 0.0;
    for value in anon {
        if let Value::Set(set) = value {
            accumulated += set.len() as f64 / categories;
        }
    }
    mean_over(accumulated, anon.len())
}

/// Mean over records of the share of distinct original dates covered by
/// the generalized period or year range.
fn ncp_date(orig: &[Value], anon: &[Value]) -> f64 {
    let days: BTreeSet<NaiveDate> = orig
        .iter()
        .filter_map(Value::as_date)
        .map(|d| normalize_to_day(d).date())
        .collect();
    if days.is_empty() {
        return 0.0;
    }
    let total = days.len() as f64;
    let mut accumulated = 0.0;
    for value in anon {
        match value {
            Value::Range(range) => {
                let covered = days
                    .iter()
                    .filter(|d| range.contains_i64(i64::from(chrono::Datelike::year(*d))))
                    .count();
                accumulated += covered as f64 / total;
            }
            Value::Period(period) => {
                let covered = days.iter().filter(|d| period.covers(**d)).count();
                accumulated += covered as f64 / total;
            }
            _ => {}
        }
    }
    mean_over(accumulated, anon.len())
}

/// Per record with original tokens: `1 - |retained ∩ original| / |original|`;
/// a record with no surviving output contributes loss 1.
fn ncp_tokens(orig: &[Value], anon: &[Value]) -> f64 {
    let mut counted = 0usize;
    let mut accumulated = 0.0;
    for (index, value) in orig.iter().enumerate() {
        let Value::Tokens(original_spans) = value else {
            continue;
        };
        if original_spans.is_empty() {
            continue;
        }
        counted += 1;
        match anon.get(index) {
            Some(Value::Tokens(retained)) if !retained.is_empty() => {
                let original_set: BTreeSet<_> = original_spans.iter().collect();
                let surviving = retained
                    .iter()
                    .collect::<BTreeSet<_>>()
                    .intersection(&original_set)
                    .count();
                accumulated += 1.0 - surviving as f64 / original_spans.len() as f64;
            }
            _ => accumulated += 1.0,
        }
    }
    if counted == 0 {
        0.0
    } else {
        accumulated / counted as f64
    }
}

/// Flatten a multi-valued attribute to element granularity and apply the
/// element rule; records contribute one row per original element, so a
/// record with more elements weighs more.
fn ncp_set_valued(
    attribute: &AttributeSchema,
    element_type: ElementType,
    orig: &[Value],
    anon: &[Value],
) -> Result<f64> {
    let mut orig_elements: Vec<Value> = Vec::new();
    let mut anon_parallel: Vec<Value> = Vec::new();
    for (index, value) in orig.iter().enumerate() {
        let Value::Set(items) = value else {
            continue;
        };
        for item in items {
            let element = match element_type {
                ElementType::Categorical => Value::Text(item.clone()),
                ElementType::Numeric => Value::Number(item.trim().parse::<f64>().map_err(|_| {
                    KanonError::Usage(format!(
                        "Set element '{}' of '{}' is not numeric",
                        item, attribute.name
                    ))
                })?),
                ElementType::Date => {
                    return Err(KanonError::Usage(format!(
                        "Date-valued sets of '{}' have no loss rule",
                        attribute.name
                    )));
                }
            };
            orig_elements.push(element);
            anon_parallel.push(anon.get(index).cloned().unwrap_or(Value::Null));
        }
    }

    match element_type {
        ElementType::Categorical => Ok(ncp_categorical(&orig_elements, &anon_parallel)),
        ElementType::Numeric => {
            if anon_parallel.iter().any(|v| matches!(v, Value::Node(_))) {
                ncp_numeric_hierarchy(&orig_elements, &anon_parallel)
            } else {
                Ok(ncp_numeric(&orig_elements, &anon_parallel))
            }
        }
        ElementType::Date => unreachable!("rejected above"),
    }
}

fn numeric_domain(numbers: &[f64]) -> Option<f64> {
    if numbers.is_empty() {
        return None;
    }
    let minimum = numbers.iter().copied().fold(f64::INFINITY, f64::min).floor();
    let maximum = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max).ceil();
    Some(maximum - minimum + 1.0)
}

fn mean_over(accumulated: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        accumulated / count as f64
    }
}
