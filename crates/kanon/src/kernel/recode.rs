//! Recoding of finished partitions into generalized values.
//!
//! For every (partition, attribute) pair the engine computes one
//! generalized representative and broadcasts it to every record of the
//! partition. Dispatch follows the declared attribute type: token lists
//! first, then multi-valued sets, numbers, dates and finally categorical
//! values (or string reduction when configured). A homogeneous partition
//! keeps its original value unchanged.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::{KanonError, Result};
use crate::hierarchy::Hierarchy;
use crate::schema::{AttributeSchema, AttributeType, ElementType, RecodingRule, TableSchema};
use crate::table::RecordTable;
use crate::value::{normalize_to_day, EntitySpan, HierarchyNodeRef, IntRange, Period, Value};

use super::partition::Partition;
use super::util::{flatten_series, intersect_token_lists, next_string_to_reduce, reduce_string, Element};

/// Recode every listed attribute of every partition, producing a new table
/// with the same shape and row order.
pub fn recode_table(
    table: &RecordTable,
    schema: &TableSchema,
    partitions: &[Partition],
    attributes: &[String],
) -> Result<RecordTable> {
    let mut output = table.clone();
    for partition in partitions {
        debug!(size = partition.len(), "recoding partition");
        for name in attributes {
            let Some(attribute) = schema.get(name) else {
                continue;
            };
            if !table.has_column(name) {
                continue;
            }
            let pairs = table.values_at(name, partition);
            let value = recode_partition_value(attribute, &pairs)?;
            for &index in partition {
                output.set(name, index, value.clone())?;
            }
        }
    }
    Ok(output)
}

/// Compute the single generalized representative for one attribute over one
/// partition.
pub fn recode_partition_value(
    attribute: &AttributeSchema,
    pairs: &[(usize, &Value)],
) -> Result<Value> {
    match attribute.attr_type {
        AttributeType::Tokens => Ok(recode_tokens(pairs)),
        AttributeType::SetValued(element_type) => {
            recode_set_valued(attribute, element_type, pairs)
        }
        AttributeType::Numeric => {
            let values: Vec<&Value> = pairs.iter().map(|(_, v)| *v).collect();
            recode_range(&values, hierarchy_for(attribute))
        }
        AttributeType::Date => {
            let values: Vec<&Value> = pairs.iter().map(|(_, v)| *v).collect();
            recode_dates(&values)
        }
        AttributeType::Nominal | AttributeType::Ordinal => {
            let values: Vec<&Value> = pairs.iter().map(|(_, v)| *v).collect();
            match attribute.recoding {
                RecodingRule::StringReduction => recode_strings(&values),
                _ if attribute.attr_type == AttributeType::Ordinal => {
                    recode_ordinal(attribute, &values)
                }
                _ => recode_nominal(attribute, &values),
            }
        }
        AttributeType::Text => Err(KanonError::Usage(format!(
            "Attribute '{}' is free text and cannot be generalized directly",
            attribute.name
        ))),
    }
}

fn hierarchy_for(attribute: &AttributeSchema) -> Option<&Arc<Hierarchy>> {
    if attribute.recoding == RecodingRule::Hierarchy {
        attribute.hierarchy.as_ref()
    } else {
        None
    }
}

/// Generalize numbers to a range, or to a hierarchy bracket if provided.
/// A homogeneous series keeps its value, which also makes re-running the
/// generalization on an already generalized range a no-op.
pub fn recode_range(values: &[&Value], hierarchy: Option<&Arc<Hierarchy>>) -> Result<Value> {
    if let Some(first) = homogeneous_value(values) {
        return Ok(first.clone());
    }
    let numbers = numbers_of(values)?;
    let minimum = fold_min(&numbers);
    let maximum = fold_max(&numbers);
    if let Some(hierarchy) = hierarchy {
        let node = recode_range_hierarchical(minimum, maximum, hierarchy);
        return Ok(Value::Node(HierarchyNodeRef {
            hierarchy: Arc::clone(hierarchy),
            node,
        }));
    }
    Ok(Value::Range(IntRange::new(
        minimum.floor() as i64,
        maximum.ceil() as i64 + 1,
    )))
}

/// Locate the smallest hierarchy bracket covering both `minimum` and
/// `maximum`. The search walks the leaves upward, always taking the node
/// with the shortest range next (ties keep discovery order), and falls back
/// to the root when the tree is exhausted: total generalization, not an
/// error.
pub fn recode_range_hierarchical(minimum: f64, maximum: f64, hierarchy: &Hierarchy) -> usize {
    let mut candidates: Vec<usize> = hierarchy.leaves();
    candidates.sort_by_key(|&n| hierarchy.node(n).range.len());

    if candidates.is_empty() {
        return hierarchy.root();
    }
    let mut node = candidates.remove(0);
    while !hierarchy.node(node).is_root() {
        let range = hierarchy.node(node).range;
        if range.contains_f64(minimum) && range.contains_f64(maximum) {
            return node;
        }
        if let Some(parent) = hierarchy.parent_of(node) {
            if !candidates.contains(&parent) {
                candidates.push(parent);
                candidates.sort_by_key(|&n| hierarchy.node(n).range.len());
            }
        }
        if candidates.is_empty() {
            return hierarchy.root();
        }
        node = candidates.remove(0);
    }
    node
}

/// Generalize dates: suppress time, then day, then month; if years still
/// differ, fall back to a numeric range over the year component. The
/// finest representation that is unique wins.
pub fn recode_dates(values: &[&Value]) -> Result<Value> {
    let dates = dates_of(values)?;

    let normalized: Vec<_> = dates.iter().map(|d| normalize_to_day(*d)).collect();
    if all_equal(&normalized) {
        return Ok(Value::Date(normalized[0]));
    }

    let months: Vec<Period> = dates
        .iter()
        .map(|d| Period::Month {
            year: chrono::Datelike::year(&d.date()),
            month: chrono::Datelike::month(&d.date()),
        })
        .collect();
    if all_equal(&months) {
        return Ok(Value::Period(months[0]));
    }

    let years: Vec<Period> = dates
        .iter()
        .map(|d| Period::Year {
            year: chrono::Datelike::year(&d.date()),
        })
        .collect();
    if all_equal(&years) {
        return Ok(Value::Period(years[0]));
    }

    let year_numbers: Vec<Value> = dates
        .iter()
        .map(|d| Value::Number(f64::from(chrono::Datelike::year(&d.date()))))
        .collect();
    let year_refs: Vec<&Value> = year_numbers.iter().collect();
    recode_range(&year_refs, None)
}

/// Generalize ordered categorical values to a single value or the set of
/// values present. Calling this on an attribute not declared ordinal is a
/// usage error.
pub fn recode_ordinal(attribute: &AttributeSchema, values: &[&Value]) -> Result<Value> {
    if attribute.attr_type != AttributeType::Ordinal {
        return Err(KanonError::Usage(format!(
            "Ordinal generalization cannot be applied to attribute '{}'",
            attribute.name
        )));
    }
    grouped_categories(values)
}

/// Generalize nominal categorical values to a single value or the set of
/// values present. Calling this on a non-categorical attribute is a usage
/// error.
pub fn recode_nominal(attribute: &AttributeSchema, values: &[&Value]) -> Result<Value> {
    if !attribute.attr_type.is_categorical() {
        return Err(KanonError::Usage(format!(
            "Nominal generalization cannot be applied to attribute '{}'",
            attribute.name
        )));
    }
    grouped_categories(values)
}

fn grouped_categories(values: &[&Value]) -> Result<Value> {
    let mut distinct: BTreeSet<String> = BTreeSet::new();
    for value in values {
        match value {
            Value::Text(s) => {
                distinct.insert(s.clone());
            }
            Value::Null => {}
            other => {
                return Err(KanonError::Usage(format!(
                    "Expected categorical value, found {:?}",
                    other
                )));
            }
        }
    }
    match distinct.len() {
        0 => Ok(Value::Null),
        1 => Ok(Value::Text(distinct.into_iter().next().unwrap_or_default())),
        _ => Ok(Value::Set(distinct)),
    }
}

/// Generalize strings by stepwise masking until one distinct value remains.
pub fn recode_strings(values: &[&Value]) -> Result<Value> {
    let mut distinct: BTreeSet<String> = BTreeSet::new();
    for value in values {
        match value {
            Value::Text(s) => {
                distinct.insert(s.clone());
            }
            Value::Null => {}
            other => {
                return Err(KanonError::Usage(format!(
                    "String reduction expects text values, found {:?}",
                    other
                )));
            }
        }
    }
    if distinct.is_empty() {
        return Ok(Value::Null);
    }
    while distinct.len() > 1 {
        let Some(longest) = next_string_to_reduce(&distinct) else {
            break;
        };
        distinct.remove(&longest);
        distinct.insert(reduce_string(&longest));
    }
    Ok(Value::Text(distinct.into_iter().next().unwrap_or_default()))
}

/// Generalize a multi-valued attribute by flattening to element rows,
/// recursing with the element type, and broadcasting the single result.
fn recode_set_valued(
    attribute: &AttributeSchema,
    element_type: ElementType,
    pairs: &[(usize, &Value)],
) -> Result<Value> {
    let (flattened, _) = flatten_series(attribute.attr_type, pairs)?;
    let element_values: Vec<Value> = flattened
        .into_iter()
        .map(|(_, element)| match element {
            Element::Number(n) => Value::Number(n),
            Element::Date(d) => Value::Date(d),
            Element::Text(s) => Value::Text(s),
            Element::Null => Value::Null,
        })
        .collect();
    let refs: Vec<&Value> = element_values.iter().collect();
    match element_type {
        ElementType::Numeric => recode_range(&refs, hierarchy_for(attribute)),
        ElementType::Date => recode_dates(&refs),
        ElementType::Categorical => grouped_categories(&refs),
    }
}

/// Generalize token lists by intersecting the recognized spans across every
/// record of the partition. A record with no tokens empties the result for
/// the whole partition.
pub fn recode_tokens(pairs: &[(usize, &Value)]) -> Value {
    let mut lists: Vec<&[EntitySpan]> = Vec::with_capacity(pairs.len());
    for (_, value) in pairs {
        match value {
            Value::Tokens(spans) if !spans.is_empty() => lists.push(spans),
            _ => return Value::Null,
        }
    }
    let Some(first) = lists.first() else {
        return Value::Null;
    };

    let mut results: BTreeSet<EntitySpan> = first.iter().cloned().collect();
    let mut unique = results.clone();
    for list in &lists[1..] {
        let (intersection, remaining) = intersect_token_lists(&unique, list);
        results = intersection;
        unique = remaining;
        if results.is_empty() {
            return Value::Null;
        }
    }
    Value::Tokens(results.into_iter().collect())
}

fn homogeneous_value<'a>(values: &[&'a Value]) -> Option<&'a Value> {
    let first = values.first()?;
    values.iter().all(|v| v == first).then_some(*first)
}

fn all_equal<T: PartialEq>(items: &[T]) -> bool {
    items.windows(2).all(|w| w[0] == w[1])
}

fn numbers_of(values: &[&Value]) -> Result<Vec<f64>> {
    let mut numbers = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Number(n) => numbers.push(*n),
            Value::Null => {}
            other => {
                return Err(KanonError::Usage(format!(
                    "Expected numeric value, found {:?}",
                    other
                )));
            }
        }
    }
    if numbers.is_empty() {
        return Err(KanonError::Usage("No numeric values to generalize".to_string()));
    }
    Ok(numbers)
}

fn dates_of(values: &[&Value]) -> Result<Vec<chrono::NaiveDateTime>> {
    let mut dates = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Date(d) => dates.push(*d),
            Value::Null => {}
            other => {
                return Err(KanonError::Usage(format!(
                    "Expected date value, found {:?}",
                    other
                )));
            }
        }
    }
    if dates.is_empty() {
        return Err(KanonError::Usage("No date values to generalize".to_string()));
    }
    Ok(dates)
}

fn fold_min(numbers: &[f64]) -> f64 {
    numbers.iter().copied().fold(f64::INFINITY, f64::min)
}

fn fold_max(numbers: &[f64]) -> f64 {
    numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
