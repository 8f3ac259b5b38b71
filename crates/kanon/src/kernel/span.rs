//! Attribute span computation.
//!
//! The span of an attribute over a set of records is a non-negative
//! diversity measure used to prioritize splits: distinct-value count for
//! categorical attributes, value range for numeric attributes, day range
//! for dates. Multi-valued attributes flatten to element granularity,
//! recompress per record and recurse. Spans are pure functions of their
//! inputs.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::error::Result;
use crate::schema::{AttributeSchema, AttributeType, TableSchema};
use crate::table::RecordTable;
use crate::value::Value;

use super::util::{compress_series, flatten_series, Element, ElementKind};

/// Spans for every listed quasi-identifier present in the table, optionally
/// normalized by precomputed full-dataset scales.
pub fn attribute_spans(
    table: &RecordTable,
    schema: &TableSchema,
    quasi_identifiers: &[String],
    indices: &[usize],
    scale: Option<&IndexMap<String, f64>>,
) -> Result<IndexMap<String, f64>> {
    let mut spans = IndexMap::new();
    for name in quasi_identifiers {
        let Some(attribute) = schema.get(name) else {
            continue;
        };
        if !table.has_column(name) {
            continue;
        }
        let mut span = attribute_span(table, attribute, indices)?;
        if let Some(scale) = scale {
            if let Some(&divisor) = scale.get(name) {
                if divisor != 0.0 {
                    span /= divisor;
                }
            }
        }
        spans.insert(name.clone(), span);
    }
    Ok(spans)
}

/// Span of one attribute over the given record indices.
pub fn attribute_span(
    table: &RecordTable,
    attribute: &AttributeSchema,
    indices: &[usize],
) -> Result<f64> {
    let pairs = table.values_at(&attribute.name, indices);
    span_of_pairs(attribute, &pairs)
}

fn span_of_pairs(attribute: &AttributeSchema, pairs: &[(usize, &Value)]) -> Result<f64> {
    match attribute.attr_type {
        AttributeType::Nominal | AttributeType::Ordinal | AttributeType::Text => {
            let mut distinct: BTreeSet<&str> = BTreeSet::new();
            let mut has_null = false;
            for (_, value) in pairs {
                match value {
                    Value::Text(s) => {
                        distinct.insert(s.as_str());
                    }
                    Value::Null => has_null = true,
                    _ => {}
                }
            }
            Ok((distinct.len() + usize::from(has_null)) as f64)
        }
        AttributeType::Numeric => {
            let numbers: Vec<f64> = pairs.iter().filter_map(|(_, v)| v.as_number()).collect();
            Ok(numeric_span(&numbers))
        }
        AttributeType::Date => {
            let dates: Vec<_> = pairs.iter().filter_map(|(_, v)| v.as_date()).collect();
            match (dates.iter().min(), dates.iter().max()) {
                (Some(min), Some(max)) => Ok((*max - *min).num_days() as f64),
                _ => Ok(0.0),
            }
        }
        AttributeType::Tokens | AttributeType::SetValued(_) => {
            let (flattened, kind) = flatten_series(attribute.attr_type, pairs)?;
            let compressed = compress_series(&flattened, kind)?;
            Ok(span_of_elements(kind, &compressed))
        }
    }
}

pub(crate) fn span_of_elements(kind: ElementKind, elements: &[(usize, Element)]) -> f64 {
    match kind {
        ElementKind::Categorical => {
            let mut distinct: BTreeSet<&str> = BTreeSet::new();
            let mut has_null = false;
            for (_, element) in elements {
                match element {
                    Element::Text(s) => {
                        distinct.insert(s.as_str());
                    }
                    Element::Null => has_null = true,
                    _ => {}
                }
            }
            (distinct.len() + usize::from(has_null)) as f64
        }
        ElementKind::Numeric => {
            let numbers: Vec<f64> = elements
                .iter()
                .filter_map(|(_, e)| match e {
                    Element::Number(n) => Some(*n),
                    _ => None,
                })
                .collect();
            numeric_span(&numbers)
        }
        ElementKind::Date => {
            let dates: Vec<_> = elements
                .iter()
                .filter_map(|(_, e)| match e {
                    Element::Date(d) => Some(*d),
                    _ => None,
                })
                .collect();
            match (dates.iter().min(), dates.iter().max()) {
                (Some(min), Some(max)) => (*max - *min).num_days() as f64,
                _ => 0.0,
            }
        }
    }
}

fn numeric_span(numbers: &[f64]) -> f64 {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &n in numbers {
        min = min.min(n);
        max = max.max(n);
    }
    if min.is_finite() && max.is_finite() {
        max - min
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::date;
    use indexmap::indexmap;

    fn table() -> (RecordTable, TableSchema) {
        let table = RecordTable::from_columns(indexmap! {
            "age".to_string() => vec![
                Value::Number(25.0),
                Value::Number(40.0),
                Value::Number(31.0),
            ],
            "zip".to_string() => vec![
                Value::Text("NE9".into()),
                Value::Text("HP2".into()),
                Value::Text("NE9".into()),
            ],
            "admitted".to_string() => vec![
                date(2020, 9, 1),
                date(2020, 9, 11),
                date(2020, 9, 6),
            ],
            "conditions".to_string() => vec![
                Value::from_set(["a", "b"]),
                Value::from_set(["b"]),
                Value::Null,
            ],
        })
        .unwrap();
        let schema = TableSchema::with_attributes(vec![
            AttributeSchema::new("age", AttributeType::Numeric),
            AttributeSchema::new("zip", AttributeType::Nominal),
            AttributeSchema::new("admitted", AttributeType::Date),
            AttributeSchema::new(
                "conditions",
                AttributeType::SetValued(crate::schema::ElementType::Categorical),
            ),
        ]);
        (table, schema)
    }

    #[test]
    fn test_numeric_span() {
        let (table, schema) = table();
        let span = attribute_span(&table, schema.get("age").unwrap(), &[0, 1, 2]).unwrap();
        assert_eq!(span, 15.0);
    }

    #[test]
    fn test_categorical_span_counts_distinct() {
        let (table, schema) = table();
        let span = attribute_span(&table, schema.get("zip").unwrap(), &[0, 1, 2]).unwrap();
        assert_eq!(span, 2.0);
    }

    #[test]
    fn test_date_span_in_days() {
        let (table, schema) = table();
        let span = attribute_span(&table, schema.get("admitted").unwrap(), &[0, 1, 2]).unwrap();
        assert_eq!(span, 10.0);
    }

    #[test]
    fn test_set_valued_span_compresses_to_mode() {
        let (table, schema) = table();
        // Record 0 compresses to "a" (tie resolves to the smallest value),
        // record 1 to "b", record 2 stays a null row.
        let span = attribute_span(&table, schema.get("conditions").unwrap(), &[0, 1, 2]).unwrap();
        assert_eq!(span, 3.0);
    }

    #[test]
    fn test_normalized_spans() {
        let (table, schema) = table();
        let qis = vec!["age".to_string(), "zip".to_string()];
        let scale = attribute_spans(&table, &schema, &qis, &[0, 1, 2], None).unwrap();
        let spans = attribute_spans(&table, &schema, &qis, &[0, 2], Some(&scale)).unwrap();
        assert!((spans["age"] - 6.0 / 15.0).abs() < 1e-12);
        assert!((spans["zip"] - 0.5).abs() < 1e-12);
    }
}
