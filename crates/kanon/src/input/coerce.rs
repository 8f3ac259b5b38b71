//! Coercion of raw string cells into typed values.
//!
//! Every declared attribute is converted according to its schema type;
//! undeclared columns are carried as plain text. Multi-valued and token
//! cells hold `;`-separated elements. A quasi-identifier cell that cannot
//! be coerced (or is missing) aborts ingestion with a parse error naming
//! the row and column.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;

use crate::config::DEFAULT_DATE_FORMAT;
use crate::error::{KanonError, Result};
use crate::schema::{AnonymizationType, AttributeSchema, AttributeType, TableSchema};
use crate::table::RecordTable;
use crate::value::{EntitySpan, Value};

use super::source::RawTable;

/// Element separator inside multi-valued and token cells.
const LIST_SEPARATOR: char = ';';

/// Coerce a raw table into a typed record table using the declared schema.
pub fn coerce_table(raw: &RawTable, schema: &TableSchema) -> Result<RecordTable> {
    let mut columns: IndexMap<String, Vec<Value>> = IndexMap::new();
    for (position, header) in raw.headers.iter().enumerate() {
        let attribute = schema.get(header);
        let mut values = Vec::with_capacity(raw.row_count());
        for (row, cell) in raw.column_values(position).enumerate() {
            values.push(coerce_cell(cell, attribute, header, row)?);
        }
        columns.insert(header.clone(), values);
    }
    RecordTable::from_columns(columns)
}

fn coerce_cell(
    cell: &str,
    attribute: Option<&AttributeSchema>,
    column: &str,
    row: usize,
) -> Result<Value> {
    let Some(attribute) = attribute else {
        // Undeclared columns ride along as text.
        return Ok(if RawTable::is_null_value(cell) {
            Value::Null
        } else {
            Value::Text(cell.trim().to_string())
        });
    };

    if RawTable::is_null_value(cell) {
        if attribute.anonymization_type == AnonymizationType::QuasiIdentifier {
            return Err(KanonError::Parse {
                row,
                column: column.to_string(),
                message: "missing value in quasi-identifier".to_string(),
            });
        }
        return Ok(Value::Null);
    }

    let trimmed = cell.trim();
    match attribute.attr_type {
        AttributeType::Numeric => trimmed
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| parse_error(row, column, trimmed, "number")),
        AttributeType::Date => {
            let format = attribute
                .date_format
                .as_deref()
                .unwrap_or(DEFAULT_DATE_FORMAT);
            parse_date(trimmed, format)
                .map(Value::Date)
                .ok_or_else(|| parse_error(row, column, trimmed, "date"))
        }
        AttributeType::Nominal | AttributeType::Ordinal | AttributeType::Text => {
            Ok(Value::Text(trimmed.to_string()))
        }
        AttributeType::Tokens => {
            let spans: Vec<EntitySpan> = split_list(trimmed)
                .map(EntitySpan::from_text)
                .collect();
            Ok(if spans.is_empty() {
                Value::Null
            } else {
                Value::Tokens(spans)
            })
        }
        AttributeType::SetValued(_) => {
            let items: std::collections::BTreeSet<String> =
                split_list(trimmed).map(str::to_string).collect();
            Ok(if items.is_empty() {
                Value::Null
            } else {
                Value::Set(items)
            })
        }
    }
}

fn split_list(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_date(cell: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(cell, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(cell, format)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn parse_error(row: usize, column: &str, cell: &str, expected: &str) -> KanonError {
    KanonError::Parse {
        row,
        column: column.to_string(),
        message: format!("'{}' is not a valid {}", cell, expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::date;

    fn schema() -> TableSchema {
        TableSchema::with_attributes(vec![
            AttributeSchema::new("age", AttributeType::Numeric)
                .with_anonymization_type(AnonymizationType::QuasiIdentifier),
            AttributeSchema::new("admitted", AttributeType::Date)
                .with_anonymization_type(AnonymizationType::QuasiIdentifier),
            AttributeSchema::new("notes_person", AttributeType::Tokens),
        ])
    }

    fn raw(rows: Vec<Vec<&str>>) -> RawTable {
        RawTable::new(
            vec![
                "age".to_string(),
                "admitted".to_string(),
                "notes_person".to_string(),
                "extra".to_string(),
            ],
            rows.into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
            b',',
        )
    }

    #[test]
    fn test_coerce_typed_columns() {
        let table = coerce_table(
            &raw(vec![vec!["25", "27/09/2020", "Alice; Bob", "x"]]),
            &schema(),
        )
        .unwrap();

        assert_eq!(table.get("age", 0), Some(&Value::Number(25.0)));
        assert_eq!(table.get("admitted", 0), Some(&date(2020, 9, 27)));
        match table.get("notes_person", 0) {
            Some(Value::Tokens(spans)) => {
                assert_eq!(spans.len(), 2);
                assert_eq!(spans[0].lemma, "alice");
            }
            other => panic!("expected tokens, got {:?}", other),
        }
        assert_eq!(table.get("extra", 0), Some(&Value::Text("x".into())));
    }

    #[test]
    fn test_missing_quasi_identifier_rejected() {
        let result = coerce_table(&raw(vec![vec!["", "27/09/2020", "", ""]]), &schema());
        assert!(matches!(result, Err(KanonError::Parse { .. })));
    }

    #[test]
    fn test_missing_tokens_become_null() {
        let table = coerce_table(&raw(vec![vec!["25", "27/09/2020", "", "y"]]), &schema()).unwrap();
        assert_eq!(table.get("notes_person", 0), Some(&Value::Null));
    }

    #[test]
    fn test_bad_number_rejected() {
        let result = coerce_table(&raw(vec![vec!["abc", "27/09/2020", "", ""]]), &schema());
        assert!(matches!(result, Err(KanonError::Parse { .. })));
    }
}
