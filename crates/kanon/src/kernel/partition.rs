//! Partitioning strategies.
//!
//! Both strategies consume a record table and a minimum group size `k` and
//! produce disjoint index sets covering the table exactly once. The
//! space-partitioning strategy ("mondrian") recursively bisects the data on
//! the attribute with the highest split priority; the term-driven strategy
//! ("gdf") splits on recognized sensitive terms, consuming each term from
//! the index as it is used.
//!
//! Splitting is greedy and non-backtracking: once every attribute fails to
//! produce two halves of at least `k` records, a partition is finished even
//! if an earlier attribute might have allowed a different cut.

use std::collections::{BTreeSet, HashSet, VecDeque};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::schema::{AttributeSchema, AttributeType, TableSchema};
use crate::table::RecordTable;
use crate::value::Value;

use super::span::attribute_spans;
use super::util::{compress_series, flatten_series, Element, ElementKind};

/// A set of record indices grouped for joint generalization.
pub type Partition = Vec<usize>;

/// Index of recognized sensitive terms: entity attribute → normalized term
/// → record indices where the term was recognized. The term-driven strategy
/// narrows this structure destructively, removing a term once it has been
/// used to split.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermIndex {
    entries: IndexMap<String, IndexMap<String, Vec<usize>>>,
}

impl TermIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entity attribute names, in insertion order.
    pub fn attributes(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn insert(&mut self, attribute: impl Into<String>, term: impl Into<String>, indices: Vec<usize>) {
        self.entries
            .entry(attribute.into())
            .or_default()
            .insert(term.into(), indices);
    }

    pub fn terms(&self, attribute: &str) -> Option<&IndexMap<String, Vec<usize>>> {
        self.entries.get(attribute)
    }

    fn remove(&mut self, attribute: &str, term: &str) {
        if let Some(terms) = self.entries.get_mut(attribute) {
            terms.shift_remove(term);
        }
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &IndexMap<String, Vec<usize>>)> {
        self.entries.iter()
    }
}

/// Partition the table into groups of at least `k` records using recursive
/// multidimensional ("mondrian") splitting.
///
/// Returns the finished partitions and a per-attribute split counter. A
/// partition smaller than `2k` is a leaf; otherwise attributes are tried in
/// descending split-priority order and the first valid split wins.
///
/// The minimum size is best-effort: a table that starts out smaller than
/// `k` is emitted as one irreducible partition rather than rejected.
pub fn partition_mondrian(
    table: &RecordTable,
    schema: &TableSchema,
    quasi_identifiers: &[String],
    k: usize,
    biases: &IndexMap<String, f64>,
    relational_weight: f64,
) -> Result<(Vec<Partition>, IndexMap<String, usize>)> {
    let scale = attribute_spans(table, schema, quasi_identifiers, &table.full_index(), None)?;

    let mut finished: Vec<Partition> = Vec::new();
    let mut queue: VecDeque<Partition> = VecDeque::from([table.full_index()]);
    let mut split_statistics: IndexMap<String, usize> = quasi_identifiers
        .iter()
        .map(|attr| (attr.clone(), 0))
        .collect();

    while let Some(partition) = queue.pop_front() {
        if partition.len() < 2 * k {
            finished.push(partition);
            continue;
        }
        debug!(size = partition.len(), "working on partition");
        let spans = attribute_spans(table, schema, quasi_identifiers, &partition, Some(&scale))?;
        let priority = mondrian_split_priority(&spans, biases, relational_weight);

        let mut applied = false;
        for (column, _) in &priority {
            let Some(attribute) = schema.get(column) else {
                continue;
            };
            let pairs = table.values_at(column, &partition);
            let (left, right) = split_series(attribute, &pairs)?;
            if left.len() < k || right.len() < k {
                continue;
            }
            if left == right {
                // Degenerate cut: the attribute cannot discriminate further.
                continue;
            }
            debug!(
                attribute = column.as_str(),
                left = left.len(),
                right = right.len(),
                "splitting partition"
            );
            *split_statistics.entry(column.clone()).or_insert(0) += 1;
            queue.push_back(left);
            queue.push_back(right);
            applied = true;
            break;
        }
        if !applied {
            finished.push(partition);
        }
        debug!(remaining = queue.len(), "partitions remaining");
    }

    Ok((finished, split_statistics))
}

/// Split priority per attribute: `(normalized_span + bias + weight_term) / 2`
/// where `weight_term` is `bias + relational_weight` for attributes with an
/// explicit bias entry and `1 - relational_weight` otherwise. Sorted by
/// descending score; ties keep quasi-identifier order.
fn mondrian_split_priority(
    spans: &IndexMap<String, f64>,
    biases: &IndexMap<String, f64>,
    relational_weight: f64,
) -> Vec<(String, f64)> {
    let textual_weight = 1.0 - relational_weight;
    let mut priority: Vec<(String, f64)> = spans
        .iter()
        .map(|(attribute, &span)| {
            let mut score = span;
            score += biases.get(attribute).copied().unwrap_or(0.0);
            score += match biases.get(attribute) {
                Some(&bias) => bias + relational_weight,
                None => textual_weight,
            };
            (attribute.clone(), score / 2.0)
        })
        .collect();
    priority.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    priority
}

/// Binary-split the values of one attribute over a partition.
///
/// Numeric series split at the median; categorical and date series split
/// into the lower and upper half of their sorted distinct values;
/// multi-valued series flatten, recompress and recurse. Returned halves
/// preserve the partition's record order.
pub(crate) fn split_series(
    attribute: &AttributeSchema,
    pairs: &[(usize, &Value)],
) -> Result<(Vec<usize>, Vec<usize>)> {
    match attribute.attr_type {
        AttributeType::Numeric => {
            let mut numbers: Vec<(usize, f64)> = pairs
                .iter()
                .filter_map(|(i, v)| v.as_number().map(|n| (*i, n)))
                .collect();
            let mut sorted: Vec<f64> = numbers.iter().map(|(_, n)| *n).collect();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let median = median_of_sorted(&sorted);
            let left = numbers
                .iter()
                .filter(|(_, n)| *n < median)
                .map(|(i, _)| *i)
                .collect();
            let right = numbers
                .drain(..)
                .filter(|(_, n)| *n >= median)
                .map(|(i, _)| i)
                .collect();
            Ok((left, right))
        }
        AttributeType::Date => {
            let elements: Vec<(usize, Element)> = pairs
                .iter()
                .map(|(i, v)| match v {
                    Value::Date(d) => (*i, Element::Date(*d)),
                    _ => (*i, Element::Null),
                })
                .collect();
            Ok(split_elements_by_halves(&elements, None))
        }
        AttributeType::Nominal | AttributeType::Ordinal | AttributeType::Text => {
            let elements: Vec<(usize, Element)> = pairs
                .iter()
                .map(|(i, v)| match v {
                    Value::Text(s) => (*i, Element::Text(s.clone())),
                    _ => (*i, Element::Null),
                })
                .collect();
            Ok(split_elements_by_halves(&elements, attribute.order.as_deref()))
        }
        AttributeType::Tokens | AttributeType::SetValued(_) => {
            let (flattened, kind) = flatten_series(attribute.attr_type, pairs)?;
            let compressed = compress_series(&flattened, kind)?;
            match kind {
                ElementKind::Numeric => {
                    let numbers: Vec<(usize, f64)> = compressed
                        .iter()
                        .filter_map(|(i, e)| match e {
                            Element::Number(n) => Some((*i, *n)),
                            _ => None,
                        })
                        .collect();
                    let mut sorted: Vec<f64> = numbers.iter().map(|(_, n)| *n).collect();
                    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                    let median = median_of_sorted(&sorted);
                    let left = numbers
                        .iter()
                        .filter(|(_, n)| *n < median)
                        .map(|(i, _)| *i)
                        .collect();
                    let right = numbers
                        .iter()
                        .filter(|(_, n)| *n >= median)
                        .map(|(i, _)| *i)
                        .collect();
                    Ok((left, right))
                }
                ElementKind::Date | ElementKind::Categorical => {
                    Ok(split_elements_by_halves(&compressed, None))
                }
            }
        }
    }
}

/// Lower/upper half split over sorted distinct element values.
fn split_elements_by_halves(
    elements: &[(usize, Element)],
    order: Option<&[String]>,
) -> (Vec<usize>, Vec<usize>) {
    let mut distinct: Vec<&Element> = Vec::new();
    for (_, element) in elements {
        if !distinct.iter().any(|e| *e == element) {
            distinct.push(element);
        }
    }
    distinct.sort_by(|a, b| {
        a.sort_key(order)
            .partial_cmp(&b.sort_key(order))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let lower: Vec<&Element> = distinct[..distinct.len() / 2].to_vec();
    let left: Vec<usize> = elements
        .iter()
        .filter(|(_, e)| lower.iter().any(|l| *l == e))
        .map(|(i, _)| *i)
        .collect();
    let right: Vec<usize> = elements
        .iter()
        .filter(|(_, e)| !lower.iter().any(|l| *l == e))
        .map(|(i, _)| *i)
        .collect();
    (left, right)
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Partition the table using the term-driven ("gdf") strategy.
///
/// The term index is owned mutably by this one call: every chosen term is
/// consumed immediately after its split, so it can never be selected again
/// further down the recursion.
pub fn partition_gdf(table: &RecordTable, k: usize, terms: &mut TermIndex) -> Vec<Partition> {
    partition_gdf_recursive(table.full_index(), k, terms)
}

fn partition_gdf_recursive(partition: Partition, k: usize, terms: &mut TermIndex) -> Vec<Partition> {
    debug!(size = partition.len(), "working on partition");
    if partition.len() <= k {
        return vec![partition];
    }
    let Some((attribute, term, indices)) = next_entity_term(terms, &partition, k) else {
        return vec![partition];
    };
    debug!(
        attribute = attribute.as_str(),
        term = term.as_str(),
        "splitting partition on term"
    );

    let members: HashSet<usize> = indices.iter().copied().collect();
    let left: Partition = partition.iter().copied().filter(|i| members.contains(i)).collect();
    let right: Partition = partition
        .iter()
        .copied()
        .filter(|i| !members.contains(i))
        .collect();

    // The term is consumed regardless of outcome, preventing reselection.
    terms.remove(&attribute, &term);

    if left.is_empty() {
        partition_gdf_recursive(right, k, terms)
    } else if right.is_empty() {
        partition_gdf_recursive(left, k, terms)
    } else if left.len() < k || right.len() < k {
        vec![partition]
    } else if left == right {
        vec![left]
    } else {
        let mut result = partition_gdf_recursive(left, k, terms);
        result.extend(partition_gdf_recursive(right, k, terms));
        result
    }
}

/// Pick the highest-scoring (attribute, term) pair for the current
/// partition. A term qualifies when it occurs in at least `k` records of
/// the partition; its score is its occurrence count divided by the number
/// of distinct records covered by any term of the same entity type. The
/// ratio can exceed 1 when terms of one entity type overlap across records;
/// this is preserved as-is.
fn next_entity_term(
    terms: &TermIndex,
    partition: &[usize],
    k: usize,
) -> Option<(String, String, Vec<usize>)> {
    let members: HashSet<usize> = partition.iter().copied().collect();
    let mut amount = 0.0_f64;
    let mut best: Option<(String, String, Vec<usize>)> = None;

    for (attribute, term_map) in terms.iter() {
        let mut covered: BTreeSet<usize> = BTreeSet::new();
        let mut qualified: Vec<&String> = Vec::new();
        for (term, indices) in term_map {
            let remaining: Vec<usize> = indices
                .iter()
                .copied()
                .filter(|i| members.contains(i))
                .collect();
            covered.extend(remaining.iter().copied());
            if remaining.len() >= k {
                qualified.push(term);
            }
        }
        if covered.is_empty() {
            continue;
        }
        let normalizer = covered.len() as f64;
        for term in qualified {
            let indices: Vec<usize> = term_map[term]
                .iter()
                .copied()
                .filter(|i| members.contains(i))
                .collect();
            let score = indices.len() as f64 / normalizer;
            if score > amount {
                amount = score;
                best = Some((attribute.clone(), term.clone(), indices));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    fn numeric_table(values: &[f64]) -> (RecordTable, TableSchema) {
        let table = RecordTable::from_columns(indexmap! {
            "age".to_string() => values.iter().map(|&v| Value::Number(v)).collect(),
        })
        .unwrap();
        let schema =
            TableSchema::with_attributes(vec![AttributeSchema::new("age", AttributeType::Numeric)]);
        (table, schema)
    }

    fn assert_covers_exactly(partitions: &[Partition], rows: usize) {
        let mut seen: Vec<usize> = partitions.iter().flatten().copied().collect();
        seen.sort_unstable();
        let expected: Vec<usize> = (0..rows).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_mondrian_splits_numeric_column() {
        let (table, schema) = numeric_table(&[1.0, 2.0, 3.0, 4.0, 10.0, 11.0, 12.0, 13.0]);
        let qis = vec!["age".to_string()];
        let (partitions, stats) =
            partition_mondrian(&table, &schema, &qis, 2, &IndexMap::new(), 0.5).unwrap();

        assert_covers_exactly(&partitions, 8);
        assert!(partitions.iter().all(|p| p.len() >= 2));
        assert!(stats["age"] >= 1);
    }

    #[test]
    fn test_mondrian_small_partition_is_leaf() {
        let (table, schema) = numeric_table(&[1.0, 2.0, 3.0]);
        let qis = vec!["age".to_string()];
        let (partitions, stats) =
            partition_mondrian(&table, &schema, &qis, 2, &IndexMap::new(), 0.5).unwrap();

        // 3 < 2k, so the seed partition is emitted unsplit.
        assert_eq!(partitions, vec![vec![0, 1, 2]]);
        assert_eq!(stats["age"], 0);
    }

    #[test]
    fn test_mondrian_constant_column_finishes() {
        let (table, schema) = numeric_table(&[5.0; 8]);
        let qis = vec!["age".to_string()];
        let (partitions, _) =
            partition_mondrian(&table, &schema, &qis, 2, &IndexMap::new(), 0.5).unwrap();

        // Median split puts every record in the right half, so no valid
        // split exists and the whole table is one partition.
        assert_eq!(partitions.len(), 1);
        assert_covers_exactly(&partitions, 8);
    }

    #[test]
    fn test_mondrian_is_deterministic() {
        let (table, schema) = numeric_table(&[9.0, 1.0, 4.0, 7.0, 2.0, 8.0, 3.0, 6.0, 5.0, 0.0]);
        let qis = vec!["age".to_string()];
        let first = partition_mondrian(&table, &schema, &qis, 2, &IndexMap::new(), 0.5).unwrap();
        let second = partition_mondrian(&table, &schema, &qis, 2, &IndexMap::new(), 0.5).unwrap();
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn test_split_priority_prefers_biased_attribute() {
        let spans: IndexMap<String, f64> = indexmap! {
            "age".to_string() => 0.5,
            "notes_person".to_string() => 0.5,
        };
        let biases: IndexMap<String, f64> = indexmap! { "age".to_string() => 0.8 };
        let priority = mondrian_split_priority(&spans, &biases, 0.5);
        assert_eq!(priority[0].0, "age");
        // (0.5 + 0.8 + 0.8 + 0.5) / 2
        assert!((priority[0].1 - 1.3).abs() < 1e-12);
        // (0.5 + 0.5) / 2
        assert!((priority[1].1 - 0.5).abs() < 1e-12);
    }

    fn term_table(rows: usize) -> RecordTable {
        RecordTable::from_columns(indexmap! {
            "notes_person".to_string() => (0..rows).map(|_| Value::Null).collect(),
        })
        .unwrap()
    }

    #[test]
    fn test_gdf_leaf_when_at_or_below_k() {
        let table = term_table(3);
        let mut terms = TermIndex::new();
        terms.insert("notes_person", "alice", vec![0, 1]);
        let partitions = partition_gdf(&table, 3, &mut terms);
        assert_eq!(partitions, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_gdf_splits_on_best_term() {
        let table = term_table(6);
        let mut terms = TermIndex::new();
        terms.insert("notes_person", "alice", vec![0, 1, 2]);
        terms.insert("notes_person", "bob", vec![3, 4]);
        let partitions = partition_gdf(&table, 2, &mut terms);

        assert_covers_exactly(&partitions, 6);
        assert!(partitions.contains(&vec![0, 1, 2]));
        // The chosen terms are consumed from the index.
        assert!(!terms.terms("notes_person").unwrap().contains_key("alice"));
    }

    #[test]
    fn test_gdf_aborts_split_below_k() {
        let table = term_table(5);
        let mut terms = TermIndex::new();
        // "alice" covers 4 records, leaving a remainder of 1 < k.
        terms.insert("notes_person", "alice", vec![0, 1, 2, 3]);
        let partitions = partition_gdf(&table, 2, &mut terms);
        assert_eq!(partitions, vec![vec![0, 1, 2, 3, 4]]);
    }

    #[test]
    fn test_gdf_skips_non_discriminating_term() {
        let table = term_table(4);
        let mut terms = TermIndex::new();
        // "everyone" covers the whole partition; the remainder is empty and
        // recursion continues on the full side with the term consumed.
        terms.insert("notes_person", "everyone", vec![0, 1, 2, 3]);
        let partitions = partition_gdf(&table, 2, &mut terms);
        assert_eq!(partitions, vec![vec![0, 1, 2, 3]]);
        assert!(terms.terms("notes_person").unwrap().is_empty());
    }
}
