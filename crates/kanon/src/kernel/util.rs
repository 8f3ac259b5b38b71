//! Shared helpers for the anonymization kernel: flattening of multi-valued
//! series, per-record recompression, string masking and token matching.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;

use crate::error::{KanonError, Result};
use crate::schema::{AttributeType, ElementType};
use crate::value::{EntitySpan, Value};

/// Scalar element of a flattened multi-valued series.
///
/// `Null` rows keep records without elements present, so a split of a
/// flattened series still covers every record of the partition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Element {
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
    Null,
}

impl Element {
    pub(crate) fn sort_key(&self, order: Option<&[String]>) -> ElementKey<'_> {
        match self {
            Element::Number(n) => ElementKey::Number(*n),
            Element::Date(d) => ElementKey::Date(*d),
            Element::Text(s) => {
                let position = order
                    .and_then(|o| o.iter().position(|c| c == s))
                    .unwrap_or(usize::MAX);
                ElementKey::Text(position, s)
            }
            Element::Null => ElementKey::Null,
        }
    }
}

/// Ordering key for elements; `Null` sorts last, ordinal categories sort by
/// their declared order.
#[derive(Debug, PartialEq, PartialOrd)]
pub(crate) enum ElementKey<'a> {
    Number(f64),
    Date(NaiveDateTime),
    Text(usize, &'a str),
    Null,
}

/// Scalar kind of a flattened series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementKind {
    Numeric,
    Date,
    Categorical,
}

impl From<ElementType> for ElementKind {
    fn from(ty: ElementType) -> Self {
        match ty {
            ElementType::Numeric => ElementKind::Numeric,
            ElementType::Date => ElementKind::Date,
            ElementType::Categorical => ElementKind::Categorical,
        }
    }
}

/// Flatten a multi-valued series to one synthetic row per element, the
/// record index repeated. Records with no elements contribute a `Null` row.
pub(crate) fn flatten_series(
    attr_type: AttributeType,
    pairs: &[(usize, &Value)],
) -> Result<(Vec<(usize, Element)>, ElementKind)> {
    match attr_type {
        AttributeType::Tokens => {
            let mut flattened = Vec::new();
            for &(index, value) in pairs {
                match value {
                    Value::Tokens(spans) if !spans.is_empty() => {
                        for span in spans {
                            flattened.push((index, Element::Text(span.text.to_lowercase())));
                        }
                    }
                    Value::Null | Value::Tokens(_) => flattened.push((index, Element::Null)),
                    other => {
                        return Err(KanonError::Usage(format!(
                            "Expected token list, found {:?}",
                            other
                        )));
                    }
                }
            }
            Ok((flattened, ElementKind::Categorical))
        }
        AttributeType::SetValued(element_type) => {
            let kind = ElementKind::from(element_type);
            let mut flattened = Vec::new();
            for &(index, value) in pairs {
                match value {
                    Value::Set(items) if !items.is_empty() => {
                        for item in items {
                            flattened.push((index, parse_element(item, element_type)?));
                        }
                    }
                    Value::Null | Value::Set(_) => flattened.push((index, Element::Null)),
                    other => {
                        return Err(KanonError::Usage(format!(
                            "Expected value set, found {:?}",
                            other
                        )));
                    }
                }
            }
            Ok((flattened, kind))
        }
        other => Err(KanonError::Usage(format!(
            "Attribute type {:?} does not flatten",
            other
        ))),
    }
}

fn parse_element(item: &str, element_type: ElementType) -> Result<Element> {
    match element_type {
        ElementType::Categorical => Ok(Element::Text(item.to_string())),
        ElementType::Numeric => item
            .trim()
            .parse::<f64>()
            .map(Element::Number)
            .map_err(|_| KanonError::Usage(format!("Set element '{}' is not numeric", item))),
        ElementType::Date => parse_iso_datetime(item)
            .map(Element::Date)
            .ok_or_else(|| KanonError::Usage(format!("Set element '{}' is not a date", item))),
    }
}

fn parse_iso_datetime(item: &str) -> Option<NaiveDateTime> {
    let trimmed = item.trim();
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

/// Recompress a flattened series back to one value per record: numeric and
/// date elements aggregate by mean, categorical elements by most frequent
/// value. Result is ordered by ascending record index.
pub(crate) fn compress_series(
    flattened: &[(usize, Element)],
    kind: ElementKind,
) -> Result<Vec<(usize, Element)>> {
    let mut groups: BTreeMap<usize, Vec<&Element>> = BTreeMap::new();
    for (index, element) in flattened {
        groups.entry(*index).or_default().push(element);
    }

    let mut compressed = Vec::with_capacity(groups.len());
    for (index, elements) in groups {
        let aggregated = match kind {
            ElementKind::Numeric | ElementKind::Date => aggregate_mean(&elements)?,
            ElementKind::Categorical => aggregate_mode(&elements)?,
        };
        compressed.push((index, aggregated));
    }
    Ok(compressed)
}

/// Mean of numeric or date elements. Anything else has no combining rule.
pub(crate) fn aggregate_mean(elements: &[&Element]) -> Result<Element> {
    let present: Vec<&Element> = elements
        .iter()
        .copied()
        .filter(|e| !matches!(e, Element::Null))
        .collect();
    if present.is_empty() {
        return Ok(Element::Null);
    }
    if present.iter().all(|e| matches!(e, Element::Number(_))) {
        let sum: f64 = present
            .iter()
            .map(|e| match e {
                Element::Number(n) => *n,
                _ => 0.0,
            })
            .sum();
        return Ok(Element::Number(sum / present.len() as f64));
    }
    if present.iter().all(|e| matches!(e, Element::Date(_))) {
        let sum: i64 = present
            .iter()
            .map(|e| match e {
                Element::Date(d) => d.and_utc().timestamp(),
                _ => 0,
            })
            .sum();
        let mean = sum / present.len() as i64;
        let date = chrono::DateTime::from_timestamp(mean, 0)
            .map(|d| d.naive_utc())
            .ok_or_else(|| KanonError::Usage("Date mean out of range".to_string()))?;
        return Ok(Element::Date(date));
    }
    Err(KanonError::Usage(
        "Could not aggregate: no mean defined for this type".to_string(),
    ))
}

/// Most frequent categorical element; ties resolve to the smallest value.
pub(crate) fn aggregate_mode(elements: &[&Element]) -> Result<Element> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for element in elements {
        match element {
            Element::Text(s) => *counts.entry(s.as_str()).or_insert(0) += 1,
            Element::Null => {}
            other => {
                return Err(KanonError::Usage(format!(
                    "Could not aggregate: {:?} is not categorical",
                    other
                )));
            }
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((value, count)),
        }
    }
    Ok(best
        .map(|(value, _)| Element::Text(value.to_string()))
        .unwrap_or(Element::Null))
}

/// One masking step: replace the rightmost unmasked character with `*`,
/// collapsing a trailing run of masks into one.
pub(crate) fn reduce_string(element: &str) -> String {
    let mut chars: Vec<char> = element.chars().collect();
    if chars.is_empty() || chars == ['*'] {
        return element.to_string();
    }
    if chars.len() == 1 {
        return "*".to_string();
    }
    if chars.contains(&'*') {
        let len = chars.len();
        chars[len - 2] = '*';
        chars.truncate(len - 1);
    } else {
        let len = chars.len();
        chars[len - 1] = '*';
    }
    chars.into_iter().collect()
}

/// Pick the next string to mask: the longest value, ties broken toward a
/// value without an existing mask marker. Candidates iterate in sorted
/// order, so the choice is deterministic.
pub(crate) fn next_string_to_reduce(strings: &BTreeSet<String>) -> Option<String> {
    let mut result: Option<&String> = None;
    let mut length = 0;
    for element in strings {
        let element_length = element.chars().count();
        if element_length > length {
            result = Some(element);
            length = element_length;
        } else if element_length == length && !element.contains('*') {
            result = Some(element);
        }
    }
    result.cloned()
}

/// Intersect two token collections under the lemma-insensitive exact-phrase
/// match. Returns the matched spans from both sides, and the spans of the
/// first side that participated in a match.
pub(crate) fn intersect_token_lists(
    first: &BTreeSet<EntitySpan>,
    second: &[EntitySpan],
) -> (BTreeSet<EntitySpan>, BTreeSet<EntitySpan>) {
    let mut intersection = BTreeSet::new();
    for span_1 in first {
        for span_2 in second {
            if span_1.matches(span_2) {
                intersection.insert(span_1.clone());
                intersection.insert(span_2.clone());
            }
        }
    }
    let unique: BTreeSet<EntitySpan> = first
        .iter()
        .filter(|s| intersection.contains(*s))
        .cloned()
        .collect();
    (intersection, unique)
}
