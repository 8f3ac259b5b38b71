//! Tagged representation of cell values.
//!
//! Every cell in a [`RecordTable`](crate::table::RecordTable) holds a
//! [`Value`]. Original data uses the scalar variants; generalization
//! introduces the range, node, set and period variants. Dispatch on the
//! declared attribute type is always an exhaustive match, so an unhandled
//! combination is a compile error rather than a silent default branch.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::hierarchy::Hierarchy;

/// A half-open integer range `[start, end)`.
///
/// Numeric generalization of a partition with minimum `min` and maximum
/// `max` produces `[floor(min), ceil(max) + 1)`, so the exclusive stop is
/// one past the covered maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntRange {
    pub start: i64,
    pub end: i64,
}

impl IntRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Number of integers covered by the range.
    pub fn len(&self) -> i64 {
        (self.end - self.start).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Integer membership: a float belongs to the range only if it is
    /// integral and falls inside `[start, end)`.
    pub fn contains_f64(&self, value: f64) -> bool {
        value.fract() == 0.0 && value >= self.start as f64 && value < self.end as f64
    }

    pub fn contains_i64(&self, value: i64) -> bool {
        value >= self.start && value < self.end
    }

    /// Iterate the covered integers.
    pub fn iter(&self) -> impl Iterator<Item = i64> {
        self.start..self.end
    }
}

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A coarsened date: a whole month or a whole year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    Month { year: i32, month: u32 },
    Year { year: i32 },
}

impl Period {
    /// First day covered by the period.
    pub fn start(&self) -> NaiveDate {
        match *self {
            Period::Month { year, month } => {
                NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
            }
            Period::Year { year } => NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }

    /// Last day covered by the period (inclusive).
    pub fn end(&self) -> NaiveDate {
        match *self {
            Period::Month { year, month } => {
                let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
                NaiveDate::from_ymd_opt(ny, nm, 1)
                    .and_then(|d| d.pred_opt())
                    .unwrap_or(NaiveDate::MAX)
            }
            Period::Year { year } => NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX),
        }
    }

    /// Whether a day falls inside the period.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start() && date <= self.end()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Period::Month { year, month } => write!(f, "{:04}-{:02}", year, month),
            Period::Year { year } => write!(f, "{:04}", year),
        }
    }
}

/// A recognized entity span from a free-text attribute.
///
/// `lemma` is the stop-word-free, lowercased lemma phrase produced by the
/// upstream entity-recognition collaborator; two spans refer to the same
/// entity when their lemmas are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntitySpan {
    pub text: String,
    pub lemma: String,
}

impl EntitySpan {
    pub fn new(text: impl Into<String>, lemma: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lemma: lemma.into().to_lowercase(),
        }
    }

    /// Build a span whose lemma is simply the lowercased surface text.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let lemma = text.to_lowercase();
        Self { text, lemma }
    }

    /// Lemma-insensitive exact-phrase match.
    pub fn matches(&self, other: &EntitySpan) -> bool {
        self.lemma == other.lemma
    }
}

impl fmt::Display for EntitySpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A reference to a node of a shared generalization hierarchy.
///
/// Carries the hierarchy by `Arc` so the loss calculator can recover the
/// full tree (and its root) from any generalized cell.
#[derive(Debug, Clone)]
pub struct HierarchyNodeRef {
    pub hierarchy: Arc<Hierarchy>,
    pub node: usize,
}

impl HierarchyNodeRef {
    pub fn range(&self) -> IntRange {
        self.hierarchy.node(self.node).range
    }

    pub fn label(&self) -> &str {
        &self.hierarchy.node(self.node).label
    }
}

impl PartialEq for HierarchyNodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.range() == other.range()
    }
}

impl fmt::Display for HierarchyNodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single cell value, original or generalized.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing cell.
    Null,
    /// Numeric scalar.
    Number(f64),
    /// Categorical or free string scalar.
    Text(String),
    /// Timestamp; generalization normalizes to day first.
    Date(NaiveDateTime),
    /// Multi-valued category set.
    Set(BTreeSet<String>),
    /// Recognized entity spans derived from a free-text attribute.
    Tokens(Vec<EntitySpan>),
    /// Generalized numeric range.
    Range(IntRange),
    /// Generalized hierarchy node.
    Node(HierarchyNodeRef),
    /// Generalized date period.
    Period(Period),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_tokens(&self) -> Option<&[EntitySpan]> {
        match self {
            Value::Tokens(t) => Some(t),
            _ => None,
        }
    }

    pub fn from_set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Set(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => {
                if d.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", d.date())
                } else {
                    write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S"))
                }
            }
            Value::Set(items) => {
                let joined: Vec<&str> = items.iter().map(String::as_str).collect();
                write!(f, "{{{}}}", joined.join(", "))
            }
            Value::Tokens(spans) => {
                let joined: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
                f.write_str(&joined.join("; "))
            }
            Value::Range(r) => write!(f, "{}", r),
            Value::Node(n) => write!(f, "{}", n),
            Value::Period(p) => write!(f, "{}", p),
        }
    }
}

/// Convenience for building date values in data setup code.
pub fn date(year: i32, month: u32, day: u32) -> Value {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(d) => Value::Date(d.and_time(chrono::NaiveTime::MIN)),
        None => Value::Null,
    }
}

/// Truncate a timestamp to midnight of its day.
pub fn normalize_to_day(dt: NaiveDateTime) -> NaiveDateTime {
    dt.date().and_time(chrono::NaiveTime::MIN)
}

/// Year component of a timestamp as a numeric value.
pub fn year_of(dt: NaiveDateTime) -> f64 {
    f64::from(dt.year())
}
