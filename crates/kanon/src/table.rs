//! Index-addressable record table with typed cells.
//!
//! Columns are stored in declaration order; records are addressed by a
//! zero-based index. The kernel reads a table and produces a new
//! generalized table, so the original is never mutated.

use indexmap::IndexMap;

use crate::error::{KanonError, Result};
use crate::value::Value;

/// An ordered collection of records, stored column-major.
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    columns: IndexMap<String, Vec<Value>>,
    rows: usize,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from columns; all columns must have equal length.
    pub fn from_columns(columns: IndexMap<String, Vec<Value>>) -> Result<Self> {
        let mut rows = None;
        for (name, values) in &columns {
            match rows {
                None => rows = Some(values.len()),
                Some(expected) if values.len() != expected => {
                    return Err(KanonError::Config(format!(
                        "Column '{}' has {} rows, expected {}",
                        name,
                        values.len(),
                        expected
                    )));
                }
                _ => {}
            }
        }
        Ok(Self {
            columns,
            rows: rows.unwrap_or(0),
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// All values of a column, in record order.
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// A single cell.
    pub fn get(&self, name: &str, index: usize) -> Option<&Value> {
        self.columns.get(name).and_then(|c| c.get(index))
    }

    /// Overwrite a single cell.
    pub fn set(&mut self, name: &str, index: usize, value: Value) -> Result<()> {
        let column = self
            .columns
            .get_mut(name)
            .ok_or_else(|| KanonError::Config(format!("Unknown column '{}'", name)))?;
        let cell = column.get_mut(index).ok_or_else(|| {
            KanonError::Config(format!("Record index {} out of bounds for '{}'", index, name))
        })?;
        *cell = value;
        Ok(())
    }

    /// Append a column; must match the current row count unless the table
    /// is still empty.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<Value>) -> Result<()> {
        let name = name.into();
        if !self.columns.is_empty() && values.len() != self.rows {
            return Err(KanonError::Config(format!(
                "Column '{}' has {} rows, expected {}",
                name,
                values.len(),
                self.rows
            )));
        }
        self.rows = values.len();
        self.columns.insert(name, values);
        Ok(())
    }

    /// Drop the named columns if present.
    pub fn drop_columns(&mut self, names: &[&str]) {
        for name in names {
            self.columns.shift_remove(*name);
        }
    }

    /// Cell values of a column at the given record indices, paired with
    /// their indices. The kernel's series view.
    pub fn values_at<'a>(&'a self, name: &str, indices: &[usize]) -> Vec<(usize, &'a Value)> {
        match self.columns.get(name) {
            Some(column) => indices
                .iter()
                .filter_map(|&i| column.get(i).map(|v| (i, v)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// The full index set `0..row_count`.
    pub fn full_index(&self) -> Vec<usize> {
        (0..self.rows).collect()
    }
}
