//! Generalization hierarchies over numeric ranges.
//!
//! A hierarchy is a tree of inclusive integer ranges: leaves are the finest
//! brackets, the root covers the attribute's full domain. The tree is stored
//! as an arena of nodes addressed by index with explicit parent/child links,
//! so no shared mutable tree-node references exist. Once built, a hierarchy
//! is immutable and shared by `Arc` across all partitions that use it.

use std::collections::VecDeque;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{KanonError, Result};
use crate::value::IntRange;

static RANGE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s*-\s*(\d+)\s*$").expect("valid range label pattern")
});

/// Nested hierarchy description as it appears in configuration files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchySpec {
    /// Range label of the form `"lo-hi"` (inclusive bounds).
    pub name: String,
    /// Child brackets, finest ranges at the leaves.
    #[serde(default)]
    pub children: Vec<HierarchySpec>,
}

/// A single node of a hierarchy arena.
#[derive(Debug, Clone)]
pub struct HierarchyNode {
    pub label: String,
    pub range: IntRange,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl HierarchyNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-backed tree of ranges. The root is always node 0; node indices
/// follow level order of the configuration tree, which fixes the discovery
/// order used for deterministic tie-breaking during node search.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    nodes: Vec<HierarchyNode>,
}

impl Hierarchy {
    /// Build an arena from a nested configuration spec.
    pub fn from_spec(spec: &HierarchySpec) -> Result<Self> {
        let mut nodes = Vec::new();
        nodes.push(HierarchyNode {
            label: spec.name.clone(),
            range: parse_range_label(&spec.name)?,
            parent: None,
            children: Vec::new(),
        });

        // Level-order construction keeps sibling groups contiguous.
        let mut queue: VecDeque<(usize, &HierarchySpec)> = VecDeque::from([(0, spec)]);
        while let Some((index, current)) = queue.pop_front() {
            for child in &current.children {
                let child_index = nodes.len();
                nodes.push(HierarchyNode {
                    label: child.name.clone(),
                    range: parse_range_label(&child.name)?,
                    parent: Some(index),
                    children: Vec::new(),
                });
                nodes[index].children.push(child_index);
                queue.push_back((child_index, child));
            }
        }

        Ok(Self { nodes })
    }

    pub fn node(&self, index: usize) -> &HierarchyNode {
        &self.nodes[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> usize {
        0
    }

    /// Leaf node indices in arena (discovery) order.
    pub fn leaves(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].is_leaf())
            .collect()
    }

    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.nodes[index].parent
    }
}

/// Parse a range label of the form `"lo-hi"` into a half-open range
/// covering the inclusive bounds (`"0-100"` becomes `[0, 101)`).
pub fn parse_range_label(label: &str) -> Result<IntRange> {
    let captures = RANGE_LABEL.captures(label).ok_or_else(|| {
        KanonError::Config(format!("Malformed hierarchy range label '{}'", label))
    })?;
    let start: i64 = captures[1]
        .parse()
        .map_err(|_| KanonError::Config(format!("Invalid range start in '{}'", label)))?;
    let stop: i64 = captures[2]
        .parse()
        .map_err(|_| KanonError::Config(format!("Invalid range stop in '{}'", label)))?;
    if stop < start {
        return Err(KanonError::Config(format!(
            "Range label '{}' has stop before start",
            label
        )));
    }
    Ok(IntRange::new(start, stop + 1))
}
