//! Flat, host-neutral export of a tree
//!
//! [`DecisionTree::flatten`] walks a tree once in pre-order and appends one
//! record per node to a set of parallel arrays ([`FlatTree`]). Child
//! references are record indices; since a node is recorded before its
//! children, they always point forward.
//!
//! Encoding:
//! - record ids are 0-based, in pre-order (node, left, right, missing)
//! - leaves store [`NO_VARIABLE`] as split variable and [`NO_NODE`] as children
//! - `split_value` holds the threshold of an internal node and the shrunk
//!   prediction of a leaf
//! - categorical nodes append their left category set to a separate
//!   collection and store its index in `category_split`; every other node
//!   stores [`NO_CATEGORY_SPLIT`]
//! - `prediction` is already multiplied by the shrinkage

use crate::data::Dataset;
use crate::node::{Direction, NodeId, Split};
use crate::tree::DecisionTree;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Child sentinel for leaf records
pub const NO_NODE: i32 = -1;
/// Split variable sentinel for leaf records
pub const NO_VARIABLE: i32 = -1;
/// Category index sentinel for non-categorical records
pub const NO_CATEGORY_SPLIT: i32 = -1;

/// Parallel per-node arrays, indexed by pre-order record id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatTree {
    pub split_var: Vec<i32>,
    pub split_value: Vec<f64>,
    pub left: Vec<i32>,
    pub right: Vec<i32>,
    pub missing: Vec<i32>,
    pub error_reduction: Vec<f64>,
    pub weight: Vec<f64>,
    pub prediction: Vec<f64>,
    pub num_observations: Vec<u64>,
    pub category_split: Vec<i32>,
}

/// Left category set of one categorical record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySplit {
    pub left_categories: Vec<u32>,
    /// Level count of the split variable when the tree was exported
    pub num_levels: u32,
}

impl CategorySplit {
    /// Per-level direction codes: -1 for left, 1 for right.
    ///
    /// One entry per level of the variable; left codes at or above
    /// `num_levels` have no slot and are skipped.
    pub fn codes(&self) -> Vec<i8> {
        let mut codes = vec![1i8; self.num_levels as usize];
        for &code in &self.left_categories {
            match codes.get_mut(code as usize) {
                Some(slot) => *slot = -1,
                None => debug!(code, num_levels = self.num_levels, "left code outside level range"),
            }
        }
        codes
    }

    #[inline]
    pub fn direction(&self, code: Option<u32>) -> Direction {
        match code {
            Some(code) if self.left_categories.contains(&code) => Direction::Left,
            Some(_) => Direction::Right,
            None => Direction::Missing,
        }
    }
}

impl FlatTree {
    pub fn with_capacity(capacity: usize) -> Self {
        FlatTree {
            split_var: Vec::with_capacity(capacity),
            split_value: Vec::with_capacity(capacity),
            left: Vec::with_capacity(capacity),
            right: Vec::with_capacity(capacity),
            missing: Vec::with_capacity(capacity),
            error_reduction: Vec::with_capacity(capacity),
            weight: Vec::with_capacity(capacity),
            prediction: Vec::with_capacity(capacity),
            num_observations: Vec::with_capacity(capacity),
            category_split: Vec::with_capacity(capacity),
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.split_var.len()
    }

    pub fn is_empty(&self) -> bool {
        self.split_var.is_empty()
    }

    /// Check that every column has one entry per record
    pub fn is_consistent(&self) -> bool {
        let n = self.len();
        [
            self.split_value.len(),
            self.left.len(),
            self.right.len(),
            self.missing.len(),
            self.error_reduction.len(),
            self.weight.len(),
            self.prediction.len(),
            self.num_observations.len(),
            self.category_split.len(),
        ]
        .iter()
        .all(|&len| len == n)
    }

    /// Score observation `row` with the tree whose root is record 0
    pub fn predict<D: Dataset + ?Sized>(
        &self,
        data: &D,
        row: usize,
        categories: &[CategorySplit],
    ) -> f64 {
        self.predict_from(0, data, row, categories)
    }

    /// Score observation `row` starting at record `root`.
    ///
    /// Records are trusted to be well formed.
    pub fn predict_from<D: Dataset + ?Sized>(
        &self,
        root: usize,
        data: &D,
        row: usize,
        categories: &[CategorySplit],
    ) -> f64 {
        let mut idx = root;
        loop {
            let var = self.split_var[idx];
            if var == NO_VARIABLE {
                return self.prediction[idx];
            }
            let value = data.value(row, var as usize);
            let direction = match self.category_split[idx] {
                NO_CATEGORY_SPLIT => match value.as_numeric() {
                    Some(x) if x < self.split_value[idx] => Direction::Left,
                    Some(_) => Direction::Right,
                    None => Direction::Missing,
                },
                entry => categories[entry as usize].direction(value.as_category()),
            };
            idx = match direction {
                Direction::Left => self.left[idx],
                Direction::Right => self.right[idx],
                Direction::Missing => self.missing[idx],
                Direction::NotApplicable => return self.prediction[idx],
            } as usize;
        }
    }

    /// Append a record with no children yet; returns its id
    fn push_record(&mut self) -> usize {
        let id = self.len();
        self.split_var.push(NO_VARIABLE);
        self.split_value.push(0.0);
        self.left.push(NO_NODE);
        self.right.push(NO_NODE);
        self.missing.push(NO_NODE);
        self.error_reduction.push(0.0);
        self.weight.push(0.0);
        self.prediction.push(0.0);
        self.num_observations.push(0);
        self.category_split.push(NO_CATEGORY_SPLIT);
        id
    }
}

impl DecisionTree {
    /// Flatten the whole tree into fresh arrays
    pub fn to_flat<D: Dataset + ?Sized>(
        &self,
        data: &D,
        shrinkage: f64,
    ) -> (FlatTree, Vec<CategorySplit>) {
        let mut flat = FlatTree::with_capacity(self.len());
        let mut categories = Vec::new();
        self.flatten(&mut flat, data, &mut categories, shrinkage);
        (flat, categories)
    }

    /// Append the whole tree to `out` in pre-order; returns the root's record id.
    ///
    /// `out` and `categories` may already hold earlier trees: new records
    /// continue from `out.len()` and new category sets from
    /// `categories.len()`, and every stored index is absolute.
    #[instrument(level = "debug", skip_all, fields(nodes = self.len(), shrinkage = shrinkage))]
    pub fn flatten<D: Dataset + ?Sized>(
        &self,
        out: &mut FlatTree,
        data: &D,
        categories: &mut Vec<CategorySplit>,
        shrinkage: f64,
    ) -> usize {
        let first_category = categories.len();
        let root = self.flatten_from(DecisionTree::ROOT, out, data, categories, shrinkage);
        debug!(
            root,
            records = out.len() - root,
            category_splits = categories.len() - first_category,
            "flattened tree"
        );
        root
    }

    fn flatten_from<D: Dataset + ?Sized>(
        &self,
        id: NodeId,
        out: &mut FlatTree,
        data: &D,
        categories: &mut Vec<CategorySplit>,
        shrinkage: f64,
    ) -> usize {
        let node = self.node(id);
        let this = out.push_record();
        out.weight[this] = node.total_weight;
        out.prediction[this] = node.prediction * shrinkage;
        out.num_observations[this] = node.num_observations;

        let children = match &node.split {
            Split::Terminal => {
                out.split_value[this] = node.prediction * shrinkage;
                return this;
            }
            Split::Continuous {
                var,
                threshold,
                improvement,
                children,
            } => {
                out.split_var[this] = *var as i32;
                out.split_value[this] = *threshold;
                out.error_reduction[this] = *improvement;
                *children
            }
            Split::Categorical {
                var,
                threshold,
                left_categories,
                improvement,
                children,
            } => {
                out.split_var[this] = *var as i32;
                out.split_value[this] = *threshold;
                out.error_reduction[this] = *improvement;
                out.category_split[this] = categories.len() as i32;
                categories.push(CategorySplit {
                    left_categories: left_categories.clone(),
                    num_levels: data.num_levels(*var),
                });
                *children
            }
        };

        out.left[this] = self.flatten_from(children.left, out, data, categories, shrinkage) as i32;
        out.right[this] = self.flatten_from(children.right, out, data, categories, shrinkage) as i32;
        out.missing[this] =
            self.flatten_from(children.missing, out, data, categories, shrinkage) as i32;
        this
    }
}
