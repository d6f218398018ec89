//! Node definitions for the decision tree
//!
//! A node starts life as a leaf built from a [`NodeDef`] and may be split once,
//! from a [`NodeParams`], into an internal node with three leaf children
//! (left, right, missing). What a node does is decided by its [`Split`]:
//! a closed enum with one variant per split kind, so every operation matches
//! all three kinds exhaustively.
//!
//! Topology lives in the tree arena (see [`crate::tree::DecisionTree`]);
//! internal nodes refer to their children by [`NodeId`].

use crate::data::Dataset;

/// Node ID type (index into the tree arena)
pub type NodeId = u32;

/// Statistics describing a freshly created node.
///
/// Also used as a read-only snapshot of an existing node's statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeDef {
    /// Estimate this node contributes when an observation ends here
    pub prediction: f64,
    /// Sum of observation weights reaching this node
    pub total_weight: f64,
    /// Count of training rows reaching this node
    pub num_observations: u64,
}

impl NodeDef {
    pub fn new(prediction: f64, total_weight: f64, num_observations: u64) -> Self {
        NodeDef {
            prediction,
            total_weight,
            num_observations,
        }
    }
}

/// Split decision handed over by the tree grower.
///
/// Consumed by [`crate::tree::DecisionTree::split`]; nothing keeps it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeParams {
    /// Variable used to route observations
    pub split_var: usize,
    /// Cut point for continuous splits. For categorical splits,
    /// `1 + floor(split_threshold)` leading entries of `category_ordering`
    /// are routed left.
    pub split_threshold: f64,
    /// Ranking of category codes; only read for categorical splits
    pub category_ordering: Vec<u32>,
    /// Loss reduction attributed to this split
    pub improvement: f64,
    /// 0 for a continuous split, anything else for a categorical one
    pub split_class: i32,
    pub left: NodeDef,
    pub right: NodeDef,
    pub missing: NodeDef,
}

impl NodeParams {
    /// Continuous split: `value < threshold` goes left.
    pub fn continuous(
        split_var: usize,
        threshold: f64,
        improvement: f64,
        left: NodeDef,
        right: NodeDef,
        missing: NodeDef,
    ) -> Self {
        NodeParams {
            split_var,
            split_threshold: threshold,
            category_ordering: Vec::new(),
            improvement,
            split_class: 0,
            left,
            right,
            missing,
        }
    }

    /// Categorical split sending the first `num_left` codes of `ordering` left.
    ///
    /// `num_left` must be at least 1.
    pub fn categorical(
        split_var: usize,
        ordering: Vec<u32>,
        num_left: usize,
        improvement: f64,
        left: NodeDef,
        right: NodeDef,
        missing: NodeDef,
    ) -> Self {
        NodeParams {
            split_var,
            split_threshold: num_left as f64 - 1.0,
            category_ordering: ordering,
            improvement,
            split_class: 1,
            left,
            right,
            missing,
        }
    }
}

/// Kind of split stored on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SplitKind {
    /// Leaf
    #[default]
    None,
    /// Numeric threshold compare
    Continuous,
    /// Category set membership
    Categorical,
}

impl SplitKind {
    /// Map the grower's split class onto a kind: 0 is continuous, anything
    /// else categorical. Never yields [`SplitKind::None`].
    pub fn from_class(split_class: i32) -> Self {
        match split_class {
            0 => SplitKind::Continuous,
            _ => SplitKind::Categorical,
        }
    }
}

/// Outcome of routing an observation at a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Missing,
    /// Routing was asked of a leaf
    NotApplicable,
}

/// The three children of an internal node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Children {
    pub left: NodeId,
    pub right: NodeId,
    pub missing: NodeId,
}

impl Children {
    /// Child reached by `direction`, `None` for [`Direction::NotApplicable`]
    #[inline]
    pub fn get(self, direction: Direction) -> Option<NodeId> {
        match direction {
            Direction::Left => Some(self.left),
            Direction::Right => Some(self.right),
            Direction::Missing => Some(self.missing),
            Direction::NotApplicable => None,
        }
    }

    /// Children in left, right, missing order
    pub fn ids(self) -> [NodeId; 3] {
        [self.left, self.right, self.missing]
    }
}

/// Split stored on a node, with everything its behavior needs
#[derive(Debug, Clone, PartialEq)]
pub enum Split {
    /// Leaf: contributes its prediction, routes nowhere
    Terminal,
    /// `value < threshold` → left, otherwise right, absent → missing
    Continuous {
        var: usize,
        threshold: f64,
        improvement: f64,
        children: Children,
    },
    /// Code in `left_categories` → left, otherwise right, absent → missing
    Categorical {
        var: usize,
        /// Threshold as supplied at split time (left count minus one)
        threshold: f64,
        left_categories: Vec<u32>,
        improvement: f64,
        children: Children,
    },
}

impl Split {
    pub fn kind(&self) -> SplitKind {
        match self {
            Split::Terminal => SplitKind::None,
            Split::Continuous { .. } => SplitKind::Continuous,
            Split::Categorical { .. } => SplitKind::Categorical,
        }
    }

    /// Children of an internal node, `None` for a leaf
    #[inline]
    pub fn children(&self) -> Option<Children> {
        match self {
            Split::Terminal => None,
            Split::Continuous { children, .. } | Split::Categorical { children, .. } => {
                Some(*children)
            }
        }
    }

    /// Routing variable of an internal node
    pub fn var(&self) -> Option<usize> {
        match self {
            Split::Terminal => None,
            Split::Continuous { var, .. } | Split::Categorical { var, .. } => Some(*var),
        }
    }

    /// Loss reduction of the split; 0 for a leaf
    pub fn improvement(&self) -> f64 {
        match self {
            Split::Terminal => 0.0,
            Split::Continuous { improvement, .. } | Split::Categorical { improvement, .. } => {
                *improvement
            }
        }
    }

    /// Stored threshold; 0 for a leaf
    pub fn threshold(&self) -> f64 {
        match self {
            Split::Terminal => 0.0,
            Split::Continuous { threshold, .. } | Split::Categorical { threshold, .. } => {
                *threshold
            }
        }
    }

    /// Categories routed left; empty unless categorical
    pub fn left_categories(&self) -> &[u32] {
        match self {
            Split::Categorical {
                left_categories, ..
            } => left_categories,
            _ => &[],
        }
    }

    /// Decide which child observation `row` goes to.
    #[inline]
    pub fn route<D: Dataset + ?Sized>(&self, data: &D, row: usize) -> Direction {
        match self {
            Split::Terminal => Direction::NotApplicable,
            Split::Continuous { var, threshold, .. } => {
                match data.value(row, *var).as_numeric() {
                    Some(x) if x < *threshold => Direction::Left,
                    Some(_) => Direction::Right,
                    None => Direction::Missing,
                }
            }
            Split::Categorical {
                var,
                left_categories,
                ..
            } => match data.value(row, *var).as_category() {
                Some(code) if left_categories.contains(&code) => Direction::Left,
                Some(_) => Direction::Right,
                None => Direction::Missing,
            },
        }
    }
}

/// A node of the decision tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub prediction: f64,
    pub total_weight: f64,
    pub num_observations: u64,
    pub(crate) split: Split,
}

impl Node {
    /// Create a leaf from its definition
    pub fn new(def: &NodeDef) -> Self {
        Node {
            prediction: def.prediction,
            total_weight: def.total_weight,
            num_observations: def.num_observations,
            split: Split::Terminal,
        }
    }

    pub fn split(&self) -> &Split {
        &self.split
    }

    pub fn kind(&self) -> SplitKind {
        self.split.kind()
    }

    /// Check if this is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self.split, Split::Terminal)
    }

    pub fn children(&self) -> Option<Children> {
        self.split.children()
    }

    /// Snapshot of this node's statistics
    pub fn stats(&self) -> NodeDef {
        NodeDef::new(self.prediction, self.total_weight, self.num_observations)
    }

    /// Decide which child observation `row` goes to
    #[inline]
    pub fn route<D: Dataset + ?Sized>(&self, data: &D, row: usize) -> Direction {
        self.split.route(data, row)
    }
}

impl From<NodeDef> for Node {
    fn from(def: NodeDef) -> Self {
        Node::new(&def)
    }
}
