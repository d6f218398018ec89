//! Arena-backed decision tree
//!
//! All nodes of a tree live in one flat `Vec<Node>` indexed by [`NodeId`],
//! the root at id 0. A split appends its three children to the arena, so
//! every node is reachable from exactly one parent and dropping the tree
//! releases every node it ever grew.
//!
//! Growth (`split`) and regularization (`adjust`) take `&mut self`; everything
//! used for scoring and export takes `&self`, so a grown tree can be shared
//! across threads without locking.

use crate::data::Dataset;
use crate::error::{TreeError, TreeResult};
use crate::node::{Children, Direction, Node, NodeDef, NodeId, NodeParams, Split, SplitKind};
use std::fmt;
use tracing::{debug, instrument};

/// Decision tree wrapper
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// ID of the root node
    pub const ROOT: NodeId = 0;

    /// Create a tree holding a single leaf
    pub fn new(root: NodeDef) -> Self {
        DecisionTree {
            nodes: vec![Node::new(&root)],
        }
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    pub fn root(&self) -> &Node {
        &self.nodes[Self::ROOT as usize]
    }

    /// Get the number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree holds at least its root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over `(id, node)` in arena order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (idx as NodeId, node))
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Number of levels; a lone root has depth 1
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(Self::ROOT, 1usize)];
        while let Some((id, level)) = stack.pop() {
            deepest = deepest.max(level);
            if let Some(children) = self.nodes[id as usize].children() {
                stack.extend(children.ids().map(|child| (child, level + 1)));
            }
        }
        deepest
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id as usize]
    }

    /// Turn leaf `id` into an internal node with three fresh leaf children.
    ///
    /// The split kind comes from `params.split_class` (0 continuous, anything
    /// else categorical). A categorical split keeps the first
    /// `1 + floor(split_threshold)` codes of `params.category_ordering` as its
    /// left set. Returns the ids of the new children.
    #[instrument(level = "debug", skip(self, params), fields(var = params.split_var, class = params.split_class))]
    pub fn split(&mut self, id: NodeId, params: NodeParams) -> TreeResult<Children> {
        let node = self.get(id).ok_or(TreeError::UnknownNode(id))?;
        if !node.is_leaf() {
            return Err(TreeError::AlreadySplit(id));
        }

        let first = self.nodes.len() as NodeId;
        let children = Children {
            left: first,
            right: first + 1,
            missing: first + 2,
        };

        let split = match SplitKind::from_class(params.split_class) {
            SplitKind::Continuous => Split::Continuous {
                var: params.split_var,
                threshold: params.split_threshold,
                improvement: params.improvement,
                children,
            },
            SplitKind::Categorical => Split::Categorical {
                var: params.split_var,
                threshold: params.split_threshold,
                left_categories: left_category_prefix(id, &params)?,
                improvement: params.improvement,
                children,
            },
            SplitKind::None => unreachable!("split classes never map to a leaf"),
        };

        self.nodes.push(Node::new(&params.left));
        self.nodes.push(Node::new(&params.right));
        self.nodes.push(Node::new(&params.missing));

        let node = &mut self.nodes[id as usize];
        node.split = split;
        debug!(node = id, kind = ?node.kind(), improvement = params.improvement, "split node");

        Ok(children)
    }

    /// Routing decision of node `id` for observation `row`.
    ///
    /// Leaves answer [`Direction::NotApplicable`].
    #[inline]
    pub fn route<D: Dataset + ?Sized>(&self, id: NodeId, data: &D, row: usize) -> Direction {
        self.nodes[id as usize].route(data, row)
    }

    /// Leaf reached by following `route` from the root
    pub fn leaf_for<D: Dataset + ?Sized>(&self, data: &D, row: usize) -> NodeId {
        self.leaf_from(Self::ROOT, data, row)
    }

    fn leaf_from<D: Dataset + ?Sized>(&self, start: NodeId, data: &D, row: usize) -> NodeId {
        let mut id = start;
        loop {
            let node = &self.nodes[id as usize];
            match node.children().and_then(|c| c.get(node.route(data, row))) {
                Some(child) => id = child,
                None => return id,
            }
        }
    }

    /// Contribution of this tree to the score of observation `row`
    pub fn predict<D: Dataset + ?Sized>(&self, data: &D, row: usize, shrinkage: f64) -> f64 {
        let mut delta = 0.0;
        self.predict_into(Self::ROOT, data, row, shrinkage, &mut delta);
        delta
    }

    /// Add the shrunk prediction of the subtree at `id` for observation `row`
    /// to `delta`.
    ///
    /// Descends with an explicit loop rather than recursion, so tree depth
    /// never touches the call stack.
    #[inline]
    pub fn predict_into<D: Dataset + ?Sized>(
        &self,
        id: NodeId,
        data: &D,
        row: usize,
        shrinkage: f64,
        delta: &mut f64,
    ) {
        let leaf = self.leaf_from(id, data, row);
        *delta += self.nodes[leaf as usize].prediction * shrinkage;
    }

    /// Add each split's improvement to `influence[split_var]`.
    ///
    /// Walks left, right and missing subtrees, so the total added equals the
    /// summed improvement of every internal node.
    ///
    /// # Panics
    ///
    /// Panics if `influence` is shorter than the largest split variable + 1.
    pub fn accumulate_influence(&self, influence: &mut [f64]) {
        self.accumulate_influence_from(Self::ROOT, influence);
    }

    fn accumulate_influence_from(&self, id: NodeId, influence: &mut [f64]) {
        let split = &self.nodes[id as usize].split;
        if let (Some(var), Some(children)) = (split.var(), split.children()) {
            influence[var] += split.improvement();
            for child in children.ids() {
                self.accumulate_influence_from(child, influence);
            }
        }
    }

    /// Write the subtree at `id` to `out`, one line per node, two spaces of
    /// indentation per level.
    pub fn print_subtree<W: fmt::Write>(
        &self,
        id: NodeId,
        indent: usize,
        out: &mut W,
    ) -> fmt::Result {
        let node = &self.nodes[id as usize];
        let pad = "  ".repeat(indent);
        let Some(children) = node.children() else {
            return writeln!(
                out,
                "{pad}N = {}, Prediction = {}",
                node.total_weight, node.prediction
            );
        };

        writeln!(
            out,
            "{pad}N = {}, Improvement = {}, Prediction = {}",
            node.total_weight,
            node.split.improvement(),
            node.prediction
        )?;
        match &node.split {
            Split::Continuous { var, threshold, .. } => {
                writeln!(out, "{pad}V{var} < {threshold}")?;
                self.print_subtree(children.left, indent + 1, out)?;
                writeln!(out, "{pad}V{var} >= {threshold}")?;
                self.print_subtree(children.right, indent + 1, out)?;
            }
            Split::Categorical {
                var,
                left_categories,
                ..
            } => {
                writeln!(out, "{pad}V{var} in {left_categories:?}")?;
                self.print_subtree(children.left, indent + 1, out)?;
                writeln!(out, "{pad}V{var} not in {left_categories:?}")?;
                self.print_subtree(children.right, indent + 1, out)?;
            }
            Split::Terminal => unreachable!("leaf handled above"),
        }
        writeln!(out, "{pad}missing")?;
        self.print_subtree(children.missing, indent + 1, out)
    }
}

impl fmt::Display for DecisionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print_subtree(Self::ROOT, 0, f)
    }
}

/// Left-routed categories: the first `1 + floor(threshold)` ordered codes
fn left_category_prefix(id: NodeId, params: &NodeParams) -> TreeResult<Vec<u32>> {
    let count = params.split_threshold.floor() + 1.0;
    if count.is_nan() || count < 1.0 {
        return Err(TreeError::EmptyCategorySet {
            node: id,
            threshold: params.split_threshold,
        });
    }
    let needed = count as usize;
    let available = params.category_ordering.len();
    if needed > available {
        return Err(TreeError::CategoryOrderingTooShort {
            node: id,
            needed,
            available,
        });
    }
    Ok(params.category_ordering[..needed].to_vec())
}
