//! arbor Engine - Decision tree nodes for gradient boosted ensembles
//!
//! This crate holds a single boosted tree: the node data model, growth by
//! splitting leaves, routing and prediction, post-growth adjustment of sparse
//! leaves, variable influence, and export to flat parallel arrays.
//!
//! Choosing splits, computing gradients and running the boosting loop are the
//! grower's job and live outside this crate.

pub mod adjust;
pub mod data;
pub mod error;
pub mod flat;
pub mod node;
pub mod predict;
pub mod test_tree;
pub mod tree;

pub use adjust::{AdjustPolicy, ReplaceWithReference, ShrinkToward};
pub use data::{Dataset, DenseDataset, Observation};
pub use error::{TreeError, TreeResult};
pub use flat::{CategorySplit, FlatTree};
pub use node::{Children, Direction, Node, NodeDef, NodeId, NodeParams, Split, SplitKind};
pub use tree::DecisionTree;
