//! Error types for tree growth and reconstruction

use crate::node::NodeId;
use thiserror::Error;

/// Failures raised while growing a tree or rebuilding one from flat arrays.
///
/// Inference (`route`, `predict`) never fails: it assumes a well-formed tree
/// and a dataset that answers for every split variable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("node {0} does not exist in this tree")]
    UnknownNode(NodeId),

    #[error("node {0} is already split")]
    AlreadySplit(NodeId),

    #[error("categorical split on node {node} sends no category left (threshold {threshold})")]
    EmptyCategorySet { node: NodeId, threshold: f64 },

    #[error("categorical split on node {node} needs {needed} ordered categories, got {available}")]
    CategoryOrderingTooShort {
        node: NodeId,
        needed: usize,
        available: usize,
    },

    #[error("malformed flat tree: {0}")]
    MalformedFlatTree(String),
}

pub type TreeResult<T> = Result<T, TreeError>;
