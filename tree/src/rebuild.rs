//! Inverse of flattening
//!
//! Records are read in pre-order from the root record. Predictions are taken
//! as stored, i.e. already shrunk, so flattening a rebuilt tree with a
//! shrinkage of 1.0 reproduces the input arrays.

use arbor_engine::flat::{CategorySplit, FlatTree, NO_CATEGORY_SPLIT, NO_NODE, NO_VARIABLE};
use arbor_engine::{DecisionTree, NodeDef, NodeId, NodeParams, TreeError, TreeResult};
use tracing::{debug, instrument, trace};

/// Rebuild the tree rooted at record 0
pub fn rebuild(flat: &FlatTree, categories: &[CategorySplit]) -> TreeResult<DecisionTree> {
    rebuild_from(flat, categories, 0)
}

/// Rebuild the tree rooted at record `root`.
///
/// Fails with [`TreeError::MalformedFlatTree`] when the arrays break the flat
/// contract: ragged columns, children that do not point forward, a record
/// reached twice, a category index with no matching entry, or a leaf record
/// carrying split fields.
#[instrument(level = "debug", skip(flat, categories), fields(records = flat.len()))]
pub fn rebuild_from(
    flat: &FlatTree,
    categories: &[CategorySplit],
    root: usize,
) -> TreeResult<DecisionTree> {
    if !flat.is_consistent() {
        return Err(malformed("columns differ in length".to_string()));
    }
    if root >= flat.len() {
        return Err(malformed(format!(
            "root record {root} is out of range for {} records",
            flat.len()
        )));
    }

    let mut seen = vec![false; flat.len()];
    seen[root] = true;
    let mut tree = DecisionTree::new(node_def(flat, root));
    let mut pending: Vec<(usize, NodeId)> = vec![(root, DecisionTree::ROOT)];

    while let Some((record, id)) = pending.pop() {
        let var = flat.split_var[record];
        let links = [flat.left[record], flat.right[record], flat.missing[record]];

        if var == NO_VARIABLE {
            if links.iter().any(|&link| link != NO_NODE) {
                return Err(malformed(format!("leaf record {record} has children")));
            }
            check_leaf_fields(flat, record)?;
            trace!(record, node = id, "leaf");
            continue;
        }
        if var < 0 {
            return Err(malformed(format!(
                "record {record} has split variable {var}"
            )));
        }

        let mut child_records = [0usize; 3];
        for (slot, &link) in child_records.iter_mut().zip(&links) {
            if link <= record as i32 || link as usize >= flat.len() {
                return Err(malformed(format!(
                    "record {record} points to child record {link}"
                )));
            }
            let child = link as usize;
            if seen[child] {
                return Err(malformed(format!("record {child} is reached twice")));
            }
            seen[child] = true;
            *slot = child;
        }
        let [left, right, missing] = child_records;

        let params = NodeParams {
            split_var: var as usize,
            split_threshold: flat.split_value[record],
            category_ordering: left_categories(flat, categories, record)?,
            improvement: flat.error_reduction[record],
            split_class: if flat.category_split[record] == NO_CATEGORY_SPLIT {
                0
            } else {
                1
            },
            left: node_def(flat, left),
            right: node_def(flat, right),
            missing: node_def(flat, missing),
        };
        let children = tree.split(id, params)?;
        trace!(record, node = id, ?children, "internal");

        pending.push((missing, children.missing));
        pending.push((right, children.right));
        pending.push((left, children.left));
    }

    debug!(nodes = tree.len(), "rebuilt tree");
    Ok(tree)
}

/// Leaf columns that the tree does not store must hold exactly what
/// flattening writes, or re-flattening would not reproduce them.
fn check_leaf_fields(flat: &FlatTree, record: usize) -> TreeResult<()> {
    if flat.category_split[record] != NO_CATEGORY_SPLIT {
        return Err(malformed(format!(
            "leaf record {record} refers to category split {}",
            flat.category_split[record]
        )));
    }
    let (value, prediction) = (flat.split_value[record], flat.prediction[record]);
    if value.to_bits() != prediction.to_bits() {
        return Err(malformed(format!(
            "leaf record {record} split value {value} differs from prediction {prediction}"
        )));
    }
    if flat.error_reduction[record] != 0.0 {
        return Err(malformed(format!(
            "leaf record {record} has error reduction {}",
            flat.error_reduction[record]
        )));
    }
    Ok(())
}

fn node_def(flat: &FlatTree, record: usize) -> NodeDef {
    NodeDef::new(
        flat.prediction[record],
        flat.weight[record],
        flat.num_observations[record],
    )
}

/// Left set of a categorical record, checked against its stored threshold;
/// empty for continuous records
fn left_categories(
    flat: &FlatTree,
    categories: &[CategorySplit],
    record: usize,
) -> TreeResult<Vec<u32>> {
    let entry = flat.category_split[record];
    if entry == NO_CATEGORY_SPLIT {
        return Ok(Vec::new());
    }
    let split = usize::try_from(entry)
        .ok()
        .and_then(|entry| categories.get(entry))
        .ok_or_else(|| {
            malformed(format!(
                "record {record} refers to category split {entry} of {}",
                categories.len()
            ))
        })?;

    let threshold = flat.split_value[record];
    if threshold.floor() + 1.0 != split.left_categories.len() as f64 {
        return Err(malformed(format!(
            "record {record} threshold {threshold} does not match {} left categories",
            split.left_categories.len()
        )));
    }
    Ok(split.left_categories.clone())
}

fn malformed(reason: String) -> TreeError {
    TreeError::MalformedFlatTree(reason)
}
