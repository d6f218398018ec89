//! Hardcoded fixture trees and a seeded random grower
//!
//! Scenario tree (`build_test_tree`):
//!   0: V2 < 3.0                       N = 10  pred 0.5  improvement 2.0
//!   1: leaf (left)                    N = 4   pred 0.3
//!   2: leaf (right)                   N = 5   pred 0.8
//!   3: leaf (missing)                 N = 1   pred 0.5
//!
//! Categorical tree (`build_test_tree_categorical`) splits node 1 again:
//!   1: V0 in {3, 1}                   N = 4   pred 0.3  improvement 0.75
//!   4: leaf (left)                    N = 2   pred 0.1
//!   5: leaf (right)                   N = 1.5 pred 0.6
//!   6: leaf (missing)                 N = 0.5 pred 0.3
//!
//! Variable 0 is categorical with 4 levels, variables 1 and 2 are continuous.

use crate::data::DenseDataset;
use crate::node::{NodeDef, NodeId, NodeParams};
use crate::tree::DecisionTree;

/// Build the 4-node scenario tree.
pub fn build_test_tree() -> DecisionTree {
    let mut tree = DecisionTree::new(NodeDef::new(0.5, 10.0, 10));
    let params = NodeParams::continuous(
        2,
        3.0,
        2.0,
        NodeDef::new(0.3, 4.0, 4),
        NodeDef::new(0.8, 5.0, 5),
        NodeDef::new(0.5, 1.0, 1),
    );
    tree.split(DecisionTree::ROOT, params)
        .expect("fixture split on a fresh leaf");
    tree
}

/// Build the 7-node tree with a categorical split under the left branch.
pub fn build_test_tree_categorical() -> DecisionTree {
    let mut tree = build_test_tree();
    let params = NodeParams::categorical(
        0,
        vec![3, 1, 0, 2],
        2,
        0.75,
        NodeDef::new(0.1, 2.0, 2),
        NodeDef::new(0.6, 1.5, 1),
        NodeDef::new(0.3, 0.5, 1),
    );
    tree.split(1, params).expect("fixture split on a fresh leaf");
    tree
}

/// Rows covering every leaf of the categorical tree.
pub fn test_dataset() -> DenseDataset {
    DenseDataset::from_rows(&[
        vec![Some(3.0), Some(0.0), Some(1.0)], // V2 left, V0 in set   → 4
        vec![Some(1.0), None, Some(2.9)],      // V2 left, V0 in set   → 4
        vec![Some(0.0), Some(1.0), Some(0.5)], // V2 left, V0 not in   → 5
        vec![None, Some(1.0), Some(-4.0)],     // V2 left, V0 missing  → 6
        vec![Some(2.0), Some(0.0), Some(3.0)], // V2 right             → 2
        vec![Some(3.0), Some(0.0), None],      // V2 missing           → 3
    ])
    .with_levels(0, 4)
}

/// Level counts used by [`grow_random_tree`]: variables 1 and 3 are categorical.
pub const RANDOM_LEVELS: [u32; 4] = [0, 5, 0, 3];

/// Grow a tree of `num_splits` random splits over the variables of
/// [`RANDOM_LEVELS`], deterministically from `seed`.
pub fn grow_random_tree(seed: u64, num_splits: usize) -> DecisionTree {
    let mut rng = Lcg(seed);
    let mut tree = DecisionTree::new(NodeDef::new(rng.signed(), 64.0, 64));
    let mut leaves: Vec<NodeId> = vec![DecisionTree::ROOT];

    for _ in 0..num_splits {
        let slot = rng.below(leaves.len() as u64) as usize;
        let id = leaves.swap_remove(slot);
        let parent = tree.get(id).expect("leaf ids come from the tree").stats();

        let n = parent.num_observations;
        let left_obs = n / 2;
        let missing_obs = rng.below(n / 4 + 1);
        let right_obs = n - left_obs - missing_obs;
        let share = |obs: u64| parent.total_weight * obs as f64 / n.max(1) as f64;
        let left = NodeDef::new(rng.signed(), share(left_obs), left_obs);
        let right = NodeDef::new(rng.signed(), share(right_obs), right_obs);
        let missing = NodeDef::new(rng.signed(), share(missing_obs), missing_obs);

        let var = rng.below(RANDOM_LEVELS.len() as u64) as usize;
        let improvement = rng.below(1_000) as f64 / 100.0;
        let params = match RANDOM_LEVELS[var] {
            0 => {
                let threshold = rng.below(600) as f64 / 100.0;
                NodeParams::continuous(var, threshold, improvement, left, right, missing)
            }
            levels => {
                let mut ordering: Vec<u32> = (0..levels).collect();
                for i in (1..ordering.len()).rev() {
                    let j = rng.below(i as u64 + 1) as usize;
                    ordering.swap(i, j);
                }
                let num_left = 1 + rng.below(levels as u64 - 1) as usize;
                let mut params = NodeParams::categorical(
                    var, ordering, num_left, improvement, left, right, missing,
                );
                // fractional thresholds floor to the same left count
                if rng.below(2) == 0 {
                    params.split_threshold += 0.5;
                }
                params
            }
        };

        let children = tree
            .split(id, params)
            .expect("random params always fit their leaf");
        leaves.extend(children.ids());
    }
    tree
}

/// Rows over the variables of [`RANDOM_LEVELS`], about one cell in eight missing.
pub fn random_dataset(seed: u64, num_rows: usize) -> DenseDataset {
    let mut rng = Lcg(seed);
    let mut data = DenseDataset::new(RANDOM_LEVELS.len());
    for (var, &levels) in RANDOM_LEVELS.iter().enumerate() {
        if levels > 0 {
            data = data.with_levels(var, levels);
        }
    }
    for _ in 0..num_rows {
        let row: Vec<Option<f64>> = RANDOM_LEVELS
            .iter()
            .map(|&levels| match (rng.below(8), levels) {
                (0, _) => None,
                (_, 0) => Some(rng.below(600) as f64 / 100.0),
                (_, levels) => Some(rng.below(levels as u64) as f64),
            })
            .collect();
        data.push_row(&row);
    }
    data
}

/// 64-bit linear congruential generator (Knuth's MMIX constants)
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    /// Uniform-ish in `0..bound`; `bound` must be non-zero
    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }

    /// In `[-1, 1)`
    fn signed(&mut self) -> f64 {
        self.below(2_000) as f64 / 1_000.0 - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::SplitKind;

    #[test]
    fn test_tree_node_count() {
        assert_eq!(build_test_tree().len(), 4);
        assert_eq!(build_test_tree_categorical().len(), 7);
    }

    #[test]
    fn test_categorical_node_shape() {
        let tree = build_test_tree_categorical();
        let node = tree.get(1).unwrap();
        assert_eq!(node.kind(), SplitKind::Categorical);
        assert_eq!(node.split().left_categories(), &[3, 1]);
        assert_eq!(node.children().unwrap().ids(), [4, 5, 6]);
    }

    #[test]
    fn test_fixture_rows_reach_every_leaf() {
        let tree = build_test_tree_categorical();
        let data = test_dataset();
        let leaves: Vec<NodeId> = (0..data.num_rows()).map(|row| tree.leaf_for(&data, row)).collect();
        assert_eq!(leaves, vec![4, 4, 5, 6, 2, 3]);
    }

    #[test]
    fn test_all_children_valid() {
        let tree = grow_random_tree(11, 25);
        assert_eq!(tree.len(), 1 + 3 * 25);
        let mut parents = vec![0usize; tree.len()];
        for (_, node) in tree.iter() {
            if let Some(children) = node.children() {
                for child in children.ids() {
                    assert!(tree.get(child).is_some(), "child id {} is out of bounds", child);
                    parents[child as usize] += 1;
                }
            }
        }
        // every node but the root has exactly one parent
        assert_eq!(parents[0], 0);
        assert!(parents[1..].iter().all(|&count| count == 1));
    }

    #[test]
    fn test_random_tree_is_deterministic() {
        assert_eq!(grow_random_tree(5, 10), grow_random_tree(5, 10));
        assert_ne!(grow_random_tree(5, 10), grow_random_tree(6, 10));
    }

    #[test]
    fn test_random_observation_counts_add_up() {
        let tree = grow_random_tree(42, 30);
        for (_, node) in tree.iter() {
            if let Some(children) = node.children() {
                let total: u64 = children
                    .ids()
                    .iter()
                    .map(|&id| tree.get(id).unwrap().num_observations)
                    .sum();
                assert_eq!(total, node.num_observations);
            }
        }
    }

    #[test]
    fn test_random_dataset_levels() {
        let data = random_dataset(3, 200);
        assert_eq!(data.num_rows(), 200);
        assert_eq!(data.num_vars(), RANDOM_LEVELS.len());
    }
}
