//! Post-growth regularization of sparse leaves
//!
//! After growth, [`DecisionTree::adjust`] walks the tree bottom-up. A missing
//! branch that is a leaf reached by fewer than `min_obs` training rows has
//! its prediction revised by an [`AdjustPolicy`], relative to a reference
//! value: the weight-averaged prediction of its left and right siblings.
//! Left and right leaves keep their own estimates, so every split still
//! separates what it was grown to separate. Each internal node then takes
//! the weight-averaged prediction of its three children.
//!
//! How far a sparse missing leaf moves toward the reference is the policy's
//! call.

use crate::node::{NodeDef, NodeId};
use crate::tree::DecisionTree;
use tracing::{debug, instrument};

/// Revises the prediction of a missing-branch leaf reached by too few
/// observations
pub trait AdjustPolicy {
    /// New prediction for `leaf`, given the `reference` it may be pulled
    /// toward and the `min_obs` threshold it fell under.
    fn blend(&self, leaf: &NodeDef, reference: f64, min_obs: u64) -> f64;
}

impl<F> AdjustPolicy for F
where
    F: Fn(&NodeDef, f64, u64) -> f64,
{
    fn blend(&self, leaf: &NodeDef, reference: f64, min_obs: u64) -> f64 {
        self(leaf, reference, min_obs)
    }
}

/// Discard the sparse leaf's own estimate and use the reference
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceWithReference;

impl AdjustPolicy for ReplaceWithReference {
    fn blend(&self, _leaf: &NodeDef, reference: f64, _min_obs: u64) -> f64 {
        reference
    }
}

/// Credibility blend `(n·p + k·ref) / (n + k)` with `k = strength`.
///
/// The fewer observations a leaf has, the closer it lands to the reference.
#[derive(Debug, Clone, Copy)]
pub struct ShrinkToward {
    pub strength: f64,
}

impl AdjustPolicy for ShrinkToward {
    fn blend(&self, leaf: &NodeDef, reference: f64, _min_obs: u64) -> f64 {
        let n = leaf.num_observations as f64;
        let denom = n + self.strength;
        if denom <= 0.0 {
            return reference;
        }
        (n * leaf.prediction + self.strength * reference) / denom
    }
}

impl DecisionTree {
    /// Revise predictions of sparse leaves and recompute internal predictions.
    ///
    /// Must finish before the tree is used for scoring.
    #[instrument(level = "debug", skip(self, policy))]
    pub fn adjust<P: AdjustPolicy + ?Sized>(&mut self, min_obs: u64, policy: &P) {
        let revised = self.adjust_from(DecisionTree::ROOT, min_obs, policy);
        debug!(revised, "adjusted tree");
    }

    /// Returns how many leaves were revised
    fn adjust_from<P: AdjustPolicy + ?Sized>(
        &mut self,
        id: NodeId,
        min_obs: u64,
        policy: &P,
    ) -> usize {
        let Some(children) = self.node(id).children() else {
            return 0;
        };

        let mut revised = 0;
        for child in children.ids() {
            revised += self.adjust_from(child, min_obs, policy);
        }

        let left = self.node(children.left).stats();
        let right = self.node(children.right).stats();
        let reference = weighted_mean(&[left, right]);

        if let Some(reference) = reference {
            let missing = self.node_mut(children.missing);
            if missing.is_leaf() && missing.num_observations < min_obs {
                missing.prediction = policy.blend(&missing.stats(), reference, min_obs);
                revised += 1;
            }
        }

        let stats = children.ids().map(|child| self.node(child).stats());
        if let Some(mean) = weighted_mean(&stats) {
            self.node_mut(id).prediction = mean;
        }
        revised
    }
}

/// Total-weight-weighted mean prediction; `None` when no weight is present
fn weighted_mean(nodes: &[NodeDef]) -> Option<f64> {
    let total: f64 = nodes.iter().map(|n| n.total_weight).sum();
    if total <= 0.0 {
        return None;
    }
    Some(
        nodes
            .iter()
            .map(|n| n.total_weight * n.prediction)
            .sum::<f64>()
            / total,
    )
}
