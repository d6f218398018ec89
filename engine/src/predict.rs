//! Batch scoring of a grown tree
//!
//! Once growth and adjustment are done the tree is read-only, so rows are
//! scored in parallel with Rayon over shared references and no locking.

use crate::data::{Dataset, DenseDataset};
use crate::test_tree::build_test_tree_categorical;
use crate::tree::DecisionTree;
use rayon::prelude::*;

impl DecisionTree {
    /// Score every row in `rows`, in order.
    pub fn predict_rows<D>(&self, data: &D, rows: &[usize], shrinkage: f64) -> Vec<f64>
    where
        D: Dataset + Sync + ?Sized,
    {
        rows.par_iter()
            .map(|&row| self.predict(data, row, shrinkage))
            .collect()
    }

    /// Score rows `0..num_rows`.
    pub fn predict_all<D>(&self, data: &D, num_rows: usize, shrinkage: f64) -> Vec<f64>
    where
        D: Dataset + Sync + ?Sized,
    {
        (0..num_rows)
            .into_par_iter()
            .map(|row| self.predict(data, row, shrinkage))
            .collect()
    }
}

/// Pseudo-random rows for the fixture tree's three variables.
///
/// Variable 0 is categorical with 4 levels; roughly one cell in ten is missing.
pub fn lcg_dataset(num_rows: usize, seed: u64) -> DenseDataset {
    let mut state = seed;
    let mut next = || {
        state = state.wrapping_mul(1103515245).wrapping_add(12345) & 0x7fffffff;
        state
    };

    let mut data = DenseDataset::new(3).with_levels(0, 4);
    for _ in 0..num_rows {
        let mut row = [None; 3];
        for (var, cell) in row.iter_mut().enumerate() {
            if next() % 10 == 0 {
                continue;
            }
            *cell = Some(if var == 0 {
                (next() % 4) as f64
            } else {
                (next() % 600) as f64 / 100.0
            });
        }
        data.push_row(&row);
    }
    data
}

/// Time parallel scoring of the categorical fixture tree.
///
/// Returns `(rows_per_sec, duration_ms)`.
pub fn benchmark_throughput(sample_size: usize, shrinkage: f64) -> (f64, u64) {
    use std::time::Instant;

    let tree = build_test_tree_categorical();
    let data = lcg_dataset(sample_size, 12345);

    // Warm-up
    for row in 0..10_000.min(sample_size) {
        let _ = tree.predict(&data, row, shrinkage);
    }

    let start = Instant::now();
    let _scores = tree.predict_all(&data, sample_size, shrinkage);
    let duration = start.elapsed();

    let rows_per_sec = sample_size as f64 / duration.as_secs_f64();
    (rows_per_sec, duration.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_rows_matches_sequential() {
        let tree = build_test_tree_categorical();
        let data = lcg_dataset(500, 7);
        let rows: Vec<usize> = (0..data.num_rows()).rev().collect();
        let scores = tree.predict_rows(&data, &rows, 0.1);

        assert_eq!(scores.len(), rows.len());
        for (score, &row) in scores.iter().zip(&rows) {
            assert_eq!(*score, tree.predict(&data, row, 0.1));
        }
        assert_eq!(tree.predict_all(&data, 500, 0.1).len(), 500);
    }

    #[test]
    fn test_lcg_dataset_shape() {
        let data = lcg_dataset(1_000, 3);
        assert_eq!(data.num_rows(), 1_000);
        assert_eq!(data.num_levels(0), 4);
        let missing = (0..1_000).filter(|&row| data.value(row, 1).is_missing()).count();
        assert!(missing > 0 && missing < 300, "missing = {}", missing);
    }

    #[test]
    fn test_benchmark_throughput_small() {
        let (rows_per_sec, _) = benchmark_throughput(1_000, 1.0);
        assert!(rows_per_sec > 0.0);
    }
}
