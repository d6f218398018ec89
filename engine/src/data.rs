//! Read accessor over the observations a tree routes
//!
//! The tree never looks inside a dataset: it asks for one cell at a time
//! through [`Dataset::value`] and gets back a numeric value, a category code,
//! or an explicit missing marker.

/// A single cell of the dataset as seen by a split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// Value of a continuous variable
    Numeric(f64),
    /// Level code of a categorical variable
    Category(u32),
    /// No value recorded for this row
    Missing,
}

impl Observation {
    /// Numeric view used by continuous splits.
    ///
    /// NaN counts as missing. A category code reads as its numeric value.
    #[inline]
    pub fn as_numeric(self) -> Option<f64> {
        match self {
            Observation::Numeric(x) if !x.is_nan() => Some(x),
            Observation::Category(code) => Some(code as f64),
            _ => None,
        }
    }

    /// Category view used by categorical splits.
    ///
    /// Numeric values are accepted when they are non-negative whole numbers
    /// that fit a `u32`; anything else counts as missing.
    #[inline]
    pub fn as_category(self) -> Option<u32> {
        match self {
            Observation::Category(code) => Some(code),
            Observation::Numeric(x)
                if x.is_finite() && x >= 0.0 && x.fract() == 0.0 && x <= u32::MAX as f64 =>
            {
                Some(x as u32)
            }
            _ => None,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Observation::Missing)
    }
}

/// Row/variable accessor the tree reads during routing.
pub trait Dataset {
    /// Value of variable `var` for row `row`.
    ///
    /// Callers guarantee both indices are in range.
    fn value(&self, row: usize, var: usize) -> Observation;

    /// Number of levels of a categorical variable; 0 for continuous ones.
    fn num_levels(&self, _var: usize) -> u32 {
        0
    }
}

/// Dense row-major dataset with NaN marking missing cells.
///
/// Variables with a non-zero level count are categorical and their cells
/// are read back as category codes.
#[derive(Debug, Clone, Default)]
pub struct DenseDataset {
    values: Vec<f64>,
    num_vars: usize,
    levels: Vec<u32>,
}

impl DenseDataset {
    /// Create an empty dataset with `num_vars` continuous variables
    pub fn new(num_vars: usize) -> Self {
        DenseDataset {
            values: Vec::new(),
            num_vars,
            levels: vec![0; num_vars],
        }
    }

    /// Build a dataset from rows; `None` marks a missing cell.
    ///
    /// # Panics
    ///
    /// Panics if the rows do not all have the same length.
    pub fn from_rows(rows: &[Vec<Option<f64>>]) -> Self {
        let num_vars = rows.first().map_or(0, Vec::len);
        let mut data = DenseDataset::new(num_vars);
        for row in rows {
            data.push_row(row);
        }
        data
    }

    /// Mark variable `var` as categorical with `num_levels` levels
    pub fn with_levels(mut self, var: usize, num_levels: u32) -> Self {
        self.levels[var] = num_levels;
        self
    }

    /// Append one row
    ///
    /// # Panics
    ///
    /// Panics if `row.len()` differs from the number of variables.
    pub fn push_row(&mut self, row: &[Option<f64>]) {
        assert_eq!(row.len(), self.num_vars, "row width must match variable count");
        self.values
            .extend(row.iter().map(|cell| cell.unwrap_or(f64::NAN)));
    }

    pub fn num_rows(&self) -> usize {
        if self.num_vars == 0 {
            0
        } else {
            self.values.len() / self.num_vars
        }
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }
}

impl Dataset for DenseDataset {
    #[inline]
    fn value(&self, row: usize, var: usize) -> Observation {
        let x = self.values[row * self.num_vars + var];
        if x.is_nan() {
            Observation::Missing
        } else if self.levels[var] > 0 {
            Observation::Numeric(x)
                .as_category()
                .map_or(Observation::Missing, Observation::Category)
        } else {
            Observation::Numeric(x)
        }
    }

    fn num_levels(&self, var: usize) -> u32 {
        self.levels[var]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Observation::Numeric(2.5), Some(2.5))]
    #[case(Observation::Numeric(f64::NAN), None)]
    #[case(Observation::Category(3), Some(3.0))]
    #[case(Observation::Missing, None)]
    fn test_numeric_view(#[case] obs: Observation, #[case] expected: Option<f64>) {
        assert_eq!(obs.as_numeric(), expected);
    }

    #[rstest]
    #[case(Observation::Category(7), Some(7))]
    #[case(Observation::Numeric(4.0), Some(4))]
    #[case(Observation::Numeric(4.5), None)]
    #[case(Observation::Numeric(-1.0), None)]
    #[case(Observation::Numeric(f64::INFINITY), None)]
    #[case(Observation::Missing, None)]
    fn test_category_view(#[case] obs: Observation, #[case] expected: Option<u32>) {
        assert_eq!(obs.as_category(), expected);
    }

    #[test]
    fn test_dense_dataset_cells() {
        let data = DenseDataset::from_rows(&[
            vec![Some(1.5), Some(2.0), None],
            vec![None, Some(0.0), Some(-3.0)],
        ])
        .with_levels(1, 3);

        assert_eq!(data.num_rows(), 2);
        assert_eq!(data.num_vars(), 3);
        assert_eq!(data.value(0, 0), Observation::Numeric(1.5));
        assert_eq!(data.value(0, 1), Observation::Category(2));
        assert!(data.value(0, 2).is_missing());
        assert!(data.value(1, 0).is_missing());
        assert_eq!(data.value(1, 1), Observation::Category(0));
        assert_eq!(data.num_levels(1), 3);
        assert_eq!(data.num_levels(2), 0);
    }

    #[test]
    fn test_dense_dataset_empty() {
        let data = DenseDataset::new(0);
        assert_eq!(data.num_rows(), 0);
    }

    #[test]
    #[should_panic(expected = "row width")]
    fn test_push_row_width_mismatch() {
        let mut data = DenseDataset::new(2);
        data.push_row(&[Some(1.0)]);
    }
}
