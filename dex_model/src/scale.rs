//! Per-column z-score standardization, self-contained per table: the mean
//! and standard deviation come from the input itself, never from a scaler
//! fitted elsewhere.

use log::warn;
use ndarray::{Array2, Axis};

/// Mean and population standard deviation of one feature column, as applied
/// during standardization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub mean: f64,
    pub sd: f64,
}

/// A standardized feature matrix together with the per-column statistics
/// that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedFeatures {
    pub matrix: Array2<f64>,
    pub columns: Vec<ColumnStats>,
}

/// Standardize each column of `features` to mean 0 and standard deviation 1.
/// A zero-variance column carries no signal to separate cells on, so it
/// standardizes to all zeros rather than dividing by zero.
pub fn standardize(features: &Array2<f64>) -> StandardizedFeatures {
    let mut matrix = features.clone();
    let mut columns = Vec::with_capacity(features.ncols());

    if features.nrows() == 0 {
        columns.extend((0..features.ncols()).map(|_| ColumnStats { mean: 0.0, sd: 0.0 }));
        return StandardizedFeatures { matrix, columns };
    }

    for (j, column) in features.axis_iter(Axis(1)).enumerate() {
        let mean = column.mean().unwrap_or(0.0);
        let sd = column.std(0.0);
        columns.push(ColumnStats { mean, sd });

        let mut out = matrix.column_mut(j);
        if sd > 0.0 {
            out.mapv_inplace(|v| (v - mean) / sd);
        } else {
            warn!("feature column {j} has zero variance; standardizing to zeros");
            out.fill(0.0);
        }
    }

    StandardizedFeatures { matrix, columns }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_standardized_columns_have_zero_mean_unit_sd() {
        let features = array![[1.0, 10.0], [2.0, 30.0], [3.0, 20.0], [4.0, 40.0]];
        let standardized = standardize(&features);
        for column in standardized.matrix.axis_iter(Axis(1)) {
            assert!(column.mean().unwrap().abs() < TOL);
            assert!((column.std(0.0) - 1.0).abs() < TOL);
        }
        assert_eq!(standardized.columns[0].mean, 2.5);
    }

    #[test]
    fn test_zero_variance_column_becomes_zeros() {
        let features = array![[7.0, 1.0], [7.0, 2.0], [7.0, 3.0]];
        let standardized = standardize(&features);
        assert!(standardized.matrix.column(0).iter().all(|&v| v == 0.0));
        assert_eq!(standardized.columns[0], ColumnStats { mean: 7.0, sd: 0.0 });
        // the informative column is still standardized
        assert!(standardized.matrix.column(1).mean().unwrap().abs() < TOL);
    }

    #[test]
    fn test_all_identical_rows_yield_zero_matrix() {
        let features = Array2::from_elem((5, 4), 3.25);
        let standardized = standardize(&features);
        assert!(standardized.matrix.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_empty_input() {
        let features = Array2::<f64>::zeros((0, 4));
        let standardized = standardize(&features);
        assert_eq!(standardized.matrix.dim(), (0, 4));
        assert_eq!(standardized.columns.len(), 4);
    }
}
