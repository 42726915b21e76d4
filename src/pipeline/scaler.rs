//! Per-column standardization of the feature matrix
//!
//! Fits population mean and standard deviation once over the full batch.
//! Constant columns cannot be standardized; they are reported instead of
//! turning into NaN, and the caller chooses to drop them or fail.

use clap::ValueEnum;
use faer::Mat;
use serde::Serialize;

use super::error::{PipelineError, PipelineResult, Warning, WarningScope};

/// What to do with zero-variance feature columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConstantFeaturePolicy {
    /// Exclude constant columns from the clustering matrix and warn
    #[default]
    Drop,
    /// Abort the run
    Fail,
}

impl std::fmt::Display for ConstantFeaturePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstantFeaturePolicy::Drop => write!(f, "drop"),
            ConstantFeaturePolicy::Fail => write!(f, "fail"),
        }
    }
}

/// Fitted per-column standardization.
#[derive(Debug, Clone, Serialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
    /// Indices of columns whose standard deviation is zero
    pub constant_columns: Vec<usize>,
}

impl StandardScaler {
    /// Fit mean and population standard deviation of every column.
    pub fn fit(x: &Mat<f64>) -> Self {
        let n = x.nrows();
        let mut means = Vec::with_capacity(x.ncols());
        let mut stds = Vec::with_capacity(x.ncols());
        let mut constant_columns = Vec::new();

        for j in 0..x.ncols() {
            // Constancy comes from the raw values, not from the computed std
            let is_constant = (1..n).all(|i| x[(i, j)] == x[(0, j)]);
            let (mean, std) = if n == 0 {
                (0.0, 0.0)
            } else if is_constant {
                (x[(0, j)], 0.0)
            } else {
                let mean = (0..n).map(|i| x[(i, j)]).sum::<f64>() / n as f64;
                let var = (0..n).map(|i| (x[(i, j)] - mean).powi(2)).sum::<f64>() / n as f64;
                (mean, var.sqrt())
            };
            if std == 0.0 {
                constant_columns.push(j);
            }
            means.push(mean);
            stds.push(std);
        }

        Self {
            means,
            stds,
            constant_columns,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !self.constant_columns.is_empty()
    }

    /// Indices of columns that can be standardized.
    pub fn informative_columns(&self) -> Vec<usize> {
        (0..self.means.len())
            .filter(|j| !self.constant_columns.contains(j))
            .collect()
    }

    /// Standardize the selected columns of `x`, in the given order.
    ///
    /// Constant columns must not be selected; they are mapped to 0.0 if they are.
    pub fn transform_columns(&self, x: &Mat<f64>, columns: &[usize]) -> Mat<f64> {
        let mut out = Mat::<f64>::zeros(x.nrows(), columns.len());
        for (out_j, &j) in columns.iter().enumerate() {
            let std = self.stds[j];
            if std == 0.0 {
                continue;
            }
            for i in 0..x.nrows() {
                out[(i, out_j)] = (x[(i, j)] - self.means[j]) / std;
            }
        }
        out
    }

    /// Map standardized rows back to the original feature space.
    ///
    /// `z` holds the `columns` subset; constant columns are restored to their mean.
    pub fn inverse_transform_columns(&self, z: &Mat<f64>, columns: &[usize]) -> Mat<f64> {
        let mut out = Mat::<f64>::zeros(z.nrows(), self.means.len());
        for i in 0..z.nrows() {
            for j in 0..self.means.len() {
                out[(i, j)] = self.means[j];
            }
            for (z_j, &j) in columns.iter().enumerate() {
                out[(i, j)] = z[(i, z_j)] * self.stds[j] + self.means[j];
            }
        }
        out
    }
}

/// Standardized matrix ready for clustering.
#[derive(Debug, Clone)]
pub struct ScaledFeatures {
    pub scaler: StandardScaler,
    pub matrix: Mat<f64>,
    /// Indices (into the unscaled matrix) of the columns kept in `matrix`
    pub kept_columns: Vec<usize>,
    pub kept_names: Vec<String>,
    pub warnings: Vec<Warning>,
}

/// Fit the scaler and standardize, applying the constant-column policy.
pub fn scale_features(
    x: &Mat<f64>,
    names: &[String],
    policy: ConstantFeaturePolicy,
) -> PipelineResult<ScaledFeatures> {
    let scaler = StandardScaler::fit(x);
    let mut warnings = Vec::new();

    if scaler.is_degenerate() {
        let constant_names: Vec<String> = scaler
            .constant_columns
            .iter()
            .map(|&j| names.get(j).cloned().unwrap_or_else(|| format!("#{}", j)))
            .collect();

        match policy {
            ConstantFeaturePolicy::Fail => {
                return Err(PipelineError::ConstantFeatures {
                    columns: constant_names,
                });
            }
            ConstantFeaturePolicy::Drop => {
                warnings.push(Warning::new(
                    WarningScope::Scaler,
                    format!(
                        "Dropped {} zero-variance feature(s) from clustering: {}",
                        constant_names.len(),
                        constant_names.join(", ")
                    ),
                ));
            }
        }
    }

    let kept_columns = scaler.informative_columns();
    if kept_columns.is_empty() {
        return Err(PipelineError::NoInformativeFeatures);
    }
    let kept_names = kept_columns
        .iter()
        .map(|&j| names.get(j).cloned().unwrap_or_else(|| format!("#{}", j)))
        .collect();
    let matrix = scaler.transform_columns(x, &kept_columns);

    Ok(ScaledFeatures {
        scaler,
        matrix,
        kept_columns,
        kept_names,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    fn sample() -> Mat<f64> {
        let mut x = Mat::<f64>::zeros(4, 3);
        let rows = [[1.0, 5.0, 0.0], [2.0, 5.0, 1.0], [3.0, 5.0, 0.0], [4.0, 5.0, 1.0]];
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                x[(i, j)] = v;
            }
        }
        x
    }

    #[test]
    fn test_standardized_columns_have_zero_mean_unit_variance() {
        let scaled = scale_features(&sample(), &names(3), ConstantFeaturePolicy::Drop).unwrap();
        let z = &scaled.matrix;
        for j in 0..z.ncols() {
            let mean: f64 = (0..z.nrows()).map(|i| z[(i, j)]).sum::<f64>() / z.nrows() as f64;
            let var: f64 =
                (0..z.nrows()).map(|i| (z[(i, j)] - mean).powi(2)).sum::<f64>() / z.nrows() as f64;
            assert!(mean.abs() < 1e-12, "column {} mean {}", j, mean);
            assert!((var - 1.0).abs() < 1e-12, "column {} variance {}", j, var);
        }
    }

    #[test]
    fn test_constant_column_is_flagged_not_nan() {
        let scaler = StandardScaler::fit(&sample());
        assert!(scaler.is_degenerate());
        assert_eq!(scaler.constant_columns, vec![1]);

        let scaled = scale_features(&sample(), &names(3), ConstantFeaturePolicy::Drop).unwrap();
        assert_eq!(scaled.kept_columns, vec![0, 2]);
        assert_eq!(scaled.warnings.len(), 1);
        assert!(scaled.warnings[0].message.contains("f1"));
        for i in 0..scaled.matrix.nrows() {
            for j in 0..scaled.matrix.ncols() {
                assert!(scaled.matrix[(i, j)].is_finite());
            }
        }
    }

    #[test]
    fn test_constant_column_fails_under_fail_policy() {
        let err = scale_features(&sample(), &names(3), ConstantFeaturePolicy::Fail).unwrap_err();
        match err {
            PipelineError::ConstantFeatures { columns } => assert_eq!(columns, vec!["f1"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inverse_transform_restores_original_values() {
        let x = sample();
        let scaled = scale_features(&x, &names(3), ConstantFeaturePolicy::Drop).unwrap();
        let restored = scaled
            .scaler
            .inverse_transform_columns(&scaled.matrix, &scaled.kept_columns);
        for i in 0..x.nrows() {
            for j in 0..x.ncols() {
                assert!((restored[(i, j)] - x[(i, j)]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            ConstantFeaturePolicy::from_str("DROP", true),
            Ok(ConstantFeaturePolicy::Drop)
        );
        assert_eq!(
            ConstantFeaturePolicy::from_str("fail", false),
            Ok(ConstantFeaturePolicy::Fail)
        );
        assert!(ConstantFeaturePolicy::from_str("ignore", true).is_err());
        for policy in ConstantFeaturePolicy::value_variants() {
            let name = policy.to_possible_value().unwrap();
            assert_eq!(name.get_name(), policy.to_string());
        }
    }
}
