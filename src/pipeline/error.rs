//! Error and warning types for the tiering pipeline.
//!
//! Input errors and clustering failures are fatal and surface as
//! [`PipelineError`]. Degenerate-data conditions (constant features, absent
//! classes, empty groups) are not errors: they are collected as [`Warning`]
//! values attached to the table or metric they affect.

use polars::prelude::PolarsError;
use serde::Serialize;
use thiserror::Error;

/// Fatal errors raised by the tiering pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// One or more required columns are absent from the input table.
    #[error("Missing required column(s): {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    /// The input table has no rows.
    #[error("Dataset is empty - no records to score")]
    EmptyDataset,

    /// A presence indicator column is not numeric.
    #[error("Presence column '{column}' must be numeric 0/1, found dtype {dtype}")]
    NonNumericIndicator { column: String, dtype: String },

    /// A presence indicator cell is null.
    #[error("Presence column '{column}' has a missing value at row {row}")]
    MissingIndicatorValue { column: String, row: usize },

    /// A presence indicator cell is numeric but not 0 or 1.
    #[error("Presence column '{column}' has value {value} at row {row}; expected 0 or 1")]
    InvalidIndicatorValue {
        column: String,
        row: usize,
        value: f64,
    },

    /// Fewer records than clusters.
    #[error("Need at least {clusters} records to form {clusters} clusters, got {records}")]
    TooFewRecords { records: usize, clusters: usize },

    /// Zero-variance feature columns, raised only under the `fail` policy.
    #[error("Constant feature column(s) cannot be standardized: {}", .columns.join(", "))]
    ConstantFeatures { columns: Vec<String> },

    /// Every feature column was constant, so nothing is left to cluster.
    #[error("No feature columns with non-zero variance remain for clustering")]
    NoInformativeFeatures,

    /// The clustering algorithm exhausted its iteration budget.
    #[error("{algorithm} did not converge within {iterations} iterations (last change {change:.3e})")]
    NonConvergence {
        algorithm: String,
        iterations: usize,
        change: f64,
    },

    /// The tied covariance could not be factorized even after regularization.
    #[error("Tied covariance matrix is not positive definite")]
    SingularCovariance,

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Result alias for pipeline operations.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Part of the run output a warning is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum WarningScope {
    Scaler,
    Clustering,
    Labels,
    Metric(String),
    ClassificationReport,
    Ranking(String),
}

impl std::fmt::Display for WarningScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningScope::Scaler => write!(f, "scaler"),
            WarningScope::Clustering => write!(f, "clustering"),
            WarningScope::Labels => write!(f, "labels"),
            WarningScope::Metric(name) => write!(f, "metric '{}'", name),
            WarningScope::ClassificationReport => write!(f, "classification report"),
            WarningScope::Ranking(name) => write!(f, "ranking by {}", name),
        }
    }
}

/// A degenerate-data condition that did not stop the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub scope: WarningScope,
    pub message: String,
}

impl Warning {
    pub fn new(scope: WarningScope, message: impl Into<String>) -> Self {
        Self {
            scope,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.scope, self.message)
    }
}
