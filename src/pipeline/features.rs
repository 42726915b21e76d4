//! Completeness scoring and feature construction
//!
//! Derives the completeness percentage and weighted completeness from the
//! presence indicator columns and assembles the clustering feature matrix:
//! the indicators followed by the weighted completeness.

use faer::Mat;
use polars::prelude::*;

use super::error::{PipelineError, PipelineResult};
use super::schema::{
    CATEGORICAL_COLUMNS, COMPLETENESS_COLUMN, WEIGHTED_COMPLETENESS_COLUMN, WEIGHT_FACTOR,
};

/// Input table augmented with completeness columns, plus the raw feature matrix.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    /// Original columns plus `Completeness_Percentage` and `Weighted_Completeness`
    pub df: DataFrame,
    /// Completeness percentage per record, in row order
    pub completeness: Vec<f64>,
    /// Unscaled feature matrix (records x (documents + 1))
    pub features: Mat<f64>,
    /// Column names of `features`, in order
    pub feature_names: Vec<String>,
}

impl FeatureTable {
    pub fn n_records(&self) -> usize {
        self.completeness.len()
    }
}

/// Completeness percentage for a record with `present` of `total` documents.
///
/// Multiplies before dividing so that every exactly representable percentage
/// (40.0, 80.0, ...) comes out exact.
#[inline]
pub fn completeness_percentage(present: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    present as f64 * 100.0 / total as f64
}

/// Weighted completeness used as the extra clustering feature.
#[inline]
pub fn weighted_completeness(completeness: f64) -> f64 {
    completeness * WEIGHT_FACTOR
}

/// Verify the table carries every document column and every categorical column.
pub fn validate_required_columns(df: &DataFrame, documents: &[String]) -> PipelineResult<()> {
    let present: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();

    let missing: Vec<String> = documents
        .iter()
        .map(|s| s.as_str())
        .chain(CATEGORICAL_COLUMNS.iter().copied())
        .filter(|name| !present.contains(name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingColumns { columns: missing })
    }
}

/// Read one presence column as 0/1 flags, rejecting anything else.
fn read_indicator_column(df: &DataFrame, name: &str) -> PipelineResult<Vec<bool>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::MissingColumns {
            columns: vec![name.to_string()],
        })?;

    let dtype = column.dtype();
    if !(dtype.is_primitive_numeric() || dtype == &DataType::Boolean) {
        return Err(PipelineError::NonNumericIndicator {
            column: name.to_string(),
            dtype: dtype.to_string(),
        });
    }

    let float_col = column.cast(&DataType::Float64)?;
    let ca = float_col.f64()?;

    ca.iter()
        .enumerate()
        .map(|(row, value)| match value {
            None => Err(PipelineError::MissingIndicatorValue {
                column: name.to_string(),
                row,
            }),
            Some(v) if v == 1.0 => Ok(true),
            Some(v) if v == 0.0 => Ok(false),
            Some(v) => Err(PipelineError::InvalidIndicatorValue {
                column: name.to_string(),
                row,
                value: v,
            }),
        })
        .collect()
}

/// Build completeness columns and the feature matrix.
///
/// # Errors
/// - `EmptyDataset` when the table has no rows
/// - `MissingColumns` when a document or categorical column is absent
/// - `NonNumericIndicator` / `MissingIndicatorValue` / `InvalidIndicatorValue`
///   when a presence column is not clean 0/1
pub fn build_features(df: &DataFrame, documents: &[String]) -> PipelineResult<FeatureTable> {
    if df.height() == 0 {
        return Err(PipelineError::EmptyDataset);
    }
    validate_required_columns(df, documents)?;

    let indicators: Vec<Vec<bool>> = documents
        .iter()
        .map(|name| read_indicator_column(df, name))
        .collect::<PipelineResult<_>>()?;

    let n_rows = df.height();
    let n_docs = documents.len();

    let completeness: Vec<f64> = (0..n_rows)
        .map(|row| {
            let present = indicators.iter().filter(|col| col[row]).count();
            completeness_percentage(present, n_docs)
        })
        .collect();
    let weighted: Vec<f64> = completeness.iter().map(|&c| weighted_completeness(c)).collect();

    let mut features = Mat::<f64>::zeros(n_rows, n_docs + 1);
    for (col_idx, col) in indicators.iter().enumerate() {
        for (row_idx, &flag) in col.iter().enumerate() {
            features[(row_idx, col_idx)] = if flag { 1.0 } else { 0.0 };
        }
    }
    for (row_idx, &w) in weighted.iter().enumerate() {
        features[(row_idx, n_docs)] = w;
    }

    let mut feature_names = documents.to_vec();
    feature_names.push(WEIGHTED_COMPLETENESS_COLUMN.to_string());

    let mut out = df.clone();
    out.with_column(Column::new(COMPLETENESS_COLUMN.into(), completeness.clone()))?;
    out.with_column(Column::new(WEIGHTED_COMPLETENESS_COLUMN.into(), weighted))?;

    Ok(FeatureTable {
        df: out,
        completeness,
        features,
        feature_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn base_df() -> DataFrame {
        df! {
            "A" => [1i64, 0, 1, 0],
            "B" => [1i64, 0, 0, 0],
            "UNIT KERJA" => ["X", "X", "Y", "Y"],
            "LOKASI" => ["L1", "L1", "L2", "L2"],
            "STATUS" => ["PNS", "PNS", "CPNS", "PNS"],
            "JENIS KELAMIN" => ["P", "L", "P", "L"],
            "BULAN" => ["JAN", "JAN", "JAN", "JAN"],
            "TAHUN" => [2024i64, 2024, 2024, 2024],
        }
        .unwrap()
    }

    #[test]
    fn test_completeness_percentage_exact_boundaries() {
        assert_eq!(completeness_percentage(8, 20), 40.0);
        assert_eq!(completeness_percentage(16, 20), 80.0);
        assert_eq!(completeness_percentage(11, 20), 55.0);
        assert_eq!(completeness_percentage(0, 11), 0.0);
        assert_eq!(completeness_percentage(11, 11), 100.0);
    }

    #[test]
    fn test_build_features_adds_columns() {
        let table = build_features(&base_df(), &docs(&["A", "B"])).unwrap();

        assert_eq!(table.completeness, vec![100.0, 0.0, 50.0, 0.0]);
        assert!(table.df.column(COMPLETENESS_COLUMN).is_ok());
        let weighted = table.df.column(WEIGHTED_COMPLETENESS_COLUMN).unwrap();
        assert_eq!(weighted.f64().unwrap().get(2), Some(250.0));

        assert_eq!(table.features.nrows(), 4);
        assert_eq!(table.features.ncols(), 3);
        assert_eq!(table.features[(0, 2)], 500.0);
        assert_eq!(table.feature_names, docs(&["A", "B", WEIGHTED_COMPLETENESS_COLUMN]));
    }

    #[test]
    fn test_missing_columns_reported_by_name() {
        let df = base_df().drop("LOKASI").unwrap();
        let err = build_features(&df, &docs(&["A", "B", "C"])).unwrap_err();
        match err {
            PipelineError::MissingColumns { columns } => {
                assert_eq!(columns, docs(&["C", "LOKASI"]));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_string_indicator_rejected() {
        let mut df = base_df();
        df.with_column(Column::new("A".into(), ["√", "", "√", ""])).unwrap();
        let err = build_features(&df, &docs(&["A", "B"])).unwrap_err();
        assert!(matches!(err, PipelineError::NonNumericIndicator { .. }));
    }

    #[test]
    fn test_null_indicator_rejected() {
        let mut df = base_df();
        df.with_column(Column::new("B".into(), [Some(1i64), None, Some(0), Some(0)]))
            .unwrap();
        let err = build_features(&df, &docs(&["A", "B"])).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingIndicatorValue { row: 1, .. }
        ));
    }

    #[test]
    fn test_non_binary_indicator_rejected() {
        let mut df = base_df();
        df.with_column(Column::new("A".into(), [1i64, 2, 0, 0])).unwrap();
        let err = build_features(&df, &docs(&["A", "B"])).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidIndicatorValue { row: 1, .. }
        ));
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let df = base_df().head(Some(0));
        let err = build_features(&df, &docs(&["A", "B"])).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset));
    }
}
