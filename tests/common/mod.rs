//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

use doctier::pipeline::{
    PipelineConfig, GENDER_COLUMN, LOCATION_COLUMN, MONTH_COLUMN, STATUS_COLUMN, UNIT_COLUMN,
    YEAR_COLUMN,
};

/// Completeness bands of the nine-record scenario, as present-document counts out of 20:
/// 10/15/20%, 45/50/55% and 85/90/95%.
pub const BANDED_COUNTS: [usize; 9] = [2, 3, 4, 9, 10, 11, 17, 18, 19];

/// Document column names `DOC 1` .. `DOC n`.
pub fn document_names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("DOC {}", i)).collect()
}

/// Build a cleaned table where record `i` holds the first `counts[i]` of `n_docs` documents.
///
/// Categorical columns are filled from the given per-record values.
pub fn create_checklist_dataframe(
    counts: &[usize],
    n_docs: usize,
    units: &[&str],
    locations: &[&str],
) -> DataFrame {
    let n = counts.len();
    let mut columns: Vec<Column> = document_names(n_docs)
        .iter()
        .enumerate()
        .map(|(j, name)| {
            Column::new(
                name.as_str().into(),
                counts.iter().map(|&c| (j < c) as i64).collect::<Vec<_>>(),
            )
        })
        .collect();

    let cycle = |values: &[&str]| -> Vec<String> {
        (0..n).map(|i| values[i % values.len()].to_string()).collect()
    };
    columns.push(Column::new(UNIT_COLUMN.into(), cycle(units)));
    columns.push(Column::new(LOCATION_COLUMN.into(), cycle(locations)));
    columns.push(Column::new(STATUS_COLUMN.into(), cycle(&["PNS", "CPNS", "PPPK"])));
    columns.push(Column::new(GENDER_COLUMN.into(), cycle(&["L", "P"])));
    columns.push(Column::new(MONTH_COLUMN.into(), vec!["JANUARI"; n]));
    columns.push(Column::new(YEAR_COLUMN.into(), vec![2024i64; n]));

    DataFrame::new(columns).unwrap()
}

/// The nine-record, three-band scenario over 20 documents.
pub fn create_banded_dataframe() -> DataFrame {
    create_checklist_dataframe(
        &BANDED_COUNTS,
        20,
        &["BIRO UMUM", "BIRO KEUANGAN", "INSPEKTORAT"],
        &["PUSAT", "DAERAH"],
    )
}

/// Pipeline config reading the `DOC n` columns.
pub fn config_for(n_docs: usize) -> PipelineConfig {
    PipelineConfig {
        documents: document_names(n_docs),
        ..Default::default()
    }
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Read a string column into owned values
pub fn string_values(df: &DataFrame, column: &str) -> Vec<String> {
    df.column(column)
        .unwrap()
        .str()
        .unwrap()
        .into_no_null_iter()
        .map(|s| s.to_string())
        .collect()
}
