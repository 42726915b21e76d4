//! Tests for dataset loading

use doctier::pipeline::{dataset_stats, load_dataset, run_pipeline, ClusterAlgorithm};
use polars::prelude::*;
use std::io::Write;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_load_csv_file() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "a,b,c").unwrap();
    writeln!(file, "1,2,3").unwrap();
    writeln!(file, "4,5,6").unwrap();
    drop(file);

    let df = load_dataset(&csv_path, 100).unwrap();
    let stats = dataset_stats(&df);

    assert_eq!(stats.rows, 2, "Should have 2 data rows");
    assert_eq!(stats.columns, 3, "Should have 3 columns");
    assert_eq!(df.get_column_names(), &["a", "b", "c"]);
    assert!(stats.memory_mb >= 0.0, "Memory estimate should be non-negative");
}

#[test]
fn test_load_parquet_file() {
    let mut df = df! {
        "x" => [1i32, 2, 3],
        "y" => [4i32, 5, 6],
    }
    .unwrap();
    let (_dir, parquet_path) = create_temp_parquet(&mut df);

    let loaded = load_dataset(&parquet_path, 100).unwrap();

    assert_eq!(loaded.shape(), (3, 2));
    assert_eq!(loaded.get_column_names(), &["x", "y"]);
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.xlsx");
    std::fs::write(&path, "not a table").unwrap();

    let err = load_dataset(&path, 100).unwrap_err();
    assert!(err.to_string().contains("Unsupported file format"));
}

#[test]
fn test_missing_file_names_the_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.csv");

    let err = load_dataset(&path, 100).unwrap_err();
    assert!(format!("{:#}", err).contains("absent.csv"));
}

#[test]
fn test_csv_round_trip_feeds_pipeline() {
    let mut df = create_banded_dataframe();
    let (_dir, csv_path) = create_temp_csv(&mut df);

    let loaded = load_dataset(&csv_path, 0).unwrap();
    assert_eq!(loaded.height(), 9);

    let run = run_pipeline(&loaded, ClusterAlgorithm::Centroid, &config_for(20)).unwrap();
    assert_eq!(run.evaluation.metrics.accuracy, 1.0);
}

#[test]
fn test_parquet_input_matches_csv_input() {
    let mut df = create_banded_dataframe();
    let (_csv_dir, csv_path) = create_temp_csv(&mut df);
    let (_pq_dir, parquet_path) = create_temp_parquet(&mut df);

    let from_csv = run_pipeline(
        &load_dataset(&csv_path, 100).unwrap(),
        ClusterAlgorithm::Mixture,
        &config_for(20),
    )
    .unwrap();
    let from_parquet = run_pipeline(
        &load_dataset(&parquet_path, 100).unwrap(),
        ClusterAlgorithm::Mixture,
        &config_for(20),
    )
    .unwrap();

    assert_eq!(from_csv.predicted, from_parquet.predicted);
    assert_eq!(from_csv.completeness, from_parquet.completeness);
}
