//! Export of run results as CSV tables and a JSON run report
//!
//! Every file of a run is prefixed with the algorithm key (`gmm_`, `kmeans_`)
//! so both variants can share one output directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use polars::prelude::*;
use serde::Serialize;

use crate::pipeline::{
    matrix_rows, ClassificationReport, ConfusionMatrix, FittedModel, LabelMapping, MetricsTable,
    OutputSchema, PipelineConfig, RankingTable, TierLabel, TieringRun, Warning,
    CLUSTER_COLUMN, CLUSTER_LABEL_COLUMN,
};

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub doctier_version: String,
    pub input_file: String,
    pub algorithm: String,
    pub records: usize,
}

/// Partition summary for the JSON report
#[derive(Debug, Clone, Serialize)]
pub struct PartitionSummary {
    pub iterations: usize,
    pub cluster_sizes: Vec<usize>,
    pub mapping: LabelMapping,
    pub model: FittedModel,
    /// Representative points in the original feature space
    pub centers: Vec<Vec<f64>>,
    pub feature_names: Vec<String>,
    pub projection_explained_variance: Vec<f64>,
}

/// Complete JSON run report
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub metadata: ReportMetadata,
    pub config: PipelineConfig,
    pub partition: PartitionSummary,
    pub metrics: MetricsTable,
    pub confusion_matrix: ConfusionMatrix,
    pub classification_report: ClassificationReport,
    pub rankings: Vec<RankingTable>,
    pub warnings: Vec<Warning>,
    pub schema: OutputSchema,
}

impl RunReport {
    pub fn new(run: &TieringRun, config: &PipelineConfig, input: &Path) -> Self {
        Self {
            metadata: ReportMetadata {
                timestamp: Utc::now().to_rfc3339(),
                doctier_version: env!("CARGO_PKG_VERSION").to_string(),
                input_file: input.display().to_string(),
                algorithm: run.algorithm.key().to_string(),
                records: run.labeled.height(),
            },
            config: config.clone(),
            partition: PartitionSummary {
                iterations: run.partition.iterations,
                cluster_sizes: run.partition.cluster_sizes(),
                mapping: run.mapping.clone(),
                model: run.partition.model.clone(),
                centers: matrix_rows(&run.centers),
                feature_names: run.feature_names.clone(),
                projection_explained_variance: run.projection.explained_variance.clone(),
            },
            metrics: run.evaluation.metrics.clone(),
            confusion_matrix: run.evaluation.confusion,
            classification_report: run.evaluation.report.clone(),
            rankings: run.rankings.clone(),
            warnings: run.warnings.clone(),
            schema: OutputSchema::labeled_records(),
        }
    }
}

/// Metric / Value table; undefined metrics are null.
pub fn metrics_frame(metrics: &MetricsTable) -> PolarsResult<DataFrame> {
    let rows = metrics.rows();
    df! {
        "Metric" => rows.iter().map(|r| r.name.clone()).collect::<Vec<_>>(),
        "Value" => rows.iter().map(|r| r.value).collect::<Vec<_>>(),
    }
}

/// Confusion matrix with `Actual_*` rows and `Pred_*` columns.
pub fn confusion_frame(confusion: &ConfusionMatrix) -> PolarsResult<DataFrame> {
    let mut columns = vec![Column::new(
        "Label".into(),
        TierLabel::ALL
            .iter()
            .map(|l| format!("Actual_{}", l))
            .collect::<Vec<_>>(),
    )];
    for predicted in TierLabel::ALL {
        columns.push(Column::new(
            format!("Pred_{}", predicted).into(),
            TierLabel::ALL
                .iter()
                .map(|&actual| confusion.get(actual, predicted) as u64)
                .collect::<Vec<_>>(),
        ));
    }
    DataFrame::new(columns)
}

/// Per-class rows, then accuracy, macro avg and weighted avg.
pub fn classification_frame(report: &ClassificationReport) -> PolarsResult<DataFrame> {
    let mut names = Vec::new();
    let mut precision = Vec::new();
    let mut recall = Vec::new();
    let mut f1 = Vec::new();
    let mut support = Vec::new();

    for (label, m) in &report.classes {
        names.push(label.to_string());
        precision.push(Some(m.precision));
        recall.push(Some(m.recall));
        f1.push(Some(m.f1_score));
        support.push(m.support as u64);
    }
    names.push("accuracy".to_string());
    precision.push(None);
    recall.push(None);
    f1.push(Some(report.accuracy));
    support.push(report.macro_avg.support as u64);
    for (name, m) in [
        ("macro avg", &report.macro_avg),
        ("weighted avg", &report.weighted_avg),
    ] {
        names.push(name.to_string());
        precision.push(Some(m.precision));
        recall.push(Some(m.recall));
        f1.push(Some(m.f1_score));
        support.push(m.support as u64);
    }

    df! {
        "Class" => names,
        "Precision" => precision,
        "Recall" => recall,
        "F1-Score" => f1,
        "Support" => support,
    }
}

/// One row per cluster in the original feature space.
pub fn centers_frame(run: &TieringRun) -> PolarsResult<DataFrame> {
    let k = run.centers.nrows();
    let mut columns = vec![
        Column::new(CLUSTER_COLUMN.into(), (0..k as u32).collect::<Vec<_>>()),
        Column::new(
            CLUSTER_LABEL_COLUMN.into(),
            run.mapping.labels.iter().map(|l| l.as_str()).collect::<Vec<_>>(),
        ),
    ];
    for (j, name) in run.feature_names.iter().enumerate() {
        columns.push(Column::new(
            name.as_str().into(),
            (0..k).map(|c| run.centers[(c, j)]).collect::<Vec<_>>(),
        ));
    }
    DataFrame::new(columns)
}

/// Two-component coordinates per record, with cluster id and label.
pub fn projection_frame(run: &TieringRun) -> PolarsResult<DataFrame> {
    let points = &run.projection.points;
    df! {
        "PC1" => points.iter().map(|p| p[0]).collect::<Vec<_>>(),
        "PC2" => points.iter().map(|p| p[1]).collect::<Vec<_>>(),
        CLUSTER_COLUMN => run.partition.assignments.iter().map(|&c| c as u32).collect::<Vec<_>>(),
        CLUSTER_LABEL_COLUMN => run.predicted.iter().map(|l| l.as_str()).collect::<Vec<_>>(),
    }
}

/// Write a DataFrame as CSV.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    CsvWriter::new(&mut file)
        .finish(df)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
    Ok(())
}

/// Serialize the run report as pretty-printed JSON.
pub fn export_run_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(report).context("Failed to serialize run report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write run report to {}", output_path.display()))?;

    Ok(())
}

/// Write every table of a run under `dir` and return the written paths.
pub fn export_run(
    run: &TieringRun,
    config: &PipelineConfig,
    input: &Path,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let key = run.algorithm.key();
    let path = |suffix: &str| dir.join(format!("{}_{}", key, suffix));
    let mut written = Vec::new();

    let mut tables: Vec<(PathBuf, DataFrame)> = vec![
        (path("output.csv"), run.labeled.clone()),
        (path("metrics.csv"), metrics_frame(&run.evaluation.metrics)?),
        (
            path("confusion_matrix.csv"),
            confusion_frame(&run.evaluation.confusion)?,
        ),
        (
            path("classification_report.csv"),
            classification_frame(&run.evaluation.report)?,
        ),
    ];
    for ranking in &run.rankings {
        tables.push((
            path(&format!("best_{}_report.csv", ranking.dimension.key())),
            ranking.to_dataframe()?,
        ));
    }
    tables.push((path("centers.csv"), centers_frame(run)?));
    tables.push((path("projection.csv"), projection_frame(run)?));

    for (file, mut df) in tables {
        write_csv(&mut df, &file)?;
        written.push(file);
    }

    let report_path = path("report.json");
    export_run_report(&RunReport::new(run, config, input), &report_path)?;
    written.push(report_path);

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::labels::TierLabel::*;

    #[test]
    fn test_confusion_frame_layout() {
        let cm = ConfusionMatrix::from_labels(&[Low, Medium, High, High], &[Low, Low, High, High]);
        let df = confusion_frame(&cm).unwrap();

        assert_eq!(df.shape(), (3, 4));
        assert_eq!(
            df.get_column_names(),
            &["Label", "Pred_Low", "Pred_Medium", "Pred_High"]
        );
        let pred_low = df.column("Pred_Low").unwrap().u64().unwrap();
        assert_eq!(pred_low.get(0), Some(1));
        assert_eq!(pred_low.get(1), Some(1));
        assert_eq!(df.column("Pred_High").unwrap().u64().unwrap().get(2), Some(2));
    }

    #[test]
    fn test_metrics_frame_keeps_undefined_as_null() {
        let metrics = MetricsTable {
            accuracy: 0.5,
            silhouette: None,
            calinski_harabasz: Some(3.0),
            davies_bouldin: Some(0.4),
        };
        let df = metrics_frame(&metrics).unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(df.column("Value").unwrap().null_count(), 1);
    }
}
