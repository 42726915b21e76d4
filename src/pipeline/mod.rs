//! Pipeline module - orchestrates the tiering steps
//!
//! Feature building and scaling run once per input table; the clustering,
//! labeling, evaluation and aggregation steps run once per algorithm on the
//! same prepared features, so the two variants can be compared directly.

pub mod aggregation;
pub mod cluster;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod labels;
pub mod loader;
pub mod projection;
pub mod scaler;
pub mod schema;

use faer::Mat;
use polars::prelude::{Column, DataFrame};
use serde::Serialize;

pub use aggregation::*;
pub use cluster::{
    matrix_rows, ClusterAlgorithm, ClusterConfig, ClusterEngine, FittedModel, GaussianMixture,
    KMeans, Partition, DEFAULT_SEED, N_TIERS,
};
pub use error::*;
pub use evaluation::*;
pub use features::*;
pub use labels::*;
pub use loader::*;
pub use projection::*;
pub use scaler::*;
pub use schema::*;

/// Settings shared by every algorithm run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    /// Presence-indicator columns, in feature order
    pub documents: Vec<String>,
    pub constant_policy: ConstantFeaturePolicy,
    pub cluster: ClusterConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            documents: DEFAULT_DOCUMENT_COLUMNS.iter().map(|s| s.to_string()).collect(),
            constant_policy: ConstantFeaturePolicy::default(),
            cluster: ClusterConfig::default(),
        }
    }
}

/// Features and reference tiers computed once per input table.
#[derive(Debug, Clone)]
pub struct PreparedFeatures {
    pub table: FeatureTable,
    pub scaled: ScaledFeatures,
    /// Rule-based tier per record
    pub actual: Vec<TierLabel>,
}

impl PreparedFeatures {
    pub fn n_records(&self) -> usize {
        self.table.n_records()
    }
}

/// Build, validate and standardize the features of a cleaned table.
pub fn prepare_features(df: &DataFrame, config: &PipelineConfig) -> PipelineResult<PreparedFeatures> {
    let table = build_features(df, &config.documents)?;
    let scaled = scale_features(&table.features, &table.feature_names, config.constant_policy)?;
    let actual = table
        .completeness
        .iter()
        .map(|&pct| classify_completeness(pct))
        .collect();

    Ok(PreparedFeatures {
        table,
        scaled,
        actual,
    })
}

/// Everything one algorithm run produces.
#[derive(Debug, Clone)]
pub struct TieringRun {
    pub algorithm: ClusterAlgorithm,
    /// Input columns plus completeness, cluster id, cluster label and reference label
    pub labeled: DataFrame,
    pub partition: Partition,
    pub mapping: LabelMapping,
    pub completeness: Vec<f64>,
    pub predicted: Vec<TierLabel>,
    pub actual: Vec<TierLabel>,
    /// Representative points in the original feature space (k x all features)
    pub centers: Mat<f64>,
    /// Column names of `centers`
    pub feature_names: Vec<String>,
    pub evaluation: Evaluation,
    /// Unit, location, status and gender tables, in that order
    pub rankings: Vec<RankingTable>,
    pub projection: Projection,
    /// Every warning raised along the way, in step order
    pub warnings: Vec<Warning>,
}

impl TieringRun {
    pub fn ranking(&self, dimension: Dimension) -> Option<&RankingTable> {
        self.rankings.iter().find(|t| t.dimension == dimension)
    }

    /// Median completeness per tier; `None` when no record received the tier.
    pub fn tier_medians(&self) -> Vec<(TierLabel, Option<f64>)> {
        TierLabel::ALL
            .iter()
            .map(|&tier| {
                let values: Vec<f64> = self
                    .predicted
                    .iter()
                    .zip(&self.completeness)
                    .filter(|(p, _)| **p == tier)
                    .map(|(_, &c)| c)
                    .collect();
                (tier, median(&values))
            })
            .collect()
    }
}

/// Cluster the prepared features with one algorithm and derive every output.
pub fn run_algorithm(
    prepared: &PreparedFeatures,
    algorithm: ClusterAlgorithm,
    cluster_config: &ClusterConfig,
) -> PipelineResult<TieringRun> {
    let x = &prepared.scaled.matrix;
    let engine = algorithm.engine(cluster_config);
    let partition = engine.fit(x)?;
    let n_clusters = partition.n_clusters();

    let mut warnings = prepared.scaled.warnings.clone();
    let populated = partition.cluster_sizes().iter().filter(|&&s| s > 0).count();
    if populated < n_clusters {
        warnings.push(Warning::new(
            WarningScope::Clustering,
            format!(
                "{} produced {} non-empty cluster(s) out of {}",
                algorithm.title(),
                populated,
                n_clusters
            ),
        ));
    }

    let mapping = map_cluster_labels(
        &partition.assignments,
        &prepared.table.completeness,
        n_clusters,
    );
    warnings.extend(mapping.warnings.iter().cloned());
    let predicted = mapping.apply(&partition.assignments);

    let evaluation = evaluate(
        &predicted,
        &prepared.actual,
        x,
        &partition.assignments,
        n_clusters,
    );
    warnings.extend(evaluation.warnings.iter().cloned());

    let labeled = label_records(
        &prepared.table.df,
        &partition.assignments,
        &predicted,
        &prepared.actual,
    )?;

    let rankings = aggregate_all(&labeled, &predicted)?;
    for table in &rankings {
        warnings.extend(table.warnings.iter().cloned());
    }

    let centers = prepared
        .scaled
        .scaler
        .inverse_transform_columns(&partition.centers, &prepared.scaled.kept_columns);
    let projection = project_2d(x, &partition.centers);

    Ok(TieringRun {
        algorithm,
        labeled,
        partition,
        mapping,
        completeness: prepared.table.completeness.clone(),
        predicted,
        actual: prepared.actual.clone(),
        centers,
        feature_names: prepared.table.feature_names.clone(),
        evaluation,
        rankings,
        projection,
        warnings,
    })
}

/// Prepare features and run a single algorithm.
pub fn run_pipeline(
    df: &DataFrame,
    algorithm: ClusterAlgorithm,
    config: &PipelineConfig,
) -> PipelineResult<TieringRun> {
    let prepared = prepare_features(df, config)?;
    run_algorithm(&prepared, algorithm, &config.cluster)
}

/// Append the cluster id, cluster label and rule-based label columns.
pub fn label_records(
    df: &DataFrame,
    assignments: &[usize],
    predicted: &[TierLabel],
    actual: &[TierLabel],
) -> PipelineResult<DataFrame> {
    let mut out = df.clone();
    out.with_column(Column::new(
        CLUSTER_COLUMN.into(),
        assignments.iter().map(|&c| c as u32).collect::<Vec<_>>(),
    ))?;
    out.with_column(Column::new(
        CLUSTER_LABEL_COLUMN.into(),
        predicted.iter().map(|l| l.as_str()).collect::<Vec<_>>(),
    ))?;
    out.with_column(Column::new(
        ACTUAL_LABEL_COLUMN.into(),
        actual.iter().map(|l| l.as_str()).collect::<Vec<_>>(),
    ))?;
    Ok(out)
}

/// Side-by-side view of two runs over the same records.
#[derive(Debug, Clone, Serialize)]
pub struct RunComparison {
    pub left: ClusterAlgorithm,
    pub right: ClusterAlgorithm,
    /// Fraction of records given the same tier by both runs
    pub label_agreement: f64,
    pub left_metrics: MetricsTable,
    pub right_metrics: MetricsTable,
}

pub fn compare_runs(left: &TieringRun, right: &TieringRun) -> RunComparison {
    RunComparison {
        left: left.algorithm,
        right: right.algorithm,
        label_agreement: agreement_accuracy(&left.predicted, &right.predicted),
        left_metrics: left.evaluation.metrics.clone(),
        right_metrics: right.evaluation.metrics.clone(),
    }
}
