//! Command-line argument definitions using clap

use clap::Parser;
use std::path::{Path, PathBuf};

use crate::pipeline::{
    ClusterAlgorithm, ClusterConfig, ConstantFeaturePolicy, PipelineConfig,
    DEFAULT_DOCUMENT_COLUMNS, N_TIERS,
};

/// Which clustering variants to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmChoice {
    Gmm,
    Kmeans,
    Both,
}

impl AlgorithmChoice {
    /// Algorithms to run, in execution order.
    pub fn algorithms(&self) -> Vec<ClusterAlgorithm> {
        match self {
            AlgorithmChoice::Gmm => vec![ClusterAlgorithm::Mixture],
            AlgorithmChoice::Kmeans => vec![ClusterAlgorithm::Centroid],
            AlgorithmChoice::Both => ClusterAlgorithm::ALL.to_vec(),
        }
    }
}

impl std::fmt::Display for AlgorithmChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlgorithmChoice::Gmm => write!(f, "gmm"),
            AlgorithmChoice::Kmeans => write!(f, "kmeans"),
            AlgorithmChoice::Both => write!(f, "both"),
        }
    }
}

impl std::str::FromStr for AlgorithmChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "both" | "all" => Ok(AlgorithmChoice::Both),
            other => match other.parse::<ClusterAlgorithm>()? {
                ClusterAlgorithm::Mixture => Ok(AlgorithmChoice::Gmm),
                ClusterAlgorithm::Centroid => Ok(AlgorithmChoice::Kmeans),
            },
        }
    }
}

/// doctier - Tier employee document completeness with GMM and K-Means clustering
#[derive(Parser, Debug)]
#[command(name = "doctier")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file path (cleaned CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for the exported tables and run reports.
    /// Defaults to the input directory with a '_tiers' suffix (e.g., data.csv → data_tiers/).
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Clustering algorithm: "gmm", "kmeans" or "both"
    #[arg(short, long, default_value = "both", value_parser = parse_algorithm)]
    pub algorithm: AlgorithmChoice,

    /// Seed shared by both clustering algorithms
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Maximum iterations per fit.
    /// Defaults to 100 for GMM and 300 for K-Means.
    #[arg(long, value_parser = validate_max_iter)]
    pub max_iter: Option<usize>,

    /// Convergence tolerance.
    /// Defaults to 1e-3 for GMM (log-likelihood change) and 1e-4 for K-Means (relative center shift).
    #[arg(long, value_parser = validate_tol)]
    pub tol: Option<f64>,

    /// Number of K-Means restarts; the lowest-inertia run is kept
    #[arg(long, default_value = "10", value_parser = validate_n_init)]
    pub n_init: usize,

    /// Presence-indicator columns (comma-separated).
    /// Defaults to the standard 11-document checklist.
    #[arg(long, value_delimiter = ',')]
    pub documents: Vec<String>,

    /// What to do with zero-variance features
    #[arg(long, value_enum, ignore_case = true, default_value_t = ConstantFeaturePolicy::Drop)]
    pub constant_features: ConstantFeaturePolicy,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,

    /// Skip the confirmation prompt before overwriting an existing output directory
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Print the summary only, without writing output files
    #[arg(long, default_value = "false")]
    pub no_export: bool,
}

impl Cli {
    /// Get the output directory, deriving it from the input if not provided.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| derive_output_dir(&self.input))
    }

    /// Presence-indicator columns, falling back to the default checklist.
    pub fn documents(&self) -> Vec<String> {
        let given: Vec<String> = self
            .documents
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        if given.is_empty() {
            DEFAULT_DOCUMENT_COLUMNS.iter().map(|s| s.to_string()).collect()
        } else {
            given
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            documents: self.documents(),
            constant_policy: self.constant_features,
            cluster: ClusterConfig {
                n_clusters: N_TIERS,
                seed: self.seed,
                max_iter: self.max_iter,
                tol: self.tol,
                n_init: self.n_init,
                ..Default::default()
            },
        }
    }
}

/// `<input dir>/<stem>_tiers`
pub fn derive_output_dir(input: &Path) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    parent.join(format!("{}_tiers", stem))
}

fn parse_algorithm(s: &str) -> Result<AlgorithmChoice, String> {
    s.parse()
}

/// Validator for tol parameter
fn validate_tol(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("tol must be a positive number, got {}", value))
    }
}

/// Validator for max_iter parameter
fn validate_max_iter(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid integer", s))?;

    if value == 0 {
        Err("max_iter must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

/// Validator for n_init parameter
fn validate_n_init(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid integer", s))?;

    if value == 0 {
        Err("n_init must be at least 1".to_string())
    } else {
        Ok(value)
    }
}
