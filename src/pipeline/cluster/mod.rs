//! Pluggable clustering engines
//!
//! Both engines take the standardized feature matrix and produce a hard
//! partition plus one representative point per cluster. The pipeline is
//! parameterized over [`ClusterAlgorithm`] so both variants run on identical
//! inputs through the same downstream steps.

mod gmm;
mod kmeans;

use faer::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::error::PipelineResult;

pub use gmm::GaussianMixture;
pub use kmeans::KMeans;

/// Number of completeness tiers, and therefore clusters.
pub const N_TIERS: usize = 3;

/// Default seed, shared by both engines.
pub const DEFAULT_SEED: u64 = 42;

/// Which clustering capability produces the partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterAlgorithm {
    /// Gaussian mixture with one covariance shared by all components
    Mixture,
    /// Centroid-based partitioning (Lloyd's iteration)
    Centroid,
}

impl ClusterAlgorithm {
    pub const ALL: [ClusterAlgorithm; 2] = [ClusterAlgorithm::Mixture, ClusterAlgorithm::Centroid];

    /// Short name used for file prefixes and CLI values.
    pub fn key(&self) -> &'static str {
        match self {
            ClusterAlgorithm::Mixture => "gmm",
            ClusterAlgorithm::Centroid => "kmeans",
        }
    }

    /// Human-readable name.
    pub fn title(&self) -> &'static str {
        match self {
            ClusterAlgorithm::Mixture => "GMM",
            ClusterAlgorithm::Centroid => "K-Means",
        }
    }

    /// Build the engine for this algorithm.
    pub fn engine(&self, config: &ClusterConfig) -> Box<dyn ClusterEngine> {
        match self {
            ClusterAlgorithm::Mixture => Box::new(GaussianMixture::from_config(config)),
            ClusterAlgorithm::Centroid => Box::new(KMeans::from_config(config)),
        }
    }
}

impl std::fmt::Display for ClusterAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl std::str::FromStr for ClusterAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gmm" | "mixture" => Ok(ClusterAlgorithm::Mixture),
            "kmeans" | "k-means" | "centroid" => Ok(ClusterAlgorithm::Centroid),
            _ => Err(format!(
                "Unknown clustering algorithm: '{}'. Use 'gmm' or 'kmeans'.",
                s
            )),
        }
    }
}

/// Engine parameters. `None` iteration settings fall back to each engine's default.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterConfig {
    pub n_clusters: usize,
    pub seed: u64,
    pub max_iter: Option<usize>,
    pub tol: Option<f64>,
    /// Number of K-Means restarts; the lowest-inertia run is kept
    pub n_init: usize,
    /// Added to the diagonal of the tied covariance
    pub reg_covar: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            n_clusters: N_TIERS,
            seed: DEFAULT_SEED,
            max_iter: None,
            tol: None,
            n_init: 10,
            reg_covar: 1e-6,
        }
    }
}

/// Fitted model parameters, serializable as the run's model artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FittedModel {
    Centroid {
        inertia: f64,
    },
    Mixture {
        weights: Vec<f64>,
        /// Shared covariance in standardized space
        covariance: Vec<Vec<f64>>,
        mean_log_likelihood: f64,
    },
}

/// Output of a clustering engine.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Cluster id per record, in `0..n_clusters`
    pub assignments: Vec<usize>,
    /// One row per cluster, in standardized space
    pub centers: Mat<f64>,
    pub iterations: usize,
    pub model: FittedModel,
}

impl Partition {
    pub fn n_clusters(&self) -> usize {
        self.centers.nrows()
    }

    /// Number of records assigned to each cluster id.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters()];
        for &c in &self.assignments {
            sizes[c] += 1;
        }
        sizes
    }
}

/// Common contract of the clustering capabilities.
///
/// Implementations must be deterministic for a given seed and input, and must
/// report exhaustion of their iteration budget as `PipelineError::NonConvergence`.
pub trait ClusterEngine: Send + Sync {
    fn algorithm(&self) -> ClusterAlgorithm;

    fn fit(&self, x: &Mat<f64>) -> PipelineResult<Partition>;
}

/// Squared Euclidean distance between row `i` of `a` and row `j` of `b`.
#[inline]
pub(crate) fn squared_distance(a: &Mat<f64>, i: usize, b: &Mat<f64>, j: usize) -> f64 {
    (0..a.ncols()).map(|c| (a[(i, c)] - b[(j, c)]).powi(2)).sum()
}

/// Mean of per-column population variances, used to scale tolerances.
pub(crate) fn mean_column_variance(x: &Mat<f64>) -> f64 {
    let n = x.nrows();
    if n == 0 || x.ncols() == 0 {
        return 0.0;
    }
    let total: f64 = (0..x.ncols())
        .map(|j| {
            let mean = (0..n).map(|i| x[(i, j)]).sum::<f64>() / n as f64;
            (0..n).map(|i| (x[(i, j)] - mean).powi(2)).sum::<f64>() / n as f64
        })
        .sum();
    total / x.ncols() as f64
}

/// Derive `count` independent seeds from a master seed.
pub(crate) fn derive_seeds(seed: u64, count: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| rng.gen::<u64>()).collect()
}

/// Convert matrix rows to nested vectors for serialization.
pub fn matrix_rows(m: &Mat<f64>) -> Vec<Vec<f64>> {
    (0..m.nrows())
        .map(|i| (0..m.ncols()).map(|j| m[(i, j)]).collect())
        .collect()
}
