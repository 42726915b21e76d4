//! Gaussian mixture with a tied covariance, fitted by expectation-maximization
//!
//! All components share one covariance matrix. Responsibilities are
//! initialized from a K-Means partition with the same seed and restart count,
//! and the hard assignment is the most probable component per record.

use faer::{Mat, Side};

use super::kmeans::KMeans;
use super::{matrix_rows, ClusterAlgorithm, ClusterConfig, ClusterEngine, FittedModel, Partition};
use crate::pipeline::error::{PipelineError, PipelineResult};

const DEFAULT_MAX_ITER: usize = 100;
const DEFAULT_TOL: f64 = 1e-3;

/// Guards component weights against division by zero.
const WEIGHT_FLOOR: f64 = 10.0 * f64::EPSILON;

/// Tied-covariance Gaussian mixture engine.
#[derive(Debug, Clone)]
pub struct GaussianMixture {
    pub n_components: usize,
    pub seed: u64,
    pub max_iter: usize,
    pub tol: f64,
    pub reg_covar: f64,
    /// K-Means restarts used for initialization
    pub n_init: usize,
}

/// Mixture parameters plus the Cholesky factor of the shared covariance.
struct Params {
    weights: Vec<f64>,
    means: Mat<f64>,
    covariance: Mat<f64>,
    chol_l: Mat<f64>,
    log_det: f64,
}

impl GaussianMixture {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            seed: super::DEFAULT_SEED,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
            reg_covar: 1e-6,
            n_init: 10,
        }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self {
            n_components: config.n_clusters,
            seed: config.seed,
            max_iter: config.max_iter.unwrap_or(DEFAULT_MAX_ITER),
            tol: config.tol.unwrap_or(DEFAULT_TOL),
            reg_covar: config.reg_covar,
            n_init: config.n_init.max(1),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Estimate weights, means and the shared covariance from responsibilities.
    fn m_step(&self, x: &Mat<f64>, resp: &Mat<f64>) -> PipelineResult<Params> {
        let n = x.nrows();
        let d = x.ncols();
        let k = self.n_components;

        let nk: Vec<f64> = (0..k)
            .map(|c| (0..n).map(|i| resp[(i, c)]).sum::<f64>() + WEIGHT_FLOOR)
            .collect();
        let total: f64 = nk.iter().sum();

        let mut means = resp.transpose() * x;
        for c in 0..k {
            for j in 0..d {
                means[(c, j)] /= nk[c];
            }
        }

        // Tied covariance: (X^T X - sum_k n_k mu_k mu_k^T) / sum_k n_k
        let mut covariance = x.transpose() * x;
        for c in 0..k {
            for a in 0..d {
                for b in 0..d {
                    covariance[(a, b)] -= nk[c] * means[(c, a)] * means[(c, b)];
                }
            }
        }
        for a in 0..d {
            for b in 0..d {
                covariance[(a, b)] /= total;
            }
            covariance[(a, a)] += self.reg_covar;
        }

        let chol_l = covariance
            .cholesky(Side::Lower)
            .map_err(|_| PipelineError::SingularCovariance)?
            .compute_l();
        let log_det = 2.0 * (0..d).map(|j| chol_l[(j, j)].ln()).sum::<f64>();
        if !log_det.is_finite() {
            return Err(PipelineError::SingularCovariance);
        }

        Ok(Params {
            weights: nk.iter().map(|&w| w / total).collect(),
            means,
            covariance,
            chol_l,
            log_det,
        })
    }

    /// Log responsibilities and the mean per-record log-likelihood.
    fn e_step(&self, x: &Mat<f64>, params: &Params) -> (Mat<f64>, f64) {
        let n = x.nrows();
        let d = x.ncols();
        let k = self.n_components;
        let log_norm = -0.5 * (d as f64 * (2.0 * std::f64::consts::PI).ln() + params.log_det);

        // Whiten means once: L m = mu
        let whitened_means: Vec<Vec<f64>> = (0..k)
            .map(|c| {
                let mu: Vec<f64> = (0..d).map(|j| params.means[(c, j)]).collect();
                forward_substitute(&params.chol_l, &mu)
            })
            .collect();

        let mut log_resp = Mat::<f64>::zeros(n, k);
        let mut total_log_likelihood = 0.0;

        for i in 0..n {
            let row: Vec<f64> = (0..d).map(|j| x[(i, j)]).collect();
            let whitened = forward_substitute(&params.chol_l, &row);

            let weighted: Vec<f64> = (0..k)
                .map(|c| {
                    let mahalanobis: f64 = whitened
                        .iter()
                        .zip(&whitened_means[c])
                        .map(|(a, b)| (a - b).powi(2))
                        .sum();
                    log_norm - 0.5 * mahalanobis + params.weights[c].ln()
                })
                .collect();

            let norm = log_sum_exp(&weighted);
            total_log_likelihood += norm;
            for c in 0..k {
                log_resp[(i, c)] = weighted[c] - norm;
            }
        }

        (log_resp, total_log_likelihood / n as f64)
    }

    /// One-hot responsibilities from a seeded K-Means partition.
    fn initial_responsibilities(&self, x: &Mat<f64>) -> PipelineResult<Mat<f64>> {
        let init = KMeans::new(self.n_components)
            .with_seed(self.seed)
            .with_n_init(self.n_init)
            .fit(x)?;
        let mut resp = Mat::<f64>::zeros(x.nrows(), self.n_components);
        for (i, &c) in init.assignments.iter().enumerate() {
            resp[(i, c)] = 1.0;
        }
        Ok(resp)
    }
}

impl ClusterEngine for GaussianMixture {
    fn algorithm(&self) -> ClusterAlgorithm {
        ClusterAlgorithm::Mixture
    }

    fn fit(&self, x: &Mat<f64>) -> PipelineResult<Partition> {
        if x.nrows() < self.n_components {
            return Err(PipelineError::TooFewRecords {
                records: x.nrows(),
                clusters: self.n_components,
            });
        }

        let resp = self.initial_responsibilities(x)?;
        let mut params = self.m_step(x, &resp)?;
        let mut lower_bound = f64::NEG_INFINITY;
        let mut change = f64::INFINITY;
        let mut converged_at = None;

        for iteration in 1..=self.max_iter {
            let previous = lower_bound;
            let (log_resp, bound) = self.e_step(x, &params);
            params = self.m_step(x, &exp_matrix(&log_resp))?;
            lower_bound = bound;

            change = lower_bound - previous;
            if change.abs() < self.tol {
                converged_at = Some(iteration);
                break;
            }
        }

        let iterations = converged_at.ok_or_else(|| PipelineError::NonConvergence {
            algorithm: ClusterAlgorithm::Mixture.title().to_string(),
            iterations: self.max_iter,
            change,
        })?;

        // Final E-step so labels agree with the returned parameters
        let (log_resp, mean_log_likelihood) = self.e_step(x, &params);
        let assignments = (0..x.nrows())
            .map(|i| {
                let mut best = 0;
                for c in 1..self.n_components {
                    if log_resp[(i, c)] > log_resp[(i, best)] {
                        best = c;
                    }
                }
                best
            })
            .collect();

        Ok(Partition {
            assignments,
            centers: params.means.clone(),
            iterations,
            model: FittedModel::Mixture {
                weights: params.weights.clone(),
                covariance: matrix_rows(&params.covariance),
                mean_log_likelihood,
            },
        })
    }
}

/// Solve `L y = b` for lower-triangular `L`.
fn forward_substitute(l: &Mat<f64>, b: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; b.len()];
    for i in 0..b.len() {
        let partial: f64 = (0..i).map(|j| l[(i, j)] * y[j]).sum();
        y[i] = (b[i] - partial) / l[(i, i)];
    }
    y
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

fn exp_matrix(m: &Mat<f64>) -> Mat<f64> {
    let mut out = Mat::<f64>::zeros(m.nrows(), m.ncols());
    for i in 0..m.nrows() {
        for j in 0..m.ncols() {
            out[(i, j)] = m[(i, j)].exp();
        }
    }
    out
}
