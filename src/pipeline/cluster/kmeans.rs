//! Centroid-based partitioning with k-means++ seeding and Lloyd's iteration

use faer::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::{
    derive_seeds, mean_column_variance, squared_distance, ClusterAlgorithm, ClusterConfig,
    ClusterEngine, FittedModel, Partition,
};
use crate::pipeline::error::{PipelineError, PipelineResult};

const DEFAULT_MAX_ITER: usize = 300;
const DEFAULT_TOL: f64 = 1e-4;

/// K-Means engine.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub n_clusters: usize,
    pub seed: u64,
    pub max_iter: usize,
    pub tol: f64,
    pub n_init: usize,
}

/// Result of a single restart.
struct Run {
    labels: Vec<usize>,
    centers: Mat<f64>,
    inertia: f64,
    iterations: usize,
    converged: bool,
    last_shift: f64,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            seed: super::DEFAULT_SEED,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
            n_init: 10,
        }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self {
            n_clusters: config.n_clusters,
            seed: config.seed,
            max_iter: config.max_iter.unwrap_or(DEFAULT_MAX_ITER),
            tol: config.tol.unwrap_or(DEFAULT_TOL),
            n_init: config.n_init.max(1),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// k-means++ seeding with greedy local trials.
    fn init_centers(&self, x: &Mat<f64>, rng: &mut StdRng) -> Mat<f64> {
        let n = x.nrows();
        let d = x.ncols();
        let k = self.n_clusters;
        let n_trials = 2 + (k as f64).ln().floor() as usize;

        let mut centers = Mat::<f64>::zeros(k, d);
        let first = rng.gen_range(0..n);
        copy_row(x, first, &mut centers, 0);

        let mut closest: Vec<f64> = (0..n).map(|i| squared_distance(x, i, &centers, 0)).collect();

        for c in 1..k {
            let potential: f64 = closest.iter().sum();

            let mut best_candidate = 0;
            let mut best_potential = f64::INFINITY;
            let mut best_closest = closest.clone();

            for _ in 0..n_trials {
                let candidate = if potential > 0.0 {
                    sample_weighted(&closest, potential, rng)
                } else {
                    rng.gen_range(0..n)
                };
                let trial: Vec<f64> = (0..n)
                    .map(|i| closest[i].min(squared_distance(x, i, x, candidate)))
                    .collect();
                let trial_potential: f64 = trial.iter().sum();
                if trial_potential < best_potential {
                    best_potential = trial_potential;
                    best_candidate = candidate;
                    best_closest = trial;
                }
            }

            copy_row(x, best_candidate, &mut centers, c);
            closest = best_closest;
        }

        centers
    }

    /// One restart: seed, then iterate until the center shift falls under tolerance.
    fn run_once(&self, x: &Mat<f64>, seed: u64, tol_abs: f64) -> Run {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut centers = self.init_centers(x, &mut rng);
        let mut labels: Vec<usize> = Vec::new();
        let mut last_shift = f64::INFINITY;

        for iteration in 1..=self.max_iter {
            let (new_labels, _) = assign(x, &centers);
            if new_labels == labels {
                let inertia = assign(x, &centers).1;
                return Run {
                    labels,
                    centers,
                    inertia,
                    iterations: iteration,
                    converged: true,
                    last_shift: 0.0,
                };
            }
            labels = new_labels;

            let new_centers = update_centers(x, &mut labels, &centers);
            last_shift = (0..self.n_clusters)
                .map(|c| squared_distance(&centers, c, &new_centers, c))
                .sum();
            centers = new_centers;

            if last_shift <= tol_abs {
                let (final_labels, inertia) = assign(x, &centers);
                return Run {
                    labels: final_labels,
                    centers,
                    inertia,
                    iterations: iteration,
                    converged: true,
                    last_shift,
                };
            }
        }

        let (labels, inertia) = assign(x, &centers);
        Run {
            labels,
            centers,
            inertia,
            iterations: self.max_iter,
            converged: false,
            last_shift,
        }
    }
}

impl ClusterEngine for KMeans {
    fn algorithm(&self) -> ClusterAlgorithm {
        ClusterAlgorithm::Centroid
    }

    fn fit(&self, x: &Mat<f64>) -> PipelineResult<Partition> {
        if x.nrows() < self.n_clusters {
            return Err(PipelineError::TooFewRecords {
                records: x.nrows(),
                clusters: self.n_clusters,
            });
        }

        let tol_abs = self.tol * mean_column_variance(x);
        let seeds = derive_seeds(self.seed, self.n_init);

        // Restarts are independent; collecting in index order keeps the
        // selection identical to a serial loop.
        let runs: Vec<Run> = seeds
            .par_iter()
            .map(|&seed| self.run_once(x, seed, tol_abs))
            .collect();

        let mut best: Option<Run> = None;
        let mut worst_shift = 0.0f64;
        for run in runs {
            if !run.converged {
                worst_shift = worst_shift.max(run.last_shift);
                continue;
            }
            let better = best.as_ref().map_or(true, |b| run.inertia < b.inertia);
            if better {
                best = Some(run);
            }
        }

        let best = best.ok_or_else(|| PipelineError::NonConvergence {
            algorithm: ClusterAlgorithm::Centroid.title().to_string(),
            iterations: self.max_iter,
            change: worst_shift,
        })?;

        Ok(Partition {
            assignments: best.labels,
            centers: best.centers,
            iterations: best.iterations,
            model: FittedModel::Centroid {
                inertia: best.inertia,
            },
        })
    }
}

fn copy_row(src: &Mat<f64>, src_row: usize, dst: &mut Mat<f64>, dst_row: usize) {
    for j in 0..src.ncols() {
        dst[(dst_row, j)] = src[(src_row, j)];
    }
}

/// Draw an index with probability proportional to `weights`.
fn sample_weighted(weights: &[f64], total: f64, rng: &mut StdRng) -> usize {
    let target = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative > target {
            return i;
        }
    }
    weights.len() - 1
}

/// Nearest-center assignment (lowest index wins ties) and total inertia.
fn assign(x: &Mat<f64>, centers: &Mat<f64>) -> (Vec<usize>, f64) {
    let mut inertia = 0.0;
    let labels = (0..x.nrows())
        .map(|i| {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for c in 0..centers.nrows() {
                let dist = squared_distance(x, i, centers, c);
                if dist < best_dist {
                    best_dist = dist;
                    best = c;
                }
            }
            inertia += best_dist;
            best
        })
        .collect();
    (labels, inertia)
}

/// Recompute centers as cluster means.
///
/// An empty cluster is re-seeded with the point farthest from its current
/// center, and that point is moved into the empty cluster.
fn update_centers(x: &Mat<f64>, labels: &mut [usize], previous: &Mat<f64>) -> Mat<f64> {
    let k = previous.nrows();
    let d = x.ncols();

    let mut counts = vec![0usize; k];
    for &c in labels.iter() {
        counts[c] += 1;
    }

    let mut taken = vec![false; x.nrows()];
    for c in 0..k {
        if counts[c] > 0 {
            continue;
        }
        let far = (0..x.nrows())
            .filter(|&i| !taken[i] && counts[labels[i]] > 1)
            .max_by(|&a, &b| {
                let da = squared_distance(x, a, previous, labels[a]);
                let db = squared_distance(x, b, previous, labels[b]);
                da.partial_cmp(&db)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.cmp(&a))
            });
        if let Some(i) = far {
            counts[labels[i]] -= 1;
            labels[i] = c;
            counts[c] = 1;
            taken[i] = true;
        }
    }

    let mut centers = Mat::<f64>::zeros(k, d);
    for (i, &c) in labels.iter().enumerate() {
        for j in 0..d {
            centers[(c, j)] += x[(i, j)];
        }
    }
    for c in 0..k {
        if counts[c] == 0 {
            copy_row(previous, c, &mut centers, c);
            continue;
        }
        for j in 0..d {
            centers[(c, j)] /= counts[c] as f64;
        }
    }
    centers
}
