//! Evaluation of a partition against the rule-based tiers
//!
//! Accuracy here is the agreement rate between the cluster-derived tier and
//! the rule-based tier. The two are linked only through the median ranking in
//! the label mapper, so it is an internal-consistency score rather than a
//! held-out supervised accuracy.
//!
//! The three unsupervised indices are computed on the standardized matrix and
//! the raw cluster ids:
//! - Silhouette in [-1, 1], higher is better
//! - Calinski-Harabasz (between/within dispersion ratio), higher is better
//! - Davies-Bouldin (mean similarity to the nearest cluster), lower is better

use faer::Mat;
use rayon::prelude::*;
use serde::Serialize;

use super::cluster::squared_distance;
use super::error::{Warning, WarningScope};
use super::labels::TierLabel;

pub const ACCURACY: &str = "Accuracy";
pub const SILHOUETTE: &str = "Silhouette Score";
pub const CALINSKI_HARABASZ: &str = "Calinski-Harabasz Index";
pub const DAVIES_BOULDIN: &str = "Davies-Bouldin Index";

/// One named scalar; `None` when the metric is undefined for this data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricValue {
    pub name: String,
    pub value: Option<f64>,
}

/// The four run-level metrics, in fixed order.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsTable {
    pub accuracy: f64,
    pub silhouette: Option<f64>,
    pub calinski_harabasz: Option<f64>,
    pub davies_bouldin: Option<f64>,
}

impl MetricsTable {
    pub fn rows(&self) -> Vec<MetricValue> {
        vec![
            MetricValue {
                name: ACCURACY.to_string(),
                value: Some(self.accuracy),
            },
            MetricValue {
                name: SILHOUETTE.to_string(),
                value: self.silhouette,
            },
            MetricValue {
                name: CALINSKI_HARABASZ.to_string(),
                value: self.calinski_harabasz,
            },
            MetricValue {
                name: DAVIES_BOULDIN.to_string(),
                value: self.davies_bouldin,
            },
        ]
    }
}

/// 3x3 counts; rows are rule-based tiers, columns are predicted tiers,
/// both in Low, Medium, High order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; 3]; 3],
}

impl ConfusionMatrix {
    pub fn from_labels(actual: &[TierLabel], predicted: &[TierLabel]) -> Self {
        let mut counts = [[0usize; 3]; 3];
        for (a, p) in actual.iter().zip(predicted) {
            counts[a.index()][p.index()] += 1;
        }
        Self { counts }
    }

    pub fn get(&self, actual: TierLabel, predicted: TierLabel) -> usize {
        self.counts[actual.index()][predicted.index()]
    }

    pub fn row_sum(&self, actual: TierLabel) -> usize {
        self.counts[actual.index()].iter().sum()
    }

    pub fn column_sum(&self, predicted: TierLabel) -> usize {
        self.counts.iter().map(|row| row[predicted.index()]).sum()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn diagonal(&self) -> usize {
        (0..3).map(|i| self.counts[i][i]).sum()
    }
}

/// Precision, recall, F1 and support for one row of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class metrics plus accuracy and macro/weighted averages.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<(TierLabel, ClassMetrics)>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn class(&self, label: TierLabel) -> &ClassMetrics {
        &self.classes[label.index()].1
    }
}

/// Full evaluation output.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub metrics: MetricsTable,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
    pub warnings: Vec<Warning>,
}

/// Fraction of records whose predicted tier equals the rule-based tier.
pub fn agreement_accuracy(actual: &[TierLabel], predicted: &[TierLabel]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let correct = actual.iter().zip(predicted).filter(|(a, p)| a == p).count();
    correct as f64 / actual.len() as f64
}

/// Build the classification report; zero divisions yield 0.0 with a warning.
pub fn classification_report(
    confusion: &ConfusionMatrix,
    warnings: &mut Vec<Warning>,
) -> ClassificationReport {
    let total = confusion.total();

    let classes: Vec<(TierLabel, ClassMetrics)> = TierLabel::ALL
        .iter()
        .map(|&label| {
            let tp = confusion.get(label, label) as f64;
            let predicted = confusion.column_sum(label);
            let support = confusion.row_sum(label);

            let precision = if predicted == 0 {
                warnings.push(Warning::new(
                    WarningScope::ClassificationReport,
                    format!("No records predicted as {}; precision set to 0.0", label),
                ));
                0.0
            } else {
                tp / predicted as f64
            };
            let recall = if support == 0 {
                warnings.push(Warning::new(
                    WarningScope::ClassificationReport,
                    format!("No rule-based {} records; recall set to 0.0", label),
                ));
                0.0
            } else {
                tp / support as f64
            };
            let f1_score = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };

            (
                label,
                ClassMetrics {
                    precision,
                    recall,
                    f1_score,
                    support,
                },
            )
        })
        .collect();

    let n_classes = classes.len() as f64;
    let macro_avg = ClassMetrics {
        precision: classes.iter().map(|(_, m)| m.precision).sum::<f64>() / n_classes,
        recall: classes.iter().map(|(_, m)| m.recall).sum::<f64>() / n_classes,
        f1_score: classes.iter().map(|(_, m)| m.f1_score).sum::<f64>() / n_classes,
        support: total,
    };

    let weighted = |f: fn(&ClassMetrics) -> f64| -> f64 {
        if total == 0 {
            return 0.0;
        }
        classes
            .iter()
            .map(|(_, m)| f(m) * m.support as f64)
            .sum::<f64>()
            / total as f64
    };
    let weighted_avg = ClassMetrics {
        precision: weighted(|m| m.precision),
        recall: weighted(|m| m.recall),
        f1_score: weighted(|m| m.f1_score),
        support: total,
    };

    let accuracy = if total == 0 {
        0.0
    } else {
        confusion.diagonal() as f64 / total as f64
    };

    ClassificationReport {
        classes,
        accuracy,
        macro_avg,
        weighted_avg,
    }
}

/// Number of records per cluster id.
fn cluster_sizes(labels: &[usize], n_clusters: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; n_clusters];
    for &c in labels {
        sizes[c] += 1;
    }
    sizes
}

/// Per-cluster mean rows of `x`; rows of empty clusters stay zero.
fn cluster_centroids(x: &Mat<f64>, labels: &[usize], sizes: &[usize]) -> Mat<f64> {
    let mut centroids = Mat::<f64>::zeros(sizes.len(), x.ncols());
    for (i, &c) in labels.iter().enumerate() {
        for j in 0..x.ncols() {
            centroids[(c, j)] += x[(i, j)];
        }
    }
    for (c, &size) in sizes.iter().enumerate() {
        if size > 0 {
            for j in 0..x.ncols() {
                centroids[(c, j)] /= size as f64;
            }
        }
    }
    centroids
}

/// Mean silhouette coefficient over all records.
///
/// Records in singleton clusters contribute 0. Returns `None` unless the
/// number of populated clusters is between 2 and n - 1.
pub fn silhouette_score(x: &Mat<f64>, labels: &[usize], n_clusters: usize) -> Option<f64> {
    let n = x.nrows();
    let sizes = cluster_sizes(labels, n_clusters);
    let populated = sizes.iter().filter(|&&s| s > 0).count();
    if populated < 2 || populated > n.saturating_sub(1) {
        return None;
    }

    // Per-record coefficients are independent; summing the collected vector
    // in order keeps the result identical to a serial pass.
    let coefficients: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|i| {
            let own = labels[i];
            if sizes[own] <= 1 {
                return 0.0;
            }
            let mut dist_sums = vec![0.0; n_clusters];
            for j in 0..n {
                if i != j {
                    dist_sums[labels[j]] += squared_distance(x, i, x, j).sqrt();
                }
            }
            let a = dist_sums[own] / (sizes[own] - 1) as f64;
            let b = (0..n_clusters)
                .filter(|&c| c != own && sizes[c] > 0)
                .map(|c| dist_sums[c] / sizes[c] as f64)
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom == 0.0 {
                0.0
            } else {
                (b - a) / denom
            }
        })
        .collect();

    Some(coefficients.iter().sum::<f64>() / n as f64)
}

/// Ratio of between-cluster to within-cluster dispersion.
///
/// Returns 1.0 when the within-cluster dispersion is zero.
pub fn calinski_harabasz_score(x: &Mat<f64>, labels: &[usize], n_clusters: usize) -> Option<f64> {
    let n = x.nrows();
    let sizes = cluster_sizes(labels, n_clusters);
    let populated = sizes.iter().filter(|&&s| s > 0).count();
    if populated < 2 || populated > n.saturating_sub(1) {
        return None;
    }

    let centroids = cluster_centroids(x, labels, &sizes);
    let overall: Vec<f64> = (0..x.ncols())
        .map(|j| (0..n).map(|i| x[(i, j)]).sum::<f64>() / n as f64)
        .collect();

    let between: f64 = (0..n_clusters)
        .filter(|&c| sizes[c] > 0)
        .map(|c| {
            let sq: f64 = (0..x.ncols())
                .map(|j| (centroids[(c, j)] - overall[j]).powi(2))
                .sum();
            sizes[c] as f64 * sq
        })
        .sum();
    let within: f64 = (0..n)
        .map(|i| squared_distance(x, i, &centroids, labels[i]))
        .sum();

    if within == 0.0 {
        return Some(1.0);
    }
    Some(between * (n - populated) as f64 / (within * (populated - 1) as f64))
}

/// Mean over clusters of the worst-case (s_i + s_j) / d_ij similarity.
///
/// Returns 0.0 when every cluster is a single point or all centroids coincide.
pub fn davies_bouldin_score(x: &Mat<f64>, labels: &[usize], n_clusters: usize) -> Option<f64> {
    let n = x.nrows();
    let sizes = cluster_sizes(labels, n_clusters);
    let populated: Vec<usize> = (0..n_clusters).filter(|&c| sizes[c] > 0).collect();
    if populated.len() < 2 || populated.len() > n.saturating_sub(1) {
        return None;
    }

    let centroids = cluster_centroids(x, labels, &sizes);
    let mut intra = vec![0.0; n_clusters];
    for i in 0..n {
        intra[labels[i]] += squared_distance(x, i, &centroids, labels[i]).sqrt();
    }
    for &c in &populated {
        intra[c] /= sizes[c] as f64;
    }

    let all_intra_zero = populated.iter().all(|&c| intra[c] == 0.0);
    let all_centroids_equal = populated
        .iter()
        .all(|&c| squared_distance(&centroids, c, &centroids, populated[0]) == 0.0);
    if all_intra_zero || all_centroids_equal {
        return Some(0.0);
    }

    let total: f64 = populated
        .iter()
        .map(|&a| {
            populated
                .iter()
                .filter(|&&b| b != a)
                .map(|&b| {
                    let d = squared_distance(&centroids, a, &centroids, b).sqrt();
                    if d == 0.0 {
                        0.0
                    } else {
                        (intra[a] + intra[b]) / d
                    }
                })
                .fold(0.0, f64::max)
        })
        .sum();

    Some(total / populated.len() as f64)
}

/// Evaluate predicted tiers against rule-based tiers and score the partition.
pub fn evaluate(
    predicted: &[TierLabel],
    actual: &[TierLabel],
    x: &Mat<f64>,
    clusters: &[usize],
    n_clusters: usize,
) -> Evaluation {
    let mut warnings = Vec::new();

    let confusion = ConfusionMatrix::from_labels(actual, predicted);
    let report = classification_report(&confusion, &mut warnings);
    let accuracy = agreement_accuracy(actual, predicted);

    let present_actual = TierLabel::ALL
        .iter()
        .filter(|&&l| confusion.row_sum(l) > 0)
        .count();
    if present_actual == 1 {
        warnings.push(Warning::new(
            WarningScope::Metric(ACCURACY.to_string()),
            "Rule-based tiers contain a single class; agreement is not informative",
        ));
    }

    let silhouette = silhouette_score(x, clusters, n_clusters);
    let calinski_harabasz = calinski_harabasz_score(x, clusters, n_clusters);
    let davies_bouldin = davies_bouldin_score(x, clusters, n_clusters);

    for (name, value) in [
        (SILHOUETTE, silhouette),
        (CALINSKI_HARABASZ, calinski_harabasz),
        (DAVIES_BOULDIN, davies_bouldin),
    ] {
        if value.is_none() {
            warnings.push(Warning::new(
                WarningScope::Metric(name.to_string()),
                "Undefined: needs between 2 and n-1 populated clusters",
            ));
        }
    }

    Evaluation {
        metrics: MetricsTable {
            accuracy,
            silhouette,
            calinski_harabasz,
            davies_bouldin,
        },
        confusion,
        report,
        warnings,
    }
}
