//! Two-component principal projection for scatter-plot renderers

use faer::{Mat, Side};
use serde::Serialize;

use super::cluster::matrix_rows;

/// Fitted principal axes and the projected records and representative points.
#[derive(Debug, Clone, Serialize)]
pub struct Projection {
    /// Variance captured by each component
    pub explained_variance: Vec<f64>,
    /// Records in component space (n x 2)
    pub points: Vec<Vec<f64>>,
    /// Representative points in component space (k x 2)
    pub centers: Vec<Vec<f64>>,
}

/// Project the standardized records and the cluster centers onto the first
/// two principal axes of the records.
///
/// Each axis is oriented so its largest-magnitude loading is positive, which
/// makes the projection reproducible across eigen solvers.
pub fn project_2d(x: &Mat<f64>, centers: &Mat<f64>) -> Projection {
    let n = x.nrows();
    let d = x.ncols();
    let n_components = d.min(2);

    let means: Vec<f64> = (0..d)
        .map(|j| {
            if n == 0 {
                0.0
            } else {
                (0..n).map(|i| x[(i, j)]).sum::<f64>() / n as f64
            }
        })
        .collect();

    let mut centered = Mat::<f64>::zeros(n, d);
    for i in 0..n {
        for j in 0..d {
            centered[(i, j)] = x[(i, j)] - means[j];
        }
    }

    let denom = (n.max(2) - 1) as f64;
    let mut covariance = centered.transpose() * &centered;
    for a in 0..d {
        for b in 0..d {
            covariance[(a, b)] /= denom;
        }
    }

    let evd = covariance.selfadjoint_eigendecomposition(Side::Lower);
    let u = evd.u();

    // Rank eigenvectors by their Rayleigh quotient, largest first
    let mut axes: Vec<(f64, Vec<f64>)> = (0..u.ncols())
        .map(|c| {
            let v: Vec<f64> = (0..d).map(|r| u[(r, c)]).collect();
            let cv: Vec<f64> = (0..d)
                .map(|a| (0..d).map(|b| covariance[(a, b)] * v[b]).sum())
                .collect();
            let lambda: f64 = v.iter().zip(&cv).map(|(a, b)| a * b).sum();
            (lambda, v)
        })
        .collect();
    axes.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    axes.truncate(n_components);

    for (_, v) in axes.iter_mut() {
        let pivot = v
            .iter()
            .copied()
            .fold(0.0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
        if pivot < 0.0 {
            v.iter_mut().for_each(|x| *x = -*x);
        }
    }

    let project = |m: &Mat<f64>, centered_input: bool| -> Mat<f64> {
        let mut out = Mat::<f64>::zeros(m.nrows(), 2);
        for i in 0..m.nrows() {
            for (c, (_, v)) in axes.iter().enumerate() {
                out[(i, c)] = (0..d)
                    .map(|j| {
                        let value = if centered_input {
                            m[(i, j)]
                        } else {
                            m[(i, j)] - means[j]
                        };
                        value * v[j]
                    })
                    .sum();
            }
        }
        out
    };

    Projection {
        explained_variance: axes.iter().map(|(l, _)| l.max(0.0)).collect(),
        points: matrix_rows(&project(&centered, true)),
        centers: matrix_rows(&project(centers, false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_captures_dominant_axis() {
        // points along the (1, 1, 0) diagonal, z noise uncorrelated with it
        let rows = [
            [-2.0, -2.0, 0.1],
            [-1.0, -1.0, -0.1],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, -0.1],
            [2.0, 2.0, 0.1],
        ];
        let mut x = Mat::<f64>::zeros(rows.len(), 3);
        for (i, r) in rows.iter().enumerate() {
            for (j, &v) in r.iter().enumerate() {
                x[(i, j)] = v;
            }
        }
        let centers = Mat::<f64>::zeros(1, 3);
        let p = project_2d(&x, &centers);

        assert_eq!(p.points.len(), 5);
        assert_eq!(p.centers.len(), 1);
        assert!(p.explained_variance[0] > p.explained_variance[1]);
        // first component increases along the diagonal
        assert!(p.points[4][0] > p.points[0][0]);
        let expected = (8.0f64).sqrt();
        assert!((p.points[4][0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_projection_of_single_feature() {
        let mut x = Mat::<f64>::zeros(3, 1);
        x[(0, 0)] = -1.0;
        x[(2, 0)] = 1.0;
        let p = project_2d(&x, &Mat::<f64>::zeros(1, 1));
        assert_eq!(p.explained_variance.len(), 1);
        assert_eq!(p.points[2], vec![1.0, 0.0]);
    }
}
