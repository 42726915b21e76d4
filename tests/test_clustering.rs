//! Tests for the clustering engines and partition quality scores

use doctier::pipeline::{
    calinski_harabasz_score, davies_bouldin_score, map_cluster_labels, prepare_features,
    silhouette_score, ClusterAlgorithm, ClusterConfig, ClusterEngine, FittedModel,
    GaussianMixture, KMeans, PipelineError, TierLabel,
};
use faer::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[path = "common/mod.rs"]
mod common;

use common::*;

/// Three well separated 2-D blobs of `per_blob` points each, in blob order.
fn blobs(per_blob: usize, seed: u64) -> Mat<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let centers = [(0.0, 0.0), (10.0, 0.0), (5.0, 9.0)];
    let mut x = Mat::<f64>::zeros(per_blob * centers.len(), 2);
    for (b, (cx, cy)) in centers.iter().enumerate() {
        for i in 0..per_blob {
            let row = b * per_blob + i;
            x[(row, 0)] = cx + rng.gen_range(-1.0..1.0);
            x[(row, 1)] = cy + rng.gen_range(-1.0..1.0);
        }
    }
    x
}

fn assert_blob_partition(assignments: &[usize], per_blob: usize) {
    let ids: Vec<usize> = (0..3).map(|b| assignments[b * per_blob]).collect();
    for b in 0..3 {
        for i in 0..per_blob {
            assert_eq!(assignments[b * per_blob + i], ids[b], "blob {} row {}", b, i);
        }
    }
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);
    assert_ne!(ids[0], ids[2]);
}

#[test]
fn test_both_engines_recover_blobs() {
    let x = blobs(20, 5);
    let config = ClusterConfig::default();

    for algorithm in ClusterAlgorithm::ALL {
        let partition = algorithm.engine(&config).fit(&x).unwrap();
        assert_eq!(partition.n_clusters(), 3);
        assert_eq!(partition.assignments.len(), 60);
        assert_blob_partition(&partition.assignments, 20);
    }
}

#[test]
fn test_engines_are_deterministic_across_seeds_and_runs() {
    let x = blobs(15, 9);
    for seed in [0u64, 1, 42, 1234] {
        let config = ClusterConfig {
            seed,
            ..Default::default()
        };
        for algorithm in ClusterAlgorithm::ALL {
            let a = algorithm.engine(&config).fit(&x).unwrap();
            let b = algorithm.engine(&config).fit(&x).unwrap();
            assert_eq!(a.assignments, b.assignments);
            assert_eq!(a.iterations, b.iterations);
            for c in 0..3 {
                for j in 0..2 {
                    assert_eq!(a.centers[(c, j)], b.centers[(c, j)]);
                }
            }
        }
    }
}

#[test]
fn test_kmeans_centers_are_cluster_means() {
    let x = blobs(10, 3);
    let partition = KMeans::new(3).fit(&x).unwrap();

    for c in 0..3 {
        let members: Vec<usize> = (0..x.nrows())
            .filter(|&i| partition.assignments[i] == c)
            .collect();
        for j in 0..2 {
            let mean = members.iter().map(|&i| x[(i, j)]).sum::<f64>() / members.len() as f64;
            assert!((partition.centers[(c, j)] - mean).abs() < 1e-9);
        }
    }
    assert!(matches!(partition.model, FittedModel::Centroid { inertia } if inertia > 0.0));
}

#[test]
fn test_gmm_exposes_tied_covariance() {
    let x = blobs(10, 3);
    let partition = GaussianMixture::new(3).fit(&x).unwrap();
    match partition.model {
        FittedModel::Mixture {
            weights,
            covariance,
            mean_log_likelihood,
        } => {
            assert_eq!(weights.len(), 3);
            assert_eq!(covariance.len(), 2);
            assert!(mean_log_likelihood.is_finite());
            for w in weights {
                assert!((w - 1.0 / 3.0).abs() < 1e-6);
            }
        }
        other => panic!("unexpected model: {:?}", other),
    }
}

#[test]
fn test_iteration_budget_exhaustion_is_an_error() {
    let x = blobs(10, 3);
    let err = GaussianMixture::new(3).with_max_iter(1).fit(&x).unwrap_err();
    assert!(matches!(err, PipelineError::NonConvergence { .. }));
    assert!(err.to_string().contains("GMM"));
}

#[test]
fn test_quality_scores_prefer_true_partition() {
    let x = blobs(10, 11);
    let truth: Vec<usize> = (0..30).map(|i| i / 10).collect();
    let scrambled: Vec<usize> = (0..30).map(|i| i % 3).collect();

    let good_sil = silhouette_score(&x, &truth, 3).unwrap();
    let bad_sil = silhouette_score(&x, &scrambled, 3).unwrap();
    assert!(good_sil > 0.7);
    assert!(good_sil > bad_sil);

    assert!(calinski_harabasz_score(&x, &truth, 3).unwrap() > calinski_harabasz_score(&x, &scrambled, 3).unwrap());
    assert!(davies_bouldin_score(&x, &truth, 3).unwrap() < davies_bouldin_score(&x, &scrambled, 3).unwrap());
}

#[test]
fn test_scores_undefined_for_single_cluster() {
    let x = blobs(5, 1);
    let one: Vec<usize> = vec![0; 15];
    assert_eq!(silhouette_score(&x, &one, 3), None);
    assert_eq!(calinski_harabasz_score(&x, &one, 3), None);
    assert_eq!(davies_bouldin_score(&x, &one, 3), None);
}

#[test]
fn test_label_mapping_on_banded_features() {
    let df = create_banded_dataframe();
    let prepared = prepare_features(&df, &config_for(20)).unwrap();
    let partition = KMeans::new(3).fit(&prepared.scaled.matrix).unwrap();

    let mapping = map_cluster_labels(&partition.assignments, &prepared.table.completeness, 3);
    let medians: Vec<f64> = TierLabel::ALL
        .iter()
        .map(|&tier| {
            let c = (0..3).find(|&c| mapping.label_of(c) == tier).unwrap();
            mapping.medians[c].unwrap()
        })
        .collect();
    assert_eq!(medians, vec![15.0, 50.0, 90.0]);
}
