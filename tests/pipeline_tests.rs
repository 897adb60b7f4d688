// End-to-end checks of the PCA pipeline and the concordance tooling

use approx::{assert_abs_diff_eq, assert_relative_eq};
use concordant_pca::covariance::trace;
use concordant_pca::io::{load_matrix, save_matrix};
use concordant_pca::{
    align_signs, center, center_and_covariance, compute_concordance, concordance_by_class,
    covariance, decompose_covariance, eigen_decompose, project, select_top_k,
    validate_projections, validate_with_breakdown, Agreement, JacobiConfig, PcaConfig, PcaError,
    PCA,
};
use ndarray::{array, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded samples with a couple of correlated columns so the spectrum is
/// well separated.
fn generate_correlated_data(n_samples: usize, n_features: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Array2::from_shape_fn((n_samples, n_features), |_| rng.gen_range(-1.0..1.0));
    for mut row in data.rows_mut() {
        row[1] += 3.0 * row[0];
        row[2] -= 1.5 * row[0] + 0.5 * row[1];
    }
    data
}

#[test]
fn test_pipeline_properties_on_random_data() {
    let data = generate_correlated_data(80, 6, 2024);
    let (mean, centered) = center(data.view()).unwrap();
    assert_eq!(mean.len(), 6);
    for column in centered.axis_iter(Axis(1)) {
        let scale = column.iter().fold(1.0f64, |acc, x| acc.max(x.abs()));
        assert!(column.sum().abs() / 80.0 <= 1e-9 * scale);
    }

    let cov = covariance(centered.view()).unwrap();
    assert_eq!(cov, cov.t());

    let config = PcaConfig::with_components(6);
    let full = decompose_covariance(cov.view(), &config).unwrap();
    let eigenvalues = full.eigenvalues();
    assert_relative_eq!(eigenvalues.sum(), trace(cov.view()), max_relative = 1e-6);
    for pair in eigenvalues.windows(2) {
        assert!(pair[0] >= pair[1]);
    }

    let rotation = full.rotation();
    let gram = rotation.t().dot(&rotation);
    assert_abs_diff_eq!(gram, Array2::<f64>::eye(6), epsilon = 1e-10);

    let kept = full.top_k(3).unwrap();
    let scores = project(centered.view(), &kept).unwrap();
    assert_eq!(scores.dim(), (80, 3));
    let variances = scores.var_axis(Axis(0), 1.0);
    for k in 0..3 {
        assert_relative_eq!(variances[k], eigenvalues[k], max_relative = 1e-9);
    }
}

#[test]
fn test_model_agrees_with_staged_pipeline() {
    let data = generate_correlated_data(50, 5, 11);
    let (_, cov) = center_and_covariance(data.view()).unwrap();
    let pairs = eigen_decompose(cov.view(), &JacobiConfig::default()).unwrap();
    let kept = select_top_k(pairs, 2, 1e-9).unwrap();
    let (_, centered) = center(data.view()).unwrap();
    let staged = project(centered.view(), &kept).unwrap();

    let mut pca = PCA::new(PcaConfig::with_components(2));
    let scores = pca.fit(data.view()).unwrap();
    assert_abs_diff_eq!(scores, staged, epsilon = 1e-12);
}

#[test]
fn test_self_alignment_and_concordance() {
    let data = generate_correlated_data(40, 4, 5);
    let mut pca = PCA::new(PcaConfig::with_components(3));
    let scores = pca.fit(data.view()).unwrap();

    let alignment = align_signs(scores.view(), scores.view()).unwrap();
    assert!(alignment.flipped.is_empty());
    for rho in &alignment.correlations_before {
        assert_eq!(*rho, Some(1.0));
    }

    let report = compute_concordance(scores.view(), alignment.adjusted.view()).unwrap();
    assert_eq!(report.mse, 0.0);
    assert_eq!(report.mae, 0.0);
    assert_eq!(report.max_abs_diff, 0.0);
    assert!(report.correlations().iter().all(|r| *r == Some(1.0)));
    assert_eq!(report.agreement, Agreement::Excellent);
}

#[test]
fn test_sign_flipped_candidate_validates() {
    let data = generate_correlated_data(60, 5, 77);
    let mut pca = PCA::new(PcaConfig::with_components(3));
    let reference = pca.fit(data.view()).unwrap();

    let mut candidate = reference.clone();
    candidate.column_mut(0).mapv_inplace(|x| -x);
    candidate.column_mut(2).mapv_inplace(|x| -x);

    let report = validate_projections(reference.view(), candidate.view()).unwrap();
    assert_eq!(report.flipped, vec![0, 2]);
    assert_eq!(report.mse, 0.0);
    assert!(report.correlations().iter().all(|r| *r == Some(1.0)));
    assert_eq!(report.agreement, Agreement::Excellent);
}

#[test]
fn test_projection_survives_file_interchange() {
    let data = generate_correlated_data(30, 4, 3);
    let mut pca = PCA::new(PcaConfig::with_components(2));
    let scores = pca.fit(data.view()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scores.csv");
    save_matrix(&path, scores.view()).unwrap();
    let reloaded = load_matrix(&path).unwrap();

    let report = validate_projections(scores.view(), reloaded.view()).unwrap();
    assert!(report.flipped.is_empty());
    assert!(report.max_abs_diff <= 5e-7 + 1e-12);
    assert_eq!(report.agreement, Agreement::Excellent);
}

#[test]
fn test_too_many_components_is_rejected() {
    let data = generate_correlated_data(20, 5, 9);
    let mut pca = PCA::new(PcaConfig::with_components(6));
    assert!(matches!(
        pca.fit(data.view()),
        Err(PcaError::InvalidParameter { .. })
    ));

    let (_, cov) = center_and_covariance(data.view()).unwrap();
    let pairs = eigen_decompose(cov.view(), &JacobiConfig::default()).unwrap();
    assert!(matches!(
        select_top_k(pairs, 6, 1e-9),
        Err(PcaError::InvalidParameter { .. })
    ));
}

#[test]
fn test_isotropic_four_point_scenario() {
    let data = array![[2.0, 0.0], [0.0, 2.0], [-2.0, 0.0], [0.0, -2.0]];
    let (mean, cov) = center_and_covariance(data.view()).unwrap();
    assert_eq!(mean, array![0.0, 0.0]);
    // Unbiased estimator: 8 / (4 - 1) on the diagonal
    assert_abs_diff_eq!(cov, array![[8.0 / 3.0, 0.0], [0.0, 8.0 / 3.0]], epsilon = 1e-15);

    let full = decompose_covariance(cov.view(), &PcaConfig::default()).unwrap();
    assert_abs_diff_eq!(full.eigenvalues(), array![8.0 / 3.0, 8.0 / 3.0], epsilon = 1e-15);
    assert_eq!(full.degenerate_indices(), vec![0, 1]);
    let indices: Vec<usize> = full.pairs().iter().map(|p| p.original_index).collect();
    assert_eq!(indices, vec![0, 1]);
}

#[test]
fn test_rotated_basis_in_tied_eigenspace_is_indeterminate() {
    let data = array![[2.0, 0.0], [0.0, 2.0], [-2.0, 0.0], [0.0, -2.0]];
    let mut pca = PCA::new(PcaConfig::with_components(2));
    let reference = pca.fit(data.view()).unwrap();
    let degenerate = pca.components().unwrap().degenerate_indices();
    assert_eq!(degenerate, vec![0, 1]);

    // Any rotation of the axes is an equally valid answer for Σ = cI
    let angle = std::f64::consts::FRAC_PI_4;
    let rotation = array![[angle.cos(), -angle.sin()], [angle.sin(), angle.cos()]];
    let candidate = reference.dot(&rotation);

    let naive = validate_projections(reference.view(), candidate.view()).unwrap();
    assert!(naive.indeterminate.is_empty());
    assert_abs_diff_eq!(naive.average_correlation.unwrap(), angle.cos(), epsilon = 1e-12);

    let labels = [0, 0, 1, 1];
    let validation =
        validate_with_breakdown(reference.view(), candidate.view(), &degenerate, Some(&labels[..]))
            .unwrap();
    assert_eq!(validation.report.indeterminate, vec![0, 1]);
    assert_eq!(validation.report.average_correlation, None);
    assert_ne!(validation.report.agreement, Agreement::Excellent);
    for report in validation.by_class.unwrap().values() {
        assert_eq!(report.indeterminate, vec![0, 1]);
        assert_ne!(report.agreement, Agreement::Excellent);
    }
}

#[test]
fn test_single_column_flip_scenario() {
    let reference = array![[1.0], [-1.0], [2.0], [-2.0]];
    let candidate = array![[-1.0], [1.0], [-2.0], [2.0]];
    let alignment = align_signs(reference.view(), candidate.view()).unwrap();
    assert_eq!(alignment.correlations_before, vec![Some(-1.0)]);
    assert_eq!(alignment.flipped, vec![0]);

    let report = compute_concordance(reference.view(), alignment.adjusted.view()).unwrap();
    assert_eq!(report.correlations(), vec![Some(1.0)]);
    assert_eq!(report.mse, 0.0);
}

#[test]
fn test_non_convergence_surfaces_through_fit() {
    let data = generate_correlated_data(20, 4, 1);
    let mut config = PcaConfig::with_components(2);
    config.jacobi.max_sweeps = Some(0);
    let mut pca = PCA::new(config);
    assert!(matches!(
        pca.fit(data.view()),
        Err(PcaError::NonConvergence { sweeps: 0, .. })
    ));
}

#[test]
fn test_per_class_breakdown() {
    let data = generate_correlated_data(40, 4, 13);
    let mut pca = PCA::new(PcaConfig::with_components(2));
    let reference = pca.fit(data.view()).unwrap();
    let candidate = -&reference;
    let aligned = align_signs(reference.view(), candidate.view()).unwrap();

    let mut labels: Vec<i64> = (0..40).map(|i| i % 2).collect();
    labels[39] = 7;
    let by_class = concordance_by_class(reference.view(), aligned.adjusted.view(), &labels, &[]).unwrap();
    assert_eq!(by_class.keys().copied().collect::<Vec<_>>(), vec![0, 1, 7]);
    assert_eq!(by_class[&0].n_samples, 20);
    assert_eq!(by_class[&0].agreement, Agreement::Excellent);
    // A single sample has no defined correlation
    assert_eq!(by_class[&7].indeterminate, vec![0, 1]);
    assert_eq!(by_class[&7].agreement, Agreement::NeedsReview);

    assert!(matches!(
        concordance_by_class(reference.view(), aligned.adjusted.view(), &labels[..10], &[]),
        Err(PcaError::InvalidParameter { .. })
    ));
}

#[cfg(feature = "lapack")]
#[test]
fn test_jacobi_and_lapack_projections_agree() {
    use concordant_pca::LapackEigenSolver;

    let data = generate_correlated_data(100, 8, 4242);
    let mut jacobi_pca = PCA::new(PcaConfig::with_components(4));
    let jacobi_scores = jacobi_pca.fit(data.view()).unwrap();
    let mut lapack_pca = PCA::new(PcaConfig::with_components(4));
    let lapack_scores = lapack_pca
        .fit_with_solver(data.view(), &LapackEigenSolver)
        .unwrap();

    let report = validate_projections(jacobi_scores.view(), lapack_scores.view()).unwrap();
    assert!(report.max_abs_diff < 1e-8);
    assert_eq!(report.agreement, Agreement::Excellent);
}
