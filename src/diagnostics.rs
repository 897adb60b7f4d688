// src/diagnostics.rs

use ndarray::{Array2, ArrayView2};
use serde::Serialize;

use crate::eigen::frobenius_norm;
use crate::selection::ComponentSet;

/// Numerical health of a fitted decomposition, logged at debug level by
/// `PCA::fit` and checked by the tests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecompositionDiagnostics {
    pub n_features: usize,
    pub n_components: usize,
    pub covariance_fro_norm: f64,           // ||Σ||_F
    pub orthogonality_error: f64,           // ||I - VᵀV||_F over the kept components
    pub trace_gap_rel: f64,                 // |tr(Σ) - Σλ| / max(|tr(Σ)|, tiny), full spectrum
    pub reconstruction_error_rel: Option<f64>, // ||Σ - VΛVᵀ||_F / ||Σ||_F, only when K = M
    pub degenerate_components: Vec<usize>,
}

/// Computes orthogonality error ||I - QᵀQ||_F for a matrix with orthonormal columns.
pub fn orthogonality_error(q_matrix: ArrayView2<f64>) -> f64 {
    if q_matrix.ncols() == 0 {
        return 0.0;
    }
    let qtq = q_matrix.t().dot(&q_matrix);
    let identity = Array2::<f64>::eye(qtq.nrows());
    frobenius_norm((identity - qtq).view())
}

/// Computes reconstruction error ||Σ - VΛVᵀ||_F / ||Σ||_F.
///
/// Only meaningful when `components` holds the full spectrum. Returns `None`
/// on a dimension mismatch.
pub fn reconstruction_error(matrix: ArrayView2<f64>, components: &ComponentSet) -> Option<f64> {
    if matrix.nrows() != matrix.ncols() || matrix.nrows() != components.n_features() {
        return None;
    }
    let rotation = components.rotation();
    let lambda = Array2::from_diag(&components.eigenvalues());
    let reconstructed = rotation.dot(&lambda).dot(&rotation.t());
    let diff = &matrix - &reconstructed;

    let norm_diff = frobenius_norm(diff.view());
    let norm_original = frobenius_norm(matrix);
    if norm_original < 1e-300 {
        // Zero matrix: perfect if the reconstruction is also zero
        return Some(if norm_diff < 1e-300 { 0.0 } else { f64::INFINITY });
    }
    Some(norm_diff / norm_original)
}

/// Relative gap between the trace and the eigenvalue sum.
pub fn trace_gap(matrix: ArrayView2<f64>, eigenvalues: &[f64]) -> f64 {
    let trace = matrix.diag().sum();
    let sum: f64 = eigenvalues.iter().sum();
    (trace - sum).abs() / trace.abs().max(f64::MIN_POSITIVE)
}

/// Collects diagnostics for a decomposition of `covariance`.
///
/// `full` must be the complete sorted spectrum and `kept` the truncated set.
pub fn diagnose(
    covariance: ArrayView2<f64>,
    full: &ComponentSet,
    kept: &ComponentSet,
) -> DecompositionDiagnostics {
    let all_eigenvalues = full.eigenvalues().to_vec();
    DecompositionDiagnostics {
        n_features: full.n_features(),
        n_components: kept.len(),
        covariance_fro_norm: frobenius_norm(covariance),
        orthogonality_error: orthogonality_error(kept.rotation().view()),
        trace_gap_rel: trace_gap(covariance, &all_eigenvalues),
        reconstruction_error_rel: reconstruction_error(covariance, full),
        degenerate_components: kept.degenerate_indices(),
    }
}
