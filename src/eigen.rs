//! Symmetric eigen-decomposition by cyclic Jacobi rotations.
//!
//! Each sweep applies one plane rotation to every off-diagonal pair (p, q),
//! in row order. Rotations are orthogonal similarity transforms, so the
//! spectrum is preserved and the accumulated product of rotations is an
//! orthonormal eigenbasis. Eigenvector signs are whatever the rotations
//! produce; callers must not rely on them.

use log::{debug, trace};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::Serialize;

use crate::config::JacobiConfig;
use crate::error::{PcaError, Result};

/// Inputs whose asymmetry exceeds this fraction of their Frobenius norm are
/// rejected.
const SYMMETRY_RTOL: f64 = 1e-9;

/// One eigenvalue with its unit-norm eigenvector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EigenPair {
    pub eigenvalue: f64,
    /// Unit norm, length M. Sign is arbitrary.
    pub eigenvector: Array1<f64>,
    /// Position of this pair in the solver's output, used as the tie-break key.
    pub original_index: usize,
}

/// Output of a symmetric eigendecomposition.
#[derive(Debug)]
pub struct EighOutput {
    /// Eigenvalues in solver order (not sorted).
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors as columns; column i corresponds to eigenvalues[i].
    pub eigenvectors: Array2<f64>,
}

impl EighOutput {
    /// Splits the output into pairs, normalizing each eigenvector.
    pub fn into_pairs(self) -> Vec<EigenPair> {
        self.eigenvalues
            .iter()
            .zip(self.eigenvectors.axis_iter(Axis(1)))
            .enumerate()
            .map(|(original_index, (&eigenvalue, column))| {
                let mut eigenvector = column.to_owned();
                let norm = eigenvector.dot(&eigenvector).sqrt();
                if norm > 0.0 {
                    eigenvector.mapv_inplace(|x| x / norm);
                }
                EigenPair {
                    eigenvalue,
                    eigenvector,
                    original_index,
                }
            })
            .collect()
    }
}

/// Root of the sum of squares, scaled by the largest magnitude so that
/// entries above ~1e154 do not overflow.
fn scaled_l2(values: &[f64]) -> f64 {
    let scale = values.iter().fold(0.0f64, |acc, &x| acc.max(x.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return scale;
    }
    let sum: f64 = values
        .iter()
        .map(|&x| {
            let r = x / scale;
            r * r
        })
        .sum();
    scale * sum.sqrt()
}

/// Frobenius norm of a matrix.
pub fn frobenius_norm(matrix: ArrayView2<f64>) -> f64 {
    let entries: Vec<f64> = matrix.iter().copied().collect();
    scaled_l2(&entries)
}

/// Frobenius norm of the strictly off-diagonal part of a square matrix.
pub fn off_diagonal_norm(matrix: ArrayView2<f64>) -> f64 {
    let off_diagonal: Vec<f64> = matrix
        .indexed_iter()
        .filter(|((i, j), _)| i != j)
        .map(|(_, &value)| value)
        .collect();
    scaled_l2(&off_diagonal)
}

fn validate_symmetric(matrix: ArrayView2<f64>) -> Result<()> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(PcaError::invalid_shape(format!(
            "eigen-decomposition needs a square matrix, got {}x{}",
            rows, cols
        )));
    }
    if rows == 0 {
        return Err(PcaError::invalid_shape("eigen-decomposition of an empty matrix"));
    }
    if matrix.iter().any(|x| !x.is_finite()) {
        return Err(PcaError::invalid_parameter(
            "matrix contains non-finite (NaN or infinity) values",
        ));
    }
    let asymmetry = frobenius_norm((&matrix - &matrix.t()).view());
    let scale = frobenius_norm(matrix);
    if asymmetry > SYMMETRY_RTOL * scale {
        return Err(PcaError::invalid_parameter(format!(
            "matrix is not symmetric (asymmetry {:e} relative to norm {:e})",
            asymmetry, scale
        )));
    }
    Ok(())
}

/// Applies the rotation in plane (p, q) that zeroes `a[[p, q]]`, updating the
/// accumulated eigenvector matrix `v`.
fn rotate(a: &mut Array2<f64>, v: &mut Array2<f64>, p: usize, q: usize) {
    let apq = a[[p, q]];
    if apq == 0.0 {
        return;
    }
    let app = a[[p, p]];
    let aqq = a[[q, q]];
    let theta = (aqq - app) / (2.0 * apq);
    // Smaller root of t² + 2θt − 1 = 0, i.e. rotation angle at most π/4
    let t = if theta.abs() > 1e150 {
        0.5 / theta
    } else {
        theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
    };
    let c = 1.0 / (t * t + 1.0).sqrt();
    let s = t * c;
    let n = a.nrows();

    for k in 0..n {
        let akp = a[[k, p]];
        let akq = a[[k, q]];
        a[[k, p]] = c * akp - s * akq;
        a[[k, q]] = s * akp + c * akq;
    }
    for k in 0..n {
        let apk = a[[p, k]];
        let aqk = a[[q, k]];
        a[[p, k]] = c * apk - s * aqk;
        a[[q, k]] = s * apk + c * aqk;
    }
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for k in 0..n {
        let vkp = v[[k, p]];
        let vkq = v[[k, q]];
        v[[k, p]] = c * vkp - s * vkq;
        v[[k, q]] = s * vkp + c * vkq;
    }
}

/// Cyclic Jacobi eigendecomposition of a real symmetric matrix.
///
/// Converges when the off-diagonal Frobenius norm is at most
/// `config.tolerance · ‖A‖_F`. The number of sweeps is bounded by
/// [`JacobiConfig::sweep_limit`].
///
/// # Errors
/// - `InvalidShape` if the matrix is empty or not square.
/// - `InvalidParameter` if it holds non-finite values or is not symmetric.
/// - `NonConvergence` with the residual reached if the sweep bound runs out.
pub fn jacobi_eigh(matrix: ArrayView2<f64>, config: &JacobiConfig) -> Result<EighOutput> {
    validate_symmetric(matrix)?;
    let n = matrix.nrows();
    if !(config.tolerance.is_finite() && config.tolerance >= 0.0) {
        return Err(PcaError::invalid_parameter(format!(
            "Jacobi tolerance must be finite and non-negative, got {}",
            config.tolerance
        )));
    }

    // Symmetrize away any rounding-level asymmetry before rotating; halves
    // are added so huge entries cannot overflow
    let mut a = matrix.to_owned();
    for p in 0..n {
        for q in (p + 1)..n {
            let mean = 0.5 * matrix[[p, q]] + 0.5 * matrix[[q, p]];
            a[[p, q]] = mean;
            a[[q, p]] = mean;
        }
    }
    let mut v = Array2::<f64>::eye(n);

    let scale = frobenius_norm(a.view());
    if scale == 0.0 {
        return Ok(EighOutput {
            eigenvalues: Array1::zeros(n),
            eigenvectors: v,
        });
    }
    let threshold = config.tolerance * scale;
    let max_sweeps = config.sweep_limit(n);

    let mut sweeps = 0usize;
    loop {
        let residual = off_diagonal_norm(a.view());
        trace!("Jacobi sweep {}: off-diagonal residual {:e}", sweeps, residual);
        if residual <= threshold {
            debug!(
                "Jacobi converged in {} sweeps for a {}x{} matrix (residual {:e}).",
                sweeps, n, n, residual
            );
            break;
        }
        if sweeps == max_sweeps {
            return Err(PcaError::NonConvergence { sweeps, residual });
        }
        for p in 0..n.saturating_sub(1) {
            for q in (p + 1)..n {
                rotate(&mut a, &mut v, p, q);
            }
        }
        sweeps += 1;
    }

    Ok(EighOutput {
        eigenvalues: a.diag().to_owned(),
        eigenvectors: v,
    })
}

/// Decomposes a symmetric matrix into M eigenpairs in solver order.
pub fn eigen_decompose(matrix: ArrayView2<f64>, config: &JacobiConfig) -> Result<Vec<EigenPair>> {
    Ok(jacobi_eigh(matrix, config)?.into_pairs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn assert_is_eigenpair(matrix: &Array2<f64>, pair: &EigenPair, tol: f64) {
        let lhs = matrix.dot(&pair.eigenvector);
        let rhs = &pair.eigenvector * pair.eigenvalue;
        assert_abs_diff_eq!(lhs, rhs, epsilon = tol);
        assert_abs_diff_eq!(pair.eigenvector.dot(&pair.eigenvector), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_known_2x2() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let pairs = eigen_decompose(m.view(), &JacobiConfig::default()).unwrap();
        let mut values: Vec<f64> = pairs.iter().map(|p| p.eigenvalue).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        assert_abs_diff_eq!(values[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(values[1], 3.0, epsilon = 1e-12);
        for pair in &pairs {
            assert_is_eigenpair(&m, pair, 1e-12);
        }
    }

    #[test]
    fn test_diagonal_input_needs_no_sweeps() {
        let m = array![[3.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 2.0]];
        let config = JacobiConfig {
            max_sweeps: Some(0),
            ..JacobiConfig::default()
        };
        let out = jacobi_eigh(m.view(), &config).unwrap();
        assert_eq!(out.eigenvalues, array![3.0, 1.0, 2.0]);
        assert_eq!(out.eigenvectors, Array2::<f64>::eye(3));
    }

    #[test]
    fn test_trace_and_orthonormality_5x5() {
        let m = array![
            [4.0, 1.0, 0.5, 0.0, 0.2],
            [1.0, 3.0, 0.3, 0.1, 0.0],
            [0.5, 0.3, 2.0, 0.7, 0.4],
            [0.0, 0.1, 0.7, 1.5, 0.6],
            [0.2, 0.0, 0.4, 0.6, 1.0]
        ];
        let out = jacobi_eigh(m.view(), &JacobiConfig::default()).unwrap();
        assert_abs_diff_eq!(out.eigenvalues.sum(), m.diag().sum(), epsilon = 1e-10);
        let gram = out.eigenvectors.t().dot(&out.eigenvectors);
        assert_abs_diff_eq!(gram, Array2::<f64>::eye(5), epsilon = 1e-12);
        for pair in out.into_pairs() {
            assert_is_eigenpair(&m, &pair, 1e-10);
        }
    }

    #[test]
    fn test_zero_matrix() {
        let m = Array2::<f64>::zeros((3, 3));
        let pairs = eigen_decompose(m.view(), &JacobiConfig::default()).unwrap();
        assert!(pairs.iter().all(|p| p.eigenvalue == 0.0));
        assert_eq!(
            pairs.iter().map(|p| p.original_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_sweep_bound_reports_non_convergence() {
        let m = array![[1.0, 0.5], [0.5, 1.0]];
        let config = JacobiConfig {
            tolerance: 1e-12,
            max_sweeps: Some(0),
        };
        match jacobi_eigh(m.view(), &config) {
            Err(PcaError::NonConvergence { sweeps, residual }) => {
                assert_eq!(sweeps, 0);
                assert_abs_diff_eq!(residual, 0.5f64.hypot(0.5), epsilon = 1e-15);
            }
            other => panic!("expected NonConvergence, got {:?}", other),
        }
    }

    #[test]
    fn test_norms_do_not_overflow() {
        let m = array![[3.0e200, 4.0e200], [4.0e200, 0.0]];
        assert_abs_diff_eq!(frobenius_norm(m.view()) / 1e200, 41.0f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(off_diagonal_norm(m.view()) / 1e200, 32.0f64.sqrt(), epsilon = 1e-12);
        assert_eq!(frobenius_norm(Array2::<f64>::zeros((2, 2)).view()), 0.0);
    }

    #[test]
    fn test_huge_matrix_is_rotated() {
        let scale = 1.0e160;
        let small = array![[2.0, 1.0], [1.0, 2.0]];
        let big = &small * scale;
        let out = jacobi_eigh(big.view(), &JacobiConfig::default()).unwrap();
        let mut values: Vec<f64> = out.eigenvalues.iter().map(|v| v / scale).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        assert_abs_diff_eq!(values[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(values[1], 3.0, epsilon = 1e-12);
        assert!(out.eigenvectors[[0, 1]].abs() > 0.5);
    }

    #[test]
    fn test_rejects_bad_input() {
        let rect = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            jacobi_eigh(rect.view(), &JacobiConfig::default()),
            Err(PcaError::InvalidShape { .. })
        ));
        let asym = array![[1.0, 2.0], [0.0, 1.0]];
        assert!(matches!(
            jacobi_eigh(asym.view(), &JacobiConfig::default()),
            Err(PcaError::InvalidParameter { .. })
        ));
        let nan = array![[1.0, f64::NAN], [f64::NAN, 1.0]];
        assert!(matches!(
            jacobi_eigh(nan.view(), &JacobiConfig::default()),
            Err(PcaError::InvalidParameter { .. })
        ));
    }
}
