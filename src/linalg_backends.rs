// src/linalg_backends.rs

use ndarray::ArrayView2;

use crate::config::JacobiConfig;
use crate::eigen::{jacobi_eigh, EigenPair, EighOutput};
use crate::error::Result;

/// Trait for symmetric eigendecomposition.
///
/// Implementers expect `matrix` to be symmetric. Output order and eigenvector
/// signs are implementation-defined; sort with
/// [`crate::selection::sort_components`] and compare with
/// [`crate::alignment::align_signs`].
pub trait SymmetricEigenSolver: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    fn eigh(&self, matrix: ArrayView2<f64>) -> Result<EighOutput>;

    fn decompose(&self, matrix: ArrayView2<f64>) -> Result<Vec<EigenPair>> {
        Ok(self.eigh(matrix)?.into_pairs())
    }
}

/// The crate's own cyclic Jacobi solver.
#[derive(Debug, Default, Clone)]
pub struct JacobiEigenSolver {
    config: JacobiConfig,
}

impl JacobiEigenSolver {
    pub fn new(config: JacobiConfig) -> Self {
        Self { config }
    }
}

impl SymmetricEigenSolver for JacobiEigenSolver {
    fn name(&self) -> &'static str {
        "jacobi"
    }

    fn eigh(&self, matrix: ArrayView2<f64>) -> Result<EighOutput> {
        jacobi_eigh(matrix, &self.config)
    }
}

// --- LAPACK reference backend (ndarray-linalg) ---
#[cfg(feature = "lapack")]
mod lapack_specific_code {
    use super::SymmetricEigenSolver;
    use crate::eigen::EighOutput;
    use crate::error::{PcaError, Result};
    use ndarray::ArrayView2;
    use ndarray_linalg::{Eigh, UPLO};

    /// Symmetric eigensolver backed by LAPACK's `dsyev` family.
    ///
    /// Used as an independent reference when validating the Jacobi solver.
    #[derive(Debug, Default, Copy, Clone)]
    pub struct LapackEigenSolver;

    impl SymmetricEigenSolver for LapackEigenSolver {
        fn name(&self) -> &'static str {
            "lapack"
        }

        fn eigh(&self, matrix: ArrayView2<f64>) -> Result<EighOutput> {
            if matrix.nrows() != matrix.ncols() || matrix.nrows() == 0 {
                return Err(PcaError::invalid_shape(format!(
                    "eigen-decomposition needs a non-empty square matrix, got {:?}",
                    matrix.dim()
                )));
            }
            let (eigenvalues, eigenvectors) = matrix
                .eigh(UPLO::Upper)
                .map_err(|e| PcaError::Backend(e.to_string()))?;
            Ok(EighOutput {
                eigenvalues,
                eigenvectors,
            })
        }
    }
}

#[cfg(feature = "lapack")]
pub use lapack_specific_code::LapackEigenSolver;
