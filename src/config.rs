//! Configuration for the PCA pipeline.

use serde::{Deserialize, Serialize};

/// Convergence settings for the cyclic Jacobi eigensolver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JacobiConfig {
    /// Iteration stops once the off-diagonal Frobenius norm is at most
    /// `tolerance` times the Frobenius norm of the input matrix.
    pub tolerance: f64,
    /// Upper bound on full sweeps. `None` uses [`JacobiConfig::default_max_sweeps`].
    pub max_sweeps: Option<usize>,
}

impl Default for JacobiConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_sweeps: None,
        }
    }
}

impl JacobiConfig {
    /// Default sweep bound for an M×M matrix: `max(50, 10·⌈log2(M+1)⌉)`.
    ///
    /// Cyclic Jacobi converges quadratically once the off-diagonal mass is
    /// small, so typical inputs finish in well under ten sweeps.
    pub fn default_max_sweeps(n_features: usize) -> usize {
        let log2_ceil = (usize::BITS - n_features.leading_zeros()) as usize;
        (10 * log2_ceil).max(50)
    }

    /// The sweep bound that applies to an M×M matrix.
    pub fn sweep_limit(&self, n_features: usize) -> usize {
        self.max_sweeps
            .unwrap_or_else(|| Self::default_max_sweeps(n_features))
    }
}

/// Settings for a full fit: how many components to keep, how to decompose,
/// and when two eigenvalues count as tied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PcaConfig {
    /// Number of principal components K to keep (1 ≤ K ≤ M).
    pub n_components: usize,
    /// Eigensolver settings.
    pub jacobi: JacobiConfig,
    /// Eigenvalues closer than this fraction of the largest |eigenvalue| are
    /// treated as tied and ordered by original index.
    pub tie_tolerance: f64,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            n_components: 2,
            jacobi: JacobiConfig::default(),
            tie_tolerance: 1e-9,
        }
    }
}

impl PcaConfig {
    /// Default configuration keeping `n_components` components.
    pub fn with_components(n_components: usize) -> Self {
        Self {
            n_components,
            ..Self::default()
        }
    }
}
