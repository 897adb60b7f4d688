// Principal component analysis (PCA) with cross-implementation concordance

#![doc = include_str!("../README.md")]

pub mod alignment;
pub mod centering;
pub mod concordance;
pub mod config;
pub mod covariance;
pub mod diagnostics;
pub mod eigen;
pub mod error;
pub mod io;
pub mod linalg_backends;
pub mod pca;
pub mod projection;
pub mod selection;
mod stats;

use ndarray::ArrayView2;

pub use alignment::{align_signs, best_global_sign, SignAlignment};
pub use centering::{center, center_with};
pub use concordance::{
    compute_concordance, concordance_by_class, validate_projections, validate_with_breakdown,
    Agreement, ComponentConcordance, ConcordanceReport, DifferenceStats, ProjectionValidation,
};
pub use config::{JacobiConfig, PcaConfig};
pub use covariance::{center_and_covariance, covariance};
pub use eigen::{eigen_decompose, EigenPair};
pub use error::{PcaError, Result};
#[cfg(feature = "lapack")]
pub use linalg_backends::LapackEigenSolver;
pub use linalg_backends::{JacobiEigenSolver, SymmetricEigenSolver};
pub use pca::PCA;
pub use projection::project;
pub use selection::{select_top_k, sort_components, ComponentSet};
pub use stats::pearson_correlation;

/// Decomposes a covariance matrix into its full, sorted spectrum.
///
/// Equivalent to [`eigen_decompose`] followed by [`sort_components`] with the
/// tolerances in `config`.
pub fn decompose_covariance(covariance: ArrayView2<f64>, config: &PcaConfig) -> Result<ComponentSet> {
    let pairs = eigen_decompose(covariance, &config.jacobi)?;
    sort_components(pairs, config.tie_tolerance)
}
