//! Unbiased sample covariance of centered data.

use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView2};
use rayon::prelude::*;

use crate::centering::center;
use crate::error::{PcaError, Result};
use crate::stats::compensated_dot;

/// Computes Σ = X′ᵗ·X′ / (N − 1) for a centered N×M matrix.
///
/// Only the upper triangle is computed; each entry is mirrored, so the
/// result is exactly symmetric. Entries are independent and evaluated in
/// parallel.
///
/// # Errors
/// `InsufficientSamples` if N < 2, `InvalidShape` if M = 0.
pub fn covariance(centered: ArrayView2<f64>) -> Result<Array2<f64>> {
    let (n_samples, n_features) = centered.dim();
    if n_samples < 2 {
        return Err(PcaError::insufficient_samples(2, n_samples));
    }
    if n_features == 0 {
        return Err(PcaError::invalid_shape("centered matrix has no columns"));
    }
    let denominator = (n_samples - 1) as f64;

    let upper_pairs: Vec<(usize, usize)> = (0..n_features)
        .flat_map(|i| (i..n_features).map(move |j| (i, j)))
        .collect();
    let entries: Vec<f64> = upper_pairs
        .par_iter()
        .map(|&(i, j)| compensated_dot(centered.column(i), centered.column(j)) / denominator)
        .collect();

    let mut cov_matrix = Array2::<f64>::zeros((n_features, n_features));
    for (&(i, j), value) in upper_pairs.iter().zip(entries) {
        cov_matrix[[i, j]] = value;
        cov_matrix[[j, i]] = value;
    }
    debug!(
        "Covariance matrix {}x{} from {} samples.",
        n_features, n_features, n_samples
    );
    Ok(cov_matrix)
}

/// Centers `data` and returns its mean vector together with its covariance.
pub fn center_and_covariance(data: ArrayView2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
    let (n_samples, n_features) = data.dim();
    info!(
        "Computing mean and covariance of {} samples x {} features.",
        n_samples, n_features
    );
    let (mean_vector, centered) = center(data)?;
    let cov_matrix = covariance(centered.view())?;
    Ok((mean_vector, cov_matrix))
}

/// Sum of the diagonal.
pub fn trace(matrix: ArrayView2<f64>) -> f64 {
    matrix.diag().sum()
}
