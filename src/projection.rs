//! Projection of centered samples onto principal axes.

use log::debug;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;

use crate::error::{PcaError, Result};
use crate::selection::ComponentSet;

/// Computes the N×K score matrix Y with Y[:, k] = X′ · v_k.
///
/// Columns are independent dot products and are evaluated in parallel.
/// The sample variance of column k equals the k-th eigenvalue when `centered`
/// is the data the components were fitted on.
///
/// # Errors
/// `InvalidParameter` if `components` is empty or its eigenvectors do not
/// have one entry per column of `centered`.
pub fn project(centered: ArrayView2<f64>, components: &ComponentSet) -> Result<Array2<f64>> {
    let (n_samples, n_features) = centered.dim();
    if components.is_empty() {
        return Err(PcaError::invalid_parameter("no components to project onto"));
    }
    if components.n_features() != n_features {
        return Err(PcaError::invalid_parameter(format!(
            "components have {} features but the data has {}",
            components.n_features(),
            n_features
        )));
    }

    let columns: Vec<Array1<f64>> = components
        .pairs()
        .par_iter()
        .map(|pair| centered.dot(&pair.eigenvector))
        .collect();

    let mut projected = Array2::<f64>::zeros((n_samples, components.len()));
    for (mut target, column) in projected.axis_iter_mut(Axis(1)).zip(columns.iter()) {
        target.assign(column);
    }
    debug!(
        "Projected {} samples onto {} components.",
        n_samples,
        components.len()
    );
    Ok(projected)
}
