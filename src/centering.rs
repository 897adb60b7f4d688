//! Sample matrix construction and mean-centering.

use log::debug;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;

use crate::error::{PcaError, Result};
use crate::stats;

/// Builds an N×M sample matrix from row vectors.
///
/// # Errors
/// `InvalidShape` if there are no rows, no columns, or any row length
/// differs from the first.
pub fn sample_matrix_from_rows(rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let n_samples = rows.len();
    if n_samples == 0 {
        return Err(PcaError::invalid_shape("sample matrix has no rows"));
    }
    let n_features = rows[0].len();
    if n_features == 0 {
        return Err(PcaError::invalid_shape("sample matrix has no columns"));
    }

    let mut flat = Vec::with_capacity(n_samples * n_features);
    for (row_idx, row) in rows.iter().enumerate() {
        if row.len() != n_features {
            return Err(PcaError::invalid_shape(format!(
                "row {} has {} values, expected {}",
                row_idx,
                row.len(),
                n_features
            )));
        }
        flat.extend_from_slice(row);
    }
    Array2::from_shape_vec((n_samples, n_features), flat)
        .map_err(|e| PcaError::invalid_shape(e.to_string()))
}

/// Per-column arithmetic mean.
///
/// Each column is summed with compensation, then refined once with the mean
/// of the residuals so that the centered columns average to zero to within
/// rounding even when the values share a large offset.
pub fn column_means(data: ArrayView2<f64>) -> Result<Array1<f64>> {
    let (n_samples, n_features) = data.dim();
    if n_samples == 0 || n_features == 0 {
        return Err(PcaError::invalid_shape(format!(
            "cannot center a {}x{} matrix",
            n_samples, n_features
        )));
    }

    let means: Vec<f64> = data
        .axis_iter(Axis(1))
        .into_par_iter()
        .map(|column| {
            let first = stats::mean(column).unwrap_or(0.0);
            let correction =
                stats::compensated_sum(column.iter().map(|&x| x - first)) / n_samples as f64;
            first + correction
        })
        .collect();
    Ok(Array1::from(means))
}

/// Subtracts the per-column mean from every row.
///
/// Returns the mean vector and the centered copy; the input is left untouched.
///
/// # Errors
/// `InvalidShape` if the matrix has zero rows or zero columns.
pub fn center(data: ArrayView2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
    let mean_vector = column_means(data)?;
    let centered = &data - &mean_vector;
    debug!(
        "Centered {}x{} sample matrix.",
        centered.nrows(),
        centered.ncols()
    );
    Ok((mean_vector, centered))
}

/// Centers `data` with a previously computed mean.
pub fn center_with(data: ArrayView2<f64>, mean_vector: &Array1<f64>) -> Result<Array2<f64>> {
    if data.ncols() != mean_vector.len() {
        return Err(PcaError::invalid_parameter(format!(
            "input has {} features but the mean vector has {}",
            data.ncols(),
            mean_vector.len()
        )));
    }
    Ok(&data - mean_vector)
}
