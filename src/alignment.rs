//! Per-component sign alignment of two projections of the same data.
//!
//! An eigenvector v and its negation −v are equally valid, so two correct
//! PCA runs may disagree column-by-column in sign. Before comparing, each
//! candidate column is negated when it is anti-correlated with the matching
//! reference column. Negation changes neither the captured variance nor the
//! magnitude of any correlation.

use log::{debug, warn};
use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

use crate::error::{PcaError, Result};
use crate::stats::{compensated_sum, pearson_correlation};

/// Result of [`align_signs`].
#[derive(Debug, Clone, PartialEq)]
pub struct SignAlignment {
    /// Candidate with anti-correlated columns negated.
    pub adjusted: Array2<f64>,
    /// Columns that were negated, ascending.
    pub flipped: Vec<usize>,
    /// Columns whose correlation is undefined (a side has zero variance);
    /// these are never flipped.
    pub indeterminate: Vec<usize>,
    /// Pearson correlation of each column before alignment.
    pub correlations_before: Vec<Option<f64>>,
}

/// Fails with `InvalidParameter` unless both matrices are N×K with N, K ≥ 1
/// and every entry is finite.
pub(crate) fn check_comparable(reference: ArrayView2<f64>, candidate: ArrayView2<f64>) -> Result<()> {
    if reference.dim() != candidate.dim() {
        return Err(PcaError::invalid_parameter(format!(
            "reference is {:?} but candidate is {:?}",
            reference.dim(),
            candidate.dim()
        )));
    }
    if reference.nrows() == 0 || reference.ncols() == 0 {
        return Err(PcaError::invalid_parameter(format!(
            "cannot compare empty projections of shape {:?}",
            reference.dim()
        )));
    }
    for (name, matrix) in [("reference", reference.view()), ("candidate", candidate.view())] {
        if let Some(((row, col), value)) = matrix.indexed_iter().find(|(_, x)| !x.is_finite()) {
            return Err(PcaError::invalid_parameter(format!(
                "{} projection has non-finite value {} at row {}, column {}",
                name, value, row, col
            )));
        }
    }
    Ok(())
}

/// Column-wise Pearson correlations, computed in parallel.
pub(crate) fn column_correlations(
    reference: ArrayView2<f64>,
    candidate: ArrayView2<f64>,
) -> Vec<Option<f64>> {
    (0..reference.ncols())
        .into_par_iter()
        .map(|k| pearson_correlation(reference.column(k), candidate.column(k)))
        .collect()
}

/// Flips candidate columns that are anti-correlated with the reference.
///
/// # Errors
/// `InvalidParameter` if the two matrices differ in shape, are empty, or hold
/// non-finite values.
pub fn align_signs(reference: ArrayView2<f64>, candidate: ArrayView2<f64>) -> Result<SignAlignment> {
    check_comparable(reference, candidate)?;

    let correlations_before = column_correlations(reference, candidate);
    let mut adjusted = candidate.to_owned();
    let mut flipped = Vec::new();
    let mut indeterminate = Vec::new();

    for (k, (mut column, correlation)) in adjusted
        .axis_iter_mut(Axis(1))
        .zip(&correlations_before)
        .enumerate()
    {
        match correlation {
            Some(rho) if *rho < 0.0 => {
                column.mapv_inplace(|x| -x);
                flipped.push(k);
            }
            Some(_) => {}
            None => indeterminate.push(k),
        }
    }

    if !indeterminate.is_empty() {
        warn!(
            "Components {:?} have zero variance; their sign cannot be aligned.",
            indeterminate
        );
    }
    debug!("Sign alignment flipped components {:?}.", flipped);
    Ok(SignAlignment {
        adjusted,
        flipped,
        indeterminate,
        correlations_before,
    })
}

/// Chooses between `candidate` and `−candidate` as a whole, keeping whichever
/// has the lower mean squared error against `reference`.
///
/// This is the coarse check that assumes all components flip together; it is
/// kept for comparison with tools that validate that way. Returns the chosen
/// matrix and whether it was negated.
pub fn best_global_sign(
    reference: ArrayView2<f64>,
    candidate: ArrayView2<f64>,
) -> Result<(Array2<f64>, bool)> {
    check_comparable(reference, candidate)?;
    let squared_error = |sign: f64| {
        compensated_sum(
            reference
                .iter()
                .zip(candidate.iter())
                .map(|(&r, &c)| (r - sign * c) * (r - sign * c)),
        )
    };
    if squared_error(-1.0) < squared_error(1.0) {
        Ok((candidate.mapv(|x| -x), true))
    } else {
        Ok((candidate.to_owned(), false))
    }
}
