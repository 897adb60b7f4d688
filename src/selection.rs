//! Ordering and truncation of eigenpairs.

use float_cmp::{ApproxEq, F64Margin};
use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};
use serde::Serialize;

use crate::eigen::EigenPair;
use crate::error::{PcaError, Result};

/// Eigenpairs sorted by eigenvalue, largest first.
///
/// Tied eigenvalues keep ascending `original_index` order. That order is only
/// for determinism: within a degenerate eigenspace any orthonormal basis is
/// equally valid, so the affected components are flagged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSet {
    pairs: Vec<EigenPair>,
    degenerate: Vec<bool>,
    /// Sum of the non-negative eigenvalues of the full spectrum.
    total_variance: f64,
}

impl ComponentSet {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[EigenPair] {
        &self.pairs
    }

    pub fn get(&self, k: usize) -> Option<&EigenPair> {
        self.pairs.get(k)
    }

    /// Dimension M of the eigenvectors.
    pub fn n_features(&self) -> usize {
        self.pairs.first().map_or(0, |p| p.eigenvector.len())
    }

    /// Eigenvalues in component order.
    pub fn eigenvalues(&self) -> Array1<f64> {
        self.pairs.iter().map(|p| p.eigenvalue).collect()
    }

    /// Eigenvectors stacked as columns, shape (M, K).
    pub fn rotation(&self) -> Array2<f64> {
        let mut rotation = Array2::<f64>::zeros((self.n_features(), self.len()));
        for (mut column, pair) in rotation.axis_iter_mut(Axis(1)).zip(&self.pairs) {
            column.assign(&pair.eigenvector);
        }
        rotation
    }

    /// Whether component `k` shares its eigenvalue with another eigenpair
    /// (including ones dropped by truncation).
    pub fn is_degenerate(&self, k: usize) -> bool {
        self.degenerate.get(k).copied().unwrap_or(false)
    }

    /// Positions of all degenerate components.
    pub fn degenerate_indices(&self) -> Vec<usize> {
        self.degenerate
            .iter()
            .enumerate()
            .filter_map(|(k, &d)| d.then_some(k))
            .collect()
    }

    pub fn total_variance(&self) -> f64 {
        self.total_variance
    }

    /// Fraction of total variance captured by each component.
    ///
    /// Negative eigenvalues (rounding noise on singular covariances) count as zero.
    pub fn explained_variance_ratio(&self) -> Array1<f64> {
        if self.total_variance <= 0.0 {
            return Array1::zeros(self.len());
        }
        self.pairs
            .iter()
            .map(|p| p.eigenvalue.max(0.0) / self.total_variance)
            .collect()
    }

    /// Keeps the first `k` components.
    ///
    /// # Errors
    /// `InvalidParameter` unless 1 ≤ k ≤ len.
    pub fn top_k(&self, k: usize) -> Result<ComponentSet> {
        check_k(k, self.len())?;
        Ok(ComponentSet {
            pairs: self.pairs[..k].to_vec(),
            degenerate: self.degenerate[..k].to_vec(),
            total_variance: self.total_variance,
        })
    }
}

fn check_k(k: usize, m: usize) -> Result<()> {
    if k < 1 || k > m {
        return Err(PcaError::invalid_parameter(format!(
            "number of components K must be in [1, {}], got {}",
            m, k
        )));
    }
    Ok(())
}

/// Sorts all eigenpairs by descending eigenvalue.
///
/// Pairs are first put in strict (eigenvalue desc, index asc) order; then each
/// run of neighbours whose eigenvalues agree within
/// `tie_tolerance · max|λ|` is reordered by original index and flagged as
/// degenerate.
///
/// # Errors
/// `InvalidParameter` if `pairs` is empty, an eigenvalue is NaN, or the
/// eigenvectors differ in length.
pub fn sort_components(mut pairs: Vec<EigenPair>, tie_tolerance: f64) -> Result<ComponentSet> {
    if pairs.is_empty() {
        return Err(PcaError::invalid_parameter("no eigenpairs to sort"));
    }
    if pairs.iter().any(|p| p.eigenvalue.is_nan()) {
        return Err(PcaError::invalid_parameter("eigenvalue is NaN"));
    }
    let n_features = pairs[0].eigenvector.len();
    if pairs.iter().any(|p| p.eigenvector.len() != n_features) {
        return Err(PcaError::invalid_parameter(
            "eigenvectors have inconsistent lengths",
        ));
    }

    pairs.sort_by(|a, b| {
        b.eigenvalue
            .total_cmp(&a.eigenvalue)
            .then(a.original_index.cmp(&b.original_index))
    });

    let largest_magnitude = pairs
        .iter()
        .fold(0.0f64, |acc, p| acc.max(p.eigenvalue.abs()));
    let margin = F64Margin {
        epsilon: tie_tolerance.max(0.0) * largest_magnitude,
        ulps: 4,
    };

    let mut degenerate = vec![false; pairs.len()];
    let mut run_start = 0;
    for i in 1..=pairs.len() {
        let continues_run = i < pairs.len()
            && pairs[i]
                .eigenvalue
                .approx_eq(pairs[i - 1].eigenvalue, margin);
        if continues_run {
            continue;
        }
        if i - run_start > 1 {
            pairs[run_start..i].sort_by_key(|p| p.original_index);
            degenerate[run_start..i].iter_mut().for_each(|d| *d = true);
            warn!(
                "Eigenvalues at sorted positions {}..{} are tied ({:e}); their eigenvectors are not unique.",
                run_start,
                i,
                pairs[run_start].eigenvalue
            );
        }
        run_start = i;
    }

    let total_variance = pairs.iter().map(|p| p.eigenvalue.max(0.0)).sum();
    debug!(
        "Sorted {} eigenpairs; largest eigenvalue {:e}.",
        pairs.len(),
        pairs[0].eigenvalue
    );
    Ok(ComponentSet {
        pairs,
        degenerate,
        total_variance,
    })
}

/// Sorts eigenpairs and keeps the top `k`.
///
/// # Errors
/// `InvalidParameter` if k < 1 or k > M, plus anything [`sort_components`] rejects.
pub fn select_top_k(pairs: Vec<EigenPair>, k: usize, tie_tolerance: f64) -> Result<ComponentSet> {
    check_k(k, pairs.len())?;
    sort_components(pairs, tie_tolerance)?.top_k(k)
}
