//! Agreement metrics between a reference projection and an aligned candidate.

use std::collections::BTreeMap;
use std::fmt;

use log::{info, warn};
use ndarray::{ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::alignment::{align_signs, check_comparable, column_correlations};
use crate::error::{PcaError, Result};
use crate::stats::{compensated_sum, summary};

/// Overall verdict from the average per-component correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agreement {
    /// Average correlation above 0.99.
    Excellent,
    /// Average correlation above 0.95.
    Good,
    NeedsReview,
}

impl Agreement {
    /// Classifies an average correlation; `None` (nothing determinate to
    /// average) needs review.
    pub fn from_average_correlation(average: Option<f64>) -> Self {
        match average {
            Some(avg) if avg > 0.99 => Agreement::Excellent,
            Some(avg) if avg > 0.95 => Agreement::Good,
            _ => Agreement::NeedsReview,
        }
    }
}

impl fmt::Display for Agreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Agreement::Excellent => "excellent",
            Agreement::Good => "good",
            Agreement::NeedsReview => "needs review",
        };
        f.write_str(label)
    }
}

/// Statistics of the per-sample difference reference − candidate for one
/// component. `std_dev` is the population standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DifferenceStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Concordance of one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentConcordance {
    pub index: usize,
    /// Pearson correlation; `None` when a column has zero variance.
    pub correlation: Option<f64>,
    pub difference: DifferenceStats,
    /// Excluded from the average correlation: either the correlation is
    /// undefined or the component lies in a degenerate eigenspace.
    pub indeterminate: bool,
}

/// Everything known about how well two projections agree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcordanceReport {
    pub n_samples: usize,
    pub n_components: usize,
    pub components: Vec<ComponentConcordance>,
    /// Mean squared error over all N×K entries.
    pub mse: f64,
    /// Mean absolute error over all N×K entries.
    pub mae: f64,
    pub max_abs_diff: f64,
    /// Mean absolute difference over all entries; equal to `mae`, reported
    /// under both names for consumers that expect either.
    pub mean_abs_diff: f64,
    /// Components negated during alignment.
    pub flipped: Vec<usize>,
    /// Components excluded from the agreement verdict.
    pub indeterminate: Vec<usize>,
    /// Average correlation over determinate components.
    pub average_correlation: Option<f64>,
    pub agreement: Agreement,
}

impl ConcordanceReport {
    /// Per-component correlations in order.
    pub fn correlations(&self) -> Vec<Option<f64>> {
        self.components.iter().map(|c| c.correlation).collect()
    }

    pub fn has_indeterminate(&self) -> bool {
        !self.indeterminate.is_empty()
    }

    /// Marks `indices` as indeterminate (e.g. components in a degenerate
    /// eigenspace, whose basis the two solvers may choose differently) and
    /// recomputes the verdict without them. Out-of-range indices are ignored.
    pub fn flag_indeterminate(&mut self, indices: &[usize]) {
        for &k in indices {
            if let Some(component) = self.components.get_mut(k) {
                component.indeterminate = true;
            }
        }
        self.refresh_verdict();
    }

    fn refresh_verdict(&mut self) {
        self.indeterminate = self
            .components
            .iter()
            .filter(|c| c.indeterminate)
            .map(|c| c.index)
            .collect();
        let determinate: Vec<f64> = self
            .components
            .iter()
            .filter(|c| !c.indeterminate)
            .filter_map(|c| c.correlation)
            .collect();
        self.average_correlation = if determinate.is_empty() {
            None
        } else {
            Some(determinate.iter().sum::<f64>() / determinate.len() as f64)
        };
        self.agreement = Agreement::from_average_correlation(self.average_correlation);
    }
}

/// Computes concordance metrics between `reference` and an already aligned
/// candidate. `flipped` on the result is empty; see [`validate_projections`].
///
/// # Errors
/// `InvalidParameter` if the matrices differ in shape, are empty, or hold
/// non-finite values.
pub fn compute_concordance(
    reference: ArrayView2<f64>,
    adjusted: ArrayView2<f64>,
) -> Result<ConcordanceReport> {
    check_comparable(reference, adjusted)?;
    let (n_samples, n_components) = reference.dim();
    let n_entries = (n_samples * n_components) as f64;

    let difference = &reference - &adjusted;
    let mse = compensated_sum(difference.iter().map(|d| d * d)) / n_entries;
    let mae = compensated_sum(difference.iter().map(|d| d.abs())) / n_entries;
    let max_abs_diff = difference.iter().fold(0.0f64, |acc, d| acc.max(d.abs()));

    let correlations = column_correlations(reference, adjusted);
    let difference_stats: Vec<DifferenceStats> = difference
        .axis_iter(Axis(1))
        .into_par_iter()
        .map(|column| {
            // Columns are non-empty, so summary always succeeds
            let (mean, std_dev, min, max) = summary(column).unwrap_or((0.0, 0.0, 0.0, 0.0));
            DifferenceStats {
                mean,
                std_dev,
                min,
                max,
            }
        })
        .collect();

    let components: Vec<ComponentConcordance> = correlations
        .into_iter()
        .zip(difference_stats)
        .enumerate()
        .map(|(index, (correlation, difference))| ComponentConcordance {
            index,
            correlation,
            difference,
            indeterminate: correlation.is_none(),
        })
        .collect();

    let mut report = ConcordanceReport {
        n_samples,
        n_components,
        components,
        mse,
        mae,
        max_abs_diff,
        mean_abs_diff: mae,
        flipped: Vec::new(),
        indeterminate: Vec::new(),
        average_correlation: None,
        agreement: Agreement::NeedsReview,
    };
    report.refresh_verdict();

    if report.has_indeterminate() {
        warn!(
            "Components {:?} are indeterminate and excluded from the agreement verdict.",
            report.indeterminate
        );
    }
    info!(
        "Concordance over {}x{}: MSE {:.6e}, MAE {:.6e}, max |diff| {:.6e}, agreement {}.",
        n_samples, n_components, report.mse, report.mae, report.max_abs_diff, report.agreement
    );
    Ok(report)
}

/// Aligns `candidate` to `reference` and reports their concordance, recording
/// which components were flipped.
pub fn validate_projections(
    reference: ArrayView2<f64>,
    candidate: ArrayView2<f64>,
) -> Result<ConcordanceReport> {
    let alignment = align_signs(reference, candidate)?;
    let mut report = compute_concordance(reference, alignment.adjusted.view())?;
    report.flipped = alignment.flipped;
    Ok(report)
}

/// Concordance restricted to the rows of each class label.
///
/// `labels` is aligned with the rows of both matrices. Classes with a single
/// sample have undefined correlations and come back fully indeterminate.
/// Components listed in `degenerate` are marked indeterminate in every class
/// report, as in [`ConcordanceReport::flag_indeterminate`].
///
/// # Errors
/// `InvalidParameter` if the shapes differ, an entry is non-finite, or
/// `labels` has the wrong length.
pub fn concordance_by_class(
    reference: ArrayView2<f64>,
    adjusted: ArrayView2<f64>,
    labels: &[i64],
    degenerate: &[usize],
) -> Result<BTreeMap<i64, ConcordanceReport>> {
    check_comparable(reference, adjusted)?;
    if labels.len() != reference.nrows() {
        return Err(PcaError::invalid_parameter(format!(
            "{} labels for {} samples",
            labels.len(),
            reference.nrows()
        )));
    }

    let mut rows_by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (row, &label) in labels.iter().enumerate() {
        rows_by_class.entry(label).or_default().push(row);
    }

    rows_by_class
        .into_iter()
        .map(|(label, rows)| -> Result<(i64, ConcordanceReport)> {
            let class_reference = reference.select(Axis(0), &rows);
            let class_adjusted = adjusted.select(Axis(0), &rows);
            let mut report = compute_concordance(class_reference.view(), class_adjusted.view())?;
            report.flag_indeterminate(degenerate);
            Ok((label, report))
        })
        .collect()
}

/// Overall and optional per-class concordance of one candidate projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionValidation {
    pub report: ConcordanceReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_class: Option<BTreeMap<i64, ConcordanceReport>>,
}

/// Aligns `candidate` once, then reports overall and (with `labels`)
/// per-class concordance.
///
/// `degenerate` lists components of the reference fit that lie in a tied
/// eigenspace (see [`crate::selection::ComponentSet::degenerate_indices`]);
/// their basis is not unique, so they are excluded from every verdict.
/// Each class report carries the same `flipped` list as the overall one.
pub fn validate_with_breakdown(
    reference: ArrayView2<f64>,
    candidate: ArrayView2<f64>,
    degenerate: &[usize],
    labels: Option<&[i64]>,
) -> Result<ProjectionValidation> {
    let alignment = align_signs(reference, candidate)?;
    let mut report = compute_concordance(reference, alignment.adjusted.view())?;
    report.flipped = alignment.flipped.clone();
    report.flag_indeterminate(degenerate);

    let by_class = match labels {
        Some(labels) => {
            let mut reports =
                concordance_by_class(reference, alignment.adjusted.view(), labels, degenerate)?;
            for class_report in reports.values_mut() {
                class_report.flipped = alignment.flipped.clone();
            }
            Some(reports)
        }
        None => None,
    };
    Ok(ProjectionValidation { report, by_class })
}
