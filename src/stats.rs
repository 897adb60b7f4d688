// Scalar statistics shared by the pipeline stages.

use ndarray::ArrayView1;

/// Columns whose root-mean-square deviation is below this fraction of their
/// largest magnitude are treated as constant.
const ZERO_VARIANCE_RTOL: f64 = 1e-10;

/// Neumaier-compensated summation.
pub(crate) fn compensated_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut sum = 0.0f64;
    let mut compensation = 0.0f64;
    for value in values {
        let t = sum + value;
        if sum.abs() >= value.abs() {
            compensation += (sum - t) + value;
        } else {
            compensation += (value - t) + sum;
        }
        sum = t;
    }
    sum + compensation
}

/// Dot product with compensated accumulation.
pub(crate) fn compensated_dot(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    compensated_sum(a.iter().zip(b.iter()).map(|(&x, &y)| x * y))
}

/// Arithmetic mean, or `None` for an empty slice.
pub(crate) fn mean(values: ArrayView1<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(compensated_sum(values.iter().copied()) / values.len() as f64)
}

/// Sum of squared deviations from the mean, and whether the vector is
/// effectively constant.
fn centered_sum_of_squares(values: ArrayView1<f64>, mean: f64) -> (f64, bool) {
    let ss = compensated_sum(values.iter().map(|&x| (x - mean) * (x - mean)));
    let scale = values.iter().fold(0.0f64, |acc, &x| acc.max(x.abs()));
    let rms = (ss / values.len() as f64).sqrt();
    let constant = ss == 0.0 || rms <= ZERO_VARIANCE_RTOL * scale;
    (ss, constant)
}

/// Pearson correlation of two equal-length vectors.
///
/// Returns `None` when fewer than two values are given or either vector is
/// constant, since the correlation is undefined there.
pub fn pearson_correlation(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Option<f64> {
    let n = a.len();
    if n != b.len() || n < 2 {
        return None;
    }
    let mean_a = mean(a)?;
    let mean_b = mean(b)?;

    let (ss_a, constant_a) = centered_sum_of_squares(a, mean_a);
    let (ss_b, constant_b) = centered_sum_of_squares(b, mean_b);
    if constant_a || constant_b {
        return None;
    }

    let cov_ab = compensated_sum(
        a.iter()
            .zip(b.iter())
            .map(|(&x, &y)| (x - mean_a) * (y - mean_b)),
    );
    // sqrt(ss_a * ss_b) rather than sqrt(ss_a) * sqrt(ss_b): exact for a == b
    let r = cov_ab / (ss_a * ss_b).sqrt();
    Some(r.clamp(-1.0, 1.0))
}

/// Population statistics of a vector: (mean, standard deviation, min, max).
pub(crate) fn summary(values: ArrayView1<f64>) -> Option<(f64, f64, f64, f64)> {
    let mean = mean(values)?;
    let variance =
        compensated_sum(values.iter().map(|&x| (x - mean) * (x - mean))) / values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((mean, variance.sqrt(), min, max))
}
