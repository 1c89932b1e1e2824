//! Numeric safety helpers shared by trees, forests and boosting.
//!
//! Every epsilon floor and clamped logarithm used during training and inference lives here so the
//! same policy applies everywhere.

use nalgebra::{DVector, RowDVector};

/// Probabilities, weights and sums below this value are treated as zero.
pub const EPSILON: f64 = 1e-10;

/// Shannon entropy (natural log) of a class-weight histogram whose entries sum to `total`.
///
/// Probabilities below [`EPSILON`] are skipped, so empty classes never reach `ln(0)`.
/// A histogram with total weight below [`EPSILON`] has zero entropy.
pub fn entropy(histogram: &[f64], total: f64) -> f64 {
    if total <= EPSILON {
        return 0.0;
    }
    histogram
        .iter()
        .map(|&weight| weight / total)
        .filter(|&p| p > EPSILON)
        .map(|p| -p * p.ln())
        .sum()
}

/// Normalizes `values` in place so they sum to one.
///
/// Returns `false` and leaves the values untouched when the sum is below [`EPSILON`].
pub fn normalize(values: &mut DVector<f64>) -> bool {
    let sum = values.sum();
    if sum.abs() <= EPSILON {
        return false;
    }
    *values /= sum;
    true
}

/// Turns a leaf histogram into a probability distribution, falling back to the uniform
/// distribution when the histogram carries no weight.
pub fn leaf_distribution(histogram: &DVector<f64>) -> RowDVector<f64> {
    let num_labels = histogram.len();
    let sum = histogram.sum();
    if sum > EPSILON {
        histogram.transpose() / sum
    } else {
        RowDVector::from_element(num_labels, 1.0 / num_labels as f64)
    }
}

/// Index of the largest value; ties go to the lowest index.
pub fn argmax<'a>(values: impl IntoIterator<Item = &'a f64>) -> usize {
    let mut best_index = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (index, &value) in values.into_iter().enumerate() {
        if value > best_value {
            best_index = index;
            best_value = value;
        }
    }
    best_index
}

/// Keeps a weighted boosting error inside the open interval where the SAMME weight is finite.
pub fn clamp_error(error: f64, num_labels: usize) -> f64 {
    let chance = 1.0 - 1.0 / num_labels as f64;
    if error <= 0.0 {
        EPSILON
    } else if error >= chance {
        chance - EPSILON
    } else {
        error
    }
}

/// SAMME confidence weight `ln((1 - err) / err) + ln(K - 1)` for an already clamped error.
pub fn samme_alpha(error: f64, num_labels: usize) -> f64 {
    ((1.0 - error) / error).ln() + ((num_labels - 1) as f64).ln()
}
