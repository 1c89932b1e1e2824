//! Labelled quadrant data used by the end-to-end tests.

use super::dataset::Dataset;
use nalgebra::{DMatrix, DVector};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Points drawn uniformly from `[-1, 1]^d` (d ≥ 2) labelled by the signs of the first two
/// coordinates: 1 when both are positive, 2 when both are non-positive, 3 otherwise.
pub(crate) fn quadrant_dataset(nrows: usize, ncols: usize, seed: u64) -> Dataset<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let x = DMatrix::from_fn(nrows, ncols, |_, _| rng.gen_range(-1.0..=1.0));
    let y = DVector::from_fn(nrows, |row, _| match (x[(row, 0)] > 0.0, x[(row, 1)] > 0.0) {
        (true, true) => 1,
        (false, false) => 2,
        _ => 3,
    });
    Dataset::new(x, y).expect("synthetic data is never empty")
}

