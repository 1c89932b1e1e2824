use crate::error::ForestError;
use nalgebra::{DMatrix, DVector};
use num_traits::{Float, FromPrimitive, Num, ToPrimitive};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use std::cmp::PartialOrd;
use std::fmt::{Debug, Display};
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

pub trait DataValue:
    Debug
    + Clone
    + Copy
    + Num
    + FromPrimitive
    + ToPrimitive
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Send
    + Sync
    + Display
    + 'static
{
}

impl<T> DataValue for T where
    T: Debug
        + Clone
        + Copy
        + Num
        + FromPrimitive
        + ToPrimitive
        + AddAssign
        + SubAssign
        + MulAssign
        + DivAssign
        + Send
        + Sync
        + Display
        + 'static
{
}

pub trait Number: DataValue + PartialOrd {}
impl<T> Number for T where T: DataValue + PartialOrd {}

/// Feature value type accepted by the trees (in practice `f32` or `f64`).
pub trait RealNumber: Number + Float {}
impl<T> RealNumber for T where T: Number + Float {}

/// Training data: features, 1-based labels and per-sample weights.
///
/// Per-feature mean and standard deviation (unweighted, population) and the number of labels
/// are computed once at construction. A dataset is never mutated afterwards; reweighting
/// produces a new dataset through [`Dataset::with_weights`].
#[derive(Clone, Debug)]
pub struct Dataset<XT: RealNumber> {
    x: DMatrix<XT>,
    y: DVector<usize>,
    w: DVector<f64>,
    mean: DVector<XT>,
    std: DVector<XT>,
    num_labels: usize,
}

impl<XT: RealNumber> Dataset<XT> {
    /// Creates a dataset with uniform weights `1/n`.
    ///
    /// # Errors
    ///
    /// Fails when `x` has no rows, when `y` doesn't have one label per row or when a label is 0.
    pub fn new(x: DMatrix<XT>, y: DVector<usize>) -> Result<Self, ForestError> {
        let nrows = x.nrows();
        Self::with_sample_weights(x, y, DVector::from_element(nrows, 1.0))
    }

    /// Creates a dataset with explicit per-sample weights.
    ///
    /// Weights are rescaled to sum to one.
    ///
    /// # Errors
    ///
    /// On top of the checks done by [`Dataset::new`], fails when `w` has the wrong length,
    /// contains a negative or non-finite entry, or sums to zero.
    pub fn with_sample_weights(
        x: DMatrix<XT>,
        y: DVector<usize>,
        w: DVector<f64>,
    ) -> Result<Self, ForestError> {
        let (nrows, ncols) = x.shape();
        if nrows == 0 {
            return Err(ForestError::EmptyDataset);
        }
        if y.len() != nrows {
            return Err(ForestError::InvalidLabels {
                message: format!("expected {} labels, got {}", nrows, y.len()),
            });
        }
        if y.iter().any(|&label| label < 1) {
            return Err(ForestError::InvalidLabels {
                message: "labels must be between 1 and the number of labels".into(),
            });
        }
        let w = Self::checked_weights(w, nrows)?;

        let n = XT::from_usize(nrows).ok_or(ForestError::EmptyDataset)?;
        let mean = DVector::from_fn(ncols, |col, _| {
            x.column(col).iter().fold(XT::zero(), |acc, &value| acc + value) / n
        });
        let std = DVector::from_fn(ncols, |col, _| {
            let sum_sq = x.column(col).iter().fold(XT::zero(), |acc, &value| {
                let diff = value - mean[col];
                acc + diff * diff
            });
            (sum_sq / n).sqrt()
        });
        let num_labels = y.iter().copied().max().unwrap_or(1);

        Ok(Self {
            x,
            y,
            w,
            mean,
            std,
            num_labels,
        })
    }

    /// Returns a new dataset over the same samples and labels with replaced weights.
    ///
    /// Feature statistics are carried over instead of being recomputed.
    pub fn with_weights(&self, w: DVector<f64>) -> Result<Self, ForestError> {
        let w = Self::checked_weights(w, self.nrows())?;
        Ok(Self {
            x: self.x.clone(),
            y: self.y.clone(),
            w,
            mean: self.mean.clone(),
            std: self.std.clone(),
            num_labels: self.num_labels,
        })
    }

    /// Same samples and labels with uniform weights `1/n`.
    pub fn with_uniform_weights(&self) -> Self {
        let nrows = self.nrows();
        Self {
            x: self.x.clone(),
            y: self.y.clone(),
            w: DVector::from_element(nrows, 1.0 / nrows as f64),
            mean: self.mean.clone(),
            std: self.std.clone(),
            num_labels: self.num_labels,
        }
    }

    fn checked_weights(mut w: DVector<f64>, nrows: usize) -> Result<DVector<f64>, ForestError> {
        if w.len() != nrows {
            return Err(ForestError::InvalidWeights {
                message: format!("expected {} weights, got {}", nrows, w.len()),
            });
        }
        if w.iter().any(|&weight| !weight.is_finite() || weight < 0.0) {
            return Err(ForestError::InvalidWeights {
                message: "weights must be finite and non-negative".into(),
            });
        }
        let sum = w.sum();
        if sum <= 0.0 {
            return Err(ForestError::InvalidWeights {
                message: "weights must not all be zero".into(),
            });
        }
        w /= sum;
        Ok(w)
    }

    pub fn x(&self) -> &DMatrix<XT> {
        &self.x
    }

    pub fn y(&self) -> &DVector<usize> {
        &self.y
    }

    pub fn weights(&self) -> &DVector<f64> {
        &self.w
    }

    pub fn mean(&self) -> &DVector<XT> {
        &self.mean
    }

    pub fn std(&self) -> &DVector<XT> {
        &self.std
    }

    /// Largest label present, i.e. the number of classes K.
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.x.ncols()
    }

    /// Shuffles the samples and splits them into a training and a testing dataset.
    ///
    /// Both halves get uniform weights and their own feature statistics.
    ///
    /// # Errors
    ///
    /// Fails when `train_size` is outside `0.0..=1.0` or when either half would be empty.
    pub fn train_test_split(
        &self,
        train_size: f64,
        seed: Option<u64>,
    ) -> Result<(Self, Self), ForestError> {
        if !(0.0..=1.0).contains(&train_size) {
            return Err(ForestError::parameter(
                "train size should be between 0.0 and 1.0",
            ));
        }
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut indices = (0..self.nrows()).collect::<Vec<_>>();
        indices.shuffle(&mut rng);
        let train_size = (self.nrows() as f64 * train_size).floor() as usize;
        let (train_indices, test_indices) = indices.split_at(train_size);

        Ok((self.subset(train_indices)?, self.subset(test_indices)?))
    }

    fn subset(&self, indices: &[usize]) -> Result<Self, ForestError> {
        let x = self.x.select_rows(indices);
        let y = DVector::from_iterator(indices.len(), indices.iter().map(|&index| self.y[index]));
        Self::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn small_dataset() -> Dataset<f64> {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let y = DVector::from_vec(vec![1, 2, 2, 3]);
        Dataset::new(x, y).unwrap()
    }

    #[test]
    fn test_dataset_new() {
        let dataset = small_dataset();
        assert_eq!(dataset.nrows(), 4);
        assert_eq!(dataset.ncols(), 2);
        assert_eq!(dataset.num_labels(), 3);
        assert_relative_eq!(*dataset.weights(), DVector::from_element(4, 0.25));
    }

    #[test]
    fn test_dataset_statistics() {
        let dataset = small_dataset();
        assert_relative_eq!(*dataset.mean(), DVector::from_vec(vec![4.0, 5.0]));
        let expected_std = 5.0_f64.sqrt();
        assert_relative_eq!(
            *dataset.std(),
            DVector::from_vec(vec![expected_std, expected_std]),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_dataset_normalizes_weights() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let y = DVector::from_vec(vec![1, 2]);
        let w = DVector::from_vec(vec![1.0, 3.0]);
        let dataset = Dataset::with_sample_weights(x, y, w).unwrap();
        assert_relative_eq!(*dataset.weights(), DVector::from_vec(vec![0.25, 0.75]));
    }

    #[test]
    fn test_dataset_rejects_invalid_input() {
        let empty = Dataset::<f64>::new(DMatrix::zeros(0, 2), DVector::zeros(0));
        assert!(matches!(empty, Err(ForestError::EmptyDataset)));

        let zero_label = Dataset::new(
            DMatrix::from_row_slice(2, 1, &[1.0, 2.0]),
            DVector::from_vec(vec![0, 1]),
        );
        assert!(matches!(zero_label, Err(ForestError::InvalidLabels { .. })));

        let short_labels = Dataset::new(
            DMatrix::from_row_slice(2, 1, &[1.0, 2.0]),
            DVector::from_vec(vec![1]),
        );
        assert!(matches!(short_labels, Err(ForestError::InvalidLabels { .. })));

        let negative_weight = Dataset::with_sample_weights(
            DMatrix::from_row_slice(2, 1, &[1.0, 2.0]),
            DVector::from_vec(vec![1, 2]),
            DVector::from_vec(vec![1.0, -1.0]),
        );
        assert!(matches!(
            negative_weight,
            Err(ForestError::InvalidWeights { .. })
        ));

        let zero_weights = Dataset::with_sample_weights(
            DMatrix::from_row_slice(2, 1, &[1.0, 2.0]),
            DVector::from_vec(vec![1, 2]),
            DVector::from_vec(vec![0.0, 0.0]),
        );
        assert!(matches!(zero_weights, Err(ForestError::InvalidWeights { .. })));
    }

    #[test]
    fn test_dataset_with_weights_keeps_samples() {
        let dataset = small_dataset();
        let reweighted = dataset
            .with_weights(DVector::from_vec(vec![2.0, 2.0, 0.0, 4.0]))
            .unwrap();

        assert_eq!(reweighted.x(), dataset.x());
        assert_eq!(reweighted.y(), dataset.y());
        assert_eq!(reweighted.mean(), dataset.mean());
        assert_relative_eq!(
            *reweighted.weights(),
            DVector::from_vec(vec![0.25, 0.25, 0.0, 0.5])
        );
        // The original view is untouched.
        assert_relative_eq!(*dataset.weights(), DVector::from_element(4, 0.25));
    }

    #[test]
    fn test_dataset_train_test_split() {
        let dataset = small_dataset();

        let (train_dataset, test_dataset) = dataset.train_test_split(0.75, Some(7)).unwrap();
        assert_eq!(train_dataset.nrows(), 3);
        assert_eq!(test_dataset.nrows(), 1);
        assert_relative_eq!(test_dataset.weights().sum(), 1.0);
    }

    #[test]
    fn test_dataset_train_test_split_rejects_bad_size() {
        let dataset = small_dataset();
        assert!(dataset.train_test_split(1.5, None).is_err());
        assert!(dataset.train_test_split(0.0, None).is_err());
    }
}
