use crate::{data::dataset::RealNumber, error::ForestError, numeric};
use nalgebra::{DMatrix, DVector};

/// Common inference interface of the tree, the forest and the boosting model.
pub trait Classifier<XT: RealNumber> {
    /// Classifies every row of `x`.
    ///
    /// Returns the 1-based predicted labels together with a probability matrix that has one row
    /// per sample and one column per label.
    ///
    /// # Errors
    ///
    /// Fails when the model wasn't trained yet or when `x` has a different number of columns than
    /// the training data.
    fn run(&self, x: &DMatrix<XT>) -> Result<(DVector<usize>, DMatrix<f64>), ForestError>;

    /// Number of labels K the model was trained on.
    fn num_labels(&self) -> usize;

    fn predict(&self, x: &DMatrix<XT>) -> Result<DVector<usize>, ForestError> {
        self.run(x).map(|(labels, _)| labels)
    }

    fn predict_proba(&self, x: &DMatrix<XT>) -> Result<DMatrix<f64>, ForestError> {
        self.run(x).map(|(_, probabilities)| probabilities)
    }
}

/// 1-based argmax of every row; ties go to the lowest label.
pub(crate) fn labels_from_scores(scores: &DMatrix<f64>) -> DVector<usize> {
    DVector::from_iterator(
        scores.nrows(),
        scores.row_iter().map(|row| numeric::argmax(row.iter()) + 1),
    )
}

pub(crate) fn check_num_features(expected: usize, actual: usize) -> Result<(), ForestError> {
    if expected != actual {
        return Err(ForestError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
