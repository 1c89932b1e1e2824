use crate::error::ForestError;
use nalgebra::{DMatrix, DVector};

type ConfusionMatrix = DMatrix<usize>;

pub trait ClassificationMetrics {
    /// Computes the confusion matrix of 1-based labels.
    ///
    /// Entry `(i, j)` counts samples of true label `i + 1` predicted as `j + 1`. The matrix is
    /// square and sized by the largest label found in either vector.
    ///
    /// # Errors
    ///
    /// Fails when the vectors differ in length or contain the label 0.
    fn confusion_matrix(
        &self,
        y_true: &DVector<usize>,
        y_pred: &DVector<usize>,
    ) -> Result<ConfusionMatrix, ForestError> {
        if y_true.len() != y_pred.len() {
            return Err(ForestError::InvalidLabels {
                message: "predictions and labels are of different sizes".into(),
            });
        }
        if y_true.iter().chain(y_pred.iter()).any(|&label| label < 1) {
            return Err(ForestError::InvalidLabels {
                message: "labels must start at 1".into(),
            });
        }

        let num_labels = y_true.iter().chain(y_pred.iter()).copied().max().unwrap_or(0);
        let mut matrix = DMatrix::zeros(num_labels, num_labels);
        for (y_t, y_p) in y_true.iter().zip(y_pred.iter()) {
            matrix[(y_t - 1, y_p - 1)] += 1;
        }

        Ok(matrix)
    }

    /// Fraction of correctly classified samples.
    ///
    /// # Errors
    ///
    /// Fails when the vectors are empty or differ in length.
    fn accuracy(
        &self,
        y_true: &DVector<usize>,
        y_pred: &DVector<usize>,
    ) -> Result<f64, ForestError> {
        if y_true.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        let matrix = self.confusion_matrix(y_true, y_pred)?;
        let correct: usize = matrix.diagonal().iter().sum();

        Ok(correct as f64 / y_true.len() as f64)
    }
}
