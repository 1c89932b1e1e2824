/// Confusion matrix and accuracy for 1-based labels
pub mod confusion;
