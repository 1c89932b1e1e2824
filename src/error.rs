use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by dataset construction, training, inference and persistence.
#[derive(Debug, Error)]
pub enum ForestError {
    #[error("Model has not been trained yet.")]
    Untrained,
    #[error("The dataset contains no samples.")]
    EmptyDataset,
    #[error("Invalid labels: {message}")]
    InvalidLabels { message: String },
    #[error("Invalid weights: {message}")]
    InvalidWeights { message: String },
    #[error("Expected {expected} features per sample, got {actual}.")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },
    #[error("Incompatible model: {message}")]
    IncompatibleModel { message: String },
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ForestError {
    pub(crate) fn parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }
}
