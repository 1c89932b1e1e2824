/// Decision forest classifier
pub mod classifier;
/// Forest hyperparameters
pub mod params;
