/// Randomized decision tree classifier
pub mod classifier;
/// Tree nodes
pub mod node;
/// Tree hyperparameters
pub mod params;
