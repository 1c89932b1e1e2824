/// Multiclass AdaBoost (SAMME)
pub mod adaboost;
/// Boosting hyperparameters
pub mod params;
