//! # decision-forest
//!
//! `decision-forest` provides three multiclass classifiers over dense numeric features, all built
//! on one randomized decision tree engine:
//!
//! * [`trees::classifier::DecisionTree`] - a single tree grown by randomized-threshold entropy
//!   splitting,
//! * [`forests::classifier::DecisionForest`] - an unweighted average of independently grown trees,
//! * [`boosting::adaboost::AdaBoost`] - a multiclass AdaBoost (SAMME) ensemble.
//!
//! Labels are integers starting at 1. Every model returns the predicted labels together with a
//! per-label probability matrix.
//!
//! ## Example Usage
//!
//! ```rust
//! use decision_forest::data::dataset::Dataset;
//! use decision_forest::forests::classifier::DecisionForest;
//! use decision_forest::model::Classifier;
//! use nalgebra::{DMatrix, DVector};
//!
//! let x = DMatrix::from_fn(40, 1, |i, _| i as f64);
//! let y = DVector::from_fn(40, |i, _| if i < 20 { 1 } else { 2 });
//! let dataset = Dataset::new(x, y).unwrap();
//!
//! let mut forest = DecisionForest::with_params(Some(5), Some(3), Some(50)).unwrap();
//! forest.fit(&dataset, Some(42)).unwrap();
//!
//! let test_x = DMatrix::from_row_slice(2, 1, &[3.0, 35.0]);
//! let (labels, probabilities) = forest.run(&test_x).unwrap();
//! assert_eq!(labels.len(), 2);
//! assert_eq!(probabilities.ncols(), 2);
//! ```

/// Multiclass AdaBoost
pub mod boosting;
/// Dataset and data manipulation utilities
pub mod data;
/// Error type
pub mod error;
/// Decision forests
pub mod forests;
/// Functions for evaluating model performance
pub mod metrics;
/// Inference interface shared by all models
pub mod model;
/// Numeric safety helpers
pub mod numeric;
/// Saving and loading trained models
pub mod persistence;
/// Decision trees
pub mod trees;
