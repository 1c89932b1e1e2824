//! Versioned JSON encoding of trained models.
//!
//! A saved model is wrapped in an envelope carrying the format version and the model kind, so a
//! blob written for one model type is never silently read back as another.

use crate::{
    boosting::adaboost::AdaBoost,
    data::dataset::RealNumber,
    error::ForestError,
    forests::classifier::DecisionForest,
    model::Classifier,
    trees::classifier::DecisionTree,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fs, path::Path};

/// Version written into every envelope; bumped whenever the stored layout changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, M> {
    format_version: u32,
    kind: &'a str,
    model: &'a M,
}

#[derive(Deserialize)]
struct Envelope {
    format_version: u32,
    kind: String,
    model: serde_json::Value,
}

/// Serialization contract shared by the trained models.
pub trait Persist: Serialize + DeserializeOwned {
    /// Identifier stored in the envelope.
    const KIND: &'static str;

    /// Checks that the parts of a decoded model fit together, so that running it cannot index
    /// out of bounds.
    fn validate(&self) -> Result<(), ForestError>;

    fn to_json(&self) -> Result<String, ForestError> {
        let envelope = EnvelopeRef {
            format_version: FORMAT_VERSION,
            kind: Self::KIND,
            model: self,
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// # Errors
    ///
    /// Fails on malformed JSON, on another format version, on another model kind or on a model
    /// whose shapes are inconsistent.
    fn from_json(json: &str) -> Result<Self, ForestError> {
        let envelope: Envelope = serde_json::from_str(json)?;
        if envelope.format_version != FORMAT_VERSION {
            return Err(ForestError::IncompatibleModel {
                message: format!(
                    "format version {} is not supported, expected {}",
                    envelope.format_version, FORMAT_VERSION
                ),
            });
        }
        if envelope.kind != Self::KIND {
            return Err(ForestError::IncompatibleModel {
                message: format!("expected a {} model, found {}", Self::KIND, envelope.kind),
            });
        }
        let model: Self = serde_json::from_value(envelope.model)?;
        model.validate()?;
        Ok(model)
    }

    fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|source| ForestError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ForestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

fn incompatible(message: String) -> ForestError {
    ForestError::IncompatibleModel { message }
}

/// Checks one tree and returns its `(num_features, num_labels)`.
fn tree_shape<XT: RealNumber>(tree: &DecisionTree<XT>) -> Result<(usize, usize), ForestError> {
    let shape = (tree.num_features(), tree.num_labels());
    let Some(root) = tree.root() else {
        return Ok(shape);
    };
    if shape.1 == 0 || !root.fits_shape(shape.0, shape.1) {
        return Err(incompatible(format!(
            "tree nodes do not fit {} features and {} labels",
            shape.0, shape.1
        )));
    }
    if tree.importance().len() != shape.0 {
        return Err(incompatible(format!(
            "importance has {} entries for {} features",
            tree.importance().len(),
            shape.0
        )));
    }
    Ok(shape)
}

/// Checks that every tree is trained and that all of them share one shape.
fn ensemble_shape<'a, XT: RealNumber + 'a>(
    trees: impl IntoIterator<Item = &'a DecisionTree<XT>>,
) -> Result<Option<(usize, usize)>, ForestError> {
    let mut expected = None;
    for tree in trees {
        if !tree.is_trained() {
            return Err(incompatible("ensemble contains an untrained tree".into()));
        }
        let shape = tree_shape(tree)?;
        match expected {
            None => expected = Some(shape),
            Some(expected) if expected != shape => {
                return Err(incompatible(format!(
                    "trees disagree on (features, labels): {:?} and {:?}",
                    expected, shape
                )));
            }
            Some(_) => {}
        }
    }
    Ok(expected)
}

impl<XT: RealNumber + Serialize + DeserializeOwned> Persist for DecisionTree<XT> {
    const KIND: &'static str = "decision_tree";

    fn validate(&self) -> Result<(), ForestError> {
        tree_shape(self).map(|_| ())
    }
}

impl<XT: RealNumber + Serialize + DeserializeOwned> Persist for DecisionForest<XT> {
    const KIND: &'static str = "decision_forest";

    fn validate(&self) -> Result<(), ForestError> {
        ensemble_shape(self.trees()).map(|_| ())
    }
}

impl<XT: RealNumber + Serialize + DeserializeOwned> Persist for AdaBoost<XT> {
    const KIND: &'static str = "adaboost";

    fn validate(&self) -> Result<(), ForestError> {
        let shape = ensemble_shape(self.rounds().iter().map(|round| &round.tree))?;
        if let Some((num_features, _)) = shape {
            if self.importance().len() != num_features {
                return Err(incompatible(format!(
                    "importance has {} entries for {} features",
                    self.importance().len(),
                    num_features
                )));
            }
        }
        if self.rounds().iter().any(|round| !round.alpha.is_finite()) {
            return Err(incompatible("boosting round with a non-finite alpha".into()));
        }
        Ok(())
    }
}
