//! Multiclass AdaBoost (SAMME) over randomized decision trees
use super::params::BoostingParams;
use crate::{
    data::dataset::{Dataset, RealNumber},
    error::ForestError,
    metrics::confusion::ClassificationMetrics,
    model::{check_num_features, labels_from_scores, Classifier},
    numeric,
    trees::{classifier::DecisionTree, params::TreeParams},
};
use nalgebra::{DMatrix, DVector};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One weak learner and its confidence weight.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoostingRound<XT: RealNumber> {
    pub tree: DecisionTree<XT>,
    pub alpha: f64,
}

/// Boosted ensemble of decision trees.
///
/// Each round trains a tree on the current sample weights, scores it with the SAMME weight
/// `alpha = ln((1 - err) / err) + ln(K - 1)` and multiplies the weight of every misclassified
/// sample by `exp(alpha)`. Inference is a hard vote where each tree adds its alpha to the label it
/// predicts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdaBoost<XT: RealNumber> {
    rounds: Vec<BoostingRound<XT>>,
    importance: DVector<f64>,
    boosting_params: BoostingParams,
}

impl<XT: RealNumber> Default for AdaBoost<XT> {
    fn default() -> Self {
        Self::new()
    }
}

impl<XT: RealNumber> ClassificationMetrics for AdaBoost<XT> {}

impl<XT: RealNumber> AdaBoost<XT> {
    pub fn new() -> Self {
        Self::from_params(BoostingParams::new())
    }

    pub fn from_params(boosting_params: BoostingParams) -> Self {
        Self {
            rounds: Vec::with_capacity(boosting_params.num_rounds()),
            importance: DVector::zeros(0),
            boosting_params,
        }
    }

    /// Creates an untrained boosting model with custom parameters.
    ///
    /// # Arguments
    ///
    /// * `num_rounds` - Number of boosting rounds (trees).
    /// * `max_depth` - The maximum depth of every tree.
    /// * `num_candidates` - Random split candidates evaluated at every node.
    ///
    /// # Errors
    ///
    /// This method will return an error if any of the given values is 0.
    pub fn with_params(
        num_rounds: Option<usize>,
        max_depth: Option<u16>,
        num_candidates: Option<usize>,
    ) -> Result<Self, ForestError> {
        let mut boosting_params = BoostingParams::new();
        if let Some(num_rounds) = num_rounds {
            boosting_params.set_num_rounds(num_rounds)?;
        }
        boosting_params.set_tree_params(TreeParams::build(max_depth, num_candidates, None)?);
        Ok(Self::from_params(boosting_params))
    }

    pub fn params(&self) -> &BoostingParams {
        &self.boosting_params
    }

    pub fn rounds(&self) -> &[BoostingRound<XT>] {
        &self.rounds
    }

    /// Confidence weights of the trained rounds, in training order.
    pub fn alphas(&self) -> Vec<f64> {
        self.rounds.iter().map(|round| round.alpha).collect()
    }

    /// Sum of the per-tree importances, normalized to sum to one.
    ///
    /// When no round split anything the sum is 0 and the values are left unnormalized (all 0).
    pub fn importance(&self) -> &DVector<f64> {
        &self.importance
    }

    /// Runs `num_rounds` boosting rounds on `dataset`.
    ///
    /// Training starts from uniform weights; the dataset's own weights are not used.
    ///
    /// # Errors
    ///
    /// This method will return an error if the dataset has fewer than two labels or no features.
    pub fn fit(&mut self, dataset: &Dataset<XT>, seed: Option<u64>) -> Result<(), ForestError> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.fit_with_rng(dataset, &mut rng)
    }

    pub fn fit_with_rng<R: Rng + ?Sized>(
        &mut self,
        dataset: &Dataset<XT>,
        rng: &mut R,
    ) -> Result<(), ForestError> {
        let num_labels = dataset.num_labels();
        if num_labels < 2 {
            return Err(ForestError::InvalidLabels {
                message: "boosting needs at least two labels".into(),
            });
        }

        let nrows = dataset.nrows();
        let mut weights = DVector::from_element(nrows, 1.0 / nrows as f64);
        let mut importance = DVector::<f64>::zeros(dataset.ncols());
        let mut rounds = Vec::with_capacity(self.boosting_params.num_rounds());

        for round in 0..self.boosting_params.num_rounds() {
            let weighted = dataset.with_weights(weights.clone())?;
            let mut tree = DecisionTree::from_params(self.boosting_params.tree_params().clone());
            tree.fit_with_rng(&weighted, rng)?;
            importance += tree.importance();

            let predictions = tree.predict(dataset.x())?;
            let misclassified = predictions
                .iter()
                .zip(dataset.y().iter())
                .map(|(predicted, actual)| predicted != actual)
                .collect::<Vec<_>>();

            let error = weighted_error(&weights, &misclassified);
            let alpha = numeric::samme_alpha(numeric::clamp_error(error, num_labels), num_labels);
            update_weights(&mut weights, &misclassified, alpha);
            info!(round = round + 1, error, alpha, "trained boosting round");

            rounds.push(BoostingRound { tree, alpha });
        }

        numeric::normalize(&mut importance);
        self.rounds = rounds;
        self.importance = importance;
        Ok(())
    }
}

impl<XT: RealNumber> Classifier<XT> for AdaBoost<XT> {
    fn run(&self, x: &DMatrix<XT>) -> Result<(DVector<usize>, DMatrix<f64>), ForestError> {
        let first = self.rounds.first().ok_or(ForestError::Untrained)?;
        check_num_features(first.tree.num_features(), x.ncols())?;

        let mut scores = DMatrix::<f64>::zeros(x.nrows(), first.tree.num_labels());
        for round in &self.rounds {
            let labels = round.tree.predict(x)?;
            for (row, &label) in labels.iter().enumerate() {
                scores[(row, label - 1)] += round.alpha;
            }
        }
        for mut row in scores.row_iter_mut() {
            let sum = row.sum();
            row /= if sum == 0.0 { 1.0 } else { sum };
        }

        Ok((labels_from_scores(&scores), scores))
    }

    fn num_labels(&self) -> usize {
        self.rounds.first().map_or(0, |round| round.tree.num_labels())
    }
}

fn weighted_error(weights: &DVector<f64>, misclassified: &[bool]) -> f64 {
    weights
        .iter()
        .zip(misclassified)
        .filter(|&(_, &missed)| missed)
        .map(|(weight, _)| weight)
        .sum()
}

/// Scales misclassified samples by `exp(alpha)` and renormalizes to a distribution.
fn update_weights(weights: &mut DVector<f64>, misclassified: &[bool], alpha: f64) {
    let boost = alpha.exp();
    for (weight, _) in weights
        .iter_mut()
        .zip(misclassified)
        .filter(|&(_, &missed)| missed)
    {
        *weight *= boost;
    }
    numeric::normalize(weights);
}
