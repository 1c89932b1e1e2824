//! Decision Forest Classifier
use super::params::ForestParams;
use crate::{
    data::dataset::{Dataset, RealNumber},
    error::ForestError,
    metrics::confusion::ClassificationMetrics,
    model::{check_num_features, labels_from_scores, Classifier},
    trees::{classifier::DecisionTree, params::TreeParams},
};
use nalgebra::{DMatrix, DVector};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Unweighted ensemble of randomized decision trees.
///
/// Every tree sees the full dataset with uniform weights; the trees differ only through their
/// random split candidates. Inference averages the per-tree probability matrices.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionForest<XT: RealNumber> {
    trees: Vec<DecisionTree<XT>>,
    forest_params: ForestParams,
}

impl<XT: RealNumber> Default for DecisionForest<XT> {
    fn default() -> Self {
        Self::new()
    }
}

impl<XT: RealNumber> ClassificationMetrics for DecisionForest<XT> {}

impl<XT: RealNumber> DecisionForest<XT> {
    pub fn new() -> Self {
        Self::from_params(ForestParams::new())
    }

    pub fn from_params(forest_params: ForestParams) -> Self {
        Self {
            trees: Vec::with_capacity(forest_params.num_trees()),
            forest_params,
        }
    }

    /// Creates an untrained forest with custom parameters.
    ///
    /// # Arguments
    ///
    /// * `num_trees` - Number of trees in the forest.
    /// * `max_depth` - The maximum depth of every tree.
    /// * `num_candidates` - Random split candidates evaluated at every node.
    ///
    /// # Errors
    ///
    /// This method will return an error if any of the given values is 0.
    pub fn with_params(
        num_trees: Option<usize>,
        max_depth: Option<u16>,
        num_candidates: Option<usize>,
    ) -> Result<Self, ForestError> {
        let mut forest_params = ForestParams::new();
        if let Some(num_trees) = num_trees {
            forest_params.set_num_trees(num_trees)?;
        }
        forest_params.set_tree_params(TreeParams::build(max_depth, num_candidates, None)?);
        Ok(Self::from_params(forest_params))
    }

    pub fn params(&self) -> &ForestParams {
        &self.forest_params
    }

    pub fn trees(&self) -> &[DecisionTree<XT>] {
        &self.trees
    }

    /// Trains `num_trees` trees on `dataset` with its weights reset to uniform.
    ///
    /// # Errors
    ///
    /// This method will return an error if any tree fails to train.
    pub fn fit(&mut self, dataset: &Dataset<XT>, seed: Option<u64>) -> Result<(), ForestError> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.fit_with_rng(dataset, &mut rng)
    }

    /// Trains the forest, drawing one seed per tree from `rng`.
    ///
    /// Trees are trained in parallel; the result only depends on the seeds, not on scheduling.
    pub fn fit_with_rng<R: Rng + ?Sized>(
        &mut self,
        dataset: &Dataset<XT>,
        rng: &mut R,
    ) -> Result<(), ForestError> {
        let uniform = dataset.with_uniform_weights();
        let seeds = (0..self.forest_params.num_trees())
            .map(|_| rng.gen::<u64>())
            .collect::<Vec<_>>();

        let tree_params = self.forest_params.tree_params();
        let trees: Result<Vec<_>, ForestError> = seeds
            .into_par_iter()
            .map(|tree_seed| {
                let mut tree = DecisionTree::from_params(tree_params.clone());
                tree.fit(&uniform, Some(tree_seed))?;
                Ok(tree)
            })
            .collect();
        self.trees = trees?;

        info!(
            trees = self.trees.len(),
            samples = dataset.nrows(),
            "trained decision forest"
        );
        Ok(())
    }
}

impl<XT: RealNumber> Classifier<XT> for DecisionForest<XT> {
    fn run(&self, x: &DMatrix<XT>) -> Result<(DVector<usize>, DMatrix<f64>), ForestError> {
        let first = self.trees.first().ok_or(ForestError::Untrained)?;
        check_num_features(first.num_features(), x.ncols())?;

        let mut probabilities = DMatrix::<f64>::zeros(x.nrows(), first.num_labels());
        for tree in &self.trees {
            let (_, tree_probabilities) = tree.run(x)?;
            probabilities += tree_probabilities;
        }
        probabilities /= self.trees.len() as f64;

        Ok((labels_from_scores(&probabilities), probabilities))
    }

    fn num_labels(&self) -> usize {
        self.trees.first().map_or(0, |tree| tree.num_labels())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::quadrant_dataset;
    use crate::numeric;
    use approx::assert_relative_eq;

    #[test]
    fn test_run_untrained() {
        let forest = DecisionForest::<f64>::new();
        let result = forest.run(&DMatrix::zeros(3, 2));
        assert!(matches!(result, Err(ForestError::Untrained)));
    }

    #[test]
    fn test_fit_trains_every_tree() {
        let dataset = quadrant_dataset(300, 2, 20);
        let mut forest = DecisionForest::with_params(Some(4), Some(4), Some(20)).unwrap();
        forest.fit(&dataset, Some(1)).unwrap();
        assert_eq!(forest.trees().len(), 4);
        assert!(forest.trees().iter().all(|tree| tree.depth() <= 4));
        assert_eq!(forest.num_labels(), 3);
    }

    #[test]
    fn test_fit_ignores_dataset_weights() {
        let dataset = quadrant_dataset(300, 2, 21);
        let skewed = dataset
            .with_weights(DVector::from_fn(300, |i, _| if i < 10 { 100.0 } else { 1.0 }))
            .unwrap();

        let mut forest = DecisionForest::with_params(Some(3), Some(4), Some(20)).unwrap();
        forest.fit(&dataset, Some(5)).unwrap();
        let mut skewed_forest = DecisionForest::with_params(Some(3), Some(4), Some(20)).unwrap();
        skewed_forest.fit(&skewed, Some(5)).unwrap();

        for (tree, skewed_tree) in forest.trees().iter().zip(skewed_forest.trees()) {
            assert_eq!(tree.root(), skewed_tree.root());
        }
    }

    #[test]
    fn test_probabilities_are_averaged() {
        let dataset = quadrant_dataset(300, 2, 22);
        let mut forest = DecisionForest::with_params(Some(5), Some(5), Some(50)).unwrap();
        forest.fit(&dataset, Some(2)).unwrap();

        let (labels, probabilities) = forest.run(dataset.x()).unwrap();

        let mut expected = DMatrix::<f64>::zeros(300, 3);
        for tree in forest.trees() {
            expected += tree.predict_proba(dataset.x()).unwrap();
        }
        expected /= 5.0;
        assert_relative_eq!(probabilities, expected, epsilon = 1e-12);

        for (row, label) in probabilities.row_iter().zip(labels.iter()) {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-9);
            assert_eq!(numeric::argmax(row.iter()) + 1, *label);
        }
    }

    #[test]
    fn test_same_seed_same_forest() {
        let dataset = quadrant_dataset(200, 2, 23);
        let mut first = DecisionForest::with_params(Some(3), Some(4), Some(20)).unwrap();
        let mut second = DecisionForest::with_params(Some(3), Some(4), Some(20)).unwrap();
        first.fit(&dataset, Some(9)).unwrap();
        second.fit(&dataset, Some(9)).unwrap();
        assert_eq!(
            first.predict_proba(dataset.x()).unwrap(),
            second.predict_proba(dataset.x()).unwrap()
        );
    }

    #[test]
    fn test_run_is_idempotent() {
        let dataset = quadrant_dataset(200, 2, 24);
        let mut forest = DecisionForest::with_params(Some(3), Some(5), Some(50)).unwrap();
        forest.fit(&dataset, Some(3)).unwrap();
        let test = quadrant_dataset(40, 2, 25);
        assert_eq!(forest.run(test.x()).unwrap(), forest.run(test.x()).unwrap());
    }

    #[test]
    fn test_run_dimension_mismatch() {
        let dataset = quadrant_dataset(100, 2, 26);
        let mut forest = DecisionForest::with_params(Some(2), Some(3), Some(10)).unwrap();
        forest.fit(&dataset, Some(4)).unwrap();
        assert!(matches!(
            forest.run(&DMatrix::zeros(1, 5)),
            Err(ForestError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_quadrant_accuracy() {
        let train = quadrant_dataset(1000, 2, 200);
        let test = quadrant_dataset(500, 2, 201);
        let mut forest = DecisionForest::with_params(Some(10), Some(5), Some(1000)).unwrap();
        forest.fit(&train, Some(13)).unwrap();

        let predictions = forest.predict(test.x()).unwrap();
        let accuracy = forest.accuracy(test.y(), &predictions).unwrap();
        assert!(accuracy > 0.85, "accuracy was {}", accuracy);
    }
}
