//! Randomized Decision Tree Classifier
use super::{node::TreeNode, params::TreeParams};
use crate::{
    data::dataset::{Dataset, RealNumber},
    error::ForestError,
    metrics::confusion::ClassificationMetrics,
    model::{check_num_features, labels_from_scores, Classifier},
    numeric::{self, EPSILON},
};
use nalgebra::{DMatrix, DVector};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Candidate thresholds are drawn from `mean ± SEARCH_RANGE * std` of the chosen feature.
const SEARCH_RANGE: f64 = 3.0;

struct SplitCandidate<XT: RealNumber> {
    feature_index: usize,
    threshold: XT,
    entropy_decrease: f64,
}

/// Decision tree grown by randomized-threshold entropy splitting.
///
/// At every node a fixed number of random (feature, threshold) pairs is scored by weighted
/// entropy decrease and the best one is kept. Leaves store class weight histograms which are
/// normalized into probabilities at inference time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionTree<XT: RealNumber> {
    root: Option<TreeNode<XT>>,
    tree_params: TreeParams,
    num_features: usize,
    num_labels: usize,
    importance: DVector<f64>,
}

impl<XT: RealNumber> Default for DecisionTree<XT> {
    fn default() -> Self {
        Self::new()
    }
}

impl<XT: RealNumber> ClassificationMetrics for DecisionTree<XT> {}

impl<XT: RealNumber> DecisionTree<XT> {
    /// Creates an untrained tree with default parameters.
    pub fn new() -> Self {
        Self::from_params(TreeParams::new())
    }

    pub fn from_params(tree_params: TreeParams) -> Self {
        Self {
            root: None,
            tree_params,
            num_features: 0,
            num_labels: 0,
            importance: DVector::zeros(0),
        }
    }

    /// Creates an untrained tree with custom parameters.
    ///
    /// # Arguments
    ///
    /// * `max_depth` - The maximum depth of the tree, the root being level 1.
    /// * `num_candidates` - Random split candidates evaluated at every node.
    /// * `min_leaf_size` - Index sets smaller than this are not split.
    ///
    /// # Errors
    ///
    /// This method will return an error if any of the given values is 0.
    pub fn with_params(
        max_depth: Option<u16>,
        num_candidates: Option<usize>,
        min_leaf_size: Option<usize>,
    ) -> Result<Self, ForestError> {
        TreeParams::build(max_depth, num_candidates, min_leaf_size).map(Self::from_params)
    }

    pub fn set_max_depth(&mut self, max_depth: u16) -> Result<(), ForestError> {
        self.tree_params.set_max_depth(max_depth)
    }

    pub fn set_num_candidates(&mut self, num_candidates: usize) -> Result<(), ForestError> {
        self.tree_params.set_num_candidates(num_candidates)
    }

    pub fn set_min_leaf_size(&mut self, min_leaf_size: usize) -> Result<(), ForestError> {
        self.tree_params.set_min_leaf_size(min_leaf_size)
    }

    pub fn params(&self) -> &TreeParams {
        &self.tree_params
    }

    pub fn root(&self) -> Option<&TreeNode<XT>> {
        self.root.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.root.is_some()
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Depth of the trained tree, 0 when untrained.
    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::depth)
    }

    pub fn num_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::num_leaves)
    }

    /// Raw feature importance accumulated during training: for every split, the entropy
    /// decrease of the chosen candidate times the number of samples at that node.
    ///
    /// The values are not normalized.
    pub fn importance(&self) -> &DVector<f64> {
        &self.importance
    }

    /// Trains the tree on `dataset`.
    ///
    /// # Arguments
    ///
    /// * `dataset` - Features, labels and sample weights.
    /// * `seed` - Seed for the candidate draws, `None` seeds from the OS.
    ///
    /// # Errors
    ///
    /// This method will return an error if the dataset has no features.
    pub fn fit(&mut self, dataset: &Dataset<XT>, seed: Option<u64>) -> Result<(), ForestError> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.fit_with_rng(dataset, &mut rng)
    }

    /// Trains the tree drawing split candidates from `rng`.
    pub fn fit_with_rng<R: Rng + ?Sized>(
        &mut self,
        dataset: &Dataset<XT>,
        rng: &mut R,
    ) -> Result<(), ForestError> {
        if dataset.ncols() == 0 {
            return Err(ForestError::parameter("the dataset has no features"));
        }

        let mut builder = TreeBuilder {
            dataset,
            rng,
            tree_params: &self.tree_params,
            min_leaf_size: self.tree_params.effective_min_leaf_size(dataset.nrows()),
            importance: DVector::zeros(dataset.ncols()),
        };
        let root = builder.build_node((0..dataset.nrows()).collect(), 1);
        self.importance = builder.importance;

        self.num_features = dataset.ncols();
        self.num_labels = dataset.num_labels();
        debug!(
            depth = root.depth(),
            leaves = root.num_leaves(),
            samples = dataset.nrows(),
            "trained decision tree"
        );
        self.root = Some(root);
        Ok(())
    }
}

impl<XT: RealNumber> Classifier<XT> for DecisionTree<XT> {
    fn run(&self, x: &DMatrix<XT>) -> Result<(DVector<usize>, DMatrix<f64>), ForestError> {
        let root = self.root.as_ref().ok_or(ForestError::Untrained)?;
        check_num_features(self.num_features, x.ncols())?;

        let mut probabilities = DMatrix::<f64>::zeros(x.nrows(), self.num_labels);
        for row in 0..x.nrows() {
            let distribution = numeric::leaf_distribution(root.find_leaf(x, row));
            probabilities.set_row(row, &distribution);
        }
        Ok((labels_from_scores(&probabilities), probabilities))
    }

    fn num_labels(&self) -> usize {
        self.num_labels
    }
}

/// Training state for one tree: the data, the random source and the importance accumulator.
struct TreeBuilder<'a, XT: RealNumber, R: Rng + ?Sized> {
    dataset: &'a Dataset<XT>,
    rng: &'a mut R,
    tree_params: &'a TreeParams,
    min_leaf_size: usize,
    importance: DVector<f64>,
}

impl<XT: RealNumber, R: Rng + ?Sized> TreeBuilder<'_, XT, R> {
    fn build_node(&mut self, indices: Vec<usize>, level: u16) -> TreeNode<XT> {
        if level >= self.tree_params.max_depth()
            || indices.len() < self.min_leaf_size
            || self.is_pure(&indices)
        {
            return self.leaf(&indices);
        }

        let best_split = match self.best_split(&indices) {
            Some(split) => split,
            None => return self.leaf(&indices),
        };
        self.importance[best_split.feature_index] +=
            best_split.entropy_decrease * indices.len() as f64;

        let x = self.dataset.x();
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) =
            indices.iter().copied().partition(|&index| {
                x[(index, best_split.feature_index)] <= best_split.threshold
            });

        // A candidate that sends everything to one side can still win, e.g. on duplicated
        // feature vectors with conflicting labels.
        if left_indices.is_empty() || right_indices.is_empty() {
            return self.leaf(&indices);
        }

        let left = self.build_node(left_indices, level + 1);
        let right = self.build_node(right_indices, level + 1);
        TreeNode::Split {
            feature_index: best_split.feature_index,
            threshold: best_split.threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn leaf(&self, indices: &[usize]) -> TreeNode<XT> {
        let (y, w) = (self.dataset.y(), self.dataset.weights());
        let mut histogram = DVector::zeros(self.dataset.num_labels());
        for &index in indices {
            histogram[y[index] - 1] += w[index];
        }
        TreeNode::Leaf { histogram }
    }

    fn is_pure(&self, indices: &[usize]) -> bool {
        let y = self.dataset.y();
        match indices.first() {
            Some(&first) => indices.iter().all(|&index| y[index] == y[first]),
            None => true,
        }
    }

    /// Scores `num_candidates` random candidates drawn from `mean ± SEARCH_RANGE * std`.
    fn best_split(&mut self, indices: &[usize]) -> Option<SplitCandidate<XT>> {
        let dataset = self.dataset;
        let rng = &mut *self.rng;
        let candidates =
            (0..self.tree_params.num_candidates()).map(|_| draw_candidate(dataset, rng));
        select_split(dataset, indices, candidates)
    }
}

fn draw_candidate<XT: RealNumber, R: Rng + ?Sized>(
    dataset: &Dataset<XT>,
    rng: &mut R,
) -> (usize, XT) {
    let feature_index = rng.gen_range(0..dataset.ncols());
    let offset: f64 = SEARCH_RANGE * rng.gen_range(-1.0_f64..=1.0);
    let offset = XT::from_f64(offset).unwrap_or_else(XT::zero);
    let threshold = dataset.mean()[feature_index] + dataset.std()[feature_index] * offset;
    (feature_index, threshold)
}

/// Picks the candidate with the largest entropy decrease; on ties the earliest one wins.
fn select_split<XT: RealNumber>(
    dataset: &Dataset<XT>,
    indices: &[usize],
    candidates: impl IntoIterator<Item = (usize, XT)>,
) -> Option<SplitCandidate<XT>> {
    let mut best_split: Option<SplitCandidate<XT>> = None;
    for (feature_index, threshold) in candidates {
        let entropy_decrease = entropy_decrease(dataset, indices, feature_index, threshold);
        if best_split
            .as_ref()
            .map_or(true, |best| entropy_decrease > best.entropy_decrease)
        {
            best_split = Some(SplitCandidate {
                feature_index,
                threshold,
                entropy_decrease,
            });
        }
    }
    best_split
}

/// Weighted entropy decrease of splitting `indices` on `x[feature_index] <= threshold`.
///
/// Each side present contributes `-(side_weight / total_weight) * side_entropy`, so the result is
/// never positive and 0 marks a split into pure sides. Sides without weight contribute nothing and
/// a weightless index set scores 0.
pub(crate) fn entropy_decrease<XT: RealNumber>(
    dataset: &Dataset<XT>,
    indices: &[usize],
    feature_index: usize,
    threshold: XT,
) -> f64 {
    let (x, y, w) = (dataset.x(), dataset.y(), dataset.weights());
    let mut left = vec![0.0; dataset.num_labels()];
    let mut right = vec![0.0; dataset.num_labels()];
    for &index in indices {
        let side = if x[(index, feature_index)] <= threshold {
            &mut left
        } else {
            &mut right
        };
        side[y[index] - 1] += w[index];
    }

    let left_weight: f64 = left.iter().sum();
    let right_weight: f64 = right.iter().sum();
    let total_weight = left_weight + right_weight;
    if total_weight <= 0.0 {
        return 0.0;
    }

    [(&left, left_weight), (&right, right_weight)]
        .into_iter()
        .filter(|&(_, weight)| weight > EPSILON)
        .map(|(histogram, weight)| -(weight / total_weight) * numeric::entropy(histogram, weight))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::quadrant_dataset;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    fn trained_tree(dataset: &Dataset<f64>, max_depth: u16, seed: u64) -> DecisionTree<f64> {
        let mut tree = DecisionTree::with_params(Some(max_depth), Some(50), None).unwrap();
        tree.fit(dataset, Some(seed)).unwrap();
        tree
    }

    fn collect_leaves<'a>(node: &'a TreeNode<f64>, leaves: &mut Vec<&'a DVector<f64>>) {
        match node {
            TreeNode::Leaf { histogram } => leaves.push(histogram),
            TreeNode::Split { left, right, .. } => {
                collect_leaves(left, leaves);
                collect_leaves(right, leaves);
            }
        }
    }

    #[test]
    fn test_entropy_decrease_of_perfect_split() {
        let x = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
        let y = DVector::from_vec(vec![1, 1, 2, 2]);
        let dataset = Dataset::new(x, y).unwrap();
        let decrease = entropy_decrease(&dataset, &[0, 1, 2, 3], 0, 2.5);
        assert_relative_eq!(decrease, 0.0);
    }

    #[test]
    fn test_entropy_decrease_of_useless_split() {
        let x = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
        let y = DVector::from_vec(vec![1, 2, 1, 2]);
        let dataset = Dataset::new(x, y).unwrap();
        let decrease = entropy_decrease(&dataset, &[0, 1, 2, 3], 0, 2.5);
        assert_relative_eq!(decrease, -(2.0_f64.ln()), epsilon = 1e-12);

        // Everything on one side scores the parent entropy.
        let decrease = entropy_decrease(&dataset, &[0, 1, 2, 3], 0, 10.0);
        assert_relative_eq!(decrease, -(2.0_f64.ln()), epsilon = 1e-12);
    }

    #[test]
    fn test_entropy_decrease_uses_weights() {
        let x = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
        let y = DVector::from_vec(vec![1, 2, 2, 2]);
        let w = DVector::from_vec(vec![1.0, 0.0, 1.0, 1.0]);
        let dataset = Dataset::with_sample_weights(x, y, w).unwrap();
        // Sample 1 carries no weight, so the left side is effectively pure.
        let decrease = entropy_decrease(&dataset, &[0, 1, 2, 3], 0, 2.5);
        assert_relative_eq!(decrease, 0.0);
    }

    #[test]
    fn test_single_leaf_at_depth_one() {
        let dataset = quadrant_dataset(200, 2, 1);
        let tree = trained_tree(&dataset, 1, 3);
        let root = tree.root().unwrap();
        assert!(root.is_leaf());
        assert_eq!(tree.depth(), 1);
        let mut leaves = Vec::new();
        collect_leaves(root, &mut leaves);
        assert_relative_eq!(leaves[0].sum(), 1.0, epsilon = 1e-12);
        assert_eq!(tree.importance(), &DVector::zeros(2));
    }

    #[test]
    fn test_depth_never_exceeds_maximum() {
        let dataset = quadrant_dataset(500, 3, 2);
        for max_depth in 1..=7 {
            let tree = trained_tree(&dataset, max_depth, u64::from(max_depth));
            assert!(tree.depth() <= usize::from(max_depth));
        }
    }

    #[test]
    fn test_leaf_histograms_conserve_weight() {
        let dataset = quadrant_dataset(400, 2, 3);
        let reweighted = dataset
            .with_weights(DVector::from_fn(400, |i, _| 1.0 + (i % 7) as f64))
            .unwrap();
        let tree = trained_tree(&reweighted, 6, 11);
        let root = tree.root().unwrap();

        let mut routed: HashMap<*const DVector<f64>, f64> = HashMap::new();
        for row in 0..reweighted.nrows() {
            let leaf = root.find_leaf(reweighted.x(), row);
            *routed.entry(leaf as *const _).or_insert(0.0) += reweighted.weights()[row];
        }

        let mut leaves = Vec::new();
        collect_leaves(root, &mut leaves);
        let mut total = 0.0;
        for leaf in leaves {
            let expected = routed.get(&(leaf as *const _)).copied().unwrap_or(0.0);
            assert_relative_eq!(leaf.sum(), expected, epsilon = 1e-12);
            assert!(leaf.iter().all(|&weight| weight >= 0.0));
            total += leaf.sum();
        }
        // Every sample lands in exactly one leaf.
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pure_dataset_is_a_leaf() {
        let x = DMatrix::from_fn(50, 2, |i, j| (i * (j + 1)) as f64);
        let y = DVector::from_element(50, 2);
        let dataset = Dataset::new(x, y).unwrap();
        let tree = trained_tree(&dataset, 5, 0);
        assert!(tree.root().unwrap().is_leaf());

        let (labels, probabilities) = tree.run(dataset.x()).unwrap();
        assert!(labels.iter().all(|&label| label == 2));
        assert_relative_eq!(probabilities[(0, 1)], 1.0);
    }

    #[test]
    fn test_unsplittable_node_becomes_leaf() {
        let x = DMatrix::from_element(40, 2, 1.5);
        let y = DVector::from_fn(40, |i, _| i % 2 + 1);
        let dataset = Dataset::new(x, y).unwrap();
        let tree = trained_tree(&dataset, 5, 4);
        assert!(tree.root().unwrap().is_leaf());

        let (labels, probabilities) = tree.run(dataset.x()).unwrap();
        assert_relative_eq!(probabilities[(0, 0)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(probabilities[(0, 1)], 0.5, epsilon = 1e-12);
        assert_eq!(labels[0], 1);
        // The winning split sent all 40 samples left, scoring the parent entropy, and was
        // still recorded before falling back to a leaf.
        assert_relative_eq!(
            tree.importance().sum(),
            -(2.0_f64.ln()) * 40.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_select_split_keeps_first_of_equal_candidates() {
        let x = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
        let y = DVector::from_vec(vec![1, 1, 2, 2]);
        let dataset = Dataset::new(x, y).unwrap();
        let indices = [0, 1, 2, 3];

        let best = select_split(&dataset, &indices, vec![(0, 2.5), (0, 2.6)]).unwrap();
        assert_relative_eq!(best.threshold, 2.5);
        let best = select_split(&dataset, &indices, vec![(0, 2.6), (0, 2.5)]).unwrap();
        assert_relative_eq!(best.threshold, 2.6);
        assert_relative_eq!(best.entropy_decrease, 0.0);

        // A strictly better later candidate still replaces an earlier one.
        let best = select_split(&dataset, &indices, vec![(0, 10.0), (0, 2.5)]).unwrap();
        assert_relative_eq!(best.threshold, 2.5);
        assert!(select_split(&dataset, &indices, Vec::<(usize, f64)>::new()).is_none());
    }

    #[test]
    fn test_importance_accumulates_on_split_features() {
        let dataset = quadrant_dataset(500, 4, 5);
        let tree = trained_tree(&dataset, 4, 6);
        assert_eq!(tree.importance().len(), 4);
        assert!(tree.importance().iter().all(|&value| value <= 0.0));
    }

    #[test]
    fn test_run_untrained() {
        let tree = DecisionTree::<f64>::new();
        let result = tree.run(&DMatrix::zeros(2, 2));
        assert!(matches!(result, Err(ForestError::Untrained)));
    }

    #[test]
    fn test_run_dimension_mismatch() {
        let dataset = quadrant_dataset(100, 2, 7);
        let tree = trained_tree(&dataset, 3, 7);
        let result = tree.run(&DMatrix::zeros(2, 3));
        assert!(matches!(
            result,
            Err(ForestError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_fit_without_features() {
        let dataset = Dataset::<f64>::new(DMatrix::zeros(3, 0), DVector::from_vec(vec![1, 2, 1]))
            .unwrap();
        let mut tree = DecisionTree::new();
        assert!(tree.fit(&dataset, Some(0)).is_err());
    }

    #[test]
    fn test_probabilities_are_distributions() {
        let dataset = quadrant_dataset(300, 2, 8);
        let tree = trained_tree(&dataset, 5, 8);
        let (labels, probabilities) = tree.run(dataset.x()).unwrap();
        assert_eq!(probabilities.shape(), (300, 3));
        for (row, label) in probabilities.row_iter().zip(labels.iter()) {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-9);
            assert_eq!(numeric::argmax(row.iter()) + 1, *label);
        }
    }

    #[test]
    fn test_same_seed_same_tree() {
        let dataset = quadrant_dataset(300, 2, 9);
        let first = trained_tree(&dataset, 5, 42);
        let second = trained_tree(&dataset, 5, 42);
        assert_eq!(first.root(), second.root());
        assert_eq!(first.importance(), second.importance());
    }

    #[test]
    fn test_run_is_idempotent() {
        let dataset = quadrant_dataset(300, 2, 10);
        let tree = trained_tree(&dataset, 5, 10);
        let test = quadrant_dataset(50, 2, 11);
        let (labels, probabilities) = tree.run(test.x()).unwrap();
        let (labels_again, probabilities_again) = tree.run(test.x()).unwrap();
        assert_eq!(labels, labels_again);
        assert_eq!(probabilities, probabilities_again);
    }

    #[test]
    fn test_quadrant_accuracy() {
        let train = quadrant_dataset(1000, 2, 100);
        let test = quadrant_dataset(500, 2, 101);
        let mut tree = DecisionTree::with_params(Some(5), Some(1000), None).unwrap();
        tree.fit(&train, Some(12)).unwrap();

        let predictions = tree.predict(test.x()).unwrap();
        let accuracy = tree.accuracy(test.y(), &predictions).unwrap();
        assert!(accuracy > 0.8, "accuracy was {}", accuracy);
    }
}
