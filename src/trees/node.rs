use crate::data::dataset::RealNumber;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Decision tree node
///
/// A leaf stores the per-class weight that reached it during training (index `label - 1`),
/// unnormalized. A split sends rows with `x[feature_index] <= threshold` to `left`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TreeNode<XT: RealNumber> {
    Leaf {
        histogram: DVector<f64>,
    },
    Split {
        feature_index: usize,
        threshold: XT,
        left: Box<TreeNode<XT>>,
        right: Box<TreeNode<XT>>,
    },
}

impl<XT: RealNumber> TreeNode<XT> {
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    /// Follows the split tests for row `row` of `x` down to a leaf and returns its histogram.
    pub fn find_leaf(&self, x: &DMatrix<XT>, row: usize) -> &DVector<f64> {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { histogram } => return histogram,
                TreeNode::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[(row, *feature_index)] <= *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                }
            }
        }
    }

    /// Number of levels below and including this node.
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Whether every split tests a feature below `num_features` and every histogram has
    /// `num_labels` entries.
    pub fn fits_shape(&self, num_features: usize, num_labels: usize) -> bool {
        match self {
            TreeNode::Leaf { histogram } => histogram.len() == num_labels,
            TreeNode::Split {
                feature_index,
                left,
                right,
                ..
            } => {
                *feature_index < num_features
                    && left.fits_shape(num_features, num_labels)
                    && right.fits_shape(num_features, num_labels)
            }
        }
    }

    pub fn num_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.num_leaves() + right.num_leaves(),
        }
    }
}
