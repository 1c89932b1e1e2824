use crate::{error::ForestError, trees::params::TreeParams};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub num_trees: usize,
    pub tree_params: TreeParams,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self::new()
    }
}

impl ForestParams {
    pub fn new() -> Self {
        Self {
            num_trees: 10,
            tree_params: TreeParams::new(),
        }
    }

    pub fn set_num_trees(&mut self, num_trees: usize) -> Result<(), ForestError> {
        if num_trees < 1 {
            return Err(ForestError::parameter(
                "the number of trees must be greater than 0",
            ));
        }
        self.num_trees = num_trees;
        Ok(())
    }

    pub fn set_tree_params(&mut self, tree_params: TreeParams) {
        self.tree_params = tree_params;
    }

    pub fn num_trees(&self) -> usize {
        self.num_trees
    }

    pub fn tree_params(&self) -> &TreeParams {
        &self.tree_params
    }
}
