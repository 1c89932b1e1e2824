use crate::{error::ForestError, trees::params::TreeParams};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub num_rounds: usize,
    pub tree_params: TreeParams,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self::new()
    }
}

impl BoostingParams {
    pub fn new() -> Self {
        Self {
            num_rounds: 10,
            tree_params: TreeParams::new(),
        }
    }

    /// Sets the number of boosting rounds, i.e. the number of weak learners.
    pub fn set_num_rounds(&mut self, num_rounds: usize) -> Result<(), ForestError> {
        if num_rounds < 1 {
            return Err(ForestError::parameter(
                "the number of boosting rounds must be greater than 0",
            ));
        }
        self.num_rounds = num_rounds;
        Ok(())
    }

    pub fn set_tree_params(&mut self, tree_params: TreeParams) {
        self.tree_params = tree_params;
    }

    pub fn num_rounds(&self) -> usize {
        self.num_rounds
    }

    pub fn tree_params(&self) -> &TreeParams {
        &self.tree_params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_num_rounds() {
        let mut params = BoostingParams::default();
        assert!(params.set_num_rounds(0).is_err());
        params.set_num_rounds(25).unwrap();
        assert_eq!(params.num_rounds(), 25);
    }
}
