use crate::error::ForestError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: u16,
    pub num_candidates: usize,
    pub min_leaf_size: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeParams {
    pub fn new() -> Self {
        Self {
            max_depth: 5,
            num_candidates: 10,
            min_leaf_size: 10,
        }
    }

    /// Sets the maximum depth. The root sits at level 1, so a depth of 1 yields a single leaf.
    pub fn set_max_depth(&mut self, max_depth: u16) -> Result<(), ForestError> {
        if max_depth < 1 {
            return Err(ForestError::parameter("the maximum depth must be greater than 0"));
        }
        self.max_depth = max_depth;
        Ok(())
    }

    /// Sets how many random (feature, threshold) candidates are evaluated at every node.
    pub fn set_num_candidates(&mut self, num_candidates: usize) -> Result<(), ForestError> {
        if num_candidates < 1 {
            return Err(ForestError::parameter(
                "the number of candidates must be greater than 0",
            ));
        }
        self.num_candidates = num_candidates;
        Ok(())
    }

    /// Sets the smallest index set that may still be split.
    ///
    /// Training raises it to `n / 1000` for datasets larger than `1000 * min_leaf_size`.
    pub fn set_min_leaf_size(&mut self, min_leaf_size: usize) -> Result<(), ForestError> {
        if min_leaf_size < 1 {
            return Err(ForestError::parameter(
                "the minimum leaf size must be greater than 0",
            ));
        }
        self.min_leaf_size = min_leaf_size;
        Ok(())
    }

    pub fn max_depth(&self) -> u16 {
        self.max_depth
    }

    pub fn num_candidates(&self) -> usize {
        self.num_candidates
    }

    pub fn min_leaf_size(&self) -> usize {
        self.min_leaf_size
    }

    /// Minimum leaf size for a dataset of `nrows` samples.
    pub fn effective_min_leaf_size(&self, nrows: usize) -> usize {
        self.min_leaf_size.max(nrows / 1000)
    }

    /// Builds validated parameters, using the defaults for every `None`.
    pub fn build(
        max_depth: Option<u16>,
        num_candidates: Option<usize>,
        min_leaf_size: Option<usize>,
    ) -> Result<Self, ForestError> {
        let mut params = Self::new();
        if let Some(max_depth) = max_depth {
            params.set_max_depth(max_depth)?;
        }
        if let Some(num_candidates) = num_candidates {
            params.set_num_candidates(num_candidates)?;
        }
        if let Some(min_leaf_size) = min_leaf_size {
            params.set_min_leaf_size(min_leaf_size)?;
        }
        Ok(params)
    }
}
