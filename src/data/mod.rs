/// Dataset and the numeric traits for feature values
pub mod dataset;

#[cfg(test)]
pub(crate) mod synthetic;
