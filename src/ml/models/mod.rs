//! Base learner implementations

pub mod boosted;
pub mod forest;
pub mod sequence;

pub use boosted::BoostedTreeRegressor;
pub use forest::ForestRegressor;
pub use sequence::SequenceRegressor;
