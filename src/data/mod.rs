//! Tabular data handling
//!
//! - [`loader`]: CSV files into one polars table
//! - [`profile`]: summary statistics and missing-value counts
//! - [`split`]: seeded subsampling and train/test partitioning
//! - [`features`]: feature/target selection and scaling

pub mod features;
pub mod loader;
pub mod profile;
pub mod split;

pub use features::{Dataset, Standardizer};
pub use profile::DatasetProfile;
pub use split::SplitIndices;
