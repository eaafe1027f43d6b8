//! Random sampling and train/test partitioning
//!
//! Both operations take the random source as a parameter; the pipeline seeds
//! a fresh generator for each so they are reproducible independently.

use rand::seq::{index, SliceRandom};
use rand::Rng;
use serde::Serialize;

use crate::error::{PipelineError, Result};

/// Row indices of the training and test partitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitIndices {
    /// In permutation order
    pub train: Vec<usize>,
    /// Ascending
    pub test: Vec<usize>,
}

impl SplitIndices {
    pub fn total(&self) -> usize {
        self.train.len() + self.test.len()
    }
}

/// Draw `size` distinct row indices out of `n_rows`
pub fn sample_indices<R: Rng + ?Sized>(n_rows: usize, size: usize, rng: &mut R) -> Result<Vec<usize>> {
    if size > n_rows {
        return Err(PipelineError::InsufficientRowsForSample {
            rows: n_rows,
            requested: size,
        });
    }
    Ok(index::sample(rng, n_rows, size).into_vec())
}

/// Shuffle all row indices and cut at `floor(train_fraction * n_rows)`
pub fn train_test_split<R: Rng + ?Sized>(n_rows: usize, train_fraction: f64, rng: &mut R) -> SplitIndices {
    let mut order: Vec<usize> = (0..n_rows).collect();
    order.shuffle(rng);

    let n_train = ((n_rows as f64) * train_fraction).floor() as usize;
    let n_train = n_train.min(n_rows);

    let mut test = order.split_off(n_train);
    test.sort_unstable();

    SplitIndices { train: order, test }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_split_sizes() {
        let mut rng = StdRng::seed_from_u64(42);
        let split = train_test_split(1000, 0.8, &mut rng);
        assert_eq!(split.train.len(), 800);
        assert_eq!(split.test.len(), 200);
    }

    #[test]
    fn test_split_floors_fraction() {
        let mut rng = StdRng::seed_from_u64(42);
        let split = train_test_split(7, 0.8, &mut rng);
        assert_eq!(split.train.len(), 5);
        assert_eq!(split.test.len(), 2);
    }

    #[test]
    fn test_test_indices_sorted() {
        let mut rng = StdRng::seed_from_u64(1);
        let split = train_test_split(50, 0.5, &mut rng);
        assert!(split.test.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_same_seed_same_partition() {
        let a = train_test_split(500, 0.8, &mut StdRng::seed_from_u64(42));
        let b = train_test_split(500, 0.8, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);

        let s1 = sample_indices(1000, 300, &mut StdRng::seed_from_u64(42)).unwrap();
        let s2 = sample_indices(1000, 300, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_sample_without_replacement() {
        let mut rng = StdRng::seed_from_u64(42);
        let sample = sample_indices(1000, 300, &mut rng).unwrap();
        assert_eq!(sample.len(), 300);
        let unique: HashSet<_> = sample.iter().collect();
        assert_eq!(unique.len(), 300);
        assert!(sample.iter().all(|&i| i < 1000));
    }

    #[test]
    fn test_sample_larger_than_table() {
        let mut rng = StdRng::seed_from_u64(42);
        let err = sample_indices(299, 300, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientRowsForSample { rows: 299, requested: 300 }
        ));
    }

    proptest! {
        #[test]
        fn prop_split_is_a_partition(n in 0usize..2000, fraction in 0.01f64..0.99, seed in any::<u64>()) {
            let split = train_test_split(n, fraction, &mut StdRng::seed_from_u64(seed));

            let train: HashSet<_> = split.train.iter().copied().collect();
            let test: HashSet<_> = split.test.iter().copied().collect();
            prop_assert_eq!(train.len(), split.train.len());
            prop_assert_eq!(test.len(), split.test.len());
            prop_assert!(train.is_disjoint(&test));

            let union: HashSet<_> = train.union(&test).copied().collect();
            prop_assert_eq!(union, (0..n).collect::<HashSet<_>>());
            prop_assert_eq!(split.total(), n);
        }
    }
}
