//! Stratified train/test partitioning.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use tg_types::{config_error, DataError, Dataset, Label, TgResult};

/// Training and held-out partitions of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub train: Dataset,
    pub test: Dataset,
}

/// Shuffled split that keeps each class's share of the data in both parts.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedSplitter {
    test_size: f64,
    random_state: u64,
}

impl StratifiedSplitter {
    pub fn new(test_size: f64, random_state: u64) -> TgResult<Self> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(config_error!("test size must be in (0, 1), got {}", test_size));
        }
        Ok(Self {
            test_size,
            random_state,
        })
    }

    pub fn test_size(&self) -> f64 {
        self.test_size
    }

    /// Each class contributes `round(n * test_size)` documents to the test
    /// part, clamped so both parts keep at least one document of the class.
    pub fn split(&self, data: &Dataset) -> TgResult<TrainTestSplit> {
        let mut by_class: BTreeMap<&Label, Vec<usize>> = BTreeMap::new();
        for (position, doc) in data.documents.iter().enumerate() {
            by_class.entry(&doc.label).or_default().push(position);
        }

        if by_class.is_empty() {
            return Err(DataError::InsufficientData {
                message: "dataset has no labeled documents".to_string(),
            }
            .into());
        }
        if let Some((label, positions)) = by_class.iter().find(|(_, p)| p.len() < 2) {
            return Err(DataError::InsufficientData {
                message: format!(
                    "class {} has {} document(s), at least 2 are needed to stratify",
                    label,
                    positions.len()
                ),
            }
            .into());
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut train = Vec::with_capacity(data.len());
        let mut test = Vec::new();

        for positions in by_class.values_mut() {
            positions.shuffle(&mut rng);
            let n = positions.len();
            let n_test = ((n as f64) * self.test_size).round() as usize;
            let n_test = n_test.clamp(1, n - 1);
            test.extend_from_slice(&positions[..n_test]);
            train.extend_from_slice(&positions[n_test..]);
        }

        train.shuffle(&mut rng);
        test.shuffle(&mut rng);

        let split = TrainTestSplit {
            train: data.select(&train),
            test: data.select(&test),
        };
        tracing::info!(
            "Split {} documents into {} training and {} test documents",
            data.len(),
            split.train.len(),
            split.test.len()
        );
        Ok(split)
    }
}

impl Default for StratifiedSplitter {
    fn default() -> Self {
        Self {
            test_size: 0.33,
            random_state: 42,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_types::{Document, TgError};

    fn dataset(counts: &[(&str, usize)]) -> Dataset {
        let mut documents = Vec::new();
        for (label, count) in counts {
            for _ in 0..*count {
                let row = documents.len();
                documents.push(Document::new(row, format!("doc {row}"), *label));
            }
        }
        Dataset::new(documents)
    }

    #[test]
    fn test_class_proportions_are_kept() {
        let data = dataset(&[("a", 30), ("b", 60), ("c", 9)]);
        let split = StratifiedSplitter::default().split(&data).unwrap();

        let test_counts = split.test.class_counts();
        assert_eq!(test_counts["a"], 10);
        assert_eq!(test_counts["b"], 20);
        assert_eq!(test_counts["c"], 3);
        assert_eq!(split.train.len() + split.test.len(), data.len());
    }

    #[test]
    fn test_partitions_are_disjoint() {
        let data = dataset(&[("a", 12), ("b", 7)]);
        let split = StratifiedSplitter::default().split(&data).unwrap();

        let mut rows = split.train.rows();
        rows.extend(split.test.rows());
        rows.sort_unstable();
        assert_eq!(rows, (0..19).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let data = dataset(&[("a", 20), ("b", 20)]);
        let first = StratifiedSplitter::new(0.25, 7).unwrap().split(&data).unwrap();
        let second = StratifiedSplitter::new(0.25, 7).unwrap().split(&data).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_small_classes_keep_both_sides() {
        let data = dataset(&[("a", 2), ("b", 50)]);
        let split = StratifiedSplitter::new(0.9, 1).unwrap().split(&data).unwrap();
        assert_eq!(split.train.class_counts()["a"], 1);
        assert_eq!(split.test.class_counts()["a"], 1);
    }

    #[test]
    fn test_singleton_class_is_rejected() {
        let data = dataset(&[("a", 10), ("lonely", 1)]);
        let err = StratifiedSplitter::default().split(&data).unwrap_err();
        assert!(matches!(err, TgError::Data(DataError::InsufficientData { .. })));
    }

    #[test]
    fn test_invalid_test_size() {
        assert!(StratifiedSplitter::new(0.0, 42).is_err());
        assert!(StratifiedSplitter::new(1.0, 42).is_err());
        assert!(StratifiedSplitter::new(f64::NAN, 42).is_err());
    }
}
