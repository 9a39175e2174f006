//! Multi-class confusion matrix.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use tg_types::{Label, ScoringError};

/// Confusion matrix with rows = true class, columns = predicted class.
///
/// Classes are kept in one consistent order for both axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<Label>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Build over the sorted union of labels seen in either sequence.
    pub fn from_labels(y_true: &[Label], y_pred: &[Label]) -> Result<Self, ScoringError> {
        check_inputs(y_true, y_pred)?;
        let labels: BTreeSet<&Label> = y_true.iter().chain(y_pred.iter()).collect();
        let labels: Vec<Label> = labels.into_iter().cloned().collect();
        Self::with_labels(labels, y_true, y_pred)
    }

    /// Build over an explicit class order. Pairs whose true or predicted
    /// label is not listed are not counted.
    pub fn with_labels(
        labels: Vec<Label>,
        y_true: &[Label],
        y_pred: &[Label],
    ) -> Result<Self, ScoringError> {
        check_inputs(y_true, y_pred)?;
        let index: HashMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i))
            .collect();

        let n = labels.len();
        let mut counts = vec![vec![0usize; n]; n];
        for (t, p) in y_true.iter().zip(y_pred) {
            if let (Some(&i), Some(&j)) = (index.get(t.as_str()), index.get(p.as_str())) {
                counts[i][j] += 1;
            }
        }

        Ok(Self { labels, counts })
    }

    /// Wrap precomputed counts; the matrix must be square and match `labels`.
    pub fn from_counts(labels: Vec<Label>, counts: Vec<Vec<usize>>) -> Result<Self, ScoringError> {
        let n = labels.len();
        if counts.len() != n {
            return Err(ScoringError::LengthMismatch {
                true_len: counts.len(),
                pred_len: n,
            });
        }
        if let Some(row) = counts.iter().find(|row| row.len() != n) {
            return Err(ScoringError::LengthMismatch {
                true_len: n,
                pred_len: row.len(),
            });
        }
        Ok(Self { labels, counts })
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Actual count per class.
    pub fn row_sums(&self) -> Vec<usize> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    /// Predicted count per class.
    pub fn col_sums(&self) -> Vec<usize> {
        (0..self.n_classes())
            .map(|j| self.counts.iter().map(|row| row[j]).sum())
            .collect()
    }

    pub fn diagonal(&self) -> Vec<usize> {
        (0..self.n_classes()).map(|i| self.counts[i][i]).collect()
    }

    pub fn trace(&self) -> usize {
        self.diagonal().iter().sum()
    }
}

fn check_inputs(y_true: &[Label], y_pred: &[Label]) -> Result<(), ScoringError> {
    if y_true.len() != y_pred.len() {
        return Err(ScoringError::LengthMismatch {
            true_len: y_true.len(),
            pred_len: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(ScoringError::EmptyInput);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<Label> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rows_are_true_and_columns_are_predicted() {
        let y_true = labels(&["a", "a", "b", "b", "b"]);
        let y_pred = labels(&["a", "b", "b", "b", "a"]);
        let cm = ConfusionMatrix::from_labels(&y_true, &y_pred).unwrap();

        assert_eq!(cm.labels, labels(&["a", "b"]));
        assert_eq!(cm.counts, vec![vec![1, 1], vec![1, 2]]);
        assert_eq!(cm.row_sums(), vec![2, 3]);
        assert_eq!(cm.col_sums(), vec![2, 3]);
        assert_eq!(cm.trace(), 3);
        assert_eq!(cm.total(), 5);
    }

    #[test]
    fn predicted_only_class_gets_a_row() {
        let y_true = labels(&["a", "a"]);
        let y_pred = labels(&["a", "c"]);
        let cm = ConfusionMatrix::from_labels(&y_true, &y_pred).unwrap();
        assert_eq!(cm.labels, labels(&["a", "c"]));
        assert_eq!(cm.row_sums(), vec![2, 0]);
        assert_eq!(cm.col_sums(), vec![1, 1]);
    }

    #[test]
    fn explicit_labels_keep_absent_classes() {
        let y_true = labels(&["a", "b"]);
        let y_pred = labels(&["a", "b"]);
        let cm = ConfusionMatrix::with_labels(labels(&["a", "b", "z"]), &y_true, &y_pred).unwrap();
        assert_eq!(cm.n_classes(), 3);
        assert_eq!(cm.row_sums()[2], 0);
        assert_eq!(cm.col_sums()[2], 0);
    }

    #[test]
    fn rejects_mismatched_and_empty_inputs() {
        let err = ConfusionMatrix::from_labels(&labels(&["a"]), &labels(&["a", "b"])).unwrap_err();
        assert!(matches!(err, ScoringError::LengthMismatch { true_len: 1, pred_len: 2 }));

        let err = ConfusionMatrix::from_labels(&[], &[]).unwrap_err();
        assert!(matches!(err, ScoringError::EmptyInput));
    }

    #[test]
    fn from_counts_requires_square_matrix() {
        assert!(ConfusionMatrix::from_counts(labels(&["0", "1"]), vec![vec![1, 2], vec![3]]).is_err());
        assert!(ConfusionMatrix::from_counts(labels(&["0", "1"]), vec![vec![1, 2], vec![3, 4]]).is_ok());
    }
}
