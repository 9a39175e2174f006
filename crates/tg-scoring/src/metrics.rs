//! Scoring functions over (true labels, predicted labels).
//!
//! Every function returns a score where higher is better, so candidates can
//! be ranked by any of them.

use tg_types::{Label, ScoringError};

use crate::confusion::ConfusionMatrix;

/// Fraction of predictions that match the true label.
pub fn accuracy(y_true: &[Label], y_pred: &[Label]) -> Result<f64, ScoringError> {
    let cm = ConfusionMatrix::from_labels(y_true, y_pred)?;
    Ok(cm.trace() as f64 / cm.total() as f64)
}

/// Mean per-class recall over the classes present in `y_true`.
pub fn balanced_accuracy(y_true: &[Label], y_pred: &[Label]) -> Result<f64, ScoringError> {
    let cm = ConfusionMatrix::from_labels(y_true, y_pred)?;
    let recalls: Vec<f64> = cm
        .row_sums()
        .into_iter()
        .zip(cm.diagonal())
        .filter(|(support, _)| *support > 0)
        .map(|(support, hits)| hits as f64 / support as f64)
        .collect();

    Ok(recalls.iter().sum::<f64>() / recalls.len() as f64)
}

/// Multi-class Matthews correlation coefficient, in [-1, 1].
///
/// Returns 0 when either marginal distribution is constant.
pub fn matthews_corrcoef(y_true: &[Label], y_pred: &[Label]) -> Result<f64, ScoringError> {
    let cm = ConfusionMatrix::from_labels(y_true, y_pred)?;
    let t: Vec<f64> = cm.row_sums().into_iter().map(|v| v as f64).collect();
    let p: Vec<f64> = cm.col_sums().into_iter().map(|v| v as f64).collect();
    let c = cm.trace() as f64;
    let s = cm.total() as f64;

    let cov_ytyp = c * s - t.iter().zip(&p).map(|(tk, pk)| tk * pk).sum::<f64>();
    let cov_ypyp = s * s - p.iter().map(|pk| pk * pk).sum::<f64>();
    let cov_ytyt = s * s - t.iter().map(|tk| tk * tk).sum::<f64>();

    let denominator = (cov_ytyt * cov_ypyp).sqrt();
    if denominator == 0.0 {
        return Ok(0.0);
    }
    Ok(cov_ytyp / denominator)
}

/// Class-balance accuracy: mean over classes of
/// `cm[i][i] / max(actual_i, predicted_i)`.
pub fn class_balance_accuracy(y_true: &[Label], y_pred: &[Label]) -> Result<f64, ScoringError> {
    let cm = ConfusionMatrix::from_labels(y_true, y_pred)?;
    class_balance_accuracy_from_matrix(&cm)
}

/// Class-balance accuracy of a precomputed matrix.
///
/// A class with zero actual and zero predicted members has no defined score
/// and fails with [`ScoringError::DegenerateClass`].
pub fn class_balance_accuracy_from_matrix(cm: &ConfusionMatrix) -> Result<f64, ScoringError> {
    if cm.n_classes() == 0 {
        return Err(ScoringError::EmptyInput);
    }

    let row_sums = cm.row_sums();
    let col_sums = cm.col_sums();
    let mut total = 0.0;

    for i in 0..cm.n_classes() {
        let denominator = row_sums[i].max(col_sums[i]);
        if denominator == 0 {
            return Err(ScoringError::DegenerateClass {
                label: cm.labels[i].clone(),
            });
        }
        total += cm.counts[i][i] as f64 / denominator as f64;
    }

    Ok(total / cm.n_classes() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<Label> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn matrix(counts: Vec<Vec<usize>>) -> ConfusionMatrix {
        let names = (0..counts.len()).map(|i| i.to_string()).collect();
        ConfusionMatrix::from_counts(names, counts).unwrap()
    }

    /// Expand a confusion matrix back into label sequences.
    fn sequences(counts: &[Vec<usize>]) -> (Vec<Label>, Vec<Label>) {
        let mut y_true = Vec::new();
        let mut y_pred = Vec::new();
        for (i, row) in counts.iter().enumerate() {
            for (j, &n) in row.iter().enumerate() {
                for _ in 0..n {
                    y_true.push(i.to_string());
                    y_pred.push(j.to_string());
                }
            }
        }
        (y_true, y_pred)
    }

    #[test]
    fn class_balance_accuracy_perfect_matrix_is_one() {
        let cm = matrix(vec![vec![5, 0, 0], vec![0, 5, 0], vec![0, 0, 5]]);
        assert_eq!(class_balance_accuracy_from_matrix(&cm).unwrap(), 1.0);

        let (y_true, y_pred) = sequences(&cm.counts);
        assert_eq!(class_balance_accuracy(&y_true, &y_pred).unwrap(), 1.0);
    }

    #[test]
    fn class_balance_accuracy_two_class_example() {
        // row sums [3, 3], col sums [2, 4] => (2/3 + 3/4) / 2
        let counts = vec![vec![2, 1], vec![0, 3]];
        let cm = matrix(counts.clone());
        let score = class_balance_accuracy_from_matrix(&cm).unwrap();
        assert!((score - 0.708).abs() < 1e-3, "got {score}");

        let (y_true, y_pred) = sequences(&counts);
        let from_labels = class_balance_accuracy(&y_true, &y_pred).unwrap();
        assert!((from_labels - score).abs() < 1e-12);
    }

    #[test]
    fn class_balance_accuracy_rejects_absent_class() {
        let cm = ConfusionMatrix::with_labels(
            labels(&["a", "b", "ghost"]),
            &labels(&["a", "b"]),
            &labels(&["a", "b"]),
        )
        .unwrap();
        let err = class_balance_accuracy_from_matrix(&cm).unwrap_err();
        assert!(matches!(err, ScoringError::DegenerateClass { ref label } if label == "ghost"));
    }

    #[test]
    fn accuracy_counts_matches() {
        let y_true = labels(&["a", "b", "b", "c"]);
        let y_pred = labels(&["a", "b", "c", "c"]);
        assert_eq!(accuracy(&y_true, &y_pred).unwrap(), 0.75);
    }

    #[test]
    fn balanced_accuracy_averages_recall() {
        // recall a = 1/1, recall b = 1/3
        let y_true = labels(&["a", "b", "b", "b"]);
        let y_pred = labels(&["a", "b", "a", "a"]);
        let score = balanced_accuracy(&y_true, &y_pred).unwrap();
        assert!((score - (1.0 + 1.0 / 3.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn balanced_accuracy_ignores_predicted_only_classes() {
        let y_true = labels(&["a", "a"]);
        let y_pred = labels(&["a", "z"]);
        assert_eq!(balanced_accuracy(&y_true, &y_pred).unwrap(), 0.5);
    }

    #[test]
    fn matthews_binary_matches_closed_form() {
        // tp=3 fn=1 fp=1 tn=3 => (9 - 1) / sqrt(4*4*4*4) = 0.5
        let counts = vec![vec![3, 1], vec![1, 3]];
        let (y_true, y_pred) = sequences(&counts);
        let score = matthews_corrcoef(&y_true, &y_pred).unwrap();
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn matthews_perfect_and_constant() {
        let y = labels(&["a", "b", "c", "a"]);
        assert!((matthews_corrcoef(&y, &y).unwrap() - 1.0).abs() < 1e-12);

        let y_true = labels(&["a", "b", "a"]);
        let y_pred = labels(&["a", "a", "a"]);
        assert_eq!(matthews_corrcoef(&y_true, &y_pred).unwrap(), 0.0);
    }

    #[test]
    fn metrics_propagate_input_errors() {
        assert!(matches!(accuracy(&[], &[]), Err(ScoringError::EmptyInput)));
        assert!(matches!(
            class_balance_accuracy(&labels(&["a"]), &[]),
            Err(ScoringError::LengthMismatch { .. })
        ));
    }
}
