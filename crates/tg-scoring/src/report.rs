//! Per-class accuracy on held-out predictions.

use serde::{Deserialize, Serialize};

use tg_types::{Label, ScoringError};

use crate::confusion::ConfusionMatrix;

/// Share of the documents of one class that were predicted correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAccuracy {
    pub label: Label,
    /// Number of test documents whose true label is `label`.
    pub support: usize,
    pub correct: usize,
    pub accuracy: f64,
}

/// One row per class present in `y_true`, sorted by label.
pub fn per_class_accuracy(
    y_true: &[Label],
    y_pred: &[Label],
) -> Result<Vec<ClassAccuracy>, ScoringError> {
    let cm = ConfusionMatrix::from_labels(y_true, y_pred)?;
    let rows = cm
        .labels
        .iter()
        .zip(cm.row_sums())
        .zip(cm.diagonal())
        .filter(|((_, support), _)| *support > 0)
        .map(|((label, support), correct)| ClassAccuracy {
            label: label.clone(),
            support,
            correct,
            accuracy: correct as f64 / support as f64,
        })
        .collect();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<Label> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reports_each_true_class() {
        let y_true = labels(&["care", "care", "staff", "staff", "staff"]);
        let y_pred = labels(&["care", "staff", "staff", "staff", "other"]);
        let report = per_class_accuracy(&y_true, &y_pred).unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].label, "care");
        assert_eq!(report[0].support, 2);
        assert_eq!(report[0].correct, 1);
        assert_eq!(report[0].accuracy, 0.5);
        assert_eq!(report[1].label, "staff");
        assert_eq!(report[1].correct, 2);
    }
}
