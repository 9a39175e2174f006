use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use uuid::Uuid;

use tg_optimizer::{CandidateConfiguration, SelectionResult};
use tg_scoring::ClassAccuracy;

/// Summary of a finished experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub run_id: Uuid,
    pub selection_metric: String,
    pub winner: CandidateConfiguration,
    /// Winner's mean cross-validated score on the selection metric.
    pub cv_score: f64,
    /// Every registered metric on the held-out predictions.
    pub test_scores: BTreeMap<String, f64>,
    pub accuracy_per_class: Vec<ClassAccuracy>,
    pub candidates_evaluated: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub artifacts: Vec<PathBuf>,
}

const PREPROCESSOR_PREFIX: &str = "param_preprocessor__";
const CLASSIFIER_PREFIX: &str = "param_clf__";

/// Cross-validation results as a table, best candidate first. Parameter
/// columns are namespaced by pipeline step; a blank cell means the
/// candidate does not use that parameter.
pub fn tuning_table(selection: &SelectionResult) -> (Vec<String>, Vec<Vec<String>>) {
    let mut preprocessing_keys = BTreeSet::new();
    let mut classifier_keys = BTreeSet::new();
    for result in &selection.candidates {
        preprocessing_keys.extend(result.candidate.preprocessing.keys().cloned());
        classifier_keys.extend(result.candidate.hyperparameters.keys().cloned());
    }
    let metrics: Vec<String> = selection
        .candidates
        .first()
        .map(|c| c.mean_scores.keys().cloned().collect())
        .unwrap_or_default();

    let mut header: Vec<String> = ["rank", "candidate", "classifier", "variant"]
        .map(String::from)
        .to_vec();
    header.extend(preprocessing_keys.iter().map(|k| format!("{PREPROCESSOR_PREFIX}{k}")));
    header.extend(classifier_keys.iter().map(|k| format!("{CLASSIFIER_PREFIX}{k}")));
    for metric in &metrics {
        header.push(format!("mean_test_{metric}"));
        header.push(format!("std_test_{metric}"));
    }

    let rows = selection
        .ranked()
        .into_iter()
        .map(|result| {
            let candidate = &result.candidate;
            let mut row = vec![
                result.rank.to_string(),
                candidate.number.to_string(),
                candidate.classifier.to_string(),
                format!("{:?}", candidate.variant),
            ];
            let cell = |params: &BTreeMap<String, tg_types::ParamValue>, key: &String| {
                params.get(key).map(ToString::to_string).unwrap_or_default()
            };
            row.extend(preprocessing_keys.iter().map(|k| cell(&candidate.preprocessing, k)));
            row.extend(classifier_keys.iter().map(|k| cell(&candidate.hyperparameters, k)));
            for metric in &metrics {
                row.push(format_score(result.score(metric)));
                row.push(format_score(
                    result.std_scores.get(metric).copied().unwrap_or(f64::NAN),
                ));
            }
            row
        })
        .collect();

    (header, rows)
}

fn format_score(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        format!("{value:.6}")
    }
}
