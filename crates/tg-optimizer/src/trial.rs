//! Candidate scoring records and selection outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::backend::FittedModel;
use crate::search::CandidateConfiguration;

/// Cross-validated scores of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate: CandidateConfiguration,
    /// Metric name -> score, one map per fold.
    pub fold_scores: Vec<BTreeMap<String, f64>>,
    pub mean_scores: BTreeMap<String, f64>,
    pub std_scores: BTreeMap<String, f64>,
    /// 1 = best by the selection metric.
    pub rank: usize,
}

impl CandidateResult {
    /// Aggregate per-fold scores into means and population standard deviations.
    pub fn from_folds(candidate: CandidateConfiguration, fold_scores: Vec<BTreeMap<String, f64>>) -> Self {
        let mut mean_scores = BTreeMap::new();
        let mut std_scores = BTreeMap::new();

        if let Some(first) = fold_scores.first() {
            for metric in first.keys() {
                let values: Vec<f64> = fold_scores
                    .iter()
                    .filter_map(|fold| fold.get(metric).copied())
                    .collect();
                let n = values.len() as f64;
                let mean = values.iter().sum::<f64>() / n;
                let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                mean_scores.insert(metric.clone(), mean);
                std_scores.insert(metric.clone(), variance.sqrt());
            }
        }

        Self {
            candidate,
            fold_scores,
            mean_scores,
            std_scores,
            rank: 0,
        }
    }

    /// Mean score for `metric`, NaN when missing.
    pub fn score(&self, metric: &str) -> f64 {
        self.mean_scores.get(metric).copied().unwrap_or(f64::NAN)
    }
}

/// Best candidate seen so far by the selection metric.
#[derive(Debug, Clone)]
pub(crate) struct BestCandidate {
    selection_metric: String,
    seen: usize,
    best: Option<CandidateResult>,
}

impl BestCandidate {
    pub(crate) fn new(selection_metric: &str) -> Self {
        Self {
            selection_metric: selection_metric.to_string(),
            seen: 0,
            best: None,
        }
    }

    /// Keep `result` if it scores strictly higher than the current best.
    /// NaN never wins against a finite score.
    pub(crate) fn offer(&mut self, result: &CandidateResult) {
        self.seen += 1;
        let score = result.score(&self.selection_metric);
        let improves = match &self.best {
            None => true,
            Some(current) => {
                let best = current.score(&self.selection_metric);
                score > best || (best.is_nan() && !score.is_nan())
            }
        };
        if improves {
            self.best = Some(result.clone());
        }
    }

    pub(crate) fn seen(&self) -> usize {
        self.seen
    }

    pub(crate) fn into_best(self) -> Option<CandidateResult> {
        self.best
    }
}

/// Outcome of model selection: the refit winner and every candidate's scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub run_id: Uuid,
    pub selection_metric: String,
    pub winner: CandidateConfiguration,
    /// Winner's mean cross-validated score on every registered metric.
    pub scores: BTreeMap<String, f64>,
    pub best_score: f64,
    pub model: FittedModel,
    pub folds: usize,
    /// All candidates in evaluation order, each with its rank.
    pub candidates: Vec<CandidateResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SelectionResult {
    /// Candidates ordered from best to worst.
    pub fn ranked(&self) -> Vec<&CandidateResult> {
        let mut ranked: Vec<&CandidateResult> = self.candidates.iter().collect();
        ranked.sort_by_key(|c| c.rank);
        ranked
    }
}
