//! Named scorers used to evaluate and rank candidate configurations.

use std::collections::BTreeMap;
use std::fmt;

use tg_types::{ConfigError, Label, ScoringError};

use crate::metrics;

/// Scoring function: (true labels, predicted labels) -> score, higher is better.
pub type Scorer = fn(&[Label], &[Label]) -> Result<f64, ScoringError>;

pub const ACCURACY: &str = "Accuracy";
pub const BALANCED_ACCURACY: &str = "Balanced Accuracy";
pub const MATTHEWS_CORRELATION_COEFFICIENT: &str = "Matthews Correlation Coefficient";
pub const CLASS_BALANCE_ACCURACY: &str = "Class Balance Accuracy";

/// Turn user input such as `balanced_accuracy_score` into a registry key
/// such as `Balanced Accuracy`.
///
/// Underscores become spaces, a trailing `score` word is dropped and every
/// word is capitalized.
pub fn normalize_metric_name(raw: &str) -> String {
    let spaced = raw.trim().replace('_', " ");
    let mut words: Vec<&str> = spaced.split_whitespace().collect();
    if words.len() > 1 && words.last().is_some_and(|w| w.eq_ignore_ascii_case("score")) {
        words.pop();
    }

    words
        .into_iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ordered mapping from metric title to scorer.
#[derive(Clone)]
pub struct ScoringRegistry {
    entries: Vec<(String, Scorer)>,
}

impl ScoringRegistry {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Accuracy, balanced accuracy, Matthews correlation and class-balance
    /// accuracy, in that order.
    pub fn standard() -> Self {
        Self {
            entries: vec![
                (ACCURACY.to_string(), metrics::accuracy as Scorer),
                (BALANCED_ACCURACY.to_string(), metrics::balanced_accuracy),
                (
                    MATTHEWS_CORRELATION_COEFFICIENT.to_string(),
                    metrics::matthews_corrcoef,
                ),
                (
                    CLASS_BALANCE_ACCURACY.to_string(),
                    metrics::class_balance_accuracy,
                ),
            ],
        }
    }

    /// Add a scorer. The name must already be in normalized title form and
    /// must not be registered yet.
    pub fn register(&mut self, name: &str, scorer: Scorer) -> Result<(), ConfigError> {
        if normalize_metric_name(name) != name {
            return Err(ConfigError::Invalid {
                message: format!(
                    "metric name '{name}' must be title-cased without a trailing 'Score'"
                ),
            });
        }
        if self.get(name).is_some() {
            return Err(ConfigError::Invalid {
                message: format!("metric '{name}' is already registered"),
            });
        }
        self.entries.push((name.to_string(), scorer));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Scorer> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, scorer)| *scorer)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalize raw user input and match it exactly against the keys.
    pub fn resolve(&self, raw: &str) -> Result<String, ConfigError> {
        let name = normalize_metric_name(raw);
        if self.get(&name).is_some() {
            Ok(name)
        } else {
            Err(ConfigError::UnknownMetric {
                name,
                available: self.names(),
            })
        }
    }

    /// Evaluate every registered scorer on one set of predictions.
    pub fn score_all(
        &self,
        y_true: &[Label],
        y_pred: &[Label],
    ) -> Result<BTreeMap<String, f64>, ScoringError> {
        self.entries
            .iter()
            .map(|(name, scorer)| Ok((name.clone(), scorer(y_true, y_pred)?)))
            .collect()
    }
}

impl Default for ScoringRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for ScoringRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringRegistry")
            .field("metrics", &self.names())
            .finish()
    }
}
