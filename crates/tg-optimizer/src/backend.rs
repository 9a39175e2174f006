//! Seam between model selection and the machine-learning library that
//! vectorizes text, trains estimators and runs cross-validation folds.

use serde::{Deserialize, Serialize};

use tg_types::{Dataset, Label, TgResult};

use crate::search::CandidateConfiguration;

/// Validation-fold outcome for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldPredictions {
    pub y_true: Vec<Label>,
    pub y_pred: Vec<Label>,
}

/// Opaque fitted pipeline state produced by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FittedModel(pub serde_json::Value);

/// External search mechanics. Implementations own fold generation, fold
/// execution, vectorization and estimator training.
pub trait SearchBackend: Send + Sync {
    /// Run `folds`-fold cross-validation of one candidate on `train`.
    fn cross_validate(
        &self,
        candidate: &CandidateConfiguration,
        train: &Dataset,
        folds: usize,
    ) -> TgResult<Vec<FoldPredictions>>;

    /// Fit the candidate on the whole training set.
    fn refit(&self, candidate: &CandidateConfiguration, train: &Dataset) -> TgResult<FittedModel>;

    /// Predict labels for unseen texts with a refit model.
    fn predict(&self, model: &FittedModel, texts: &[String]) -> TgResult<Vec<Label>>;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}
