//! Classifier-specific and preprocessing parameter grids.

use serde::{Deserialize, Serialize};

use tg_types::params::keys;
use tg_types::{ClassifierFamily, ConfigError, ParamGrid, ParamValue};

/// Extra hyperparameters searched for one classifier family.
///
/// Looked up by family identity; families without a specific grid get an
/// empty mapping.
pub fn classifier_grid(family: ClassifierFamily) -> ParamGrid {
    let class_weight = || vec![ParamValue::None, ParamValue::text("balanced")];

    match family {
        ClassifierFamily::LinearSvc => ParamGrid::new().with(keys::CLASS_WEIGHT, class_weight()),
        ClassifierFamily::BernoulliNaiveBayes
        | ClassifierFamily::ComplementNaiveBayes
        | ClassifierFamily::MultinomialNaiveBayes => ParamGrid::new().with(
            keys::ALPHA,
            vec![
                ParamValue::Float(0.1),
                ParamValue::Float(0.5),
                ParamValue::Float(1.0),
            ],
        ),
        ClassifierFamily::StochasticGradient | ClassifierFamily::Perceptron => ParamGrid::new()
            .with(keys::CLASS_WEIGHT, class_weight())
            .with(
                keys::PENALTY,
                vec![ParamValue::text("l2"), ParamValue::text("elasticnet")],
            ),
        ClassifierFamily::Ridge => ParamGrid::new()
            .with(keys::CLASS_WEIGHT, class_weight())
            .with(
                keys::ALPHA,
                vec![
                    ParamValue::Float(0.1),
                    ParamValue::Float(1.0),
                    ParamValue::Float(10.0),
                ],
            ),
        ClassifierFamily::RandomForest => ParamGrid::new().with(
            keys::MAX_FEATURES,
            vec![ParamValue::text("sqrt"), ParamValue::Float(0.666)],
        ),
        ClassifierFamily::PassiveAggressive
        | ClassifierFamily::KNearestNeighbors
        | ClassifierFamily::NearestCentroid => ParamGrid::new(),
    }
}

/// [`classifier_grid`] for an estimator name such as `RidgeClassifier`.
pub fn classifier_grid_for(name: &str) -> Result<ParamGrid, ConfigError> {
    let family: ClassifierFamily = name.parse()?;
    Ok(classifier_grid(family))
}

/// Vectorizer (and optional feature-selection) sweep shared by every
/// classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingGrid {
    grid: ParamGrid,
}

impl PreprocessingGrid {
    /// N-gram range, document-frequency thresholds and the IDF toggle.
    pub fn base() -> Self {
        let grid = ParamGrid::new()
            .with(
                keys::NGRAM_RANGE,
                vec![
                    ParamValue::Range(1, 1),
                    ParamValue::Range(2, 2),
                    ParamValue::Range(1, 3),
                ],
            )
            .with(
                keys::MAX_DF,
                vec![ParamValue::Float(0.7), ParamValue::Float(0.95)],
            )
            .with(keys::MIN_DF, vec![ParamValue::Int(3), ParamValue::Int(1)])
            .with(
                keys::USE_IDF,
                vec![ParamValue::Bool(true), ParamValue::Bool(false)],
            );
        Self { grid }
    }

    /// Add a chi-squared select-percentile sweep after vectorization.
    pub fn with_feature_selection(mut self, percentiles: &[u32]) -> Self {
        if !percentiles.is_empty() {
            self.grid.set(
                keys::SELECT_PERCENTILE,
                percentiles
                    .iter()
                    .map(|&p| ParamValue::Int(i64::from(p)))
                    .collect(),
            );
        }
        self
    }

    pub fn as_grid(&self) -> &ParamGrid {
        &self.grid
    }
}

impl Default for PreprocessingGrid {
    fn default() -> Self {
        Self::base()
    }
}
