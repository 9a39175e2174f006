use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;
use crate::params::ParamValue;

/// Closed set of classifier families that can be searched.
///
/// The serialized form is the estimator class name the search worker
/// instantiates, e.g. `SGDClassifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassifierFamily {
    #[serde(rename = "LinearSVC")]
    LinearSvc,
    #[serde(rename = "SGDClassifier")]
    StochasticGradient,
    #[serde(rename = "BernoulliNB")]
    BernoulliNaiveBayes,
    #[serde(rename = "ComplementNB")]
    ComplementNaiveBayes,
    #[serde(rename = "MultinomialNB")]
    MultinomialNaiveBayes,
    #[serde(rename = "RidgeClassifier")]
    Ridge,
    #[serde(rename = "Perceptron")]
    Perceptron,
    #[serde(rename = "PassiveAggressiveClassifier")]
    PassiveAggressive,
    #[serde(rename = "KNeighborsClassifier")]
    KNearestNeighbors,
    #[serde(rename = "NearestCentroid")]
    NearestCentroid,
    #[serde(rename = "RandomForestClassifier")]
    RandomForest,
}

impl ClassifierFamily {
    pub const ALL: [ClassifierFamily; 11] = [
        ClassifierFamily::LinearSvc,
        ClassifierFamily::StochasticGradient,
        ClassifierFamily::BernoulliNaiveBayes,
        ClassifierFamily::ComplementNaiveBayes,
        ClassifierFamily::MultinomialNaiveBayes,
        ClassifierFamily::Ridge,
        ClassifierFamily::Perceptron,
        ClassifierFamily::PassiveAggressive,
        ClassifierFamily::KNearestNeighbors,
        ClassifierFamily::NearestCentroid,
        ClassifierFamily::RandomForest,
    ];

    /// Estimator class name understood by the search worker.
    pub fn estimator_name(&self) -> &'static str {
        match self {
            ClassifierFamily::LinearSvc => "LinearSVC",
            ClassifierFamily::StochasticGradient => "SGDClassifier",
            ClassifierFamily::BernoulliNaiveBayes => "BernoulliNB",
            ClassifierFamily::ComplementNaiveBayes => "ComplementNB",
            ClassifierFamily::MultinomialNaiveBayes => "MultinomialNB",
            ClassifierFamily::Ridge => "RidgeClassifier",
            ClassifierFamily::Perceptron => "Perceptron",
            ClassifierFamily::PassiveAggressive => "PassiveAggressiveClassifier",
            ClassifierFamily::KNearestNeighbors => "KNeighborsClassifier",
            ClassifierFamily::NearestCentroid => "NearestCentroid",
            ClassifierFamily::RandomForest => "RandomForestClassifier",
        }
    }

    /// Constructor arguments that are fixed for the family and never searched.
    pub fn fixed_arguments(&self) -> BTreeMap<String, ParamValue> {
        let mut args = BTreeMap::new();
        if matches!(
            self,
            ClassifierFamily::StochasticGradient | ClassifierFamily::LinearSvc
        ) {
            args.insert("max_iter".to_string(), ParamValue::Int(10_000));
        }
        args
    }
}

impl Default for ClassifierFamily {
    fn default() -> Self {
        Self::StochasticGradient
    }
}

impl fmt::Display for ClassifierFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.estimator_name())
    }
}

impl FromStr for ClassifierFamily {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|family| family.estimator_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownClassifier {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_estimator_names_case_insensitively() {
        assert_eq!(
            "SGDClassifier".parse::<ClassifierFamily>().unwrap(),
            ClassifierFamily::StochasticGradient
        );
        assert_eq!(
            " multinomialnb ".parse::<ClassifierFamily>().unwrap(),
            ClassifierFamily::MultinomialNaiveBayes
        );
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "XGBClassifier".parse::<ClassifierFamily>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownClassifier { ref name } if name == "XGBClassifier"));
    }

    #[test]
    fn display_matches_serialized_name() {
        for family in ClassifierFamily::ALL {
            let json = serde_json::to_string(&family).unwrap();
            assert_eq!(json, format!("\"{}\"", family));
        }
    }

    #[test]
    fn only_iterative_linear_models_fix_max_iter() {
        assert_eq!(
            ClassifierFamily::StochasticGradient.fixed_arguments().get("max_iter"),
            Some(&ParamValue::Int(10_000))
        );
        assert!(ClassifierFamily::Ridge.fixed_arguments().is_empty());
    }
}
