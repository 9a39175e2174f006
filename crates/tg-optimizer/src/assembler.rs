//! Pairs the preprocessing grid with each classifier's grid.

use serde::{Deserialize, Serialize};

use tg_types::params::keys;
use tg_types::{ClassifierFamily, ConfigError, ParamGrid, ParamValue};

use crate::grid::{classifier_grid, PreprocessingGrid};

/// Which weighting scheme a template searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridVariant {
    /// L2-normalized TF-IDF, IDF toggle swept.
    Weighted,
    /// Raw term counts: IDF off and no normalization.
    RawCounts,
}

/// A set-valued grid for one classifier and one weighting variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridTemplate {
    pub classifier: ClassifierFamily,
    pub variant: GridVariant,
    pub preprocessing: ParamGrid,
    pub hyperparameters: ParamGrid,
}

impl GridTemplate {
    /// Number of concrete candidates this template expands into.
    pub fn combinations(&self) -> Option<usize> {
        self.preprocessing
            .combinations()?
            .checked_mul(self.hyperparameters.combinations()?)
    }

    /// Normalization must be explicit, must not mix `None` with a norm, and
    /// `None` must never be paired with IDF weighting.
    pub fn check_idf_norm_pairing(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidGrid {
            message: format!("{} ({:?}): {message}", self.classifier, self.variant),
        };

        let norm = match self.preprocessing.get(keys::NORM) {
            Some(values) if !values.is_empty() => values,
            _ => return Err(invalid("normalization must be set explicitly".to_string())),
        };
        let use_idf = self.preprocessing.get(keys::USE_IDF).unwrap_or(&[]);

        let has_none = norm.iter().any(ParamValue::is_none);
        if has_none && norm.len() > 1 {
            return Err(invalid(
                "normalization None must not share a grid entry with another norm".to_string(),
            ));
        }
        if has_none && use_idf.iter().any(|v| *v != ParamValue::Bool(false)) {
            return Err(invalid(
                "normalization None requires use_idf = [false]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Build the ordered template list: for each classifier, the weighted
/// variant followed by its raw-count variant.
pub fn assemble(
    base: &PreprocessingGrid,
    classifiers: &[ClassifierFamily],
) -> Result<Vec<GridTemplate>, ConfigError> {
    let mut templates = Vec::with_capacity(classifiers.len() * 2);
    let raw_count_overrides = ParamGrid::new()
        .with(keys::USE_IDF, vec![ParamValue::Bool(false)])
        .with(keys::NORM, vec![ParamValue::None]);

    for &classifier in classifiers {
        let weighted = GridTemplate {
            classifier,
            variant: GridVariant::Weighted,
            preprocessing: base
                .as_grid()
                .clone()
                .with(keys::NORM, vec![ParamValue::text("l2")]),
            hyperparameters: classifier_grid(classifier),
        };

        let raw_counts = GridTemplate {
            variant: GridVariant::RawCounts,
            preprocessing: weighted.preprocessing.merged(&raw_count_overrides),
            ..weighted.clone()
        };

        weighted.check_idf_norm_pairing()?;
        raw_counts.check_idf_norm_pairing()?;
        templates.push(weighted);
        templates.push(raw_counts);
    }

    Ok(templates)
}

/// [`assemble`] for estimator names; fails on the first unknown name before
/// building anything.
pub fn assemble_named<S: AsRef<str>>(
    base: &PreprocessingGrid,
    names: &[S],
) -> Result<Vec<GridTemplate>, ConfigError> {
    let classifiers = names
        .iter()
        .map(|name| name.as_ref().parse::<ClassifierFamily>())
        .collect::<Result<Vec<_>, _>>()?;
    assemble(base, &classifiers)
}
