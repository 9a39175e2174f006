//! Expansion of grid templates into concrete candidate configurations.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use tg_types::params::keys;
use tg_types::{ClassifierFamily, ConfigError, ParamGrid, ParamValue};

use crate::assembler::{GridTemplate, GridVariant};

/// One fully resolved combination of preprocessing and classifier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateConfiguration {
    /// Position in the overall expansion order (0-indexed).
    pub number: usize,
    pub classifier: ClassifierFamily,
    pub variant: GridVariant,
    /// Constructor arguments that are not searched (e.g. `max_iter`).
    pub fixed_arguments: BTreeMap<String, ParamValue>,
    pub preprocessing: BTreeMap<String, ParamValue>,
    pub hyperparameters: BTreeMap<String, ParamValue>,
}

impl CandidateConfiguration {
    /// `norm = None` must come with `use_idf = false`.
    pub fn check_idf_norm_pairing(&self) -> Result<(), ConfigError> {
        let norm_is_none = self
            .preprocessing
            .get(keys::NORM)
            .map_or(true, ParamValue::is_none);
        let use_idf = self.preprocessing.get(keys::USE_IDF);

        if norm_is_none && use_idf != Some(&ParamValue::Bool(false)) {
            return Err(ConfigError::InvalidGrid {
                message: format!(
                    "candidate {} pairs normalization None with use_idf {}",
                    self.number,
                    use_idf.map_or_else(|| "unset".to_string(), ToString::to_string)
                ),
            });
        }
        Ok(())
    }
}

impl fmt::Display for CandidateConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.number, self.classifier)?;
        for (name, value) in self.preprocessing.iter().chain(&self.hyperparameters) {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}

/// Grid search over every template, in template order, optionally cut down
/// to a seeded random sample.
#[derive(Debug, Clone)]
pub struct GridSearch {
    candidates: Vec<CandidateConfiguration>,
}

impl GridSearch {
    pub fn new(templates: &[GridTemplate]) -> Result<Self, ConfigError> {
        let mut candidates = Vec::new();

        for template in templates {
            template.check_idf_norm_pairing()?;
            let preprocessing = Self::cartesian(&template.preprocessing);
            let hyperparameters = Self::cartesian(&template.hyperparameters);

            for pre in &preprocessing {
                for hyper in &hyperparameters {
                    let candidate = CandidateConfiguration {
                        number: candidates.len(),
                        classifier: template.classifier,
                        variant: template.variant,
                        fixed_arguments: template.classifier.fixed_arguments(),
                        preprocessing: pre.clone(),
                        hyperparameters: hyper.clone(),
                    };
                    candidate.check_idf_norm_pairing()?;
                    candidates.push(candidate);
                }
            }
        }

        Ok(Self { candidates })
    }

    /// Keep `n_iter` candidates drawn uniformly without replacement, seeded
    /// by `seed`. The kept candidates stay in expansion order and are
    /// renumbered from zero. A sample at least as large as the grid keeps
    /// every candidate.
    pub fn sample(self, n_iter: usize, seed: u64) -> Self {
        let total = self.candidates.len();
        if n_iter >= total {
            return self;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut picked = rand::seq::index::sample(&mut rng, total, n_iter).into_vec();
        picked.sort_unstable();

        let mut picked = picked.into_iter().peekable();
        let candidates = self
            .candidates
            .into_iter()
            .enumerate()
            .filter_map(|(position, candidate)| {
                if picked.peek() == Some(&position) {
                    picked.next();
                    Some(candidate)
                } else {
                    None
                }
            })
            .enumerate()
            .map(|(number, mut candidate)| {
                candidate.number = number;
                candidate
            })
            .collect();

        Self { candidates }
    }

    fn cartesian(grid: &ParamGrid) -> Vec<BTreeMap<String, ParamValue>> {
        let mut result: Vec<BTreeMap<String, ParamValue>> = vec![BTreeMap::new()];
        for (name, values) in grid.iter() {
            let mut next = Vec::with_capacity(result.len() * values.len());
            for existing in &result {
                for value in values {
                    let mut combo = existing.clone();
                    combo.insert(name.to_string(), value.clone());
                    next.push(combo);
                }
            }
            result = next;
        }
        result
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[CandidateConfiguration] {
        &self.candidates
    }

    pub fn into_candidates(self) -> Vec<CandidateConfiguration> {
        self.candidates
    }
}
