//! Experiment configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use tg_data::SavedObject;
use tg_scoring::ScoringRegistry;
use tg_types::{config_error, ClassifierFamily, TgResult};

/// Command line of the external search worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Split a shell-like command line on whitespace. Quoting is not supported.
    pub fn parse(command_line: &str) -> TgResult<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| config_error!("worker command is empty"))?;
        Ok(Self::new(program).with_args(parts))
    }
}

/// Everything needed to run one text classification experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub id: Uuid,
    pub name: String,
    /// CSV file with the documents.
    pub data_path: PathBuf,
    /// Column holding the class labels.
    pub target: String,
    /// Column holding the text.
    pub predictor: String,
    pub test_size: f64,
    pub random_state: u64,
    /// Estimator class names, e.g. `SGDClassifier`.
    pub learners: Vec<String>,
    /// Selection metric as typed by the user, e.g. `balanced_accuracy_score`.
    pub metric: String,
    pub folds: usize,
    pub n_jobs: usize,
    /// Evaluate this many candidates drawn from the grid instead of all of them.
    pub n_iter: Option<usize>,
    /// Tokenizer name passed through to the worker, e.g. `wordnet` or `spacy`.
    pub tokenizer: Option<String>,
    /// Select-percentile values to sweep. Empty disables feature selection.
    pub feature_selection: Vec<u32>,
    pub objects_to_save: Vec<SavedObject>,
    pub save_pipeline_as: String,
    pub results_folder: PathBuf,
    pub worker: Option<WorkerCommand>,
    pub created_at: DateTime<Utc>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self::new("text classification".to_string())
    }
}

impl ExperimentConfig {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            data_path: PathBuf::from("datasets/text_data.csv"),
            target: "label".to_string(),
            predictor: "feedback".to_string(),
            test_size: 0.33,
            random_state: 42,
            learners: vec![ClassifierFamily::StochasticGradient.estimator_name().to_string()],
            metric: "class_balance_accuracy".to_string(),
            folds: 5,
            n_jobs: 5,
            n_iter: None,
            tokenizer: None,
            feature_selection: Vec::new(),
            objects_to_save: SavedObject::ALL.to_vec(),
            save_pipeline_as: "finalized_model".to_string(),
            results_folder: PathBuf::from("results"),
            worker: None,
            created_at: Utc::now(),
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> TgResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        tracing::debug!("Loaded experiment config from {}", path.display());
        Ok(config)
    }

    pub fn with_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_columns(mut self, target: &str, predictor: &str) -> Self {
        self.target = target.to_string();
        self.predictor = predictor.to_string();
        self
    }

    pub fn with_learners<I, S>(mut self, learners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.learners = learners.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metric(mut self, metric: &str) -> Self {
        self.metric = metric.to_string();
        self
    }

    pub fn with_cv(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = Some(n_iter);
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: &str) -> Self {
        self.tokenizer = Some(tokenizer.to_string());
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_feature_selection(mut self, percentiles: Vec<u32>) -> Self {
        self.feature_selection = percentiles;
        self
    }

    pub fn with_objects_to_save(mut self, objects: Vec<SavedObject>) -> Self {
        self.objects_to_save = objects;
        self
    }

    pub fn with_results(mut self, folder: impl Into<PathBuf>, save_pipeline_as: &str) -> Self {
        self.results_folder = folder.into();
        self.save_pipeline_as = save_pipeline_as.to_string();
        self
    }

    pub fn with_worker(mut self, worker: WorkerCommand) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Check every setting before any data is touched. Returns the resolved
    /// metric name and classifier families.
    pub fn validate(&self, registry: &ScoringRegistry) -> TgResult<ValidatedConfig> {
        let metric = registry.resolve(&self.metric)?;

        if self.learners.is_empty() {
            return Err(config_error!("at least one learner is required"));
        }
        let classifiers = self
            .learners
            .iter()
            .map(|name| name.parse::<ClassifierFamily>())
            .collect::<Result<Vec<_>, _>>()?;

        if self.folds < 2 {
            return Err(config_error!("cv must be at least 2, got {}", self.folds));
        }
        if self.n_jobs == 0 {
            return Err(config_error!("n_jobs must be at least 1"));
        }
        if self.n_iter == Some(0) {
            return Err(config_error!("n_iter must be at least 1"));
        }
        if matches!(&self.tokenizer, Some(t) if t.trim().is_empty()) {
            return Err(config_error!("tokenizer must not be empty"));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(config_error!("test size must be in (0, 1), got {}", self.test_size));
        }
        if let Some(p) = self.feature_selection.iter().find(|p| **p == 0 || **p > 100) {
            return Err(config_error!("feature selection percentile {} is outside 1..=100", p));
        }
        if self.save_pipeline_as.trim().is_empty() {
            return Err(config_error!("save_pipeline_as must not be empty"));
        }

        Ok(ValidatedConfig { metric, classifiers })
    }
}

/// Settings resolved by [`ExperimentConfig::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    /// Registry key of the selection metric.
    pub metric: String,
    pub classifiers: Vec<ClassifierFamily>,
}
