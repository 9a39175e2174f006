//! TextGrid experiment driver.
//!
//! Loads a labeled CSV file, splits it, searches every configured classifier
//! over the assembled grid, evaluates the refit winner on the held-out part
//! and writes the requested artifacts.

pub mod config;
pub mod process;
pub mod report;

pub use config::{ExperimentConfig, ValidatedConfig, WorkerCommand};
pub use process::{ProcessBackend, WorkerReply, WorkerRequest, WorkerTask};
pub use report::{tuning_table, ExperimentReport};

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use tg_data::{ArtifactStore, CsvSource, SavedObject, StratifiedSplitter, TrainTestSplit};
use tg_optimizer::{
    assemble, GridTemplate, ModelSelector, PreprocessingGrid, SearchBackend, SearchPlan,
    SearchSettings, SelectionResult,
};
use tg_scoring::{per_class_accuracy, ClassAccuracy, ScoringRegistry};
use tg_types::{internal_error, Label, TgResult};

/// Pipeline artifact: the configuration next to the selection outcome.
#[derive(Debug, Serialize)]
struct SavedPipeline<'a> {
    experiment: &'a ExperimentConfig,
    selection: &'a SelectionResult,
}

/// One configured experiment, validated up front.
#[derive(Debug)]
pub struct Experiment {
    config: ExperimentConfig,
    validated: ValidatedConfig,
    registry: ScoringRegistry,
}

impl Experiment {
    /// Fails on an unknown metric or learner before any data is read.
    pub fn new(config: ExperimentConfig) -> TgResult<Self> {
        Self::with_registry(config, ScoringRegistry::standard())
    }

    pub fn with_registry(config: ExperimentConfig, registry: ScoringRegistry) -> TgResult<Self> {
        let validated = config.validate(&registry)?;
        info!(
            "Experiment {} selects by {} over {} learner(s)",
            config.name,
            validated.metric,
            validated.classifiers.len()
        );
        Ok(Self {
            config,
            validated,
            registry,
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn selection_metric(&self) -> &str {
        &self.validated.metric
    }

    /// Parameter grid templates for the configured learners.
    pub fn templates(&self) -> TgResult<Vec<GridTemplate>> {
        let base =
            PreprocessingGrid::base().with_feature_selection(&self.config.feature_selection);
        Ok(assemble(&base, &self.validated.classifiers)?)
    }

    fn selector(&self) -> TgResult<ModelSelector> {
        ModelSelector::new(
            self.registry.clone(),
            &self.validated.metric,
            SearchSettings {
                folds: self.config.folds,
                n_jobs: self.config.n_jobs,
                n_iter: self.config.n_iter,
                random_state: self.config.random_state,
            },
        )
    }

    /// The search that [`Experiment::run`] would dispatch, without running it.
    pub fn plan(&self) -> TgResult<SearchPlan> {
        self.selector()?.plan(&self.templates()?)
    }

    /// Load the data source and split it.
    pub async fn prepare(&self) -> TgResult<TrainTestSplit> {
        let source = CsvSource::new(&self.config.target, &self.config.predictor);
        let dataset = source.load(&self.config.data_path).await?;
        StratifiedSplitter::new(self.config.test_size, self.config.random_state)?.split(&dataset)
    }

    /// Run the experiment end to end.
    pub async fn run(&self, backend: Arc<dyn SearchBackend>) -> TgResult<ExperimentReport> {
        let split = self.prepare().await?;
        let templates = self.templates()?;
        let selector = self.selector()?;

        let train = split.train.clone();
        let test_texts = split.test.texts();
        let search_backend = Arc::clone(&backend);
        let (selection, predicted) = tokio::task::spawn_blocking(move || {
            let selection = selector.select(&templates, &train, search_backend.as_ref())?;
            let predicted = search_backend.predict(&selection.model, &test_texts)?;
            TgResult::Ok((selection, predicted))
        })
        .await
        .map_err(|e| internal_error!("Search task failed: {}", e))??;

        let actual = split.test.labels();
        let test_scores = self.registry.score_all(&actual, &predicted)?;
        let accuracy_per_class = per_class_accuracy(&actual, &predicted)?;
        for (metric, score) in &test_scores {
            info!("Test {}: {:.4}", metric, score);
        }

        let artifacts = self
            .save(&selection, &split, &predicted, &accuracy_per_class)
            .await?;

        Ok(ExperimentReport {
            run_id: selection.run_id,
            selection_metric: selection.selection_metric.clone(),
            winner: selection.winner.clone(),
            cv_score: selection.best_score,
            test_scores,
            accuracy_per_class,
            candidates_evaluated: selection.candidates.len(),
            train_size: split.train.len(),
            test_size: split.test.len(),
            artifacts,
        })
    }

    async fn save(
        &self,
        selection: &SelectionResult,
        split: &TrainTestSplit,
        predicted: &[Label],
        accuracy_per_class: &[ClassAccuracy],
    ) -> TgResult<Vec<PathBuf>> {
        let mut objects = self.config.objects_to_save.clone();
        objects.sort();
        objects.dedup();
        if objects.is_empty() {
            warn!("No objects selected for saving");
            return Ok(Vec::new());
        }

        let store = ArtifactStore::new(&self.config.results_folder)?;
        let save_as = &self.config.save_pipeline_as;
        let mut written = Vec::with_capacity(objects.len());

        for object in objects {
            let file_name = object.file_name(save_as);
            let path = match object {
                SavedObject::Pipeline => {
                    let pipeline = SavedPipeline {
                        experiment: &self.config,
                        selection,
                    };
                    store.write_json(&file_name, &pipeline).await?
                }
                SavedObject::TuningResults => {
                    let (header, rows) = tuning_table(selection);
                    store.write_table(&file_name, &header, &rows).await?
                }
                SavedObject::Predictions => {
                    store.write_predictions(&file_name, &split.test, predicted).await?
                }
                SavedObject::AccuracyPerClass => {
                    store.write_records(&file_name, accuracy_per_class).await?
                }
                SavedObject::TrainingIndex => store.write_index(&file_name, &split.train).await?,
                SavedObject::TestIndex => store.write_index(&file_name, &split.test).await?,
            };
            written.push(path);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tg_optimizer::{CandidateConfiguration, FittedModel, FoldPredictions};
    use tg_types::{ConfigError, Dataset, TgError};

    /// Predicts the majority class of the training data, except that
    /// candidate 3 learns the word "great" means positive.
    #[derive(Default)]
    struct KeywordBackend {
        calls: AtomicUsize,
    }

    fn keyword_predict(texts: &[String], smart: bool) -> Vec<Label> {
        texts
            .iter()
            .map(|t| {
                if !smart || t.contains("great") {
                    "positive".to_string()
                } else {
                    "negative".to_string()
                }
            })
            .collect()
    }

    impl SearchBackend for KeywordBackend {
        fn cross_validate(
            &self,
            candidate: &CandidateConfiguration,
            train: &Dataset,
            folds: usize,
        ) -> TgResult<Vec<FoldPredictions>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let y_pred = keyword_predict(&train.texts(), candidate.number == 3);
            Ok((0..folds)
                .map(|_| FoldPredictions {
                    y_true: train.labels(),
                    y_pred: y_pred.clone(),
                })
                .collect())
        }

        fn refit(&self, candidate: &CandidateConfiguration, _train: &Dataset) -> TgResult<FittedModel> {
            Ok(FittedModel(serde_json::json!({ "smart": candidate.number == 3 })))
        }

        fn predict(&self, model: &FittedModel, texts: &[String]) -> TgResult<Vec<Label>> {
            Ok(keyword_predict(texts, model.0["smart"] == true))
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    fn write_dataset(dir: &std::path::Path) -> PathBuf {
        let mut content = String::from("feedback,label\n");
        for i in 0..12 {
            content.push_str(&format!("great visit {i},positive\n"));
            content.push_str(&format!("awful wait {i},negative\n"));
        }
        content.push_str("no label here,\n");
        let path = dir.join("feedback.csv");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn config(dir: &std::path::Path) -> ExperimentConfig {
        ExperimentConfig::new("keyword test".to_string())
            .with_data(write_dataset(dir))
            .with_learners(["NearestCentroid"])
            .with_metric("balanced_accuracy_score")
            .with_cv(3)
            .with_n_jobs(2)
            .with_results(dir.join("results"), "keyword_pipeline")
    }

    #[tokio::test]
    async fn test_end_to_end_run() {
        let dir = tempfile::tempdir().unwrap();
        let experiment = Experiment::new(config(dir.path())).unwrap();
        let backend = Arc::new(KeywordBackend::default());

        let report = experiment.run(backend.clone()).await.unwrap();

        assert_eq!(report.selection_metric, "Balanced Accuracy");
        assert_eq!(report.winner.number, 3);
        assert_eq!(report.cv_score, 1.0);
        assert_eq!(report.test_scores["Accuracy"], 1.0);
        assert_eq!(report.candidates_evaluated, 36);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 36);
        assert_eq!(report.train_size + report.test_size, 24);
        assert_eq!(report.accuracy_per_class.len(), 2);
        assert_eq!(report.artifacts.len(), 6);

        let results = dir.path().join("results");
        assert!(results.join("keyword_pipeline.json").exists());
        let tuning = std::fs::read_to_string(results.join("tuning_results.csv")).unwrap();
        assert_eq!(tuning.lines().count(), 37);
        let predictions = std::fs::read_to_string(results.join("predictions.csv")).unwrap();
        assert_eq!(predictions.lines().count(), report.test_size + 1);
    }

    #[tokio::test]
    async fn test_only_selected_objects_are_saved() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path())
            .with_objects_to_save(vec![SavedObject::TestIndex, SavedObject::TestIndex]);
        let experiment = Experiment::new(config).unwrap();

        let report = experiment.run(Arc::new(KeywordBackend::default())).await.unwrap();
        assert_eq!(report.artifacts.len(), 1);
        assert!(report.artifacts[0].ends_with("index_test_data.csv"));
        assert!(!dir.path().join("results").join("keyword_pipeline.json").exists());
    }

    #[test]
    fn test_unknown_metric_is_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let err = Experiment::new(config(dir.path()).with_metric("matthews_corrcoef")).unwrap_err();
        assert!(matches!(err, TgError::Config(ConfigError::UnknownMetric { .. })));
    }

    #[test]
    fn test_plan_without_data() {
        let experiment = Experiment::new(
            ExperimentConfig::default()
                .with_learners(["RidgeClassifier", "NearestCentroid"])
                .with_feature_selection(vec![10, 50, 100]),
        )
        .unwrap();

        let plan = experiment.plan().unwrap();
        // Ridge: (24 + 12) * 6, NearestCentroid: 24 + 12, each times 3 percentiles
        assert_eq!(plan.tasks().len(), (36 * 6 + 36) * 3);
        assert_eq!(plan.selection_metric, "Class Balance Accuracy");
        assert_eq!(plan.allocation.num_workers, 5);
    }

    #[test]
    fn test_plan_samples_with_n_iter() {
        let config = ExperimentConfig::default()
            .with_learners(["RidgeClassifier", "NearestCentroid"])
            .with_n_iter(2)
            .with_random_state(7);
        let first = Experiment::new(config.clone()).unwrap().plan().unwrap();
        let second = Experiment::new(config).unwrap().plan().unwrap();

        assert_eq!(first.grid_size, 36 * 6 + 36);
        assert_eq!(first.tasks().len(), 2);
        assert_eq!(first.allocation.num_workers, 2);
        for (a, b) in first.tasks().iter().zip(second.tasks()) {
            assert_eq!(a.candidate, b.candidate);
        }
    }

    #[tokio::test]
    async fn test_missing_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let experiment = Experiment::new(
            config(dir.path()).with_data(dir.path().join("missing.csv")),
        )
        .unwrap();
        let err = experiment.prepare().await.unwrap_err();
        assert!(matches!(err, TgError::Data(_)));
    }
}
