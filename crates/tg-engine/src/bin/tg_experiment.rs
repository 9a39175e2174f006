//! Command line entry point for TextGrid experiments.
//!
//! Usage:
//!   tg-experiment --data datasets/feedback.csv --metric class_balance_accuracy \
//!       --learners SGDClassifier,Perceptron --worker "python3 worker.py"
//!   tg-experiment --config experiment.json --dry-run

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tg_data::SavedObject;
use tg_engine::{Experiment, ExperimentConfig, ProcessBackend, WorkerCommand};

#[derive(Parser, Debug)]
#[command(name = "tg-experiment")]
#[command(about = "Grid-search text classifiers and evaluate the best one")]
#[command(version)]
struct Args {
    /// JSON experiment configuration; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV file with the labeled documents
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Column holding the class labels
    #[arg(long)]
    target: Option<String>,

    /// Column holding the text
    #[arg(long)]
    predictor: Option<String>,

    /// Estimator class names (comma-separated), e.g. SGDClassifier,RidgeClassifier
    #[arg(short, long, value_delimiter = ',')]
    learners: Option<Vec<String>>,

    /// Metric that selects the best learner, e.g. balanced_accuracy_score
    #[arg(short, long, env = "TG_METRIC")]
    metric: Option<String>,

    /// Number of cross-validation folds
    #[arg(long)]
    cv: Option<usize>,

    /// Candidates evaluated concurrently
    #[arg(short = 'j', long)]
    n_jobs: Option<usize>,

    /// Evaluate this many randomly drawn candidates instead of the full grid
    #[arg(long)]
    n_iter: Option<usize>,

    /// Tokenizer the worker should use, e.g. wordnet or spacy
    #[arg(long)]
    tokenizer: Option<String>,

    /// Fraction of the data held out for testing
    #[arg(long)]
    test_size: Option<f64>,

    /// Seed for the train/test split and candidate sampling
    #[arg(long)]
    random_state: Option<u64>,

    /// Select-percentile values to sweep (comma-separated), e.g. 10,50,100
    #[arg(long, value_delimiter = ',')]
    percentiles: Option<Vec<u32>>,

    /// Objects to save (comma-separated), e.g. "pipeline,tuning results"
    #[arg(long, value_delimiter = ',')]
    save: Option<Vec<String>>,

    /// Folder the artifacts are written to
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// File name (without extension) of the saved pipeline
    #[arg(long)]
    save_as: Option<String>,

    /// Worker command that fits and scores candidates
    #[arg(short, long, env = "TG_WORKER")]
    worker: Option<String>,

    /// Print the search plan as JSON and exit
    #[arg(long)]
    dry_run: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    fn into_config(self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => ExperimentConfig::default(),
        };

        if let Some(data) = self.data {
            config = config.with_data(data);
        }
        if let Some(target) = self.target {
            config.target = target;
        }
        if let Some(predictor) = self.predictor {
            config.predictor = predictor;
        }
        if let Some(learners) = self.learners {
            config = config.with_learners(learners.into_iter().map(|l| l.trim().to_string()));
        }
        if let Some(metric) = self.metric {
            config = config.with_metric(&metric);
        }
        if let Some(cv) = self.cv {
            config = config.with_cv(cv);
        }
        if let Some(n_jobs) = self.n_jobs {
            config = config.with_n_jobs(n_jobs);
        }
        if let Some(n_iter) = self.n_iter {
            config = config.with_n_iter(n_iter);
        }
        if let Some(tokenizer) = self.tokenizer {
            config = config.with_tokenizer(&tokenizer);
        }
        if let Some(test_size) = self.test_size {
            config = config.with_test_size(test_size);
        }
        if let Some(seed) = self.random_state {
            config = config.with_random_state(seed);
        }
        if let Some(percentiles) = self.percentiles {
            config = config.with_feature_selection(percentiles);
        }
        if let Some(save) = self.save {
            let objects = save
                .iter()
                .map(|s| s.parse::<SavedObject>())
                .collect::<Result<Vec<_>, _>>()?;
            config = config.with_objects_to_save(objects);
        }
        if let Some(dir) = self.results_dir {
            config.results_folder = dir;
        }
        if let Some(save_as) = self.save_as {
            config.save_pipeline_as = save_as;
        }
        if let Some(worker) = self.worker {
            config = config.with_worker(WorkerCommand::parse(&worker)?);
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level())),
        )
        .init();

    let dry_run = args.dry_run;
    let config = args.into_config()?;
    let experiment = Experiment::new(config)?;

    if dry_run {
        let plan = experiment.plan()?;
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let Some(worker) = experiment.config().worker.clone() else {
        bail!("no search worker configured; pass --worker or set \"worker\" in the config file");
    };
    let backend =
        Arc::new(ProcessBackend::new(worker).with_tokenizer(experiment.config().tokenizer.clone()));

    let report = experiment.run(backend).await?;

    println!("\n{}", "=".repeat(60));
    println!("EXPERIMENT SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Best candidate: {}", report.winner);
    println!(
        "Cross-validated {}: {:.4} ({} candidates)",
        report.selection_metric, report.cv_score, report.candidates_evaluated
    );
    println!("\nHeld-out scores ({} test documents):", report.test_size);
    for (metric, score) in &report.test_scores {
        println!("  {:<35} {:>8.4}", metric, score);
    }
    println!("\nAccuracy per class:");
    println!("  {:<25} {:>8} {:>8} {:>9}", "Class", "Support", "Correct", "Accuracy");
    for row in &report.accuracy_per_class {
        println!(
            "  {:<25} {:>8} {:>8} {:>9.4}",
            row.label, row.support, row.correct, row.accuracy
        );
    }
    if !report.artifacts.is_empty() {
        println!("\nSaved:");
        for path in &report.artifacts {
            println!("  {}", path.display());
        }
    }

    Ok(())
}
