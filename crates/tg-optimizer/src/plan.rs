//! Task descriptors and worker allocation for dispatching a search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tg_types::ConfigError;

use crate::assembler::GridTemplate;
use crate::search::{CandidateConfiguration, GridSearch};

/// Knobs passed through to the search mechanics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Cross-validation folds per candidate.
    pub folds: usize,
    /// Candidates evaluated concurrently.
    pub n_jobs: usize,
    /// Evaluate a random sample of this many candidates instead of the full grid.
    pub n_iter: Option<usize>,
    /// Seed for the candidate sample.
    pub random_state: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            folds: 5,
            n_jobs: 5,
            n_iter: None,
            random_state: 42,
        }
    }
}

/// Describes the evaluation of a single candidate on a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTask {
    /// Unique task id.
    pub task_id: Uuid,

    /// Search run this task belongs to.
    pub run_id: Uuid,

    /// Configuration to cross-validate.
    pub candidate: CandidateConfiguration,

    /// Number of cross-validation folds.
    pub folds: usize,
}

/// How many workers evaluate the task list concurrently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerAllocation {
    /// Workers actually used: `min(n_jobs, tasks)`, at least one.
    pub num_workers: usize,

    /// Task descriptors ready to dispatch.
    pub tasks: Vec<CandidateTask>,
}

impl WorkerAllocation {
    pub fn new(n_jobs: usize, tasks: Vec<CandidateTask>) -> Self {
        let num_workers = n_jobs.min(tasks.len()).max(1);
        Self { num_workers, tasks }
    }
}

/// Everything needed to run a search, produced before any work starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPlan {
    pub run_id: Uuid,
    pub selection_metric: String,
    /// Every metric that is computed for every candidate.
    pub metrics: Vec<String>,
    pub folds: usize,
    /// Candidates in the full expansion, before any sampling.
    pub grid_size: usize,
    pub allocation: WorkerAllocation,
    pub created_at: DateTime<Utc>,
}

impl SearchPlan {
    /// Expand `templates`, sample them when `settings.n_iter` is set and wrap
    /// each candidate in a task.
    pub fn build(
        templates: &[GridTemplate],
        selection_metric: &str,
        metrics: Vec<String>,
        settings: &SearchSettings,
    ) -> Result<Self, ConfigError> {
        let run_id = Uuid::new_v4();
        let folds = settings.folds;
        let mut search = GridSearch::new(templates)?;
        let grid_size = search.len();
        if let Some(n_iter) = settings.n_iter {
            search = search.sample(n_iter, settings.random_state);
        }

        let tasks = search
            .into_candidates()
            .into_iter()
            .map(|candidate| CandidateTask {
                task_id: Uuid::new_v4(),
                run_id,
                candidate,
                folds,
            })
            .collect();

        Ok(Self {
            run_id,
            selection_metric: selection_metric.to_string(),
            metrics,
            folds,
            grid_size,
            allocation: WorkerAllocation::new(settings.n_jobs, tasks),
            created_at: Utc::now(),
        })
    }

    pub fn tasks(&self) -> &[CandidateTask] {
        &self.allocation.tasks
    }
}
