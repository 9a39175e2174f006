//! Model selection: score every candidate on every metric, pick the best by
//! the selection metric and refit it.

use chrono::Utc;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

use tg_scoring::ScoringRegistry;
use tg_types::{internal_error, Dataset, SearchError, TgError, TgResult};

use crate::assembler::GridTemplate;
use crate::backend::SearchBackend;
use crate::plan::{CandidateTask, SearchPlan, SearchSettings};
use crate::trial::{BestCandidate, CandidateResult, SelectionResult};

/// Ranks candidate configurations with a scoring registry.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    registry: ScoringRegistry,
    selection_metric: String,
    settings: SearchSettings,
}

impl ModelSelector {
    /// Fails with `UnknownMetric` unless `selection_metric` normalizes to a
    /// registry key.
    pub fn new(
        registry: ScoringRegistry,
        selection_metric: &str,
        settings: SearchSettings,
    ) -> TgResult<Self> {
        let selection_metric = registry.resolve(selection_metric)?;
        Ok(Self {
            registry,
            selection_metric,
            settings,
        })
    }

    pub fn selection_metric(&self) -> &str {
        &self.selection_metric
    }

    pub fn registry(&self) -> &ScoringRegistry {
        &self.registry
    }

    /// Expand the templates into a dispatchable plan without running it.
    pub fn plan(&self, templates: &[GridTemplate]) -> TgResult<SearchPlan> {
        if templates.is_empty() {
            return Err(SearchError::EmptyGrid.into());
        }
        let plan = SearchPlan::build(
            templates,
            &self.selection_metric,
            self.registry.names(),
            &self.settings,
        )?;
        if plan.tasks().is_empty() {
            return Err(SearchError::EmptyGrid.into());
        }
        Ok(plan)
    }

    /// Cross-validate every candidate, rank them and refit the winner on
    /// the full training set.
    pub fn select(
        &self,
        templates: &[GridTemplate],
        train: &Dataset,
        backend: &dyn SearchBackend,
    ) -> TgResult<SelectionResult> {
        let plan = self.plan(templates)?;
        self.run(&plan, train, backend)
    }

    /// Execute a previously built plan.
    pub fn run(
        &self,
        plan: &SearchPlan,
        train: &Dataset,
        backend: &dyn SearchBackend,
    ) -> TgResult<SelectionResult> {
        let started_at = Utc::now();

        info!(
            "Searching {} of {} candidates with {} folds on {} workers via {} (selecting by {})",
            plan.tasks().len(),
            plan.grid_size,
            plan.folds,
            plan.allocation.num_workers,
            backend.name(),
            self.selection_metric
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(plan.allocation.num_workers)
            .build()
            .map_err(|e| internal_error!("Failed to start search workers: {}", e))?;

        let evaluated: TgResult<Vec<CandidateResult>> = pool.install(|| {
            plan.tasks()
                .par_iter()
                .map(|task| self.evaluate(task, train, backend))
                .collect()
        });

        let mut candidates = evaluated?;
        self.assign_ranks(&mut candidates);

        let mut best = BestCandidate::new(&self.selection_metric);
        for result in &candidates {
            best.offer(result);
        }
        let seen = best.seen();
        let best = match best.into_best() {
            Some(best) if best.score(&self.selection_metric).is_finite() => best,
            _ => {
                return Err(SearchError::NoFiniteScore {
                    metric: self.selection_metric.clone(),
                }
                .into())
            }
        };

        info!(
            "Best of {} candidates {}: {} = {:.4}",
            seen,
            best.candidate,
            self.selection_metric,
            best.score(&self.selection_metric)
        );

        let model = backend.refit(&best.candidate, train)?;

        Ok(SelectionResult {
            run_id: plan.run_id,
            selection_metric: self.selection_metric.clone(),
            best_score: best.score(&self.selection_metric),
            scores: best.mean_scores.clone(),
            winner: best.candidate,
            model,
            folds: plan.folds,
            candidates,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn evaluate(
        &self,
        task: &CandidateTask,
        train: &Dataset,
        backend: &dyn SearchBackend,
    ) -> TgResult<CandidateResult> {
        let folds = backend.cross_validate(&task.candidate, train, task.folds)?;
        if folds.len() != task.folds {
            return Err(SearchError::MalformedReply {
                message: format!(
                    "expected {} folds for candidate {}, got {}",
                    task.folds,
                    task.candidate.number,
                    folds.len()
                ),
            }
            .into());
        }

        let fold_scores = folds
            .iter()
            .map(|fold| self.registry.score_all(&fold.y_true, &fold.y_pred))
            .collect::<Result<Vec<BTreeMap<String, f64>>, _>>()
            .map_err(TgError::from)?;

        let result = CandidateResult::from_folds(task.candidate.clone(), fold_scores);
        debug!(
            "Candidate {} scored {} = {:.4}",
            task.candidate,
            self.selection_metric,
            result.score(&self.selection_metric)
        );
        Ok(result)
    }

    /// Rank 1 = highest selection score; ties keep candidate order and NaN
    /// ranks last.
    fn assign_ranks(&self, candidates: &mut [CandidateResult]) {
        let metric = &self.selection_metric;
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by(|&a, &b| {
            let (sa, sb) = (candidates[a].score(metric), candidates[b].score(metric));
            match (sa.is_nan(), sb.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => sb.partial_cmp(&sa).unwrap_or(Ordering::Equal),
            }
            .then(candidates[a].candidate.number.cmp(&candidates[b].candidate.number))
        });
        for (position, index) in order.into_iter().enumerate() {
            candidates[index].rank = position + 1;
        }
    }
}
