//! # tg-optimizer
//!
//! Hyperparameter grid construction and model selection for TextGrid.
//!
//! Provides per-family classifier grids, the shared preprocessing grid, the
//! assembler that pairs them into weighted and raw-count variants, expansion
//! into concrete candidates, search plans for worker dispatch, and the model
//! selector that ranks candidates through a pluggable search backend.

mod assembler;
mod backend;
mod grid;
mod plan;
mod search;
mod selector;
mod trial;

pub use assembler::{assemble, assemble_named, GridTemplate, GridVariant};
pub use backend::{FittedModel, FoldPredictions, SearchBackend};
pub use grid::{classifier_grid, classifier_grid_for, PreprocessingGrid};
pub use plan::{CandidateTask, SearchPlan, SearchSettings, WorkerAllocation};
pub use search::{CandidateConfiguration, GridSearch};
pub use selector::ModelSelector;
pub use trial::{CandidateResult, SelectionResult};
