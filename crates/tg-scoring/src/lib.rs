//! Classification metrics and the scoring registry for TextGrid.
//!
//! Provides:
//! - A multi-class confusion matrix over sorted class labels
//! - Accuracy, balanced accuracy, Matthews correlation and class-balance accuracy
//! - A named registry of scorers used to rank candidate configurations
//! - Per-class accuracy reporting for held-out predictions

pub mod confusion;
pub mod metrics;
pub mod registry;
pub mod report;

pub use confusion::ConfusionMatrix;
pub use metrics::{
    accuracy, balanced_accuracy, class_balance_accuracy, class_balance_accuracy_from_matrix,
    matthews_corrcoef,
};
pub use registry::{normalize_metric_name, Scorer, ScoringRegistry};
pub use report::{per_class_accuracy, ClassAccuracy};
