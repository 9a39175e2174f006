use thiserror::Error;

/// Main error type for the TextGrid system
#[derive(Error, Debug)]
pub enum TgError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scoring error: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration errors. These are raised before any search work starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown classifier: {name}")]
    UnknownClassifier { name: String },

    #[error("Unknown metric: {name} (available: {})", available.join(", "))]
    UnknownMetric { name: String, available: Vec<String> },

    #[error("Invalid parameter grid: {message}")]
    InvalidGrid { message: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Errors raised by scoring functions
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Class {label} has neither true nor predicted members")]
    DegenerateClass { label: String },

    #[error("Label length mismatch: {true_len} true labels, {pred_len} predicted labels")]
    LengthMismatch { true_len: usize, pred_len: usize },

    #[error("Cannot score an empty label sequence")]
    EmptyInput,
}

/// Data loading and splitting errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Data source not found: {0}")]
    SourceNotFound(String),

    #[error("Column not found: {column}")]
    MissingColumn { column: String },

    #[error("Data loading failed: {message}")]
    LoadingFailed { message: String },

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("Artifact write failed: {message}")]
    WriteFailed { message: String },
}

/// Errors from the search backend or the selection step
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Parameter grid is empty")]
    EmptyGrid,

    #[error("Search backend {backend} failed: {message}")]
    BackendFailed { backend: String, message: String },

    #[error("Malformed backend reply: {message}")]
    MalformedReply { message: String },

    #[error("No candidate produced a finite score for {metric}")]
    NoFiniteScore { metric: String },
}

/// Result type alias for TextGrid operations
pub type TgResult<T> = Result<T, TgError>;

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::TgError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::TgError::Config($crate::ConfigError::Invalid {
            message: format!($($arg)*),
        })
    };
}
