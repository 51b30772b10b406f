//! Error types for the panoptic-eval library.

use thiserror::Error;

/// Result type for panoptic-eval operations.
pub type Result<T> = std::result::Result<T, PanopticEvalError>;

/// Error types that can occur during instance evaluation.
#[derive(Error, Debug)]
pub enum PanopticEvalError {
    /// Prediction and reference arrays differ in shape.
    #[error("Shape mismatch: prediction {prediction:?} vs reference {reference:?}")]
    ShapeMismatch {
        prediction: Vec<usize>,
        reference: Vec<usize>,
    },

    /// Rejected evaluator configuration (threshold range, metric names, groups).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A metric computation would divide by zero or received impossible counts.
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// Metric name not present in the registry.
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// Error during JSON parsing or serialization.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error during I/O operations.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
