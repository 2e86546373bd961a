//! Error types for Synheart Reps

use thiserror::Error;

/// Errors that can occur while driving the rep-counting pipeline.
///
/// Degraded frames (occluded joints, low-confidence angles, unclassifiable
/// poses) are not errors; they are reported through the per-frame
/// classification result instead.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse pose frame: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),

    #[error("Invalid exercise definition: {0}")]
    InvalidDefinition(String),

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("Out-of-order frame: {0}")]
    OutOfOrderFrame(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
