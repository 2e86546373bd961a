//! Synheart Reps - On-device repetition counting and form scoring
//!
//! Reps turns a stream of 2D pose keypoints into exercise feedback through a
//! deterministic pipeline: keypoint validation → joint angles → per-exercise
//! state classification → repetition debouncing → session aggregation.
//!
//! ## Modules
//!
//! - **Per-frame analysis**: `validator`, `angles`, `exercises`, `classifier`
//! - **Temporal state**: `debouncer`, `session`
//! - **Entry points**: `pipeline` (Rust API), `ffi` (C ABI), the `reps` CLI

pub mod angles;
pub mod classifier;
pub mod config;
pub mod debouncer;
pub mod definition;
pub mod error;
pub mod exercises;
pub mod frames;
pub mod pipeline;
pub mod pose;
pub mod session;
pub mod types;
pub mod validator;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::PipelineConfig;
pub use definition::{ExerciseDefinition, ExerciseRegistry};
pub use error::ComputeError;
pub use exercises::ExerciseKind;
pub use pipeline::{count_reps, FrameOutcome, RepProcessor};
pub use pose::{Keypoint, KeypointName, PoseFrame};
pub use session::{SessionAggregator, SessionState};
pub use types::{ClassificationResult, CompletionReport, ExerciseState, SessionStats};

/// Library version reported by the CLI and FFI
pub const REPS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported in diagnostics
pub const PRODUCER_NAME: &str = "synheart-reps";
