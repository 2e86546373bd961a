//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Reps.
//! It runs each pose frame through validation, angle extraction,
//! classification and debouncing, and keeps the session running.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::classifier::{FrameAnalysis, FrameClassifier};
use crate::config::PipelineConfig;
use crate::definition::{ExerciseDefinition, ExerciseRegistry};
use crate::error::ComputeError;
use crate::exercises::ExerciseKind;
use crate::frames::FrameAdapter;
use crate::pose::PoseFrame;
use crate::session::{SessionAggregator, SessionState};
use crate::types::{CompletionReport, ExerciseState, SessionStats};

/// Everything produced by one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutcome {
    pub analysis: FrameAnalysis,
    /// State change accepted on this frame
    pub accepted: Option<ExerciseState>,
    pub rep_counted: bool,
    /// Session statistics after this frame
    pub stats: SessionStats,
    /// Present only on the frame that first reached the challenge target
    pub completion: Option<CompletionReport>,
}

/// Result of counting a recorded batch of frames
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountSummary {
    pub frames: usize,
    /// Frames that passed the visibility check
    pub visible_frames: usize,
    pub stats: SessionStats,
    pub completion: Option<CompletionReport>,
}

/// Count reps in a recorded batch of frames.
///
/// # Arguments
/// * `exercise_id` - Exercise identifier (e.g., "pushup")
/// * `frames_json` - JSON array or NDJSON of pose frames in capture order
/// * `target_reps` - Challenge target; `None` for free practice
///
/// # Returns
/// A [`CountSummary`] serialized as JSON
///
/// # Example
/// ```ignore
/// let summary = count_reps("squat".to_string(), frames_json, Some(10))?;
/// ```
pub fn count_reps(
    exercise_id: String,
    frames_json: String,
    target_reps: Option<u32>,
) -> Result<String, ComputeError> {
    let exercise: ExerciseKind = exercise_id.parse()?;
    let frames = FrameAdapter::parse(&frames_json)?;

    let mut processor = RepProcessor::new(exercise)?;
    if let Some(target) = target_reps {
        processor = processor.with_target_reps(target);
    }

    let summary = processor.count(&frames)?;
    serde_json::to_string(&summary).map_err(|e| ComputeError::EncodingError(e.to_string()))
}

/// Stateful processor for live sessions.
///
/// Holds the exercise catalogue, the thresholds and the running session.
/// Frames must be fed in capture order.
pub struct RepProcessor {
    registry: ExerciseRegistry,
    config: PipelineConfig,
    target_reps: Option<u32>,
    session: SessionAggregator,
}

impl RepProcessor {
    /// Create a processor for `exercise` with the built-in catalogue
    pub fn new(exercise: ExerciseKind) -> Result<Self, ComputeError> {
        Self::with_config(exercise, PipelineConfig::default())
    }

    /// Create a processor with custom thresholds
    pub fn with_config(exercise: ExerciseKind, config: PipelineConfig) -> Result<Self, ComputeError> {
        Self::with_registry(ExerciseRegistry::builtin(), exercise, config)
    }

    /// Create a processor with a custom exercise catalogue
    pub fn with_registry(
        registry: ExerciseRegistry,
        exercise: ExerciseKind,
        config: PipelineConfig,
    ) -> Result<Self, ComputeError> {
        config.validate()?;
        let definition = lookup(&registry, exercise)?;
        let session = SessionAggregator::new(definition, config.clone());

        Ok(Self {
            registry,
            config,
            target_reps: None,
            session,
        })
    }

    /// Switch to challenge mode; starts a fresh session
    pub fn with_target_reps(mut self, target_reps: u32) -> Self {
        self.target_reps = Some(target_reps);
        self.session = self.new_session(self.session.definition_arc());
        self
    }

    /// Start a new attempt at a (possibly different) exercise
    pub fn select_exercise(&mut self, exercise: ExerciseKind) -> Result<(), ComputeError> {
        let definition = lookup(&self.registry, exercise)?;
        debug!(exercise = %exercise, "exercise selected");
        self.session = self.new_session(definition);
        Ok(())
    }

    /// Process one pose frame
    pub fn process_frame(&mut self, frame: &PoseFrame) -> Result<FrameOutcome, ComputeError> {
        let analysis = FrameClassifier::classify(frame, self.session.definition(), &self.config);
        let update = self.session.ingest(&analysis.result, frame.timestamp)?;

        Ok(FrameOutcome {
            analysis,
            accepted: update.accepted,
            rep_counted: update.rep_counted,
            stats: self.session.current_stats(),
            completion: update.completion,
        })
    }

    /// Process one pose frame given as JSON, returning the outcome as JSON
    pub fn process_frame_json(&mut self, frame_json: &str) -> Result<String, ComputeError> {
        let frame: PoseFrame = serde_json::from_str(frame_json)?;
        let outcome = self.process_frame(&frame)?;
        serde_json::to_string(&outcome).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Process a recorded batch and summarize it
    pub fn count(&mut self, frames: &[PoseFrame]) -> Result<CountSummary, ComputeError> {
        let mut visible_frames = 0;
        let mut completion = None;

        for frame in frames {
            let outcome = self.process_frame(frame)?;
            if outcome.analysis.result.is_valid_pose {
                visible_frames += 1;
            }
            if outcome.completion.is_some() {
                completion = outcome.completion;
            }
        }

        Ok(CountSummary {
            frames: frames.len(),
            visible_frames,
            stats: self.stats(),
            completion,
        })
    }

    /// Current session statistics
    pub fn stats(&self) -> SessionStats {
        self.session.current_stats()
    }

    /// Current session statistics as JSON
    pub fn stats_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string(&self.stats()).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    pub fn session_state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn exercise(&self) -> ExerciseKind {
        self.session.definition().id
    }

    pub fn definition(&self) -> &ExerciseDefinition {
        self.session.definition()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ExerciseRegistry {
        &self.registry
    }

    pub fn is_complete(&self) -> bool {
        self.session.is_complete()
    }

    /// Discard progress and restart the current exercise
    pub fn reset(&mut self) {
        self.session.reset();
    }

    fn new_session(&self, definition: Arc<ExerciseDefinition>) -> SessionAggregator {
        match self.target_reps {
            Some(target) => SessionAggregator::challenge(definition, self.config.clone(), target),
            None => SessionAggregator::new(definition, self.config.clone()),
        }
    }
}

fn lookup(
    registry: &ExerciseRegistry,
    exercise: ExerciseKind,
) -> Result<Arc<ExerciseDefinition>, ComputeError> {
    registry
        .get(exercise)
        .ok_or_else(|| ComputeError::UnknownExercise(exercise.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercises::test_support::limb;
    use crate::exercises::{LEFT_ARM, LEFT_LEG, RIGHT_ARM, RIGHT_LEG};
    use crate::types::FEEDBACK_NOT_VISIBLE;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn arms_frame(ms: i64, elbow: f64) -> PoseFrame {
        let mut keypoints = limb(LEFT_ARM, elbow, (0.0, 0.0));
        keypoints.extend(limb(RIGHT_ARM, elbow, (300.0, 0.0)));
        PoseFrame::new(t(ms), keypoints)
    }

    fn plank_frame(ms: i64, elbow: f64) -> PoseFrame {
        let mut frame = arms_frame(ms, elbow);
        frame.keypoints.extend(limb(LEFT_LEG, 180.0, (0.0, 200.0)));
        frame.keypoints.extend(limb(RIGHT_LEG, 180.0, (300.0, 200.0)));
        frame
    }

    fn occluded_frame(ms: i64) -> PoseFrame {
        PoseFrame::new(t(ms), limb(LEFT_ARM, 65.0, (0.0, 0.0)))
    }

    /// Pushup reps: elbow bent to 65° (down) then extended to 150° (up)
    fn pushup_frames_json(reps: usize) -> String {
        let mut frames = Vec::new();
        for i in 0..reps {
            let start = i as i64 * 600;
            frames.push(arms_frame(start, 65.0));
            frames.push(arms_frame(start + 300, 150.0));
        }
        serde_json::to_string(&frames).unwrap()
    }

    #[test]
    fn test_count_reps_pushup() {
        let result = count_reps("pushup".to_string(), pushup_frames_json(3), None).unwrap();
        let summary: serde_json::Value = serde_json::from_str(&result).unwrap();

        assert_eq!(summary["frames"], 6);
        assert_eq!(summary["visible_frames"], 6);
        assert_eq!(summary["stats"]["exercise"], "pushup");
        assert_eq!(summary["stats"]["count"], 3);
        assert_eq!(summary["stats"]["score"], 300);
        assert_eq!(summary["stats"]["accuracy"], 100);
        assert_eq!(summary["stats"]["feedback"], "Good, now go down slowly");
        assert!(summary["completion"].is_null());
    }

    #[test]
    fn test_count_reps_challenge_reports_completion() {
        let result = count_reps("pushup".to_string(), pushup_frames_json(3), Some(2)).unwrap();
        let summary: serde_json::Value = serde_json::from_str(&result).unwrap();

        assert_eq!(summary["stats"]["count"], 3);
        assert_eq!(summary["stats"]["completed"], true);
        assert_eq!(summary["completion"]["exerciseType"], "pushup");
        assert_eq!(summary["completion"]["reps"], 2);
        assert_eq!(summary["completion"]["points"], 100);
    }

    #[test]
    fn test_count_reps_accepts_ndjson() {
        let frames: Vec<PoseFrame> = serde_json::from_str(&pushup_frames_json(2)).unwrap();
        let ndjson = frames
            .iter()
            .map(|f| serde_json::to_string(f).unwrap())
            .collect::<Vec<_>>()
            .join("\n");

        let result = count_reps("pushup".to_string(), ndjson, None).unwrap();
        let summary: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(summary["stats"]["count"], 2);
    }

    #[test]
    fn test_count_reps_unknown_exercise() {
        let result = count_reps("burpee".to_string(), "[]".to_string(), None);
        assert!(matches!(result, Err(ComputeError::UnknownExercise(_))));
    }

    #[test]
    fn test_count_reps_invalid_json() {
        let result = count_reps("squat".to_string(), "[not json".to_string(), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_batch() {
        let result = count_reps("squat".to_string(), "[]".to_string(), Some(5)).unwrap();
        let summary: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(summary["frames"], 0);
        assert_eq!(summary["stats"]["count"], 0);
        assert_eq!(summary["stats"]["completed"], false);
    }

    #[test]
    fn test_occluded_frames_do_not_corrupt_session() {
        let mut processor = RepProcessor::new(ExerciseKind::Pushup).unwrap();
        processor.process_frame(&arms_frame(0, 65.0)).unwrap();

        let outcome = processor.process_frame(&occluded_frame(300)).unwrap();
        assert!(!outcome.analysis.result.is_valid_pose);
        assert_eq!(outcome.analysis.result.feedback, FEEDBACK_NOT_VISIBLE);
        // Accuracy 0 falls under the override threshold
        assert_eq!(outcome.stats.feedback, "Improve your form to count reps");

        let outcome = processor.process_frame(&arms_frame(600, 150.0)).unwrap();
        assert!(outcome.rep_counted);
        assert_eq!(outcome.stats.count, 1);
        assert_eq!(outcome.stats.score, 100);
    }

    #[test]
    fn test_out_of_order_frame_rejected() {
        let mut processor = RepProcessor::new(ExerciseKind::Pushup).unwrap();
        processor.process_frame(&arms_frame(500, 65.0)).unwrap();
        let before = processor.session_state().clone();

        let result = processor.process_frame(&arms_frame(100, 150.0));
        assert!(matches!(result, Err(ComputeError::OutOfOrderFrame(_))));
        assert_eq!(processor.session_state(), &before);
    }

    #[test]
    fn test_plank_holds_without_reps() {
        let mut processor = RepProcessor::new(ExerciseKind::Plank).unwrap();
        for ms in [0, 300, 600] {
            let outcome = processor.process_frame(&plank_frame(ms, 90.0)).unwrap();
            assert!(!outcome.rep_counted);
        }

        let stats = processor.stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.score, 0);
        assert_eq!(stats.hold_ms, 600);
        assert_eq!(stats.feedback, "Great plank form! Keep holding");
    }

    #[test]
    fn test_process_frame_json() {
        let mut processor = RepProcessor::new(ExerciseKind::Pushup).unwrap();
        let frame = serde_json::to_string(&arms_frame(0, 65.0)).unwrap();

        let result = processor.process_frame_json(&frame).unwrap();
        let outcome: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(outcome["analysis"]["result"]["state"], "down");
        assert_eq!(outcome["accepted"], "down");
        assert_eq!(outcome["rep_counted"], false);
        assert!(outcome["analysis"]["angles"]["leftElbow"].as_f64().is_some());
    }

    #[test]
    fn test_select_exercise_starts_fresh_session() {
        let mut processor = RepProcessor::new(ExerciseKind::Pushup)
            .unwrap()
            .with_target_reps(5);
        processor.process_frame(&arms_frame(0, 65.0)).unwrap();
        processor.process_frame(&arms_frame(300, 150.0)).unwrap();
        assert_eq!(processor.stats().count, 1);
        let old_id = processor.session_state().session_id;

        processor.select_exercise(ExerciseKind::Squat).unwrap();
        assert_eq!(processor.exercise(), ExerciseKind::Squat);
        assert_eq!(processor.stats().count, 0);
        assert_ne!(processor.session_state().session_id, old_id);

        // Earlier timestamps are fine in a new session
        assert!(processor.process_frame(&arms_frame(0, 65.0)).is_ok());
    }

    #[test]
    fn test_challenge_mode_shares_registry_definition() {
        let processor = RepProcessor::new(ExerciseKind::Pushup)
            .unwrap()
            .with_target_reps(3);

        let registered = processor.registry().get(ExerciseKind::Pushup).unwrap();
        assert!(std::ptr::eq(registered.as_ref(), processor.definition()));
    }

    #[test]
    fn test_selected_exercise_shares_registry_definition() {
        let mut processor = RepProcessor::new(ExerciseKind::Pushup)
            .unwrap()
            .with_target_reps(3);
        processor.select_exercise(ExerciseKind::Lunges).unwrap();

        let registered = processor.registry().get(ExerciseKind::Lunges).unwrap();
        assert!(std::ptr::eq(registered.as_ref(), processor.definition()));
    }

    #[test]
    fn test_reset_keeps_exercise() {
        let mut processor = RepProcessor::new(ExerciseKind::Pushup).unwrap();
        processor.process_frame(&arms_frame(0, 65.0)).unwrap();
        processor.process_frame(&arms_frame(300, 150.0)).unwrap();

        processor.reset();
        assert_eq!(processor.exercise(), ExerciseKind::Pushup);
        assert_eq!(processor.stats().count, 0);
    }

    #[test]
    fn test_custom_registry_missing_exercise() {
        let registry = ExerciseRegistry::new(vec![ExerciseRegistry::builtin()
            .get(ExerciseKind::Squat)
            .unwrap()
            .as_ref()
            .clone()])
        .unwrap();

        let result =
            RepProcessor::with_registry(registry, ExerciseKind::Pushup, PipelineConfig::default());
        assert!(matches!(result, Err(ComputeError::UnknownExercise(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig {
            visibility_ratio: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            RepProcessor::with_config(ExerciseKind::Squat, config),
            Err(ComputeError::InvalidConfig(_))
        ));
    }
}
