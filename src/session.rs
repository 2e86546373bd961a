//! Session aggregation
//!
//! One [`SessionAggregator`] exists per exercise attempt. It owns the only
//! mutable state in the pipeline, feeds classified frames through the
//! debouncer, and latches challenge completion so it is reported exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::debouncer::RepDebouncer;
use crate::definition::ExerciseDefinition;
use crate::error::ComputeError;
use crate::types::{ClassificationResult, CompletionReport, ExerciseState, SessionStats};

/// Running state of one exercise attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: Uuid,
    /// Validated repetitions
    pub rep_count: u32,
    pub score: u32,
    /// Accuracy of the most recent frame
    pub last_accuracy: u32,
    /// Feedback for the most recent frame
    pub last_feedback: String,
    /// Most recently accepted state
    pub last_validated_state: Option<ExerciseState>,
    /// Accumulated confidence in the validated state (0..=cap)
    pub state_confidence: f64,
    /// Rep timer anchor: the first frame, then the frame of each counted rep
    pub last_valid_pose_at: Option<DateTime<Utc>>,
    /// Timestamp of the most recent frame of any kind
    pub last_frame_at: Option<DateTime<Utc>>,
    /// Timestamp of the previous frame if it passed the accuracy gate;
    /// cleared by any ungated frame
    pub last_scored_frame_at: Option<DateTime<Utc>>,
    /// Time spent in the exercise's hold state, milliseconds
    pub hold_ms: i64,
    /// Latched once the challenge target has been reached
    pub completed: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            rep_count: 0,
            score: 0,
            last_accuracy: 0,
            last_feedback: String::new(),
            last_validated_state: None,
            state_confidence: 0.0,
            last_valid_pose_at: None,
            last_frame_at: None,
            last_scored_frame_at: None,
            hold_ms: 0,
            completed: false,
        }
    }
}

/// What changed when a frame was ingested
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub accepted: Option<ExerciseState>,
    pub rep_counted: bool,
    /// Present only on the frame that first reached the challenge target
    pub completion: Option<CompletionReport>,
}

/// Owner of the running state for one exercise attempt
#[derive(Debug, Clone)]
pub struct SessionAggregator {
    definition: Arc<ExerciseDefinition>,
    config: PipelineConfig,
    target_reps: Option<u32>,
    state: SessionState,
}

impl SessionAggregator {
    /// Start a free-practice session (no completion target)
    pub fn new(definition: Arc<ExerciseDefinition>, config: PipelineConfig) -> Self {
        Self {
            definition,
            config,
            target_reps: None,
            state: SessionState::new(),
        }
    }

    /// Start a challenge session that completes at `target_reps`
    pub fn challenge(
        definition: Arc<ExerciseDefinition>,
        config: PipelineConfig,
        target_reps: u32,
    ) -> Self {
        Self {
            target_reps: Some(target_reps),
            ..Self::new(definition, config)
        }
    }

    /// Fold one classified frame into the session.
    ///
    /// Frames must arrive in capture order; an earlier timestamp than the
    /// previous frame is rejected and leaves the session untouched.
    pub fn ingest(
        &mut self,
        result: &ClassificationResult,
        at: DateTime<Utc>,
    ) -> Result<SessionUpdate, ComputeError> {
        if let Some(last) = self.state.last_frame_at {
            if at < last {
                return Err(ComputeError::OutOfOrderFrame(format!(
                    "frame at {} precedes previous frame at {}",
                    at.to_rfc3339(),
                    last.to_rfc3339()
                )));
            }
        }

        let step = RepDebouncer::advance(&self.state, result, at, &self.definition, &self.config);
        self.state = step.state;

        let completion = self.latch_completion(at);

        Ok(SessionUpdate {
            accepted: step.accepted,
            rep_counted: step.rep_counted,
            completion,
        })
    }

    fn latch_completion(&mut self, at: DateTime<Utc>) -> Option<CompletionReport> {
        let target = self.target_reps?;
        if self.state.completed || self.state.rep_count < target {
            return None;
        }

        self.state.completed = true;
        info!(
            exercise = %self.definition.id,
            reps = self.state.rep_count,
            target,
            "challenge completed"
        );

        Some(self.completion_report(at))
    }

    fn completion_report(&self, at: DateTime<Utc>) -> CompletionReport {
        CompletionReport {
            session_id: self.state.session_id,
            exercise_type: self.definition.id,
            reps: self.state.rep_count,
            accuracy: self.state.last_accuracy,
            score: self.state.score,
            points: self.definition.points,
            completed_at: at,
        }
    }

    /// Live statistics for rendering
    pub fn current_stats(&self) -> SessionStats {
        SessionStats {
            exercise: self.definition.id,
            count: self.state.rep_count,
            accuracy: self.state.last_accuracy,
            score: self.state.score,
            feedback: self.state.last_feedback.clone(),
            hold_ms: self.state.hold_ms,
            completed: self.state.completed,
        }
    }

    /// Whether the challenge target has been reached (latched)
    pub fn is_complete(&self) -> bool {
        self.state.completed
    }

    pub fn target_reps(&self) -> Option<u32> {
        self.target_reps
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn definition(&self) -> &ExerciseDefinition {
        &self.definition
    }

    /// Shared handle to the definition this session was started with
    pub fn definition_arc(&self) -> Arc<ExerciseDefinition> {
        Arc::clone(&self.definition)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Discard all progress and start a fresh attempt
    pub fn reset(&mut self) {
        self.state = SessionState::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ExerciseRegistry;
    use crate::exercises::ExerciseKind;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn result(state: ExerciseState, accuracy: u32) -> ClassificationResult {
        ClassificationResult {
            state: Some(state),
            feedback: "Good, now push up".to_string(),
            accuracy,
            is_valid_pose: true,
        }
    }

    fn pushup_challenge(target: u32) -> SessionAggregator {
        let definition = ExerciseRegistry::builtin().get(ExerciseKind::Pushup).unwrap();
        SessionAggregator::challenge(definition, PipelineConfig::default(), target)
    }

    fn do_rep(session: &mut SessionAggregator, start_ms: i64) -> Vec<SessionUpdate> {
        vec![
            session.ingest(&result(ExerciseState::Down, 90), t(start_ms)).unwrap(),
            session.ingest(&result(ExerciseState::Up, 90), t(start_ms + 300)).unwrap(),
        ]
    }

    #[test]
    fn test_stats_track_reps() {
        let mut session = pushup_challenge(5);
        do_rep(&mut session, 0);
        do_rep(&mut session, 600);

        let stats = session.current_stats();
        assert_eq!(
            stats,
            SessionStats {
                exercise: ExerciseKind::Pushup,
                count: 2,
                accuracy: 90,
                score: 180,
                feedback: "Good, now push up".to_string(),
                hold_ms: 0,
                completed: false,
            }
        );
    }

    #[test]
    fn test_completion_signalled_once() {
        let mut session = pushup_challenge(2);

        let first: Vec<_> = do_rep(&mut session, 0);
        assert!(first.iter().all(|u| u.completion.is_none()));
        assert!(!session.is_complete());

        let second = do_rep(&mut session, 600);
        let report = second[1].completion.clone().expect("completion on second rep");
        assert_eq!(report.reps, 2);
        assert_eq!(report.score, 180);
        assert_eq!(report.points, 100);
        assert_eq!(report.exercise_type, ExerciseKind::Pushup);
        assert_eq!(report.session_id, session.state().session_id);
        assert!(session.is_complete());

        // Further reps keep counting but never re-signal
        let third = do_rep(&mut session, 1200);
        assert!(third.iter().all(|u| u.completion.is_none()));
        assert!(session.is_complete());
        assert_eq!(session.current_stats().count, 3);
        assert!(session.current_stats().completed);
    }

    #[test]
    fn test_free_practice_never_completes() {
        let definition = ExerciseRegistry::builtin().get(ExerciseKind::Squat).unwrap();
        let mut session = SessionAggregator::new(definition, PipelineConfig::default());

        for i in 0..5 {
            let updates = do_rep(&mut session, i * 600);
            assert!(updates.iter().all(|u| u.completion.is_none()));
        }
        assert_eq!(session.state().rep_count, 5);
        assert!(!session.is_complete());
        assert_eq!(session.target_reps(), None);
    }

    #[test]
    fn test_out_of_order_frame_rejected() {
        let mut session = pushup_challenge(5);
        session.ingest(&result(ExerciseState::Down, 90), t(500)).unwrap();
        let before = session.state().clone();

        let err = session.ingest(&result(ExerciseState::Up, 90), t(100));
        assert!(matches!(err, Err(ComputeError::OutOfOrderFrame(_))));
        assert_eq!(session.state(), &before);

        // Equal timestamps are allowed
        assert!(session.ingest(&result(ExerciseState::Down, 90), t(500)).is_ok());
    }

    #[test]
    fn test_degraded_frame_does_not_corrupt_count() {
        let mut session = pushup_challenge(5);
        do_rep(&mut session, 0);

        let update = session
            .ingest(&ClassificationResult::not_visible(), t(400))
            .unwrap();
        assert!(!update.rep_counted);
        assert_eq!(session.state().rep_count, 1);
        assert_eq!(session.state().score, 90);
        assert_eq!(session.state().last_validated_state, Some(ExerciseState::Up));
    }

    #[test]
    fn test_reset_starts_new_attempt() {
        let mut session = pushup_challenge(1);
        do_rep(&mut session, 0);
        assert!(session.is_complete());
        let old_id = session.state().session_id;

        session.reset();
        assert_eq!(session.state().rep_count, 0);
        assert!(!session.is_complete());
        assert_ne!(session.state().session_id, old_id);

        let updates = do_rep(&mut session, 1000);
        assert!(updates[1].completion.is_some());
    }
}
