//! Repetition debouncing
//!
//! Raw per-frame states flicker with pose jitter and brief occlusion. The
//! debouncer only accepts a state change once it has accumulated enough
//! confidence or enough time has passed since the rep timer anchor (the
//! first frame of the session, then the frame of each counted rep), and
//! counts a repetition when an accepted change matches the exercise's rep
//! transition.
//!
//! The transition is a pure function of the previous [`SessionState`] and the
//! frame's [`ClassificationResult`], so it can be exercised without a session.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::definition::ExerciseDefinition;
use crate::session::SessionState;
use crate::types::{ClassificationResult, ExerciseState, FEEDBACK_IMPROVE_FORM};

/// Result of feeding one frame through the debouncer
#[derive(Debug, Clone, PartialEq)]
pub struct DebounceStep {
    /// Session state after this frame
    pub state: SessionState,
    /// State change accepted on this frame, if any
    pub accepted: Option<ExerciseState>,
    /// Whether this frame completed a repetition
    pub rep_counted: bool,
}

/// Temporal state machine turning classified frames into validated reps
pub struct RepDebouncer;

impl RepDebouncer {
    /// Advance `state` by one classified frame captured at `at`.
    pub fn advance(
        state: &SessionState,
        result: &ClassificationResult,
        at: DateTime<Utc>,
        definition: &ExerciseDefinition,
        config: &PipelineConfig,
    ) -> DebounceStep {
        let mut next = state.clone();
        let mut accepted = None;
        let mut rep_counted = false;

        // The first frame anchors the rep timer
        let anchor = *next.last_valid_pose_at.get_or_insert(at);
        let interval_passed = (at - anchor).num_milliseconds() > config.min_pose_interval_ms;
        next.last_frame_at = Some(at);

        let gated = result.is_valid_pose && result.accuracy > config.accuracy_gate;

        match result.state {
            Some(frame_state) if gated => {
                let previous = next.last_validated_state;
                let was_holding =
                    definition.hold_state.is_some() && previous == definition.hold_state;

                if Some(frame_state) == previous {
                    next.state_confidence =
                        (next.state_confidence + config.confidence_step).min(config.confidence_cap);
                } else if interval_passed {
                    next.state_confidence = 0.0;
                }

                let confident = next.state_confidence >= config.acceptance_threshold();
                if (confident || interval_passed) && Some(frame_state) != previous {
                    if let Some(transition) = definition.rep_transition {
                        if previous == Some(transition.from) && frame_state == transition.to {
                            next.rep_count += 1;
                            next.score = next
                                .rep_count
                                .saturating_mul(result.accuracy.max(config.min_scored_accuracy));
                            next.last_valid_pose_at = Some(at);
                            rep_counted = true;

                            info!(
                                exercise = %definition.id,
                                reps = next.rep_count,
                                score = next.score,
                                accuracy = result.accuracy,
                                "repetition counted"
                            );
                        }
                    }

                    debug!(
                        exercise = %definition.id,
                        from = ?previous,
                        to = ?frame_state,
                        confidence = next.state_confidence,
                        "state transition accepted"
                    );
                    next.last_validated_state = Some(frame_state);
                    accepted = Some(frame_state);
                }

                let still_holding = next.last_validated_state == definition.hold_state;
                if was_holding && still_holding {
                    if let Some(previous_at) = next.last_scored_frame_at {
                        next.hold_ms += (at - previous_at).num_milliseconds().max(0);
                    }
                }
                next.last_scored_frame_at = Some(at);
            }
            _ => {
                next.state_confidence = 0.0;
                // Hold time only spans consecutive gated frames
                next.last_scored_frame_at = None;
            }
        }

        next.last_accuracy = result.accuracy;
        next.last_feedback = if result.accuracy <= config.feedback_override_accuracy {
            FEEDBACK_IMPROVE_FORM.to_string()
        } else {
            result.feedback.clone()
        };

        DebounceStep {
            state: next,
            accepted,
            rep_counted,
        }
    }
}
