//! Core types for the Synheart Reps pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: named joint angles, per-frame classification results, and the
//! read-only views of a session handed back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::exercises::ExerciseKind;

/// Feedback emitted when too few required joints are visible
pub const FEEDBACK_NOT_VISIBLE: &str = "Please ensure your full body is visible";

/// Feedback that replaces the classifier's text on low-accuracy frames
pub const FEEDBACK_IMPROVE_FORM: &str = "Improve your form to count reps";

/// Named joint angles, either measured per frame or used as target-range keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AngleName {
    Elbow,
    LeftElbow,
    RightElbow,
    Knee,
    LeftKnee,
    RightKnee,
    FrontKnee,
    BackKnee,
    Back,
    Hip,
    Torso,
}

impl AngleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AngleName::Elbow => "elbow",
            AngleName::LeftElbow => "leftElbow",
            AngleName::RightElbow => "rightElbow",
            AngleName::Knee => "knee",
            AngleName::LeftKnee => "leftKnee",
            AngleName::RightKnee => "rightKnee",
            AngleName::FrontKnee => "frontKnee",
            AngleName::BackKnee => "backKnee",
            AngleName::Back => "back",
            AngleName::Hip => "hip",
            AngleName::Torso => "torso",
        }
    }
}

/// Joint angles for one frame.
///
/// An entry holding `None` means the angle was attempted but could not be
/// computed (a joint was missing or below the confidence gate). It is never
/// the same thing as 0°.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AngleSet(BTreeMap<AngleName, Option<f64>>);

impl AngleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: AngleName, degrees: Option<f64>) {
        self.0.insert(name, degrees);
    }

    /// Angle in degrees, or `None` when absent or never attempted
    pub fn get(&self, name: AngleName) -> Option<f64> {
        self.0.get(&name).copied().flatten()
    }

    /// Whether the extractor attempted this angle
    pub fn contains(&self, name: AngleName) -> bool {
        self.0.contains_key(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AngleName, Option<f64>)> + '_ {
        self.0.iter().map(|(name, degrees)| (*name, *degrees))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(AngleName, Option<f64>)> for AngleSet {
    fn from_iter<I: IntoIterator<Item = (AngleName, Option<f64>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Discrete biomechanical states across all exercise families.
///
/// Rep-based exercises use `Up`/`Down` (lunges add `Transition`); plank uses
/// `Correct`/`Incorrect`. "No state" is modelled as `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseState {
    Up,
    Down,
    Transition,
    Correct,
    Incorrect,
}

impl ExerciseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseState::Up => "up",
            ExerciseState::Down => "down",
            ExerciseState::Transition => "transition",
            ExerciseState::Correct => "correct",
            ExerciseState::Incorrect => "incorrect",
        }
    }
}

/// Per-frame output of the exercise rules, before visibility is known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub state: Option<ExerciseState>,
    pub feedback: String,
    /// Form accuracy (0-100)
    pub accuracy: u32,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            state: None,
            feedback: String::new(),
            accuracy: 100,
        }
    }
}

impl Classification {
    /// Deduct a form penalty, saturating at zero
    pub fn penalize(&mut self, points: u32) {
        self.accuracy = self.accuracy.saturating_sub(points);
    }
}

/// Full per-frame result handed to the debouncer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub state: Option<ExerciseState>,
    pub feedback: String,
    /// Form accuracy (0-100)
    pub accuracy: u32,
    pub is_valid_pose: bool,
}

impl ClassificationResult {
    /// Result for a frame where too few required joints were visible
    pub fn not_visible() -> Self {
        Self {
            state: None,
            feedback: FEEDBACK_NOT_VISIBLE.to_string(),
            accuracy: 0,
            is_valid_pose: false,
        }
    }

    pub fn from_classification(classification: Classification) -> Self {
        Self {
            state: classification.state,
            feedback: classification.feedback,
            accuracy: classification.accuracy,
            is_valid_pose: true,
        }
    }
}

/// Live statistics for UI rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub exercise: ExerciseKind,
    pub count: u32,
    pub accuracy: u32,
    pub score: u32,
    pub feedback: String,
    /// Time spent in the exercise's hold state (plank), milliseconds
    pub hold_ms: i64,
    pub completed: bool,
}

/// Summary reported upward when a challenge target is first reached.
///
/// Field names follow the completion payload accepted by the exercise
/// history backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub session_id: Uuid,
    pub exercise_type: ExerciseKind,
    pub reps: u32,
    pub accuracy: u32,
    pub score: u32,
    pub points: u32,
    pub completed_at: DateTime<Utc>,
}
