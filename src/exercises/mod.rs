//! Per-exercise rules
//!
//! Each supported exercise is a variant of [`ExerciseKind`] backed by a unit
//! struct implementing [`ExerciseRules`]: which joint triples to measure, and
//! how the measured angles map onto a biomechanical state, feedback and form
//! accuracy. Adding an exercise means adding a variant and a rules module;
//! no stage of the pipeline branches on the exercise id.

mod lunges;
mod plank;
mod pushup;
mod squat;

pub use lunges::LungeRules;
pub use plank::PlankRules;
pub use pushup::PushupRules;
pub use squat::SquatRules;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::angles::joint_angle;
use crate::config::PipelineConfig;
use crate::definition::{AngleRange, ExerciseDefinition};
use crate::error::ComputeError;
use crate::pose::{KeypointName, PoseFrame};
use crate::types::{AngleName, AngleSet, Classification, ExerciseState};

/// Trait implemented by each exercise's rule set
pub trait ExerciseRules {
    /// Measure the joint angles this exercise is judged on
    fn extract_angles(&self, pose: &PoseFrame, confidence_threshold: f64) -> AngleSet;

    /// Map measured angles to a state, feedback and accuracy
    fn classify(
        &self,
        angles: &AngleSet,
        definition: &ExerciseDefinition,
        config: &PipelineConfig,
    ) -> Classification;

    /// Target ranges a definition must provide for `classify` to work
    fn required_ranges(&self) -> &'static [AngleName];
}

/// Supported exercise types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseKind {
    Pushup,
    Squat,
    Lunges,
    Plank,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 4] = [
        ExerciseKind::Pushup,
        ExerciseKind::Squat,
        ExerciseKind::Lunges,
        ExerciseKind::Plank,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::Pushup => "pushup",
            ExerciseKind::Squat => "squat",
            ExerciseKind::Lunges => "lunges",
            ExerciseKind::Plank => "plank",
        }
    }

    /// Rules implementation for this exercise
    pub fn rules(&self) -> &'static dyn ExerciseRules {
        match self {
            ExerciseKind::Pushup => &PushupRules,
            ExerciseKind::Squat => &SquatRules,
            ExerciseKind::Lunges => &LungeRules,
            ExerciseKind::Plank => &PlankRules,
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseKind {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExerciseKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ComputeError::UnknownExercise(s.to_string()))
    }
}

/// Angle at the middle joint of `triple`
pub(crate) fn triple_angle(
    pose: &PoseFrame,
    triple: [KeypointName; 3],
    confidence_threshold: f64,
) -> Option<f64> {
    let [a, b, c] = triple;
    joint_angle(
        pose.keypoint(a),
        pose.keypoint(b),
        pose.keypoint(c),
        confidence_threshold,
    )
}

pub(crate) const LEFT_ARM: [KeypointName; 3] = [
    KeypointName::LeftShoulder,
    KeypointName::LeftElbow,
    KeypointName::LeftWrist,
];

pub(crate) const RIGHT_ARM: [KeypointName; 3] = [
    KeypointName::RightShoulder,
    KeypointName::RightElbow,
    KeypointName::RightWrist,
];

pub(crate) const LEFT_LEG: [KeypointName; 3] = [
    KeypointName::LeftHip,
    KeypointName::LeftKnee,
    KeypointName::LeftAnkle,
];

pub(crate) const RIGHT_LEG: [KeypointName; 3] = [
    KeypointName::RightHip,
    KeypointName::RightKnee,
    KeypointName::RightAnkle,
];

/// Bottom/top position of a flex-extend movement.
///
/// Below `min + margin` is the bottom of the rep, above `max - margin` the
/// top; anything between is left unclassified.
pub(crate) fn flex_state(degrees: f64, range: AngleRange, margin: f64) -> Option<ExerciseState> {
    if degrees < range.min + margin {
        Some(ExerciseState::Down)
    } else if degrees > range.max - margin {
        Some(ExerciseState::Up)
    } else {
        None
    }
}

/// Whether a present angle falls outside its target range
pub(crate) fn out_of_range(degrees: Option<f64>, range: Option<AngleRange>) -> bool {
    matches!((degrees, range), (Some(d), Some(r)) if !r.contains(d))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::pose::Keypoint;
    use chrono::Utc;

    /// Place `a` and `c` so the angle at `b` equals `degrees`
    pub fn limb(triple: [KeypointName; 3], degrees: f64, origin: (f64, f64)) -> Vec<Keypoint> {
        let [a, b, c] = triple;
        let (bx, by) = origin;
        let theta = degrees.to_radians();
        vec![
            Keypoint::new(a, bx + 100.0, by, 0.9),
            Keypoint::new(b, bx, by, 0.9),
            Keypoint::new(c, bx + 100.0 * theta.cos(), by + 100.0 * theta.sin(), 0.9),
        ]
    }

    pub fn pose(limbs: Vec<Vec<Keypoint>>) -> PoseFrame {
        PoseFrame::new(Utc::now(), limbs.into_iter().flatten().collect())
    }

    pub fn angles(entries: &[(AngleName, Option<f64>)]) -> AngleSet {
        entries.iter().copied().collect()
    }
}
