//! Plank rules
//!
//! A plank is held rather than repeated: frames are either in the target
//! elbow range (`correct`) or outside it (`incorrect`), never `up`/`down`.

use super::{triple_angle, ExerciseRules, LEFT_ARM, RIGHT_ARM};
use crate::config::PipelineConfig;
use crate::definition::ExerciseDefinition;
use crate::pose::PoseFrame;
use crate::types::{AngleName, AngleSet, Classification, ExerciseState};

const ALIGNMENT_PENALTY: u32 = 15;

pub struct PlankRules;

impl ExerciseRules for PlankRules {
    fn extract_angles(&self, pose: &PoseFrame, confidence_threshold: f64) -> AngleSet {
        let mut angles = AngleSet::new();
        angles.insert(
            AngleName::LeftElbow,
            triple_angle(pose, LEFT_ARM, confidence_threshold),
        );
        angles.insert(
            AngleName::RightElbow,
            triple_angle(pose, RIGHT_ARM, confidence_threshold),
        );
        angles
    }

    fn classify(
        &self,
        angles: &AngleSet,
        definition: &ExerciseDefinition,
        _config: &PipelineConfig,
    ) -> Classification {
        let mut result = Classification::default();

        let Some(elbow) = angles
            .get(AngleName::LeftElbow)
            .or_else(|| angles.get(AngleName::RightElbow))
        else {
            return result;
        };
        let Some(range) = definition.range(AngleName::Elbow) else {
            return result;
        };

        if elbow < range.min {
            result.state = Some(ExerciseState::Incorrect);
            result.feedback = "Raise your body slightly".to_string();
            result.penalize(ALIGNMENT_PENALTY);
        } else if elbow > range.max {
            result.state = Some(ExerciseState::Incorrect);
            result.feedback = "Lower your body slightly".to_string();
            result.penalize(ALIGNMENT_PENALTY);
        } else {
            result.state = Some(ExerciseState::Correct);
            result.feedback = "Great plank form! Keep holding".to_string();
        }

        result
    }

    fn required_ranges(&self) -> &'static [AngleName] {
        &[AngleName::Elbow]
    }
}
