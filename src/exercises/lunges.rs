//! Lunge rules
//!
//! The left leg is treated as the front leg and the right leg as the back
//! leg. Both knee angles are needed; with either missing the frame is left
//! unclassified.

use super::{triple_angle, ExerciseRules, LEFT_LEG, RIGHT_LEG};
use crate::config::PipelineConfig;
use crate::definition::ExerciseDefinition;
use crate::pose::PoseFrame;
use crate::types::{AngleName, AngleSet, Classification, ExerciseState};

const SHALLOW_PENALTY: u32 = 15;

pub struct LungeRules;

impl ExerciseRules for LungeRules {
    fn extract_angles(&self, pose: &PoseFrame, confidence_threshold: f64) -> AngleSet {
        let mut angles = AngleSet::new();
        angles.insert(
            AngleName::FrontKnee,
            triple_angle(pose, LEFT_LEG, confidence_threshold),
        );
        angles.insert(
            AngleName::BackKnee,
            triple_angle(pose, RIGHT_LEG, confidence_threshold),
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

        let (Some(front), Some(back)) = (
            angles.get(AngleName::FrontKnee),
            angles.get(AngleName::BackKnee),
        ) else {
            return result;
        };
        let (Some(front_range), Some(back_range)) = (
            definition.range(AngleName::FrontKnee),
            definition.range(AngleName::BackKnee),
        ) else {
            return result;
        };

        if front < front_range.min || back < back_range.min {
            result.state = Some(ExerciseState::Down);
            result.feedback = "Good depth! Push back up".to_string();
        } else if front > front_range.max || back > back_range.max {
            result.state = Some(ExerciseState::Up);
            result.feedback = "Lunge deeper".to_string();
            result.penalize(SHALLOW_PENALTY);
        } else {
            result.state = Some(ExerciseState::Transition);
            result.feedback = "Good form! Keep going".to_string();
        }

        result
    }

    fn required_ranges(&self) -> &'static [AngleName] {
        &[AngleName::FrontKnee, AngleName::BackKnee]
    }
}
