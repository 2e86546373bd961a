//! Squat rules

use super::{flex_state, out_of_range, triple_angle, ExerciseRules, LEFT_LEG, RIGHT_LEG};
use crate::config::PipelineConfig;
use crate::definition::ExerciseDefinition;
use crate::pose::PoseFrame;
use crate::types::{AngleName, AngleSet, Classification, ExerciseState};

const HIP_PENALTY: u32 = 20;

pub struct SquatRules;

impl ExerciseRules for SquatRules {
    fn extract_angles(&self, pose: &PoseFrame, confidence_threshold: f64) -> AngleSet {
        let mut angles = AngleSet::new();
        angles.insert(
            AngleName::LeftKnee,
            triple_angle(pose, LEFT_LEG, confidence_threshold),
        );
        angles.insert(
            AngleName::RightKnee,
            triple_angle(pose, RIGHT_LEG, confidence_threshold),
        );
        angles
    }

    fn classify(
        &self,
        angles: &AngleSet,
        definition: &ExerciseDefinition,
        config: &PipelineConfig,
    ) -> Classification {
        let mut result = Classification::default();

        let Some(knee) = angles
            .get(AngleName::LeftKnee)
            .or_else(|| angles.get(AngleName::RightKnee))
        else {
            return result;
        };
        let Some(knee_range) = definition.range(AngleName::Knee) else {
            return result;
        };

        result.state = flex_state(knee, knee_range, config.state_margin_deg);
        match result.state {
            Some(ExerciseState::Down) => result.feedback = "Good depth, now stand up".to_string(),
            Some(ExerciseState::Up) => result.feedback = "Good, now squat down".to_string(),
            _ => {}
        }

        if out_of_range(angles.get(AngleName::Hip), definition.range(AngleName::Hip)) {
            result.feedback = "Try to keep your back straight".to_string();
            result.penalize(HIP_PENALTY);
        }

        result
    }

    fn required_ranges(&self) -> &'static [AngleName] {
        &[AngleName::Knee]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ExerciseRegistry;
    use crate::exercises::test_support::{angles, limb, pose};
    use crate::exercises::ExerciseKind;

    fn classify(set: &AngleSet) -> Classification {
        let definition = ExerciseRegistry::builtin().get(ExerciseKind::Squat).unwrap();
        SquatRules.classify(set, &definition, &PipelineConfig::default())
    }

    #[test]
    fn test_extracts_knees() {
        let frame = pose(vec![limb(LEFT_LEG, 75.0, (0.0, 0.0))]);
        let set = SquatRules.extract_angles(&frame, 0.2);

        assert!((set.get(AngleName::LeftKnee).unwrap() - 75.0).abs() < 1e-6);
        assert_eq!(set.get(AngleName::RightKnee), None);
    }

    #[test]
    fn test_deep_knee_is_down() {
        let result = classify(&angles(&[(AngleName::LeftKnee, Some(72.0))]));
        assert_eq!(result.state, Some(ExerciseState::Down));
        assert_eq!(result.feedback, "Good depth, now stand up");
    }

    #[test]
    fn test_standing_is_up() {
        let result = classify(&angles(&[
            (AngleName::LeftKnee, None),
            (AngleName::RightKnee, Some(175.0)),
        ]));
        assert_eq!(result.state, Some(ExerciseState::Up));
        assert_eq!(result.feedback, "Good, now squat down");
        assert_eq!(result.accuracy, 100);
    }

    #[test]
    fn test_hip_out_of_range_penalized() {
        let result = classify(&angles(&[
            (AngleName::LeftKnee, Some(72.0)),
            (AngleName::Hip, Some(150.0)),
        ]));
        assert_eq!(result.state, Some(ExerciseState::Down));
        assert_eq!(result.feedback, "Try to keep your back straight");
        assert_eq!(result.accuracy, 80);
    }

    #[test]
    fn test_absent_knees() {
        let result = classify(&angles(&[(AngleName::LeftKnee, None)]));
        assert_eq!(result.state, None);
        assert_eq!(result.accuracy, 100);
        assert!(result.feedback.is_empty());
    }
}
