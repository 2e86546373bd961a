//! Push-up rules
//!
//! Judged on elbow flexion. The left arm is preferred; the right arm stands in
//! when the left elbow angle could not be measured.

use super::{flex_state, out_of_range, triple_angle, ExerciseRules, LEFT_ARM, RIGHT_ARM};
use crate::config::PipelineConfig;
use crate::definition::ExerciseDefinition;
use crate::pose::PoseFrame;
use crate::types::{AngleName, AngleSet, Classification, ExerciseState};

const BACK_PENALTY: u32 = 20;

pub struct PushupRules;

impl ExerciseRules for PushupRules {
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
        config: &PipelineConfig,
    ) -> Classification {
        let mut result = Classification::default();

        let Some(elbow) = angles
            .get(AngleName::LeftElbow)
            .or_else(|| angles.get(AngleName::RightElbow))
        else {
            return result;
        };
        let Some(elbow_range) = definition.range(AngleName::Elbow) else {
            return result;
        };

        result.state = flex_state(elbow, elbow_range, config.state_margin_deg);
        match result.state {
            Some(ExerciseState::Down) => result.feedback = "Good, now push up".to_string(),
            Some(ExerciseState::Up) => result.feedback = "Good, now go down slowly".to_string(),
            _ => {}
        }

        if out_of_range(angles.get(AngleName::Back), definition.range(AngleName::Back)) {
            result.feedback = "Try to keep your back straight".to_string();
            result.penalize(BACK_PENALTY);
        }

        result
    }

    fn required_ranges(&self) -> &'static [AngleName] {
        &[AngleName::Elbow]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ExerciseRegistry;
    use crate::exercises::test_support::{angles, limb, pose};
    use crate::exercises::ExerciseKind;
    use crate::pose::KeypointName;
    use pretty_assertions::assert_eq;

    fn classify(set: &AngleSet) -> Classification {
        let definition = ExerciseRegistry::builtin().get(ExerciseKind::Pushup).unwrap();
        PushupRules.classify(set, &definition, &PipelineConfig::default())
    }

    #[test]
    fn test_extracts_both_elbows() {
        let frame = pose(vec![
            limb(LEFT_ARM, 90.0, (0.0, 0.0)),
            limb(RIGHT_ARM, 150.0, (400.0, 0.0)),
        ]);

        let set = PushupRules.extract_angles(&frame, 0.2);
        assert_eq!(set.len(), 2);
        assert!((set.get(AngleName::LeftElbow).unwrap() - 90.0).abs() < 1e-6);
        assert!((set.get(AngleName::RightElbow).unwrap() - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_wrist_leaves_angle_absent() {
        let mut left = limb(LEFT_ARM, 90.0, (0.0, 0.0));
        left.retain(|kp| kp.name != KeypointName::LeftWrist);
        let frame = pose(vec![left]);

        let set = PushupRules.extract_angles(&frame, 0.2);
        assert!(set.contains(AngleName::LeftElbow));
        assert_eq!(set.get(AngleName::LeftElbow), None);
        assert_eq!(set.get(AngleName::RightElbow), None);
    }

    #[test]
    fn test_bent_elbow_is_down() {
        let result = classify(&angles(&[(AngleName::LeftElbow, Some(65.0))]));
        assert_eq!(result.state, Some(ExerciseState::Down));
        assert_eq!(result.feedback, "Good, now push up");
        assert_eq!(result.accuracy, 100);
    }

    #[test]
    fn test_extended_elbow_is_up() {
        let result = classify(&angles(&[(AngleName::LeftElbow, Some(160.0))]));
        assert_eq!(result.state, Some(ExerciseState::Up));
        assert_eq!(result.feedback, "Good, now go down slowly");
    }

    #[test]
    fn test_mid_range_has_no_state() {
        let result = classify(&angles(&[(AngleName::LeftElbow, Some(95.0))]));
        assert_eq!(result, Classification::default());
    }

    #[test]
    fn test_right_elbow_fallback() {
        let result = classify(&angles(&[
            (AngleName::LeftElbow, None),
            (AngleName::RightElbow, Some(50.0)),
        ]));
        assert_eq!(result.state, Some(ExerciseState::Down));
    }

    #[test]
    fn test_zero_degree_elbow_is_measured() {
        let result = classify(&angles(&[
            (AngleName::LeftElbow, Some(0.0)),
            (AngleName::RightElbow, Some(170.0)),
        ]));
        assert_eq!(result.state, Some(ExerciseState::Down));
    }

    #[test]
    fn test_sagging_back_overrides_feedback_not_state() {
        let result = classify(&angles(&[
            (AngleName::LeftElbow, Some(160.0)),
            (AngleName::Back, Some(130.0)),
        ]));
        assert_eq!(result.state, Some(ExerciseState::Up));
        assert_eq!(result.feedback, "Try to keep your back straight");
        assert_eq!(result.accuracy, 80);
    }

    #[test]
    fn test_no_elbow_means_no_classification() {
        let result = classify(&angles(&[
            (AngleName::LeftElbow, None),
            (AngleName::RightElbow, None),
            (AngleName::Back, Some(100.0)),
        ]));
        assert_eq!(result, Classification::default());
    }
}
