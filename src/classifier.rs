//! Per-frame form classification
//!
//! Runs the stateless half of the pipeline for one pose frame:
//! visibility validation → angle extraction → exercise rules.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::PipelineConfig;
use crate::definition::ExerciseDefinition;
use crate::pose::PoseFrame;
use crate::types::{AngleSet, ClassificationResult};
use crate::validator::KeypointValidator;

/// Classification of one frame together with the angles it was based on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Measured angles; `None` when the pose failed visibility validation
    pub angles: Option<AngleSet>,
    pub result: ClassificationResult,
}

/// Stateless classifier for a single pose frame
pub struct FrameClassifier;

impl FrameClassifier {
    /// Classify `pose` against `definition`.
    ///
    /// Frames without enough visible required joints short-circuit to the
    /// "not visible" result; no angles are computed for them.
    pub fn classify(
        pose: &PoseFrame,
        definition: &ExerciseDefinition,
        config: &PipelineConfig,
    ) -> FrameAnalysis {
        let visible = KeypointValidator::validate(
            pose,
            &definition.required_keypoints,
            config.keypoint_confidence,
            config.visibility_ratio,
        );

        if !visible {
            trace!(exercise = %definition.id, "pose failed visibility check");
            return FrameAnalysis {
                angles: None,
                result: ClassificationResult::not_visible(),
            };
        }

        let rules = definition.id.rules();
        let angles = rules.extract_angles(pose, config.angle_confidence);
        let classification = rules.classify(&angles, definition, config);

        trace!(
            exercise = %definition.id,
            state = ?classification.state,
            accuracy = classification.accuracy,
            "frame classified"
        );

        FrameAnalysis {
            angles: Some(angles),
            result: ClassificationResult::from_classification(classification),
        }
    }
}
