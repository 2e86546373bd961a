//! Keypoint visibility validation
//!
//! A frame is only worth analysing when enough of the exercise's joints were
//! detected confidently. Occlusion, a person stepping out of frame or a dead
//! camera all show up here as a failed validation.

use crate::pose::{KeypointName, PoseFrame};

/// Validator for the required-joint visibility check
pub struct KeypointValidator;

impl KeypointValidator {
    /// Whether at least `ceil(ratio × |required|)` required joints are present
    /// with a score of at least `confidence_threshold`.
    pub fn validate(
        pose: &PoseFrame,
        required: &[KeypointName],
        confidence_threshold: f64,
        ratio: f64,
    ) -> bool {
        let visible = Self::visible_count(pose, required, confidence_threshold);
        visible >= minimum_visible(required.len(), ratio)
    }

    /// Number of required joints that pass the confidence gate
    pub fn visible_count(
        pose: &PoseFrame,
        required: &[KeypointName],
        confidence_threshold: f64,
    ) -> usize {
        required
            .iter()
            .filter(|&&name| {
                pose.keypoint(name)
                    .is_some_and(|kp| kp.is_confident(confidence_threshold))
            })
            .count()
    }
}

/// Smallest visible-joint count that satisfies `ratio`
fn minimum_visible(required: usize, ratio: f64) -> usize {
    // 0.7 * 10 lands a hair above 7.0 in binary; shave the rounding error so
    // exact products are not pushed to the next integer
    let exact = ratio * required as f64;
    (exact - 1e-9).ceil().max(0.0) as usize
}
