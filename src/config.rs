//! Pipeline configuration
//!
//! Every threshold the pipeline uses lives here so callers and tests can tune
//! them without touching the algorithms. `Default` reproduces the values the
//! rep counter has always shipped with.

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

/// Tunable thresholds for validation, classification and debouncing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum keypoint score for a required joint to count as visible
    pub keypoint_confidence: f64,
    /// Fraction of required joints that must be visible (0-1]
    pub visibility_ratio: f64,
    /// Minimum keypoint score for a joint to take part in an angle
    pub angle_confidence: f64,
    /// Minimum keypoint score for overlay rendering helpers
    pub display_confidence: f64,
    /// Margin (degrees) inside a target range that marks up/down positions
    pub state_margin_deg: f64,
    /// Confidence added when a frame repeats the validated state
    pub confidence_step: f64,
    /// Upper bound on accumulated state confidence
    pub confidence_cap: f64,
    /// Elapsed time after which a state change is accepted regardless of confidence
    pub min_pose_interval_ms: i64,
    /// Frames must score strictly above this to drive the debouncer
    pub accuracy_gate: u32,
    /// At or below this accuracy the feedback asks the user to fix their form
    pub feedback_override_accuracy: u32,
    /// Accuracy floor used when scoring a counted rep
    pub min_scored_accuracy: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keypoint_confidence: 0.2,
            visibility_ratio: 0.7,
            angle_confidence: 0.2,
            display_confidence: 0.3,
            state_margin_deg: 10.0,
            confidence_step: 1.5,
            confidence_cap: 1.5,
            min_pose_interval_ms: 250,
            accuracy_gate: 40,
            feedback_override_accuracy: 50,
            min_scored_accuracy: 60,
        }
    }
}

impl PipelineConfig {
    /// Confidence a state change needs before it is accepted
    pub fn acceptance_threshold(&self) -> f64 {
        (self.confidence_cap - self.confidence_step).max(0.0)
    }

    /// Check that every threshold is in range
    pub fn validate(&self) -> Result<(), ComputeError> {
        for (name, value) in [
            ("keypoint_confidence", self.keypoint_confidence),
            ("angle_confidence", self.angle_confidence),
            ("display_confidence", self.display_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ComputeError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if !(self.visibility_ratio > 0.0 && self.visibility_ratio <= 1.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "visibility_ratio must be within (0, 1], got {}",
                self.visibility_ratio
            )));
        }

        if !(self.state_margin_deg >= 0.0 && self.state_margin_deg < 90.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "state_margin_deg must be within [0, 90), got {}",
                self.state_margin_deg
            )));
        }

        if !(self.confidence_step > 0.0) || !(self.confidence_cap > 0.0) {
            return Err(ComputeError::InvalidConfig(
                "confidence_step and confidence_cap must be positive".to_string(),
            ));
        }

        if self.min_pose_interval_ms < 0 {
            return Err(ComputeError::InvalidConfig(format!(
                "min_pose_interval_ms must not be negative, got {}",
                self.min_pose_interval_ms
            )));
        }

        for (name, value) in [
            ("accuracy_gate", self.accuracy_gate),
            ("feedback_override_accuracy", self.feedback_override_accuracy),
            ("min_scored_accuracy", self.min_scored_accuracy),
        ] {
            if value > 100 {
                return Err(ComputeError::InvalidConfig(format!(
                    "{name} must be within [0, 100], got {value}"
                )));
            }
        }

        Ok(())
    }

    /// Load and validate a configuration from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}
