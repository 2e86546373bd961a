//! Pose input types
//!
//! A [`PoseFrame`] is what the external pose estimator hands us for one
//! instant: a list of named 2D keypoints with detection scores, stamped with
//! the capture time. Frames are read-only to the pipeline and dropped once
//! classified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body joints reported by single-person 2D pose models (COCO-17 layout)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeypointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl KeypointName {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeypointName::Nose => "nose",
            KeypointName::LeftEye => "left_eye",
            KeypointName::RightEye => "right_eye",
            KeypointName::LeftEar => "left_ear",
            KeypointName::RightEar => "right_ear",
            KeypointName::LeftShoulder => "left_shoulder",
            KeypointName::RightShoulder => "right_shoulder",
            KeypointName::LeftElbow => "left_elbow",
            KeypointName::RightElbow => "right_elbow",
            KeypointName::LeftWrist => "left_wrist",
            KeypointName::RightWrist => "right_wrist",
            KeypointName::LeftHip => "left_hip",
            KeypointName::RightHip => "right_hip",
            KeypointName::LeftKnee => "left_knee",
            KeypointName::RightKnee => "right_knee",
            KeypointName::LeftAnkle => "left_ankle",
            KeypointName::RightAnkle => "right_ankle",
        }
    }
}

/// Bone segments drawn by skeleton overlays
pub const SKELETON_EDGES: [(KeypointName, KeypointName); 12] = [
    (KeypointName::LeftShoulder, KeypointName::RightShoulder),
    (KeypointName::LeftShoulder, KeypointName::LeftElbow),
    (KeypointName::RightShoulder, KeypointName::RightElbow),
    (KeypointName::LeftElbow, KeypointName::LeftWrist),
    (KeypointName::RightElbow, KeypointName::RightWrist),
    (KeypointName::LeftShoulder, KeypointName::LeftHip),
    (KeypointName::RightShoulder, KeypointName::RightHip),
    (KeypointName::LeftHip, KeypointName::RightHip),
    (KeypointName::LeftHip, KeypointName::LeftKnee),
    (KeypointName::RightHip, KeypointName::RightKnee),
    (KeypointName::LeftKnee, KeypointName::LeftAnkle),
    (KeypointName::RightKnee, KeypointName::RightAnkle),
];

/// A single detected joint location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Joint identifier
    pub name: KeypointName,
    /// Horizontal position (pixels or normalized, y grows downward)
    pub x: f64,
    /// Vertical position
    pub y: f64,
    /// Detection confidence (0-1). Some estimators omit it for joints they
    /// did not score; those keypoints never pass a confidence gate.
    #[serde(default)]
    pub score: Option<f64>,
}

impl Keypoint {
    pub fn new(name: KeypointName, x: f64, y: f64, score: f64) -> Self {
        Self {
            name,
            x,
            y,
            score: Some(score),
        }
    }

    /// Whether the keypoint carries a score at or above `threshold`
    pub fn is_confident(&self, threshold: f64) -> bool {
        matches!(self.score, Some(score) if score >= threshold)
    }
}

/// All keypoints detected for one person at one instant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseFrame {
    /// Capture time of the source video frame
    pub timestamp: DateTime<Utc>,
    /// Detected keypoints in estimator order
    pub keypoints: Vec<Keypoint>,
}

impl PoseFrame {
    pub fn new(timestamp: DateTime<Utc>, keypoints: Vec<Keypoint>) -> Self {
        Self {
            timestamp,
            keypoints,
        }
    }

    /// Look up a keypoint by name; the first match wins
    pub fn keypoint(&self, name: KeypointName) -> Option<&Keypoint> {
        self.keypoints.iter().find(|kp| kp.name == name)
    }

    /// Skeleton segments whose endpoints are both strictly above `threshold`
    pub fn visible_segments(&self, threshold: f64) -> Vec<(&Keypoint, &Keypoint)> {
        let visible = |name| {
            self.keypoint(name)
                .filter(|kp| matches!(kp.score, Some(score) if score > threshold))
        };

        SKELETON_EDGES
            .iter()
            .filter_map(|&(a, b)| Some((visible(a)?, visible(b)?)))
            .collect()
    }
}
