//! Pose frame ingestion
//!
//! Reads recorded pose frames from JSON arrays or NDJSON streams and checks a
//! batch for problems that would otherwise surface one frame at a time.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::ComputeError;
use crate::pose::PoseFrame;

/// Parser and batch checker for recorded pose frames
pub struct FrameAdapter;

impl FrameAdapter {
    /// Parse a JSON string containing an array of PoseFrames
    pub fn parse_array(json: &str) -> Result<Vec<PoseFrame>, ComputeError> {
        let frames: Vec<PoseFrame> = serde_json::from_str(json)?;
        Ok(frames)
    }

    /// Parse NDJSON (newline-delimited JSON), one PoseFrame per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<PoseFrame>, ComputeError> {
        let mut frames = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<PoseFrame>(trimmed) {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(frames)
    }

    /// Parse either format, picking by the first non-whitespace character
    pub fn parse(input: &str) -> Result<Vec<PoseFrame>, ComputeError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Report frames that would be rejected or misread by the pipeline
    pub fn validate_frames(frames: &[PoseFrame]) -> Vec<FrameIssue> {
        let mut issues = Vec::new();

        for (index, frame) in frames.iter().enumerate() {
            if index > 0 && frame.timestamp < frames[index - 1].timestamp {
                issues.push(FrameIssue {
                    index,
                    problem: format!(
                        "timestamp {} precedes previous frame",
                        frame.timestamp.to_rfc3339()
                    ),
                });
            }

            if frame.keypoints.is_empty() {
                issues.push(FrameIssue {
                    index,
                    problem: "no keypoints".to_string(),
                });
            }

            for kp in &frame.keypoints {
                if let Some(score) = kp.score {
                    if !(0.0..=1.0).contains(&score) {
                        issues.push(FrameIssue {
                            index,
                            problem: format!("{} score {} outside [0, 1]", kp.name.as_str(), score),
                        });
                    }
                }
                if !kp.x.is_finite() || !kp.y.is_finite() {
                    issues.push(FrameIssue {
                        index,
                        problem: format!("{} has non-finite coordinates", kp.name.as_str()),
                    });
                }
            }
        }

        issues
    }

    /// Distinct frame indices named by `issues`, in frame order
    pub fn invalid_frames(issues: &[FrameIssue]) -> BTreeSet<usize> {
        issues.iter().map(|issue| issue.index).collect()
    }
}

/// A problem found in one frame of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameIssue {
    pub index: usize,
    pub problem: String,
}
