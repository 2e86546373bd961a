//! Joint angle calculation
//!
//! Computes the interior angle at a vertex joint from three keypoints using
//! the difference of the two limb headings.

use crate::pose::Keypoint;

/// Interior angle at `b` (degrees, 0-180) formed by `a`-`b`-`c`.
///
/// Returns `None` when any point is missing, unscored, or scored below
/// `confidence_threshold`. The result does not depend on the order of `a`
/// and `c`.
pub fn joint_angle(
    a: Option<&Keypoint>,
    b: Option<&Keypoint>,
    c: Option<&Keypoint>,
    confidence_threshold: f64,
) -> Option<f64> {
    let (a, b, c) = (a?, b?, c?);

    if ![a, b, c]
        .iter()
        .all(|kp| kp.is_confident(confidence_threshold))
    {
        return None;
    }

    Some(interior_angle((a.x, a.y), (b.x, b.y), (c.x, c.y)))
}

/// Unsigned angle at `b` between the rays towards `a` and `c`
pub fn interior_angle(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    let heading_c = (c.1 - b.1).atan2(c.0 - b.0);
    let heading_a = (a.1 - b.1).atan2(a.0 - b.0);

    let angle = (heading_c - heading_a).to_degrees().abs();
    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}
