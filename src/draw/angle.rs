//! Winner index to wheel rotation
//!
//! Frame convention shared by every consumer (renderer, client spin, HTTP API):
//! - segment 0 starts at 0°, measured clockwise from 3 o'clock
//! - segment i spans [i * segment_angle, (i + 1) * segment_angle)
//! - the pointer sits at a fixed angle in that unrotated frame
//!
//! Rotating the wheel by `target` degrees brings the winner's center under the pointer.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::normalize_degrees;

/// Resolved landing geometry for one spin (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Width of each segment
    pub segment_angle: f64,
    /// Rotation in [0, 360) that puts the winner's center under the pointer
    pub target_angle: f64,
    /// Delta to animate: extra full turns plus `target_angle`
    pub final_angle: f64,
}

/// Width of one segment in degrees
#[inline]
pub fn segment_angle(segment_count: usize) -> f64 {
    360.0 / segment_count as f64
}

/// Center of segment `index` in the unrotated frame
#[inline]
pub fn segment_center(index: usize, segment_count: usize) -> f64 {
    let width = segment_angle(segment_count);
    index as f64 * width + width / 2.0
}

/// Resolve the landing rotation for `winner_index`
pub fn resolve(
    winner_index: usize,
    segment_count: usize,
    pointer_angle_deg: f64,
    extra_turns: u32,
) -> Result<Resolution, ValidationError> {
    if winner_index >= segment_count {
        return Err(ValidationError::IndexOutOfRange {
            index: winner_index,
            count: segment_count,
        });
    }

    let width = segment_angle(segment_count);
    let target_angle =
        normalize_degrees(pointer_angle_deg - segment_center(winner_index, segment_count));
    let final_angle = extra_turns as f64 * 360.0 + target_angle;

    Ok(Resolution {
        segment_angle: width,
        target_angle,
        final_angle,
    })
}

impl Resolution {
    /// Delta from an arbitrary accumulated rotation (degrees) to the landing angle.
    /// Equals `final_angle` when `current_deg` is a whole number of turns.
    pub fn delta_from(&self, current_deg: f64, extra_turns: u32) -> f64 {
        let remaining = normalize_degrees(self.target_angle - normalize_degrees(current_deg));
        extra_turns as f64 * 360.0 + remaining
    }
}

/// Index of the segment under the pointer for a wheel rotated by `rotation_deg`
pub fn segment_under_pointer(rotation_deg: f64, segment_count: usize, pointer_angle_deg: f64) -> usize {
    let local = normalize_degrees(pointer_angle_deg - rotation_deg);
    ((local / segment_angle(segment_count)).floor() as usize).min(segment_count.saturating_sub(1))
}
