//! Spin animation state machine
//!
//! `Idle -> Spinning -> Idle`, driven by a host frame callback that supplies a
//! monotonic clock in milliseconds. Progress is a function of elapsed time only,
//! so the result is the same at 30 Hz or 144 Hz.

use serde::{Deserialize, Serialize};

use super::angle::{self, Resolution};
use crate::consts::*;
use crate::error::{StateError, ValidationError};
use crate::roster::Participant;

/// Ease-out cubic: fast start, decelerates into the stop
#[inline]
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Observable wheel state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WheelState {
    pub segment_count: usize,
    /// Radians, accumulates across spins
    pub current_rotation: f64,
    pub is_spinning: bool,
}

/// Outcome of a spin, fixed before the wheel moves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinResult {
    pub winner_index: usize,
    pub winner: Participant,
    /// Full animated delta (degrees)
    pub target_rotation: f64,
    /// Degrees
    pub segment_angle: f64,
}

/// Timing knobs for the animator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinTiming {
    pub duration_ms: f64,
    pub announce_delay_ms: f64,
    pub extra_turns: u32,
    pub pointer_angle_deg: f64,
}

impl Default for SpinTiming {
    fn default() -> Self {
        Self {
            duration_ms: SPIN_DURATION_DEFAULT_MS,
            announce_delay_ms: ANNOUNCE_DELAY_MS,
            extra_turns: EXTRA_TURNS,
            pointer_angle_deg: POINTER_ANGLE_DEG,
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveSpin {
    start_rotation: f64,
    /// Radians
    delta: f64,
    start_ms: f64,
    /// Radians
    segment_width: f64,
    last_segment: i64,
    result: SpinResult,
}

#[derive(Debug, Clone)]
struct Announcement {
    due_ms: f64,
    result: SpinResult,
}

/// What a single frame step produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStep {
    /// Rotation to composite this frame (radians)
    pub rotation: f64,
    /// Segment boundaries crossed since the previous frame
    pub ticks: u32,
    /// The wheel came to rest on this frame
    pub stopped: bool,
    /// Winner ready to be shown (after the display delay)
    pub announce: Option<SpinResult>,
    /// Host should schedule another frame
    pub keep_running: bool,
}

/// Drives one spin at a time
#[derive(Debug, Clone)]
pub struct SpinAnimator {
    wheel: WheelState,
    timing: SpinTiming,
    active: Option<ActiveSpin>,
    pending: Option<Announcement>,
}

impl SpinAnimator {
    pub fn new(timing: SpinTiming) -> Self {
        Self {
            wheel: WheelState::default(),
            timing,
            active: None,
            pending: None,
        }
    }

    pub fn state(&self) -> WheelState {
        self.wheel
    }

    pub fn timing(&self) -> SpinTiming {
        self.timing
    }

    /// Takes effect from the next spin
    pub fn set_timing(&mut self, timing: SpinTiming) {
        self.timing = timing;
    }

    pub fn is_spinning(&self) -> bool {
        self.wheel.is_spinning
    }

    /// Wheel rotation in degrees
    pub fn rotation_degrees(&self) -> f64 {
        self.wheel.current_rotation.to_degrees()
    }

    /// Keep the segment count in sync with the roster while idle
    pub fn set_segment_count(&mut self, count: usize) {
        if !self.wheel.is_spinning {
            self.wheel.segment_count = count;
        }
    }

    /// Back to zero rotation (explicit clear only)
    pub fn reset_rotation(&mut self) {
        if !self.wheel.is_spinning {
            self.wheel.current_rotation = 0.0;
        }
    }

    /// Begin spinning toward `winner_index`.
    ///
    /// The delta is aligned to the current accumulated rotation so the winner
    /// lands under the pointer whatever angle the previous spin left behind.
    pub fn start(
        &mut self,
        winner_index: usize,
        winner: Participant,
        segment_count: usize,
        now_ms: f64,
    ) -> Result<Resolution, crate::DrawError> {
        if self.wheel.is_spinning {
            return Err(StateError::AlreadySpinning.into());
        }
        if segment_count < MIN_PARTICIPANTS {
            return Err(ValidationError::TooFewParticipants {
                count: segment_count,
                min: MIN_PARTICIPANTS,
            }
            .into());
        }

        let res = angle::resolve(
            winner_index,
            segment_count,
            self.timing.pointer_angle_deg,
            self.timing.extra_turns,
        )?;
        let delta_deg = res.delta_from(self.rotation_degrees(), self.timing.extra_turns);
        let segment_width = res.segment_angle.to_radians();

        self.wheel.segment_count = segment_count;
        self.wheel.is_spinning = true;
        self.active = Some(ActiveSpin {
            start_rotation: self.wheel.current_rotation,
            delta: delta_deg.to_radians(),
            start_ms: now_ms,
            segment_width,
            last_segment: (self.wheel.current_rotation / segment_width).floor() as i64,
            result: SpinResult {
                winner_index,
                winner,
                target_rotation: delta_deg,
                segment_angle: res.segment_angle,
            },
        });

        log::info!(
            "Spin started: winner #{} of {}, delta {:.1}°",
            winner_index,
            segment_count,
            delta_deg
        );
        Ok(res)
    }

    /// Advance to `now_ms`
    pub fn step(&mut self, now_ms: f64) -> FrameStep {
        let mut frame = FrameStep {
            rotation: self.wheel.current_rotation,
            ..Default::default()
        };

        if let Some(spin) = self.active.as_mut() {
            let elapsed = now_ms - spin.start_ms;
            let t = if self.timing.duration_ms > 0.0 {
                (elapsed / self.timing.duration_ms).clamp(0.0, 1.0)
            } else {
                1.0
            };

            let rotation = if t >= 1.0 {
                // Snap to the exact target instead of the eased approximation
                spin.start_rotation + spin.delta
            } else {
                spin.start_rotation + spin.delta * ease_out_cubic(t)
            };

            let segment = (rotation / spin.segment_width).floor() as i64;
            if segment > spin.last_segment {
                frame.ticks = (segment - spin.last_segment) as u32;
                spin.last_segment = segment;
            }

            self.wheel.current_rotation = rotation;
            frame.rotation = rotation;

            if t >= 1.0 {
                if let Some(done) = self.active.take() {
                    log::info!("Wheel stopped on #{}", done.result.winner_index);
                    self.pending = Some(Announcement {
                        due_ms: now_ms + self.timing.announce_delay_ms,
                        result: done.result,
                    });
                }
                self.wheel.is_spinning = false;
                frame.stopped = true;
            }
        }

        if self.pending.as_ref().is_some_and(|p| now_ms >= p.due_ms) {
            frame.announce = self.pending.take().map(|p| p.result);
        }

        frame.keep_running = self.active.is_some() || self.pending.is_some();
        frame
    }

    /// Hand over an announcement that has not fired yet
    pub fn take_pending(&mut self) -> Option<SpinResult> {
        self.pending.take().map(|p| p.result)
    }

    /// Host teardown: drop the in-flight spin and any pending announcement
    pub fn cancel(&mut self) {
        if self.active.take().is_some() {
            log::info!("Spin cancelled");
        }
        self.pending = None;
        self.wheel.is_spinning = false;
    }
}

impl Default for SpinAnimator {
    fn default() -> Self {
        Self::new(SpinTiming::default())
    }
}
