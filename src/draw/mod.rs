//! Selection and rotation geometry
//!
//! Pure logic, no rendering or storage:
//! - `selector`: uniform winner index
//! - `angle`: winner index to landing rotation
//! - `spin`: time-based ease-out animation toward that rotation

pub mod angle;
pub mod selector;
pub mod spin;

pub use angle::{Resolution, resolve, segment_angle, segment_center, segment_under_pointer};
pub use selector::{RandomSource, Selector, pick};
pub use spin::{FrameStep, SpinAnimator, SpinResult, SpinTiming, WheelState, ease_out_cubic};
