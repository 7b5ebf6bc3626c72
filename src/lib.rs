//! Lucky Draw - a spinning wheel that picks one winner
//!
//! Core modules:
//! - `draw`: Selection, angle resolution and the spin state machine
//! - `renderer`: Drawing surface abstraction and the wheel render cache
//! - `roster`: Ordered participant list with persist-on-mutation
//! - `persistence`: Key-value stores (memory, file, LocalStorage)
//! - `app`: `LuckyDraw`, the session tying roster, animator and renderer together
//! - `api` / `server`: HTTP handlers and the native server loop
//! - `platform`: HTML canvas surface (wasm32)

pub mod api;
pub mod app;
pub mod draw;
pub mod error;
pub mod history;
pub mod persistence;
pub mod platform;
pub mod renderer;
pub mod roster;
#[cfg(not(target_arch = "wasm32"))]
pub mod server;
pub mod settings;

pub use app::LuckyDraw;
pub use error::{DrawError, RenderError, StateError, StorageError, ValidationError};
pub use history::WinnerHistory;
pub use roster::{Participant, Roster};
pub use settings::Settings;

use glam::Vec2;

/// Wheel configuration constants
pub mod consts {
    /// Pointer position in the unrotated wheel frame (degrees, clockwise from 3 o'clock).
    /// 90° is the bottom of the wheel.
    pub const POINTER_ANGLE_DEG: f64 = 90.0;
    /// Full turns added to every spin for dramatic effect
    pub const EXTRA_TURNS: u32 = 8;

    /// Spin duration bounds (ms)
    pub const SPIN_DURATION_MIN_MS: f64 = 3000.0;
    pub const SPIN_DURATION_MAX_MS: f64 = 9000.0;
    pub const SPIN_DURATION_DEFAULT_MS: f64 = 6000.0;
    /// Pause between the wheel stopping and the winner announcement
    pub const ANNOUNCE_DELAY_MS: f64 = 500.0;

    /// Participant bounds for a draw
    pub const MIN_PARTICIPANTS: usize = 2;
    pub const MAX_PARTICIPANTS: usize = 1000;
    /// Longest accepted participant name
    pub const MAX_NAME_LEN: usize = 50;

    /// Logical wheel canvas size (px)
    pub const VIEW_SIZE: f32 = 800.0;
    /// Gap between the wheel rim and the canvas edge
    pub const RIM_MARGIN: f32 = 10.0;
    /// Slices narrower than this (radians) get no label
    pub const LABEL_MIN_SLICE: f32 = 0.3;
    /// Labels longer than this are cut and suffixed with an ellipsis
    pub const LABEL_MAX_CHARS: usize = 12;
    /// Distance from the rim to the label's right edge
    pub const LABEL_RIM_INSET: f32 = 20.0;
    /// Hub radius as a fraction of the wheel radius
    pub const HUB_RATIO: f32 = 0.3;
    pub const CENTER_DOT_RADIUS: f32 = 5.0;

    /// Winner history length
    pub const MAX_HISTORY: usize = 10;
}

/// Normalize degrees into [0, 360)
#[inline]
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = ((angle % 360.0) + 360.0) % 360.0;
    // -1e-15 % 360 + 360 rounds to exactly 360
    if a >= 360.0 { 0.0 } else { a }
}

/// Convert polar (r, theta) to cartesian (x, y) around `center`.
/// Theta grows clockwise on screen since y points down.
#[inline]
pub fn polar_to_cartesian(center: Vec2, r: f32, theta: f32) -> Vec2 {
    center + Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Wall-clock milliseconds since the Unix epoch
pub fn now_ms() -> f64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}
