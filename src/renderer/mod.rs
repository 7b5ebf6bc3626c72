//! Wheel rendering
//!
//! The wheel is painted once per roster revision into an offscreen image and
//! composited with a rotation every frame.

pub mod cache;
pub mod surface;
pub mod svg;

pub use cache::{RenderCache, WheelGeometry, WheelRenderer, font_size_for, paint_wheel};
pub use surface::{Canvas, Color, Surface, TextAlign, TextStyle};
pub use svg::SvgSurface;
