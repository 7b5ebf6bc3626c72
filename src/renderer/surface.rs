//! Drawing surface abstraction
//!
//! `Canvas` is the primitive set the wheel painter needs. `Surface` adds the
//! visible target: clearing, painting into an offscreen image once, and
//! compositing that image with a rotation every frame.

use glam::Vec2;

use crate::error::RenderError;

/// RGBA color, channels 0-255 plus alpha 0-1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rrggbb`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let h = hex.strip_prefix('#')?;
        if h.len() != 6 || !h.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&h[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Perceived brightness in [0, 1]
    pub fn luminance(&self) -> f32 {
        (0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32) / 255.0
    }

    /// Black on light colors, white on dark ones
    pub fn contrast(&self) -> Color {
        if self.luminance() > 0.5 {
            Color::BLACK
        } else {
            Color::WHITE
        }
    }

    /// CSS color string
    pub fn to_css(&self) -> String {
        if self.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_px: f32,
    pub color: Color,
    pub align: TextAlign,
    pub bold: bool,
}

/// Primitive drawing operations. Angles are radians, clockwise from 3 o'clock.
pub trait Canvas {
    /// Pie slice from the center out to `radius`
    fn fill_wedge(&mut self, center: Vec2, radius: f32, start: f32, end: f32, color: Color);
    fn stroke_wedge(
        &mut self,
        center: Vec2,
        radius: f32,
        start: f32,
        end: f32,
        color: Color,
        width: f32,
    );
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);
    fn stroke_circle(&mut self, center: Vec2, radius: f32, color: Color, width: f32);
    /// Text anchored at `anchor`, rotated by `angle` around it, vertically centered
    fn fill_text(&mut self, text: &str, anchor: Vec2, angle: f32, style: &TextStyle);
    /// Rendered width of `text` in pixels
    fn measure_text(&self, text: &str, style: &TextStyle) -> f32;
}

/// A visible drawing target
pub trait Surface: Canvas {
    /// Offscreen image produced by `render_offscreen`
    type Image;

    fn clear(&mut self);
    /// Paint into a new offscreen image of `size`
    fn render_offscreen(
        &mut self,
        size: Vec2,
        paint: &mut dyn FnMut(&mut dyn Canvas),
    ) -> Result<Self::Image, RenderError>;
    /// Composite `image` centered at `center`, rotated by `rotation` radians
    fn draw_image(&mut self, image: &Self::Image, center: Vec2, rotation: f32);
}
