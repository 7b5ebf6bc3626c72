//! SVG drawing surface
//!
//! Used by the HTTP API to serve a snapshot of the wheel. The offscreen image
//! is an SVG fragment; compositing wraps it in a rotated `<g>`.

use std::f32::consts::TAU;
use std::fmt::Write;

use glam::Vec2;

use super::surface::{Canvas, Color, Surface, TextAlign, TextStyle};
use crate::error::RenderError;
use crate::polar_to_cartesian;

/// Average glyph advance as a fraction of the font size
const GLYPH_ADVANCE: f32 = 0.6;

pub struct SvgSurface {
    size: Vec2,
    body: String,
}

impl SvgSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
            body: String::new(),
        }
    }

    /// Complete SVG document
    pub fn finish(&self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">{body}</svg>",
            w = self.size.x,
            h = self.size.y,
            body = self.body
        )
    }

    fn wedge_path(center: Vec2, radius: f32, start: f32, end: f32) -> String {
        let a = polar_to_cartesian(center, radius, start);
        let b = polar_to_cartesian(center, radius, end);
        let large = if end - start > TAU / 2.0 { 1 } else { 0 };
        format!(
            "M{:.2} {:.2} L{:.2} {:.2} A{r:.2} {r:.2} 0 {large} 1 {:.2} {:.2} Z",
            center.x,
            center.y,
            a.x,
            a.y,
            b.x,
            b.y,
            r = radius,
            large = large
        )
    }

    fn is_full_turn(start: f32, end: f32) -> bool {
        end - start >= TAU - 1e-4
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

impl Canvas for SvgSurface {
    fn fill_wedge(&mut self, center: Vec2, radius: f32, start: f32, end: f32, color: Color) {
        if Self::is_full_turn(start, end) {
            self.fill_circle(center, radius, color);
            return;
        }
        let _ = write!(
            self.body,
            "<path d=\"{}\" fill=\"{}\"/>",
            Self::wedge_path(center, radius, start, end),
            color.to_css()
        );
    }

    fn stroke_wedge(
        &mut self,
        center: Vec2,
        radius: f32,
        start: f32,
        end: f32,
        color: Color,
        width: f32,
    ) {
        if Self::is_full_turn(start, end) {
            self.stroke_circle(center, radius, color, width);
            return;
        }
        let _ = write!(
            self.body,
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>",
            Self::wedge_path(center, radius, start, end),
            color.to_css(),
            width
        );
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        let _ = write!(
            self.body,
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\"/>",
            center.x,
            center.y,
            radius,
            color.to_css()
        );
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, color: Color, width: f32) {
        let _ = write!(
            self.body,
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>",
            center.x,
            center.y,
            radius,
            color.to_css(),
            width
        );
    }

    fn fill_text(&mut self, text: &str, anchor: Vec2, angle: f32, style: &TextStyle) {
        let align = match style.align {
            TextAlign::Left => "start",
            TextAlign::Center => "middle",
            TextAlign::Right => "end",
        };
        let weight = if style.bold { "bold" } else { "normal" };
        let _ = write!(
            self.body,
            "<text x=\"{x:.2}\" y=\"{y:.2}\" transform=\"rotate({deg:.3} {x:.2} {y:.2})\" \
             font-family=\"Montserrat, sans-serif\" font-size=\"{px}\" font-weight=\"{weight}\" \
             fill=\"{fill}\" text-anchor=\"{align}\" dominant-baseline=\"middle\">{text}</text>",
            x = anchor.x,
            y = anchor.y,
            deg = angle.to_degrees(),
            px = style.font_px,
            weight = weight,
            fill = style.color.to_css(),
            align = align,
            text = escape(text)
        );
    }

    fn measure_text(&self, text: &str, style: &TextStyle) -> f32 {
        text.chars().count() as f32 * style.font_px * GLYPH_ADVANCE
    }
}

impl Surface for SvgSurface {
    type Image = String;

    fn clear(&mut self) {
        self.body.clear();
    }

    fn render_offscreen(
        &mut self,
        size: Vec2,
        paint: &mut dyn FnMut(&mut dyn Canvas),
    ) -> Result<String, RenderError> {
        let mut layer = SvgSurface::new(size.x, size.y);
        paint(&mut layer);
        Ok(layer.body)
    }

    fn draw_image(&mut self, image: &String, center: Vec2, rotation: f32) {
        let _ = write!(
            self.body,
            "<g transform=\"rotate({:.4} {:.2} {:.2})\">{}</g>",
            rotation.to_degrees(),
            center.x,
            center.y,
            image
        );
    }
}
