//! HTML canvas surface
//!
//! Offscreen images are detached `<canvas>` elements sized for the device
//! pixel ratio; compositing draws one rotated about the wheel center.

use glam::Vec2;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::error::RenderError;
use crate::renderer::{Canvas, Color, Surface, TextAlign, TextStyle};

fn backend(e: wasm_bindgen::JsValue) -> RenderError {
    RenderError::Backend(format!("{:?}", e))
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, RenderError> {
    canvas
        .get_context("2d")
        .map_err(backend)?
        .ok_or(RenderError::SurfaceUnavailable)?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| RenderError::SurfaceUnavailable)
}

/// Size `canvas` for `logical` px at `dpr` and return a context in logical units
fn prepare(canvas: &HtmlCanvasElement, logical: Vec2, dpr: f64) -> Result<CanvasRenderingContext2d, RenderError> {
    canvas.set_width((logical.x as f64 * dpr) as u32);
    canvas.set_height((logical.y as f64 * dpr) as u32);
    let ctx = context_2d(canvas)?;
    ctx.scale(dpr, dpr).map_err(backend)?;
    Ok(ctx)
}

/// Canvas primitives over a 2D context
struct Context2d(CanvasRenderingContext2d);

impl Context2d {
    fn wedge_path(&self, center: Vec2, radius: f32, start: f32, end: f32) {
        let ctx = &self.0;
        ctx.begin_path();
        ctx.move_to(center.x as f64, center.y as f64);
        let _ = ctx.arc(center.x as f64, center.y as f64, radius as f64, start as f64, end as f64);
        ctx.close_path();
    }

    fn circle_path(&self, center: Vec2, radius: f32) {
        let ctx = &self.0;
        ctx.begin_path();
        let _ = ctx.arc(
            center.x as f64,
            center.y as f64,
            radius as f64,
            0.0,
            std::f64::consts::TAU,
        );
    }

    fn apply_font(&self, style: &TextStyle) {
        let weight = if style.bold { "bold" } else { "normal" };
        self.0
            .set_font(&format!("{} {}px Montserrat, sans-serif", weight, style.font_px));
    }
}

impl Canvas for Context2d {
    fn fill_wedge(&mut self, center: Vec2, radius: f32, start: f32, end: f32, color: Color) {
        self.wedge_path(center, radius, start, end);
        self.0.set_fill_style_str(&color.to_css());
        self.0.fill();
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
        self.wedge_path(center, radius, start, end);
        self.0.set_stroke_style_str(&color.to_css());
        self.0.set_line_width(width as f64);
        self.0.stroke();
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.circle_path(center, radius);
        self.0.set_fill_style_str(&color.to_css());
        self.0.fill();
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, color: Color, width: f32) {
        self.circle_path(center, radius);
        self.0.set_stroke_style_str(&color.to_css());
        self.0.set_line_width(width as f64);
        self.0.stroke();
    }

    fn fill_text(&mut self, text: &str, anchor: Vec2, angle: f32, style: &TextStyle) {
        let ctx = &self.0;
        ctx.save();
        let _ = ctx.translate(anchor.x as f64, anchor.y as f64);
        let _ = ctx.rotate(angle as f64);
        self.apply_font(style);
        ctx.set_text_align(match style.align {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        });
        ctx.set_text_baseline("middle");
        ctx.set_fill_style_str(&style.color.to_css());
        let _ = ctx.fill_text(text, 0.0, 0.0);
        ctx.restore();
    }

    fn measure_text(&self, text: &str, style: &TextStyle) -> f32 {
        self.apply_font(style);
        self.0
            .measure_text(text)
            .map(|m| m.width() as f32)
            .unwrap_or(0.0)
    }
}

/// The visible wheel canvas
pub struct WebSurface {
    ctx: Context2d,
    size: Vec2,
    dpr: f64,
}

impl WebSurface {
    /// Take over `canvas` at `logical_size` CSS px
    pub fn new(canvas: &HtmlCanvasElement, logical_size: f32, dpr: f64) -> Result<Self, RenderError> {
        let size = Vec2::splat(logical_size);
        let ctx = prepare(canvas, size, dpr)?;
        log::info!("Canvas surface {}x{} @ {}x", size.x, size.y, dpr);
        Ok(Self {
            ctx: Context2d(ctx),
            size,
            dpr,
        })
    }
}

impl Canvas for WebSurface {
    fn fill_wedge(&mut self, center: Vec2, radius: f32, start: f32, end: f32, color: Color) {
        self.ctx.fill_wedge(center, radius, start, end, color);
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
        self.ctx.stroke_wedge(center, radius, start, end, color, width);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.ctx.fill_circle(center, radius, color);
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, color: Color, width: f32) {
        self.ctx.stroke_circle(center, radius, color, width);
    }

    fn fill_text(&mut self, text: &str, anchor: Vec2, angle: f32, style: &TextStyle) {
        self.ctx.fill_text(text, anchor, angle, style);
    }

    fn measure_text(&self, text: &str, style: &TextStyle) -> f32 {
        self.ctx.measure_text(text, style)
    }
}

impl Surface for WebSurface {
    type Image = HtmlCanvasElement;

    fn clear(&mut self) {
        self.ctx
            .0
            .clear_rect(0.0, 0.0, self.size.x as f64, self.size.y as f64);
    }

    fn render_offscreen(
        &mut self,
        size: Vec2,
        paint: &mut dyn FnMut(&mut dyn Canvas),
    ) -> Result<HtmlCanvasElement, RenderError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or(RenderError::SurfaceUnavailable)?;
        let canvas: HtmlCanvasElement = document
            .create_element("canvas")
            .map_err(backend)?
            .dyn_into()
            .map_err(|_| RenderError::SurfaceUnavailable)?;

        let mut layer = Context2d(prepare(&canvas, size, self.dpr)?);
        paint(&mut layer);
        Ok(canvas)
    }

    fn draw_image(&mut self, image: &HtmlCanvasElement, center: Vec2, rotation: f32) {
        let ctx = &self.ctx.0;
        let w = image.width() as f64 / self.dpr;
        let h = image.height() as f64 / self.dpr;
        ctx.save();
        let _ = ctx.translate(center.x as f64, center.y as f64);
        let _ = ctx.rotate(rotation as f64);
        let _ = ctx.draw_image_with_html_canvas_element_and_dw_and_dh(image, -w / 2.0, -h / 2.0, w, h);
        ctx.restore();
    }
}
