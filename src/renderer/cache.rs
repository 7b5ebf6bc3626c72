//! Pre-rendered wheel image
//!
//! Slices, borders and labels are painted once per roster revision into an
//! offscreen image at zero rotation. Animation frames only composite that
//! image with a different rotation.

use std::f32::consts::TAU;

use glam::Vec2;

use super::surface::{Canvas, Color, Surface, TextAlign, TextStyle};
use crate::consts::*;
use crate::error::RenderError;
use crate::polar_to_cartesian;
use crate::roster::{Participant, Roster, palette_color};

const SLICE_BORDER: Color = Color::rgba(255, 255, 255, 0.3);
const OUTER_RING: Color = Color::rgba(255, 255, 255, 0.5);
const HUB_FILL: Color = Color::rgba(255, 255, 255, 0.1);
const EMPTY_FILL: Color = Color::rgb(0x2a, 0x2a, 0x4a);
const EMPTY_RING: Color = Color::rgb(0x66, 0x7e, 0xea);

/// Wheel layout within a square view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelGeometry {
    pub size: f32,
}

impl WheelGeometry {
    pub fn new(size: f32) -> Self {
        Self { size }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::splat(self.size / 2.0)
    }

    pub fn radius(&self) -> f32 {
        (self.size / 2.0 - RIM_MARGIN).max(1.0)
    }
}

/// Label font size by segment-count band
pub fn font_size_for(segment_count: usize) -> f32 {
    match segment_count {
        0..=30 => 18.0,
        31..=60 => 15.0,
        61..=100 => 12.0,
        _ => 11.0,
    }
}

/// Cut to the character budget, then shorten until it fits `max_width`
pub fn fit_label(canvas: &dyn Canvas, name: &str, style: &TextStyle, max_width: f32) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= LABEL_MAX_CHARS && canvas.measure_text(name, style) <= max_width {
        return name.to_string();
    }

    let mut keep = chars.len().min(LABEL_MAX_CHARS - 2);
    loop {
        let label: String = chars[..keep].iter().collect::<String>() + "...";
        if keep <= 1 || canvas.measure_text(&label, style) <= max_width {
            return label;
        }
        keep -= 1;
    }
}

fn slice_color(participant: &Participant, index: usize) -> Color {
    Color::from_hex(&participant.color)
        .or_else(|| Color::from_hex(palette_color(index)))
        .unwrap_or(Color::WHITE)
}

/// Paint the unrotated wheel for `participants`
pub fn paint_wheel(canvas: &mut dyn Canvas, participants: &[Participant], geometry: &WheelGeometry) {
    let center = geometry.center();
    let radius = geometry.radius();
    let count = participants.len();
    if count == 0 {
        return;
    }

    let slice = TAU / count as f32;
    let font_px = font_size_for(count);
    let hub_radius = radius * HUB_RATIO;
    // Radial room between the hub and the label inset, capped by the slice's arc
    let max_label_width = (radius * slice * 0.9)
        .max(30.0)
        .min(radius - LABEL_RIM_INSET - hub_radius);

    for (i, participant) in participants.iter().enumerate() {
        let start = i as f32 * slice;
        let end = start + slice;
        let color = slice_color(participant, i);

        canvas.fill_wedge(center, radius, start, end, color);
        canvas.stroke_wedge(center, radius, start, end, SLICE_BORDER, 2.0);

        if slice > LABEL_MIN_SLICE {
            let bisector = start + slice / 2.0;
            let style = TextStyle {
                font_px,
                color: color.contrast(),
                align: TextAlign::Right,
                bold: true,
            };
            let label = fit_label(canvas, &participant.name, &style, max_label_width);
            let anchor = polar_to_cartesian(center, radius - LABEL_RIM_INSET, bisector);
            canvas.fill_text(&label, anchor, bisector, &style);
        }
    }

    canvas.stroke_circle(center, radius, OUTER_RING, 4.0);

    canvas.fill_circle(center, hub_radius, HUB_FILL);
    canvas.stroke_circle(center, hub_radius, SLICE_BORDER, 2.0);
    canvas.fill_circle(center, CENTER_DOT_RADIUS, Color::WHITE);
}

/// Empty wheel with a hint, drawn straight onto the surface
pub fn paint_placeholder(canvas: &mut dyn Canvas, geometry: &WheelGeometry) {
    let center = geometry.center();
    canvas.fill_circle(center, geometry.radius(), EMPTY_FILL);
    canvas.stroke_circle(center, geometry.radius(), EMPTY_RING, 3.0);
    let style = TextStyle {
        font_px: 20.0,
        color: Color::WHITE,
        align: TextAlign::Center,
        bold: true,
    };
    canvas.fill_text("Add participants", center, 0.0, &style);
}

/// The cached wheel image plus its validity
pub struct RenderCache<I> {
    image: Option<I>,
    built_for: Option<u64>,
    stale: bool,
    rebuilds: u64,
}

impl<I> Default for RenderCache<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> RenderCache<I> {
    pub fn new() -> Self {
        Self {
            image: None,
            built_for: None,
            stale: true,
            rebuilds: 0,
        }
    }

    /// Stale if explicitly invalidated or never built
    pub fn is_stale(&self) -> bool {
        self.stale || self.image.is_none()
    }

    /// Stale for a roster at `revision`
    pub fn is_stale_for(&self, revision: u64) -> bool {
        self.is_stale() || self.built_for != Some(revision)
    }

    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Number of rebuilds so far
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Repaint the image for `roster`
    pub fn rebuild<S>(
        &mut self,
        surface: &mut S,
        roster: &Roster,
        geometry: &WheelGeometry,
    ) -> Result<&I, RenderError>
    where
        S: Surface<Image = I>,
    {
        let participants = roster.participants();
        let size = Vec2::splat(geometry.size);
        let image = surface.render_offscreen(size, &mut |canvas: &mut dyn Canvas| {
            paint_wheel(canvas, participants, geometry);
        })?;

        self.rebuilds += 1;
        self.built_for = Some(roster.revision());
        self.stale = false;
        log::debug!(
            "Wheel cache rebuilt for {} segments (revision {})",
            participants.len(),
            roster.revision()
        );
        Ok(self.image.insert(image))
    }

    /// Current image, rebuilding first if the roster moved on
    pub fn ensure<S>(
        &mut self,
        surface: &mut S,
        roster: &Roster,
        geometry: &WheelGeometry,
    ) -> Result<&I, RenderError>
    where
        S: Surface<Image = I>,
    {
        if self.is_stale_for(roster.revision()) {
            return self.rebuild(surface, roster, geometry);
        }
        self.image.as_ref().ok_or(RenderError::SurfaceUnavailable)
    }
}

/// Owns the optional surface and its cache
pub struct WheelRenderer<S: Surface> {
    surface: Option<S>,
    cache: RenderCache<S::Image>,
    geometry: WheelGeometry,
    warned: bool,
}

impl<S: Surface> WheelRenderer<S> {
    /// `None` degrades every draw to a no-op
    pub fn new(surface: Option<S>, view_size: f32) -> Self {
        if surface.is_none() {
            log::warn!("No drawing surface available - wheel will not be drawn");
        }
        Self {
            surface,
            cache: RenderCache::new(),
            geometry: WheelGeometry::new(view_size),
            warned: false,
        }
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn cache(&self) -> &RenderCache<S::Image> {
        &self.cache
    }

    pub fn geometry(&self) -> &WheelGeometry {
        &self.geometry
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    /// Draw `roster` rotated by `rotation` radians. Returns false when nothing was drawn.
    pub fn draw(&mut self, roster: &Roster, rotation: f64) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            if !self.warned {
                log::warn!("Skipping draw: no drawing surface");
                self.warned = true;
            }
            return false;
        };

        surface.clear();
        if roster.is_empty() {
            paint_placeholder(surface, &self.geometry);
            return true;
        }

        match self.cache.ensure(surface, roster, &self.geometry) {
            Ok(image) => {
                // Accumulated rotation is unbounded; f32 only sees the part within one turn
                let within_turn = (rotation % std::f64::consts::TAU) as f32;
                surface.draw_image(image, self.geometry.center(), within_turn);
                true
            }
            Err(e) => {
                if !self.warned {
                    log::warn!("Skipping draw: {}", e);
                    self.warned = true;
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Wedge(Color),
        Stroke,
        Circle,
        Text(String, f32),
        Clear,
        Image(f32),
    }

    /// Records operations; text is 10px per char
    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
    }

    impl Canvas for Recorder {
        fn fill_wedge(&mut self, _: Vec2, _: f32, _: f32, _: f32, color: Color) {
            self.ops.push(Op::Wedge(color));
        }
        fn stroke_wedge(&mut self, _: Vec2, _: f32, _: f32, _: f32, _: Color, _: f32) {
            self.ops.push(Op::Stroke);
        }
        fn fill_circle(&mut self, _: Vec2, _: f32, _: Color) {
            self.ops.push(Op::Circle);
        }
        fn stroke_circle(&mut self, _: Vec2, _: f32, _: Color, _: f32) {
            self.ops.push(Op::Circle);
        }
        fn fill_text(&mut self, text: &str, _: Vec2, _: f32, style: &TextStyle) {
            self.ops.push(Op::Text(text.to_string(), style.font_px));
        }
        fn measure_text(&self, text: &str, _: &TextStyle) -> f32 {
            text.chars().count() as f32 * 10.0
        }
    }

    impl Surface for Recorder {
        type Image = Vec<Op>;

        fn clear(&mut self) {
            self.ops.push(Op::Clear);
        }
        fn render_offscreen(
            &mut self,
            _: Vec2,
            paint: &mut dyn FnMut(&mut dyn Canvas),
        ) -> Result<Vec<Op>, RenderError> {
            let mut layer = Recorder::default();
            paint(&mut layer);
            Ok(layer.ops)
        }
        fn draw_image(&mut self, _: &Vec<Op>, _: Vec2, rotation: f32) {
            self.ops.push(Op::Image(rotation));
        }
    }

    fn roster(names: &[&str]) -> Roster {
        let mut r = Roster::with_rng(Pcg32::seed_from_u64(3));
        if !names.is_empty() {
            r.add_bulk(names.iter().copied()).unwrap();
        }
        r
    }

    fn style() -> TextStyle {
        TextStyle {
            font_px: 14.0,
            color: Color::WHITE,
            align: TextAlign::Right,
            bold: true,
        }
    }

    #[test]
    fn test_font_bands() {
        assert_eq!(font_size_for(2), 18.0);
        assert_eq!(font_size_for(30), 18.0);
        assert_eq!(font_size_for(31), 15.0);
        assert_eq!(font_size_for(100), 12.0);
        assert_eq!(font_size_for(101), 11.0);
    }

    #[test]
    fn test_fit_label_truncates_long_names() {
        let canvas = Recorder::default();
        assert_eq!(fit_label(&canvas, "Short", &style(), 500.0), "Short");
        assert_eq!(
            fit_label(&canvas, "Bartholomew Jones", &style(), 500.0),
            "Bartholome..."
        );
        // 8 chars max at 10px each
        assert_eq!(fit_label(&canvas, "Christina", &style(), 80.0), "Chris...");
    }

    #[test]
    fn test_paint_wheel_layers() {
        let r = roster(&["a", "b", "c"]);
        let mut canvas = Recorder::default();
        paint_wheel(&mut canvas, r.participants(), &WheelGeometry::new(VIEW_SIZE));

        let wedges = canvas.ops.iter().filter(|op| matches!(op, Op::Wedge(_))).count();
        let labels: Vec<_> = canvas
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Text(t, px) => Some((t.clone(), *px)),
                _ => None,
            })
            .collect();
        assert_eq!(wedges, 3);
        assert_eq!(
            labels,
            [
                ("a".to_string(), 18.0),
                ("b".to_string(), 18.0),
                ("c".to_string(), 18.0)
            ]
        );
        // ring, hub fill, hub stroke, center dot
        let tail: Vec<_> = canvas.ops.iter().rev().take(4).cloned().collect();
        assert!(tail.iter().all(|op| *op == Op::Circle));
    }

    #[test]
    fn test_narrow_slices_skip_labels() {
        let names: Vec<String> = (0..40).map(|i| format!("p{i}")).collect();
        let r = roster(&names.iter().map(String::as_str).collect::<Vec<_>>());
        let mut canvas = Recorder::default();
        paint_wheel(&mut canvas, r.participants(), &WheelGeometry::new(VIEW_SIZE));
        // 2π/40 ≈ 0.157 rad, below the label threshold
        assert!(!canvas.ops.iter().any(|op| matches!(op, Op::Text(..))));
    }

    #[test]
    fn test_cache_rebuilds_once_per_mutation() {
        let mut r = roster(&["a", "b"]);
        let mut renderer = WheelRenderer::new(Some(Recorder::default()), VIEW_SIZE);

        assert!(renderer.draw(&r, 0.0));
        assert_eq!(renderer.cache().rebuilds(), 1);

        for frame in 1..10 {
            renderer.draw(&r, frame as f64 * 0.1);
        }
        assert_eq!(renderer.cache().rebuilds(), 1);

        r.add("c").unwrap();
        assert!(renderer.cache().is_stale_for(r.revision()));
        renderer.draw(&r, 1.0);
        assert_eq!(renderer.cache().rebuilds(), 2);
        renderer.draw(&r, 1.1);
        assert_eq!(renderer.cache().rebuilds(), 2);

        renderer.invalidate();
        assert!(renderer.cache().is_stale());
        renderer.draw(&r, 1.2);
        assert_eq!(renderer.cache().rebuilds(), 3);
    }

    #[test]
    fn test_frames_composite_rotation() {
        let r = roster(&["a", "b"]);
        let mut renderer = WheelRenderer::new(Some(Recorder::default()), VIEW_SIZE);
        renderer.draw(&r, 0.5);
        let ops = &renderer.surface().unwrap().ops;
        assert_eq!(ops.as_slice(), [Op::Clear, Op::Image(0.5)]);
    }

    #[test]
    fn test_long_run_rotation_stays_precise() {
        let r = roster(&["a", "b"]);
        let mut renderer = WheelRenderer::new(Some(Recorder::default()), VIEW_SIZE);
        // A thousand 8-turn spins plus a quarter turn
        let rotation = 8000.0 * std::f64::consts::TAU + std::f64::consts::FRAC_PI_2;
        renderer.draw(&r, rotation);
        let ops = &renderer.surface().unwrap().ops;
        let Some(Op::Image(drawn)) = ops.last() else {
            panic!("no composite in {:?}", ops);
        };
        assert!((drawn - std::f32::consts::FRAC_PI_2).abs() < 1e-4, "drawn {}", drawn);
    }

    #[test]
    fn test_empty_roster_draws_placeholder() {
        let r = roster(&[]);
        let mut renderer = WheelRenderer::new(Some(Recorder::default()), VIEW_SIZE);
        assert!(renderer.draw(&r, 0.0));
        assert_eq!(renderer.cache().rebuilds(), 0);
        let ops = &renderer.surface().unwrap().ops;
        assert!(ops.contains(&Op::Text("Add participants".into(), 20.0)));
    }

    #[test]
    fn test_missing_surface_is_noop() {
        let r = roster(&["a", "b"]);
        let mut renderer: WheelRenderer<Recorder> = WheelRenderer::new(None, VIEW_SIZE);
        assert!(!renderer.draw(&r, 0.0));
        assert!(!renderer.draw(&r, 0.1));
        assert_eq!(renderer.cache().rebuilds(), 0);
    }
}
