//! egui implementation of [`ShapeRenderer`].

use egui::{Color32, Pos2, Shape, Stroke};
use glam::Vec2;
use sim_core::{
    color::Rgb,
    shape::{Paint, ShapeDraw, ShapeKind, ShapeRenderer},
    view::ViewTransform,
};
use std::f32::consts::FRAC_PI_2;

/// Segments used per rounded square corner.
const CORNER_SEGMENTS: usize = 4;

fn color32(rgb: Rgb) -> Color32 {
    Color32::from_rgb(rgb.r, rgb.g, rgb.b)
}

/// Outline of a square of side `size` centered on the origin, with corners
/// rounded by `radius` (clamped to half the side).
pub fn rounded_square(size: f32, radius: f32) -> Vec<Vec2> {
    let half = size / 2.0;
    let r = radius.clamp(0.0, half);
    if r <= f32::EPSILON {
        return vec![
            Vec2::new(-half, -half),
            Vec2::new(half, -half),
            Vec2::new(half, half),
            Vec2::new(-half, half),
        ];
    }

    let inner = half - r;
    // Corner centers in clockwise order starting top-right (y down).
    let corners = [
        (Vec2::new(inner, -inner), -FRAC_PI_2),
        (Vec2::new(inner, inner), 0.0),
        (Vec2::new(-inner, inner), FRAC_PI_2),
        (Vec2::new(-inner, -inner), std::f32::consts::PI),
    ];

    let mut out = Vec::with_capacity(4 * (CORNER_SEGMENTS + 1));
    for (center, start) in corners {
        for i in 0..=CORNER_SEGMENTS {
            let a = start + FRAC_PI_2 * i as f32 / CORNER_SEGMENTS as f32;
            out.push(center + Vec2::from_angle(a) * r);
        }
    }
    out
}

/// Screen-space outline of a non-circle shape.
///
/// ### Returns
/// `None` for circles, which are drawn natively.
pub fn screen_outline(shape: &ShapeDraw, view: &ViewTransform) -> Option<Vec<Vec2>> {
    let local = match shape.kind {
        ShapeKind::Circle => return None,
        ShapeKind::Square => rounded_square(shape.size, shape.corner_radius),
        ShapeKind::Triangle | ShapeKind::Pentagon | ShapeKind::Hexagon => shape.local_vertices()?,
    };

    let rot = Vec2::from_angle(shape.rotation);
    Some(
        local
            .into_iter()
            .map(|v| view.to_screen(shape.center + rot.rotate(v)))
            .collect(),
    )
}

/// Draws world-space shapes through a [`ViewTransform`] into an egui painter.
///
/// `origin` is the canvas top-left in egui coordinates.
pub struct EguiRenderer<'a> {
    pub painter: &'a egui::Painter,
    pub view: &'a ViewTransform,
    pub origin: Pos2,
}

impl EguiRenderer<'_> {
    fn to_pos(&self, v: Vec2) -> Pos2 {
        self.origin + egui::vec2(v.x, v.y)
    }
}

impl ShapeRenderer for EguiRenderer<'_> {
    fn draw_shape(&mut self, shape: &ShapeDraw) {
        let scale = self.view.scale();
        let (fill, stroke) = match shape.paint {
            Paint::Fill(rgb) => (color32(rgb), Stroke::NONE),
            Paint::Stroke { color, width } => {
                (Color32::TRANSPARENT, Stroke::new(width * scale, color32(color)))
            }
        };

        let Some(outline) = screen_outline(shape, self.view) else {
            let center = self.to_pos(self.view.to_screen(shape.center));
            let radius = shape.size / 2.0 * scale;
            self.painter.circle(center, radius, fill, stroke);
            return;
        };

        let points: Vec<Pos2> = outline.into_iter().map(|v| self.to_pos(v)).collect();
        match shape.paint {
            Paint::Fill(_) => self.painter.add(Shape::convex_polygon(points, fill, Stroke::NONE)),
            Paint::Stroke { .. } => self.painter.add(Shape::closed_line(points, stroke)),
        };
    }
}
