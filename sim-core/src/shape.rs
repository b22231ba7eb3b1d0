//! Renderer-neutral description of one particle's on-screen primitive.
//!
//! The live painter and the SVG exporter both consume [`ShapeDraw`]
//! records produced by the simulator, so they share one rule set for
//! geometry, color and fill-vs-stroke.

use crate::{color::Rgb, view::ViewTransform};
use glam::Vec2;
use std::f32::consts::TAU;

/// Outline of a particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Circle,
    Square,
    Triangle,
    Pentagon,
    Hexagon,
}

impl ShapeKind {
    pub const ALL: [Self; 5] = [
        Self::Circle,
        Self::Square,
        Self::Triangle,
        Self::Pentagon,
        Self::Hexagon,
    ];

    /// Side count for the regular polygon kinds.
    pub fn polygon_sides(self) -> Option<usize> {
        match self {
            Self::Triangle => Some(3),
            Self::Pentagon => Some(5),
            Self::Hexagon => Some(6),
            Self::Circle | Self::Square => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderStyle {
    Fill,
    Stroke,
}

/// How a primitive is painted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Paint {
    Fill(Rgb),
    Stroke { color: Rgb, width: f32 },
}

impl Paint {
    pub fn color(&self) -> Rgb {
        match *self {
            Self::Fill(color) | Self::Stroke { color, .. } => color,
        }
    }
}

/// One particle primitive in world space.
///
/// ### Fields
/// - `kind` - Outline.
/// - `center` - World position.
/// - `rotation` - Radians, applied about `center`.
/// - `size` - Circle diameter / square side; polygons use `size * 0.6` as circumradius.
/// - `corner_radius` - Square corner rounding.
/// - `paint` - Fill or stroke color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeDraw {
    pub kind: ShapeKind,
    pub center: Vec2,
    pub rotation: f32,
    pub size: f32,
    pub corner_radius: f32,
    pub paint: Paint,
}

impl ShapeDraw {
    /// Circumradius of polygon kinds.
    #[inline]
    pub fn polygon_radius(&self) -> f32 {
        self.size * 0.6
    }

    /// Unrotated local vertices for polygon kinds, starting at angle 0.
    pub fn local_vertices(&self) -> Option<Vec<Vec2>> {
        let sides = self.kind.polygon_sides()?;
        Some(regular_polygon(sides, self.polygon_radius()))
    }

    /// The same primitive as it appears on screen under `view`.
    ///
    /// Position goes through [`ViewTransform::to_screen`]; every length is
    /// multiplied by the current zoom.
    pub fn projected(&self, view: &ViewTransform) -> Self {
        let scale = view.scale();
        let paint = match self.paint {
            Paint::Fill(color) => Paint::Fill(color),
            Paint::Stroke { color, width } => Paint::Stroke {
                color,
                width: width * scale,
            },
        };
        Self {
            center: view.to_screen(self.center),
            size: self.size * scale,
            corner_radius: self.corner_radius * scale,
            paint,
            ..*self
        }
    }
}

/// Vertices of a regular `n`-gon of circumradius `radius` centered on the origin.
pub fn regular_polygon(sides: usize, radius: f32) -> Vec<Vec2> {
    let step = TAU / sides as f32;
    (0..sides)
        .map(|i| Vec2::from_angle(i as f32 * step) * radius)
        .collect()
}

/// Drawing collaborator for the live frame.
///
/// Implementations receive world-space records and apply their own view
/// transform.
pub trait ShapeRenderer {
    fn draw_shape(&mut self, shape: &ShapeDraw);
}

/// Collects every record; used for snapshots and tests.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub shapes: Vec<ShapeDraw>,
}

impl ShapeRenderer for RecordingRenderer {
    fn draw_shape(&mut self, shape: &ShapeDraw) {
        self.shapes.push(*shape);
    }
}
