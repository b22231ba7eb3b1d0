//! Screen <-> world mapping under pan, drift and zoom.
//!
//! The render transform is `translate(c) · scale(s) · translate(-c) ·
//! translate(pan + drift)` with `c` the viewport center. Rendering and
//! pointer handling both go through [`ViewTransform::to_screen`] and
//! [`ViewTransform::to_world`], so the two can never disagree.

use glam::Vec2;

const MIN_SCALE: f32 = 0.1;
const MAX_SCALE: f32 = 5.0;
const SCALE_SMOOTHING: f32 = 0.1;
const WHEEL_SENSITIVITY: f32 = 0.001;
const DRIFT_AMPLITUDE: f32 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    viewport: Vec2,
    pan: Vec2,
    drift: Vec2,
    scale: f32,
    target_scale: f32,
}

impl ViewTransform {
    pub fn new(viewport: Vec2) -> Self {
        Self {
            viewport,
            pan: Vec2::ZERO,
            drift: Vec2::ZERO,
            scale: 1.0,
            target_scale: 1.0,
        }
    }

    #[inline]
    fn center(&self) -> Vec2 {
        self.viewport * 0.5
    }

    #[inline]
    fn offset(&self) -> Vec2 {
        self.pan + self.drift
    }

    /// Converts a world-space position to screen-space.
    pub fn to_screen(&self, world: Vec2) -> Vec2 {
        let c = self.center();
        (world + self.offset() - c) * self.scale + c
    }

    /// Converts a screen-space position back to world-space.
    ///
    /// Exact inverse of [`ViewTransform::to_screen`] up to rounding.
    pub fn to_world(&self, screen: Vec2) -> Vec2 {
        let c = self.center();
        (screen - c) / self.scale - self.offset() + c
    }

    /// Eases the current scale toward the target scale by one frame.
    pub fn animate(&mut self) {
        self.scale += (self.target_scale - self.scale) * SCALE_SMOOTHING;
    }

    /// Exponential wheel zoom; positive `delta_y` zooms out.
    pub fn zoom_wheel(&mut self, delta_y: f32) {
        self.set_target_scale(self.target_scale * (-delta_y * WHEEL_SENSITIVITY).exp());
    }

    pub fn set_target_scale(&mut self, target: f32) {
        if target.is_finite() {
            self.target_scale = target.clamp(MIN_SCALE, MAX_SCALE);
        }
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        if delta.is_finite() {
            self.pan += delta;
        }
    }

    /// Updates the slow global float from simulated time.
    pub fn set_drift_from_time(&mut self, time: f32) {
        self.drift = Vec2::new((time * 0.5).sin(), (time * 0.3).cos()) * DRIFT_AMPLITUDE;
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        self.viewport = viewport;
    }

    #[inline]
    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    #[inline]
    pub fn target_scale(&self) -> f32 {
        self.target_scale
    }

    #[inline]
    pub fn pan(&self) -> Vec2 {
        self.pan
    }
}
