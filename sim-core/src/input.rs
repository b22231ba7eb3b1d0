//! Pointer source arbitration between touch and mouse.
//!
//! Event handlers call the `mouse_*`/`touch_*` methods between frames; the
//! frame loop reads [`PointerArbiter::active_position`] once per frame.

use glam::Vec2;

/// Which device currently drives the pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerSource {
    Touch,
    Mouse,
}

/// Pan/zoom intent derived from touch gestures.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
    Pan(Vec2),
    Pinch { target_scale: f32 },
}

#[derive(Clone, Copy, Debug)]
struct Pinch {
    start_distance: f32,
    start_scale: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PointerArbiter {
    mouse: Option<Vec2>,
    mouse_over: bool,
    ignore_mouse: bool,
    touches: Vec<Vec2>,
    last_touch: Option<Vec2>,
    pinch: Option<Pinch>,
}

impl PointerArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mouse_entered(&mut self) {
        self.mouse_over = true;
    }

    pub fn mouse_left(&mut self) {
        self.mouse_over = false;
    }

    /// Records a mouse move in screen space.
    ///
    /// The first move after the last touch ends is the browser's emulated
    /// ghost event: it is swallowed and re-arms the mouse for the next one.
    pub fn mouse_moved(&mut self, pos: Vec2) {
        if self.ignore_mouse {
            self.ignore_mouse = false;
            return;
        }
        self.mouse = Some(pos);
    }

    /// Starts or extends a touch set. `current_scale` seeds pinch zoom and
    /// should be the view's target scale, so a pinch never undoes a zoom
    /// that is still easing in.
    pub fn touch_started(&mut self, touches: &[Vec2], current_scale: f32) {
        self.ignore_mouse = false;
        self.touches = touches.to_vec();
        match self.touches.as_slice() {
            [one] => self.last_touch = Some(*one),
            [a, b, ..] => {
                self.pinch = Some(Pinch {
                    start_distance: a.distance(*b),
                    start_scale: current_scale,
                });
            }
            [] => {}
        }
    }

    /// Updates active touches and reports the gesture they form, if any.
    pub fn touch_moved(&mut self, touches: &[Vec2]) -> Option<Gesture> {
        self.touches = touches.to_vec();
        match self.touches.as_slice() {
            [one] => {
                self.ignore_mouse = false;
                let delta = self.last_touch.map(|last| *one - last);
                self.last_touch = Some(*one);
                delta.map(Gesture::Pan)
            }
            [a, b, ..] => {
                let pinch = self.pinch?;
                if pinch.start_distance <= 0.0 {
                    return None;
                }
                let ratio = a.distance(*b) / pinch.start_distance;
                Some(Gesture::Pinch {
                    target_scale: pinch.start_scale * ratio,
                })
            }
            [] => None,
        }
    }

    /// Records the remaining touches after one or more fingers lift.
    pub fn touch_ended(&mut self, remaining: &[Vec2]) {
        self.touches = remaining.to_vec();
        if self.touches.len() < 2 {
            self.pinch = None;
        }
        if self.touches.is_empty() {
            self.mouse = None;
            self.last_touch = None;
            self.ignore_mouse = true;
        }
    }

    pub fn touch_cancelled(&mut self) {
        self.touches.clear();
        self.pinch = None;
        self.last_touch = None;
        self.mouse = None;
    }

    /// The device currently owning the pointer, if any.
    pub fn source(&self) -> Option<PointerSource> {
        if !self.touches.is_empty() {
            Some(PointerSource::Touch)
        } else if self.mouse.is_some() && !self.ignore_mouse {
            Some(PointerSource::Mouse)
        } else {
            None
        }
    }

    /// Screen position of the active pointer, or `None` when the pointer
    /// must not influence particles this frame.
    ///
    /// ### Parameters
    /// - `viewport` - Canvas size; positions on or outside its edges are inactive.
    pub fn active_position(&self, viewport: Vec2) -> Option<Vec2> {
        let pos = match self.source()? {
            PointerSource::Touch => *self.touches.first()?,
            PointerSource::Mouse => {
                if !self.mouse_over {
                    return None;
                }
                self.mouse?
            }
        };

        let inside = pos.x > 0.0 && pos.x < viewport.x && pos.y > 0.0 && pos.y < viewport.y;
        inside.then_some(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);

    #[test]
    fn mouse_needs_hover_and_bounds() {
        let mut input = PointerArbiter::new();
        input.mouse_moved(Vec2::new(100.0, 100.0));
        assert_eq!(input.active_position(VIEWPORT), None);

        input.mouse_entered();
        assert_eq!(input.active_position(VIEWPORT), Some(Vec2::new(100.0, 100.0)));

        input.mouse_moved(Vec2::new(900.0, 100.0));
        assert_eq!(input.active_position(VIEWPORT), None);

        input.mouse_moved(Vec2::new(100.0, 100.0));
        input.mouse_left();
        assert_eq!(input.active_position(VIEWPORT), None);
    }

    #[test]
    fn touch_wins_over_mouse() {
        let mut input = PointerArbiter::new();
        input.mouse_entered();
        input.mouse_moved(Vec2::new(10.0, 10.0));
        input.touch_started(&[Vec2::new(300.0, 200.0)], 1.0);

        assert_eq!(input.source(), Some(PointerSource::Touch));
        assert_eq!(input.active_position(VIEWPORT), Some(Vec2::new(300.0, 200.0)));
    }

    #[test]
    fn ghost_mouse_after_touch_is_ignored_once() {
        let mut input = PointerArbiter::new();
        input.mouse_entered();
        input.touch_started(&[Vec2::new(300.0, 200.0)], 1.0);
        input.touch_ended(&[]);

        assert_eq!(input.source(), None);

        // Emulated mouse event at the lifted finger.
        input.mouse_moved(Vec2::new(300.0, 200.0));
        assert_eq!(input.active_position(VIEWPORT), None);

        // A genuine move afterwards is live again.
        input.mouse_moved(Vec2::new(310.0, 205.0));
        assert_eq!(input.active_position(VIEWPORT), Some(Vec2::new(310.0, 205.0)));
    }

    #[test]
    fn single_touch_drag_pans() {
        let mut input = PointerArbiter::new();
        input.touch_started(&[Vec2::new(100.0, 100.0)], 1.0);
        let gesture = input.touch_moved(&[Vec2::new(110.0, 95.0)]);
        assert_eq!(gesture, Some(Gesture::Pan(Vec2::new(10.0, -5.0))));
    }

    #[test]
    fn pinch_scales_from_start() {
        let mut input = PointerArbiter::new();
        input.touch_started(&[Vec2::new(100.0, 100.0), Vec2::new(200.0, 100.0)], 1.5);
        let gesture = input.touch_moved(&[Vec2::new(100.0, 100.0), Vec2::new(300.0, 100.0)]);
        assert_eq!(gesture, Some(Gesture::Pinch { target_scale: 3.0 }));

        input.touch_ended(&[Vec2::new(100.0, 100.0)]);
        assert_eq!(input.touch_moved(&[Vec2::new(100.0, 100.0), Vec2::new(300.0, 100.0)]), None);
    }

    #[test]
    fn cancel_clears_everything() {
        let mut input = PointerArbiter::new();
        input.mouse_entered();
        input.touch_started(&[Vec2::new(100.0, 100.0)], 1.0);
        input.touch_cancelled();
        assert_eq!(input.active_position(VIEWPORT), None);
    }
}
