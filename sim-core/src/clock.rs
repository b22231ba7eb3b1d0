use crate::config::NOMINAL_FRAME_DELTA;

/// Pausable simulated time base.
///
/// Every periodic force reads [`SimClock::time`] (or [`SimClock::frame_time`]),
/// never wall time, so pausing freezes all oscillation identically.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimClock {
    simulated_time: f64,
    paused: bool,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances simulated time by one real frame delta, unless paused.
    ///
    /// A missing, zero, negative or non-finite delta is replaced by
    /// [`NOMINAL_FRAME_DELTA`] so a dropped frame never stalls the field.
    pub fn tick(&mut self, real_dt: Option<f32>) {
        if self.paused {
            return;
        }
        let dt = match real_dt {
            Some(dt) if dt.is_finite() && dt > 0.0 => dt,
            _ => NOMINAL_FRAME_DELTA,
        };
        self.simulated_time += f64::from(dt);
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Simulated seconds since start.
    #[inline]
    pub fn time(&self) -> f32 {
        self.simulated_time as f32
    }

    /// Simulated time expressed in nominal 60 Hz frames.
    #[inline]
    pub fn frame_time(&self) -> f32 {
        (self.simulated_time * 60.0) as f32
    }
}
