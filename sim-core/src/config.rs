//! Simulation parameters and tuning constants.
//!
//! [`SimParams`] is the single configuration snapshot read by every
//! per-frame update. UI code never writes it directly; it queues
//! [`ParamChange`] values that [`crate::simulator::FieldSimulator`] applies
//! between frames.

/// Edge length of a spatial grid cell, in world pixels.
pub const CELL_SIZE: f32 = 50.0;

/// Hardware texture ceiling for the glyph coverage buffer.
pub const MAX_TEXTURE_SIZE: u32 = 4096;

/// Width (px) of the right-hand UI panel the glyph layout keeps clear of.
pub const UI_RIGHT_MARGIN: f32 = 340.0;

/// Fallback frame delta (seconds) used when the host reports none.
pub const NOMINAL_FRAME_DELTA: f32 = 0.01666;

/// Side of the near-origin box whose particles are parked off-screen.
pub const KILL_BOX: f32 = 100.0;

/// Side of the near-origin box whose samples are rejected at sampling time.
pub const SAMPLE_REJECT_BOX: f32 = 150.0;

/// Where parked particles are moved to.
pub const PARKED_POSITION: f32 = -9999.0;

/// Viewport width below which the mobile particle cap applies.
pub const MOBILE_BREAKPOINT: f32 = 768.0;

/// Sign of the pointer force.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ForceSign {
    #[default]
    Repel,
    Attract,
}

impl ForceSign {
    pub fn as_f32(self) -> f32 {
        match self {
            Self::Repel => 1.0,
            Self::Attract => -1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Self::Repel => Self::Attract,
            Self::Attract => Self::Repel,
        }
    }
}

/// User-facing simulation parameters.
///
/// ### Fields
/// - `zoom` - Scales glyph size and every distance/force constant.
/// - `size` - Base drawn particle size in pixels.
/// - `radius` - Corner rounding of square particles.
/// - `gravity` - Downward bias, sag and damping strength (0..2).
/// - `reaction` - Pointer range and force strength (0..1).
/// - `hue` - `<= 0` selects multicolor mode, otherwise the target hue in degrees.
/// - `force_sign` - Whether the pointer pushes or pulls.
/// - `gap` - Sampling sparsity; a larger gap gives fewer particles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimParams {
    pub zoom: f32,
    pub size: f32,
    pub radius: f32,
    pub gravity: f32,
    pub reaction: f32,
    pub hue: f32,
    pub force_sign: ForceSign,
    pub gap: f32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            size: 6.0,
            radius: 0.0,
            gravity: 0.0,
            reaction: 0.5,
            hue: 0.0,
            force_sign: ForceSign::Repel,
            gap: 2.0,
        }
    }
}

/// A single parameter edit queued by the UI.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamChange {
    Zoom(f32),
    Size(f32),
    Radius(f32),
    Gravity(f32),
    Reaction(f32),
    Hue(f32),
    ForceSign(ForceSign),
    Gap(f32),
}

impl ParamChange {
    /// Whether applying this change requires re-sampling the glyph.
    pub fn regenerates(&self) -> bool {
        matches!(self, Self::Zoom(_) | Self::Gap(_) | Self::Hue(_))
    }
}

impl SimParams {
    /// Applies one change. Non-finite values are ignored.
    ///
    /// ### Returns
    /// `true` if the stored value changed.
    pub fn apply(&mut self, change: ParamChange) -> bool {
        let slot = match change {
            ParamChange::ForceSign(sign) => {
                let changed = self.force_sign != sign;
                self.force_sign = sign;
                return changed;
            }
            ParamChange::Zoom(v) => (&mut self.zoom, v),
            ParamChange::Size(v) => (&mut self.size, v),
            ParamChange::Radius(v) => (&mut self.radius, v),
            ParamChange::Gravity(v) => (&mut self.gravity, v),
            ParamChange::Reaction(v) => (&mut self.reaction, v),
            ParamChange::Hue(v) => (&mut self.hue, v),
            ParamChange::Gap(v) => (&mut self.gap, v),
        };

        let (field, value) = slot;
        if !value.is_finite() || *field == value {
            return false;
        }
        *field = value;
        true
    }
}

/// Device performance tier, picked from the viewport width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceTier {
    Mobile,
    Desktop,
}

impl DeviceTier {
    pub fn from_viewport_width(width: f32) -> Self {
        if width < MOBILE_BREAKPOINT {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    /// Hard cap on sampling attempts, and therefore on population size.
    pub fn particle_cap(self) -> usize {
        match self {
            Self::Mobile => 2500,
            Self::Desktop => 10_000,
        }
    }
}

/// Linear remap of `value` from `[in_min, in_max]` to `[out_min, out_max]`, unclamped.
#[inline]
pub fn remap(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    out_min + (value - in_min) / (in_max - in_min) * (out_max - out_min)
}
