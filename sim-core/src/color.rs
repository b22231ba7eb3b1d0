//! Particle coloring in HSB space.

/// 8-bit sRGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };

    /// Converts hue (degrees), saturation and brightness (both 0..=100).
    pub fn from_hsb(hue: f32, saturation: f32, brightness: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let s = (saturation / 100.0).clamp(0.0, 1.0);
        let v = (brightness / 100.0).clamp(0.0, 1.0);

        let chroma = v * s;
        let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
        let m = v - chroma;

        let (r, g, b) = match h as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };

        let level = |c: f32| ((c + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self {
            r: level(r),
            g: level(g),
            b: level(b),
        }
    }

    /// `#rrggbb`, lowercase.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Color of a particle under the current hue setting.
///
/// `hue <= 0` is multicolor mode: each particle shows its own random hue.
/// Otherwise the field is tinted around `hue`, with the particle's own hue
/// offset compressed to a sixth for slight variation.
pub fn particle_color(hue_offset: f32, hue: f32) -> Rgb {
    if hue <= 0.0 {
        Rgb::from_hsb(hue_offset.rem_euclid(360.0), 70.0, 90.0)
    } else {
        Rgb::from_hsb((hue + hue_offset / 6.0).rem_euclid(360.0), 80.0, 90.0)
    }
}
