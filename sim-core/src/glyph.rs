//! Glyph-to-point sampling.
//!
//! A character is rendered into an off-screen alpha plane by a
//! [`GlyphRasterizer`] and then rejection-sampled into world-space home
//! anchors for the particle population.

use crate::config::{DeviceTier, MAX_TEXTURE_SIZE, SAMPLE_REJECT_BOX};
use glam::Vec2;
use rand::Rng;
use thiserror::Error;

/// Coverage above this value counts as "inside" the glyph.
const ALPHA_THRESHOLD: u8 = 128;
const BUFFER_MARGIN: f32 = 1.5;
const BASELINE_LIFT: f32 = 0.15;
const JITTER: f32 = 2.0;
const OUTLIER_FRACTION: f32 = 0.8;

/// Font size used to measure a glyph before fitting it to the viewport.
pub const PROBE_FONT_PX: f32 = 100.0;

/// Text metrics for one glyph at a given font size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphMetrics {
    pub advance_width: f32,
}

/// One rasterization job.
///
/// ### Fields
/// - `ch` - Glyph to draw.
/// - `font_px` - Font size in pixels.
/// - `width`, `height` - Output plane size.
/// - `anchor` - Buffer point the glyph's visual center is placed on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphRasterRequest {
    pub ch: char,
    pub font_px: f32,
    pub width: u32,
    pub height: u32,
    pub anchor: Vec2,
}

/// Row-major 8-bit alpha plane.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverageBuffer {
    pub width: u32,
    pub height: u32,
    pub alpha: Vec<u8>,
}

impl CoverageBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alpha: vec![0; width as usize * height as usize],
        }
    }

    /// Alpha at `(x, y)`; out-of-range reads are transparent.
    #[inline]
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.alpha.get(idx).copied().unwrap_or(0)
    }
}

/// Font backend used by the sampler and the layout fitter.
pub trait GlyphRasterizer {
    /// `false` while fonts are still loading.
    fn is_ready(&self) -> bool;

    fn measure(&mut self, ch: char, font_px: f32) -> Option<GlyphMetrics>;

    fn rasterize(&mut self, request: &GlyphRasterRequest) -> Option<CoverageBuffer>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("glyph rasterizer is not ready")]
    NotReady,
    #[error("glyph {0:?} cannot be measured")]
    Unmeasurable(char),
}

/// Where and how large to draw the glyph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphLayout {
    pub font_px: f32,
    pub center: Vec2,
    /// Particle size multiplier derived from `font_px`.
    pub font_scale: f32,
}

impl GlyphLayout {
    /// Fits `ch` into the part of the viewport left of the side panel.
    ///
    /// ### Parameters
    /// - `viewport` - Canvas size in pixels.
    /// - `ch` - Glyph to fit.
    /// - `rasterizer` - Used to measure the glyph at [`PROBE_FONT_PX`].
    /// - `ui_margin` - Width reserved on the right for the panel.
    ///
    /// ### Returns
    /// The fitted layout, or a [`SampleError`] when the font cannot be used yet.
    pub fn fit(
        viewport: Vec2,
        ch: char,
        rasterizer: &mut dyn GlyphRasterizer,
        ui_margin: f32,
    ) -> Result<Self, SampleError> {
        if !rasterizer.is_ready() {
            return Err(SampleError::NotReady);
        }
        let measured = rasterizer
            .measure(ch, PROBE_FONT_PX)
            .filter(|m| m.advance_width.is_finite() && m.advance_width > 0.0)
            .ok_or(SampleError::Unmeasurable(ch))?;

        let available = (viewport.x - ui_margin).max(1.0);
        let by_width = available * 0.9 / measured.advance_width;
        let by_height = viewport.y * 0.7 / PROBE_FONT_PX;
        let font_px = PROBE_FONT_PX * by_width.min(by_height);

        Ok(Self {
            font_px,
            center: Vec2::new(available / 2.0, viewport.y / 2.0),
            font_scale: (font_px / 300.0).clamp(0.4, 1.5),
        })
    }
}

/// Inputs to one sampling pass.
#[derive(Clone, Copy, Debug)]
pub struct SampleRequest {
    pub ch: char,
    /// Font size after zoom.
    pub font_px: f32,
    /// World-space center the glyph is placed on.
    pub center: Vec2,
    pub gap: f32,
    pub viewport: Vec2,
    pub tier: DeviceTier,
}

/// Upper bound on sampling attempts for a buffer area and gap.
///
/// Strictly non-increasing in `gap` and capped by the device tier.
pub fn attempt_budget(area: u64, gap: f32, tier: DeviceTier) -> usize {
    let ratio = 3.0 / (gap * 0.5).max(1.0);
    let attempts = (area as f64 * 0.1 * ratio as f64).floor();
    let attempts = if attempts.is_finite() && attempts > 0.0 {
        attempts as usize
    } else {
        0
    };
    attempts.min(tier.particle_cap())
}

/// Buffer size and font size after the texture ceiling is applied.
fn buffer_dims(advance: f32, font_px: f32) -> (u32, u32, f32) {
    let w = (advance * BUFFER_MARGIN).ceil().max(0.0);
    let h = (font_px * BUFFER_MARGIN).ceil().max(0.0);
    let ceiling = MAX_TEXTURE_SIZE as f32;
    let longest = w.max(h);
    if longest > ceiling {
        let scale = ceiling / longest;
        let fit = |side: f32| {
            if side >= longest {
                MAX_TEXTURE_SIZE
            } else {
                (side * scale).floor() as u32
            }
        };
        (fit(w), fit(h), font_px * scale)
    } else {
        (w as u32, h as u32, font_px)
    }
}

/// Rejection-samples the interior of `request.ch` into world-space points.
///
/// ### Parameters
/// - `request` - Glyph, size, placement and density.
/// - `rasterizer` - Font backend.
/// - `rng` - Source for candidate pixels and jitter.
///
/// ### Returns
/// Accepted points, at most the tier cap. Degenerate buffers yield an empty list.
pub fn sample_glyph<R: Rng + ?Sized>(
    request: &SampleRequest,
    rasterizer: &mut dyn GlyphRasterizer,
    rng: &mut R,
) -> Result<Vec<Vec2>, SampleError> {
    if !rasterizer.is_ready() {
        return Err(SampleError::NotReady);
    }
    let metrics = rasterizer
        .measure(request.ch, request.font_px)
        .ok_or(SampleError::Unmeasurable(request.ch))?;

    let (width, height, font_px) = buffer_dims(metrics.advance_width, request.font_px);
    if width == 0 || height == 0 || !font_px.is_finite() {
        log::debug!("glyph {:?}: degenerate buffer {width}x{height}", request.ch);
        return Ok(Vec::new());
    }

    let raster = GlyphRasterRequest {
        ch: request.ch,
        font_px,
        width,
        height,
        anchor: Vec2::new(
            width as f32 / 2.0,
            height as f32 / 2.0 - font_px * BASELINE_LIFT,
        ),
    };
    let Some(coverage) = rasterizer.rasterize(&raster) else {
        log::debug!("glyph {:?}: rasterizer produced no coverage", request.ch);
        return Ok(Vec::new());
    };

    let attempts = attempt_budget(u64::from(width) * u64::from(height), request.gap, request.tier);
    let half = Vec2::new(width as f32, height as f32) / 2.0;
    let max_offset = request.viewport * OUTLIER_FRACTION;

    let mut points = Vec::new();
    for _ in 0..attempts {
        let x = rng.random_range(0..width);
        let y = rng.random_range(0..height);
        if coverage.alpha_at(x, y) <= ALPHA_THRESHOLD {
            continue;
        }

        let jitter = Vec2::new(
            rng.random_range(-JITTER..JITTER),
            rng.random_range(-JITTER..JITTER),
        );
        let point = Vec2::new(x as f32, y as f32) - half + request.center + jitter;

        if !point.is_finite() {
            continue;
        }
        let offset = (point - request.center).abs();
        if offset.x > max_offset.x || offset.y > max_offset.y {
            continue;
        }
        if point.x < SAMPLE_REJECT_BOX && point.y < SAMPLE_REJECT_BOX {
            continue;
        }
        points.push(point);
    }

    log::debug!(
        "glyph {:?}: {} points from {attempts} attempts ({width}x{height} @ {font_px:.1}px)",
        request.ch,
        points.len(),
    );
    Ok(points)
}


#[cfg(test)]
mod tests {
    use super::testing::ShapeRasterizer;
    use super::*;
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn request(ch: char, font_px: f32, gap: f32, tier: DeviceTier) -> SampleRequest {
        SampleRequest {
            ch,
            font_px,
            center: Vec2::new(430.0, 400.0),
            gap,
            viewport: Vec2::new(1200.0, 800.0),
            tier,
        }
    }

    #[test]
    fn not_ready_is_reported() {
        let mut raster = ShapeRasterizer {
            ready: false,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let res = sample_glyph(&request('ア', 200.0, 2.0, DeviceTier::Desktop), &mut raster, &mut rng);
        assert_eq!(res, Err(SampleError::NotReady));
        assert_eq!(raster.rasterized, 0);
    }

    #[test]
    fn unmeasurable_glyph_is_an_error() {
        let mut raster = ShapeRasterizer::default();
        let mut rng = StdRng::seed_from_u64(1);
        let res = sample_glyph(&request('\0', 200.0, 2.0, DeviceTier::Desktop), &mut raster, &mut rng);
        assert_eq!(res, Err(SampleError::Unmeasurable('\0')));
    }

    #[test]
    fn points_land_inside_the_glyph() {
        let mut raster = ShapeRasterizer::default();
        let mut rng = StdRng::seed_from_u64(3);
        let req = request('ア', 200.0, 2.0, DeviceTier::Desktop);
        let points = sample_glyph(&req, &mut raster, &mut rng).unwrap_or_default();

        assert!(!points.is_empty());
        // Disc of radius 80 centered 30 px above the buffer center, plus jitter.
        let disc = req.center - Vec2::new(0.0, 30.0);
        for p in &points {
            assert!(p.distance(disc) < 80.0 + 4.0, "{p:?}");
        }
    }

    #[test]
    fn zero_size_yields_empty() {
        let mut raster = ShapeRasterizer::default();
        let mut rng = StdRng::seed_from_u64(3);
        let points = sample_glyph(&request('ア', 0.0, 2.0, DeviceTier::Desktop), &mut raster, &mut rng);
        assert_eq!(points, Ok(Vec::new()));
        assert_eq!(raster.rasterized, 0);
    }

    #[test]
    fn oversized_buffer_is_downscaled() {
        let (w, h, px) = buffer_dims(6000.0, 6000.0);
        assert_eq!((w, h), (4096, 4096));
        assert!((px - 6000.0 * 4096.0 / 9000.0).abs() < 1e-2);

        let (w, h, px) = buffer_dims(100.0, 200.0);
        assert_eq!((w, h, px), (150, 300, 200.0));
    }

    #[test]
    fn artifact_box_is_never_sampled() {
        let mut raster = ShapeRasterizer::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut req = request('口', 200.0, 0.0, DeviceTier::Desktop);
        req.center = Vec2::new(120.0, 120.0);
        let points = sample_glyph(&req, &mut raster, &mut rng).unwrap_or_default();

        assert!(!points.is_empty());
        assert!(points.iter().all(|p| !(p.x < 150.0 && p.y < 150.0)));
    }

    #[test]
    fn outliers_beyond_viewport_fraction_are_dropped() {
        let mut raster = ShapeRasterizer::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut req = request('口', 400.0, 0.0, DeviceTier::Desktop);
        req.center = Vec2::new(400.0, 400.0);
        req.viewport = Vec2::new(100.0, 100.0);
        let points = sample_glyph(&req, &mut raster, &mut rng).unwrap_or_default();

        assert!(!points.is_empty());
        for p in points {
            let d = (p - req.center).abs();
            assert!(d.x <= 80.0 && d.y <= 80.0);
        }
    }

    #[test]
    fn layout_fits_available_width_and_height() {
        let mut raster = ShapeRasterizer::default();
        // Advance equals font size, so width allows 100 * (860 * 0.9 / 100) = 774 px
        // and height allows 100 * (800 * 0.7 / 100) = 560 px.
        let layout = GlyphLayout::fit(Vec2::new(1200.0, 800.0), 'ア', &mut raster, 340.0)
            .unwrap_or_else(|e| panic!("{e}"));
        assert!((layout.font_px - 560.0).abs() < 1e-3);
        assert_eq!(layout.center, Vec2::new(430.0, 400.0));
        assert_eq!(layout.font_scale, 1.5);

        let narrow = GlyphLayout::fit(Vec2::new(400.0, 800.0), 'ア', &mut raster, 340.0)
            .unwrap_or_else(|e| panic!("{e}"));
        assert!((narrow.font_px - 54.0).abs() < 1e-3);
        assert_eq!(narrow.font_scale, 0.4);
    }

    #[test]
    fn layout_needs_a_ready_font() {
        let mut raster = ShapeRasterizer {
            ready: false,
            ..Default::default()
        };
        let res = GlyphLayout::fit(Vec2::new(1200.0, 800.0), 'ア', &mut raster, 340.0);
        assert_eq!(res, Err(SampleError::NotReady));
    }

    #[test]
    fn budget_decreases_with_gap() {
        let area = 300 * 300;
        let mut last = usize::MAX;
        for gap in [0.0, 2.0, 4.0, 8.0, 20.0] {
            let n = attempt_budget(area, gap, DeviceTier::Desktop);
            assert!(n <= last);
            last = n;
        }
        assert_eq!(attempt_budget(area, 2.0, DeviceTier::Desktop), 10_000);
        assert_eq!(attempt_budget(area, 20.0, DeviceTier::Desktop), 2_700);
        assert_eq!(attempt_budget(area, 2.0, DeviceTier::Mobile), 2_500);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn population_never_exceeds_tier_cap(
            font_px in 10.0f32..900.0,
            gap in 0.0f32..20.0,
            mobile in any::<bool>(),
            seed in any::<u64>(),
        ) {
            let tier = if mobile { DeviceTier::Mobile } else { DeviceTier::Desktop };
            let mut raster = ShapeRasterizer::default();
            let mut rng = StdRng::seed_from_u64(seed);
            let points = sample_glyph(&request('ア', font_px, gap, tier), &mut raster, &mut rng)
                .unwrap_or_default();
            prop_assert!(points.len() <= tier.particle_cap());
        }
    }
}
