use crate::{
    clock::SimClock,
    config::{CELL_SIZE, DeviceTier, ParamChange, SimParams, UI_RIGHT_MARGIN},
    export::{self, ExportError},
    glyph::{GlyphLayout, GlyphRasterizer, SampleError, SampleRequest, sample_glyph},
    grid::SpatialGrid,
    input::{Gesture, PointerArbiter},
    particle::{Particle, StepContext},
    shape::{ShapeDraw, ShapeRenderer},
    steering::neighbor_forces,
    view::ViewTransform,
};
use glam::Vec2;
use rand::{SeedableRng, rngs::StdRng};
use std::path::Path;

/// Result of one call to [`FieldSimulator::frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    /// Fonts are not loaded yet; nothing was simulated.
    WaitingForFont,
    /// The population was replaced with this many particles, then stepped.
    Regenerated(usize),
    Stepped,
    Paused,
}

/// Owns the particle field and runs it one frame at a time.
///
/// All inputs (character, parameter edits, pointer events) are recorded
/// between frames and take effect at the start of the next
/// [`FieldSimulator::frame`].
#[derive(Debug)]
pub struct FieldSimulator {
    particles: Vec<Particle>,
    grid: SpatialGrid,
    clock: SimClock,
    view: ViewTransform,
    pointer: PointerArbiter,
    params: SimParams,
    pending: Vec<ParamChange>,
    rng: StdRng,

    character: Option<char>,
    generated: Option<char>,
    needs_regeneration: bool,
    layout: Option<GlyphLayout>,
    ui_margin: f32,
}

impl FieldSimulator {
    pub fn new(viewport: Vec2, seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            grid: SpatialGrid::new(CELL_SIZE),
            clock: SimClock::new(),
            view: ViewTransform::new(viewport),
            pointer: PointerArbiter::new(),
            params: SimParams::default(),
            pending: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            character: None,
            generated: None,
            needs_regeneration: false,
            layout: None,
            ui_margin: UI_RIGHT_MARGIN,
        }
    }

    /// Same simulator with a different width reserved for the side panel.
    pub fn with_ui_margin(mut self, margin: f32) -> Self {
        self.ui_margin = margin.max(0.0);
        self
    }

    /// Selects the glyph to display; only the first code point is used.
    ///
    /// Empty input is ignored.
    pub fn set_character(&mut self, text: &str) {
        let Some(ch) = text.chars().next() else {
            return;
        };
        if self.character != Some(ch) {
            self.character = Some(ch);
            self.needs_regeneration = true;
        }
    }

    pub fn character(&self) -> Option<char> {
        self.character
    }

    /// Resizes the canvas. Forces regeneration and re-evaluates the device tier.
    pub fn set_viewport(&mut self, viewport: Vec2) {
        if self.view.viewport() == viewport {
            return;
        }
        self.view.set_viewport(viewport);
        self.needs_regeneration = true;
        log::debug!("viewport {viewport:?}, tier {:?}", self.tier());
    }

    pub fn tier(&self) -> DeviceTier {
        DeviceTier::from_viewport_width(self.view.viewport().x)
    }

    /// Queues a parameter edit for the next frame.
    pub fn queue(&mut self, change: ParamChange) {
        self.pending.push(change);
    }

    /// Applies every queued edit in order.
    pub fn apply_pending(&mut self) {
        for change in std::mem::take(&mut self.pending) {
            if self.params.apply(change) && change.regenerates() {
                self.needs_regeneration = true;
            }
        }
    }

    pub fn toggle_pause(&mut self) {
        self.clock.toggle_pause();
    }

    /// Applies a touch gesture to the view.
    pub fn apply_gesture(&mut self, gesture: Gesture) {
        match gesture {
            Gesture::Pan(delta) => self.view.pan_by(delta),
            Gesture::Pinch { target_scale } => self.view.set_target_scale(target_scale),
        }
    }

    /// Runs one frame.
    ///
    /// ### Parameters
    /// - `real_dt` - Wall-clock seconds since the previous frame, if known.
    /// - `rasterizer` - Font backend used when the glyph must be re-sampled.
    ///
    /// ### Returns
    /// What the frame did; see [`FrameStatus`].
    pub fn frame(
        &mut self,
        real_dt: Option<f32>,
        rasterizer: &mut dyn GlyphRasterizer,
    ) -> FrameStatus {
        self.apply_pending();
        self.view.animate();

        if !rasterizer.is_ready() {
            return FrameStatus::WaitingForFont;
        }

        let mut regenerated = None;
        if self.needs_regeneration || self.generated != self.character {
            match self.regenerate(rasterizer) {
                Ok(count) => regenerated = Some(count),
                Err(SampleError::NotReady) => return FrameStatus::WaitingForFont,
                Err(err) => {
                    log::warn!("keeping previous field: {err}");
                    self.needs_regeneration = false;
                    self.generated = self.character;
                }
            }
        }

        self.advance(real_dt);

        match regenerated {
            Some(count) => FrameStatus::Regenerated(count),
            None if self.clock.is_paused() => FrameStatus::Paused,
            None => FrameStatus::Stepped,
        }
    }

    /// Re-samples the current character and replaces the population.
    fn regenerate(&mut self, rasterizer: &mut dyn GlyphRasterizer) -> Result<usize, SampleError> {
        let Some(ch) = self.character else {
            self.needs_regeneration = false;
            return Ok(self.particles.len());
        };

        let viewport = self.view.viewport();
        let layout = GlyphLayout::fit(viewport, ch, rasterizer, self.ui_margin)?;
        let request = SampleRequest {
            ch,
            font_px: layout.font_px * self.params.zoom,
            center: layout.center,
            gap: self.params.gap,
            viewport,
            tier: self.tier(),
        };
        let points = sample_glyph(&request, rasterizer, &mut self.rng)?;

        self.populate(&points);
        self.layout = Some(layout);
        self.generated = Some(ch);
        self.needs_regeneration = false;

        log::debug!(
            "regenerated {:?}: {} particles, font {:.1}px, scale {:.2}",
            ch,
            self.particles.len(),
            layout.font_px,
            layout.font_scale
        );
        Ok(self.particles.len())
    }

    /// Replaces the whole population with fresh particles anchored at `homes`.
    pub fn populate(&mut self, homes: &[Vec2]) {
        self.particles = homes
            .iter()
            .map(|&home| Particle::spawn(home, &mut self.rng))
            .collect();
    }

    /// Time, drift and pointer resolution for one frame, then [`Self::step`].
    fn advance(&mut self, real_dt: Option<f32>) {
        self.clock.tick(real_dt);
        self.view.set_drift_from_time(self.clock.time());

        let pointer = self
            .pointer
            .active_position(self.view.viewport())
            .map(|screen| self.view.to_world(screen));
        self.step(pointer);
    }

    /// Rebuilds the grid and, unless paused, updates every particle in index order.
    ///
    /// Neighbor forces read the live population, so particles updated
    /// earlier in the frame are seen at their new positions.
    pub fn step(&mut self, pointer_world: Option<Vec2>) {
        self.grid.rebuild(&self.particles, CELL_SIZE);
        if self.clock.is_paused() {
            return;
        }

        let ctx = StepContext {
            params: &self.params,
            pointer: pointer_world,
            frame_time: self.clock.frame_time(),
            viewport: self.view.viewport(),
        };

        for id in 0..self.particles.len() {
            if self.particles[id].is_parked() {
                continue;
            }
            let force = neighbor_forces(&self.particles, id, &self.grid, self.params.zoom);
            let particle = &mut self.particles[id];
            particle.apply_force(force);
            particle.update(&ctx, &mut self.rng);
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewTransform {
        &mut self.view
    }

    pub fn pointer_mut(&mut self) -> &mut PointerArbiter {
        &mut self.pointer
    }

    pub fn layout(&self) -> Option<&GlyphLayout> {
        self.layout.as_ref()
    }

    /// Particle size multiplier of the current layout, 1.0 before the first one.
    pub fn font_scale(&self) -> f32 {
        self.layout.map_or(1.0, |l| l.font_scale)
    }

    /// One world-space primitive per particle, in population order.
    pub fn shapes(&self) -> Vec<ShapeDraw> {
        let font_scale = self.font_scale();
        self.particles
            .iter()
            .map(|p| p.shape(&self.params, font_scale))
            .collect()
    }

    pub fn draw(&self, renderer: &mut dyn ShapeRenderer) {
        for shape in self.shapes() {
            renderer.draw_shape(&shape);
        }
    }

    /// SVG snapshot of the visible frame, view transform included.
    /// Never mutates the field.
    pub fn export_svg(&self) -> Result<String, ExportError> {
        export::export_svg(&self.shapes(), &self.view)
    }

    pub fn save_svg(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let document = self.export_svg()?;
        export::save_svg(&document, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ForceSign,
        glyph::testing::ShapeRasterizer,
        shape::{RecordingRenderer, ShapeKind},
    };
    use proptest::prelude::*;

    const DT: Option<f32> = Some(1.0 / 60.0);
    const DESKTOP: Vec2 = Vec2::new(1200.0, 800.0);

    fn running(ch: &str, viewport: Vec2, seed: u64, raster: &mut ShapeRasterizer) -> FieldSimulator {
        let mut sim = FieldSimulator::new(viewport, seed);
        sim.set_character(ch);
        let status = sim.frame(DT, raster);
        assert!(matches!(status, FrameStatus::Regenerated(n) if n > 0), "{status:?}");
        sim
    }

    #[test]
    fn same_seed_same_field() {
        let mut raster = ShapeRasterizer::default();
        let mut a = running("ア", DESKTOP, 42, &mut raster);
        let mut b = running("ア", DESKTOP, 42, &mut raster);
        for _ in 0..30 {
            a.frame(DT, &mut raster);
            b.frame(DT, &mut raster);
        }
        assert_eq!(a.particles(), b.particles());
    }

    #[test]
    fn waits_for_font_without_touching_state() {
        let mut raster = ShapeRasterizer {
            ready: false,
            ..Default::default()
        };
        let mut sim = FieldSimulator::new(DESKTOP, 1);
        sim.set_character("ア");

        assert_eq!(sim.frame(DT, &mut raster), FrameStatus::WaitingForFont);
        assert!(sim.particles().is_empty());
        assert_eq!(sim.clock().time(), 0.0);

        raster.ready = true;
        assert!(matches!(sim.frame(DT, &mut raster), FrameStatus::Regenerated(_)));
    }

    #[test]
    fn mobile_scenario_stays_in_bounds() {
        let mut raster = ShapeRasterizer::default();
        let mut sim = FieldSimulator::new(Vec2::new(600.0, 800.0), 7);
        sim.set_character("ア");
        assert_eq!(sim.tier(), DeviceTier::Mobile);

        let FrameStatus::Regenerated(count) = sim.frame(DT, &mut raster) else {
            panic!("first frame must regenerate");
        };
        assert!(count > 0 && count <= 2500, "{count}");

        for _ in 0..60 {
            sim.frame(DT, &mut raster);
        }

        let zoom = sim.params().zoom;
        let t = sim.clock().frame_time();
        for p in sim.particles() {
            assert!(p.pos.is_finite());
            if let Some(radius) = p.role().wall_radius(zoom) {
                let d = p.pos.distance(p.wave_target(t, zoom));
                assert!(d <= radius * 1.001, "{:?} at {d}", p.role());
            }
        }
    }

    #[test]
    fn pointer_on_particle_repels_it() {
        let mut raster = ShapeRasterizer::default();
        let mut sim = running("ア", DESKTOP, 3, &mut raster);
        assert_eq!(sim.params().force_sign, ForceSign::Repel);

        let id = sim.particles().len() / 2;
        let pointer = sim.particles()[id].pos;
        let mut last = 0.0;
        let mut was_broken = false;
        for _ in 0..5 {
            sim.step(Some(pointer));
            let p = &sim.particles()[id];
            let d = p.pos.distance(pointer);
            assert!(d > last, "{d} <= {last}");
            last = d;
            was_broken |= p.is_broken();
        }
        assert!(was_broken);
    }

    #[test]
    fn switching_glyph_replaces_population() {
        let mut raster = ShapeRasterizer::default();
        let mut sim = running("ア", DESKTOP, 5, &mut raster);
        let before: Vec<Vec2> = sim.particles().iter().map(Particle::home).collect();

        sim.set_character("イ");
        assert!(matches!(sim.frame(DT, &mut raster), FrameStatus::Regenerated(_)));

        // イ is a bar of half-width 0.1 * font_px around the layout center.
        let layout = sim.layout().copied().unwrap_or_else(|| panic!("no layout"));
        let half_width = 0.1 * layout.font_px + 3.0;
        let in_bar = |h: &Vec2| (h.x - layout.center.x).abs() <= half_width;

        assert!(before.iter().any(|h| !in_bar(h)));
        assert!(sim.particles().iter().all(|p| in_bar(&p.home())));
        assert!(sim.particles().iter().all(|p| !before.contains(&p.home())));
    }

    #[test]
    fn parameter_edits_apply_at_next_frame() {
        let mut raster = ShapeRasterizer::default();
        // Short canvas keeps the gap-20 budget below the desktop cap.
        let mut sim = running("ア", Vec2::new(800.0, 300.0), 5, &mut raster);
        let count = sim.particles().len();
        let rasterized = raster.rasterized;

        sim.queue(ParamChange::Size(12.0));
        assert_eq!(sim.params().size, 6.0);
        assert_eq!(sim.frame(DT, &mut raster), FrameStatus::Stepped);
        assert_eq!(sim.params().size, 12.0);
        assert_eq!(raster.rasterized, rasterized);

        sim.queue(ParamChange::Gap(20.0));
        let FrameStatus::Regenerated(sparse) = sim.frame(DT, &mut raster) else {
            panic!("gap change must regenerate");
        };
        assert!(sparse < count, "{sparse} >= {count}");
    }

    #[test]
    fn viewport_change_regenerates_with_new_tier() {
        let mut raster = ShapeRasterizer::default();
        let mut sim = running("ア", DESKTOP, 5, &mut raster);
        sim.set_viewport(Vec2::new(500.0, 800.0));
        assert_eq!(sim.tier(), DeviceTier::Mobile);
        assert!(matches!(sim.frame(DT, &mut raster), FrameStatus::Regenerated(n) if n <= 2500));
    }

    #[test]
    fn unmeasurable_glyph_keeps_previous_field() {
        let mut raster = ShapeRasterizer::default();
        let mut sim = running("ア", DESKTOP, 5, &mut raster);
        let count = sim.particles().len();

        sim.set_character("\0");
        assert_eq!(sim.frame(DT, &mut raster), FrameStatus::Stepped);
        assert_eq!(sim.particles().len(), count);
    }

    #[test]
    fn empty_character_is_ignored() {
        let mut sim = FieldSimulator::new(DESKTOP, 1);
        sim.set_character("アイ");
        sim.set_character("");
        assert_eq!(sim.character(), Some('ア'));
    }

    #[test]
    fn export_matches_live_frame() {
        let mut raster = ShapeRasterizer::default();
        let mut sim = running("ア", DESKTOP, 9, &mut raster);
        sim.apply_gesture(Gesture::Pan(Vec2::new(-40.0, 25.0)));
        sim.apply_gesture(Gesture::Pinch { target_scale: 1.5 });
        for _ in 0..30 {
            sim.frame(DT, &mut raster);
        }
        sim.toggle_pause();
        assert_eq!(sim.frame(DT, &mut raster), FrameStatus::Paused);
        assert!(sim.view().scale() > 1.0);

        let mut live = RecordingRenderer::default();
        sim.draw(&mut live);
        let before = sim.particles().to_vec();
        let doc = sim.export_svg().unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(sim.particles(), before.as_slice());
        assert_eq!(doc.matches("<g ").count(), live.shapes.len());
        assert_eq!(live.shapes.len(), sim.particles().len());
        assert!(live.shapes.iter().any(|s| (s.projected(sim.view()).center - s.center).length() > 1.0));
        for (shape, p) in live.shapes.iter().zip(sim.particles()) {
            let shape = shape.projected(sim.view());
            assert!((shape.center - sim.view().to_screen(p.pos)).length() < 1e-3);
            let group = format!(
                r#"<g transform="translate({:.2}, {:.2}) rotate({:.2})">"#,
                shape.center.x,
                shape.center.y,
                shape.rotation.to_degrees()
            );
            assert!(doc.contains(&group), "{group}");
            assert!(doc.contains(&shape.paint.color().to_hex()));
            if shape.kind == ShapeKind::Circle {
                assert!(doc.contains(&format!(r#"r="{:.2}""#, shape.size / 2.0)));
            }
        }
    }

    #[test]
    fn export_of_empty_field_fails() {
        let sim = FieldSimulator::new(DESKTOP, 1);
        assert!(matches!(sim.export_svg(), Err(ExportError::EmptyPopulation)));
    }

    #[test]
    fn pinch_gesture_sets_target_scale() {
        let mut sim = FieldSimulator::new(DESKTOP, 1);
        sim.apply_gesture(Gesture::Pinch { target_scale: 2.0 });
        sim.apply_gesture(Gesture::Pan(Vec2::new(5.0, -5.0)));
        assert_eq!(sim.view().target_scale(), 2.0);
        assert_eq!(sim.view().pan(), Vec2::new(5.0, -5.0));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn pausing_freezes_the_field(paused_frames in 1usize..20, seed in any::<u64>()) {
            let mut raster = ShapeRasterizer::default();
            let mut paused = running("ア", DESKTOP, seed, &mut raster);
            let mut straight = running("ア", DESKTOP, seed, &mut raster);

            for _ in 0..5 {
                paused.frame(DT, &mut raster);
                straight.frame(DT, &mut raster);
            }

            paused.toggle_pause();
            let frozen = paused.particles().to_vec();
            for _ in 0..paused_frames {
                paused.frame(DT, &mut raster);
                prop_assert_eq!(paused.particles(), frozen.as_slice());
            }
            paused.toggle_pause();

            for _ in 0..5 {
                paused.frame(DT, &mut raster);
                straight.frame(DT, &mut raster);
            }
            prop_assert_eq!(paused.clock().time(), straight.clock().time());
            prop_assert_eq!(paused.particles(), straight.particles());
        }
    }
}
