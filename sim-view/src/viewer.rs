//! Interactive glyph field viewer built with eframe/egui.
//!
//! This module defines [`Viewer`], which owns the [`FieldSimulator`] and
//! the font backend and implements [`eframe::App`] to drive the field
//! one frame per repaint.

use crate::{painter::EguiRenderer, text::CosmicRasterizer};
use eframe::App;
use glam::Vec2;
use rand::Rng;
use sim_core::{
    FieldSimulator, FrameStatus,
    config::{ForceSign, ParamChange, SimParams},
};
use std::{collections::BTreeMap, path::PathBuf};

/// Startup options, filled from the command line.
#[derive(Clone, Debug)]
pub struct ViewerOptions {
    pub character: String,
    pub seed: u64,
    pub export_path: PathBuf,
}

const GRID_STEP: f32 = 200.0;
const CROSSHAIR: f32 = 5.0;
const FALLBACK_GLYPH_PX: f32 = 120.0;

/// Random character from the katakana block (ァ..=ン).
pub fn random_katakana(rng: &mut impl Rng) -> char {
    char::from_u32(rng.random_range(0x30A1..=0x30F3)).unwrap_or('ア')
}

/// Parameter edits needed to turn `current` into `edited`, in field order.
pub fn param_changes(current: &SimParams, edited: &SimParams) -> Vec<ParamChange> {
    let mut out = Vec::new();
    let mut push = |changed: bool, change: ParamChange| {
        if changed {
            out.push(change);
        }
    };
    push(current.zoom != edited.zoom, ParamChange::Zoom(edited.zoom));
    push(current.size != edited.size, ParamChange::Size(edited.size));
    push(current.radius != edited.radius, ParamChange::Radius(edited.radius));
    push(current.gravity != edited.gravity, ParamChange::Gravity(edited.gravity));
    push(current.reaction != edited.reaction, ParamChange::Reaction(edited.reaction));
    push(current.hue != edited.hue, ParamChange::Hue(edited.hue));
    push(
        current.force_sign != edited.force_sign,
        ParamChange::ForceSign(edited.force_sign),
    );
    push(current.gap != edited.gap, ParamChange::Gap(edited.gap));
    out
}

/// Grid line positions covering `[-offset - step, -offset + extent + step)`,
/// snapped to multiples of `step`, in world units.
pub fn grid_lines(extent: f32, offset: f32, step: f32) -> Vec<f32> {
    let start = -offset - step;
    let end = -offset + extent + step;
    let mut v = (start / step).floor() * step;
    let mut out = Vec::new();
    while v < end {
        out.push(v);
        v += step;
    }
    out
}

/// Active touches keyed by egui touch id, in id order.
#[derive(Debug, Default)]
struct TouchSet {
    touches: BTreeMap<u64, Vec2>,
}

impl TouchSet {
    fn positions(&self) -> Vec<Vec2> {
        self.touches.values().copied().collect()
    }
}

/// Main application state for the interactive viewer.
///
/// ### Fields
/// - `sim` - The particle field.
/// - `fonts` - Background-loaded glyph rasterizer.
/// - `text` - Contents of the character field.
/// - `edited` - Slider values; diffed against the simulator every frame.
/// - `show_grid` - Swiss grid overlay toggle.
/// - `export_path` - Where the export button writes.
/// - `status` - Last export result shown in the panel.
pub struct Viewer {
    sim: FieldSimulator,
    fonts: CosmicRasterizer,
    rng: rand::rngs::ThreadRng,

    text: String,
    edited: SimParams,
    show_grid: bool,
    export_path: PathBuf,
    status: Option<String>,

    touches: TouchSet,
}

impl Viewer {
    pub fn new(options: ViewerOptions, fonts: CosmicRasterizer) -> Self {
        // The canvas is the central panel, so no room is reserved for the side panel.
        let mut sim = FieldSimulator::new(Vec2::new(1280.0, 800.0), options.seed).with_ui_margin(0.0);
        sim.set_character(&options.character);
        let edited = *sim.params();

        Self {
            sim,
            fonts,
            rng: rand::rng(),
            text: options.character,
            edited,
            show_grid: false,
            export_path: options.export_path,
            status: None,
            touches: TouchSet::default(),
        }
    }

    fn export(&mut self) {
        self.status = Some(match self.sim.save_svg(&self.export_path) {
            Ok(()) => format!("Saved {}", self.export_path.display()),
            Err(err) => {
                log::warn!("export failed: {err}");
                format!("Export failed: {err}")
            }
        });
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (enter, grid, fullscreen) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Enter),
                i.key_pressed(egui::Key::G),
                i.key_pressed(egui::Key::F),
            )
        });

        if enter {
            self.sim.toggle_pause();
        }
        if grid {
            self.show_grid = !self.show_grid;
        }
        if fullscreen {
            let is_full = ctx.input(|i| i.viewport().fullscreen.unwrap_or(false));
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(!is_full));
        }
    }

    /// Builds the right-hand control panel.
    fn ui_control_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("control_panel")
            .resizable(false)
            .exact_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Bacteriograph");

                ui.separator();
                ui.horizontal(|ui| {
                    ui.label("Character:");
                    let edit = ui.add(egui::TextEdit::singleline(&mut self.text).desired_width(60.0));
                    if edit.changed() {
                        self.sim.set_character(&self.text);
                    }
                });
                if ui.button("🎲 Random katakana").clicked() {
                    self.text = random_katakana(&mut self.rng).to_string();
                    self.sim.set_character(&self.text);
                }

                ui.separator();
                ui.label("Field");
                let p = &mut self.edited;
                ui.add(egui::Slider::new(&mut p.zoom, 0.2..=3.0).text("Zoom"));
                ui.add(egui::Slider::new(&mut p.size, 1.0..=30.0).text("Size"));
                ui.add(egui::Slider::new(&mut p.radius, 0.0..=15.0).text("Radius"));
                ui.add(egui::Slider::new(&mut p.gap, 0.0..=20.0).text("Gap"));
                ui.add(egui::Slider::new(&mut p.hue, 0.0..=360.0).text("Hue"));

                ui.separator();
                ui.label("Motion");
                ui.add(egui::Slider::new(&mut p.gravity, 0.0..=2.0).text("Gravity"));
                ui.add(egui::Slider::new(&mut p.reaction, 0.0..=1.0).text("Reaction"));
                let sign_label = match p.force_sign {
                    ForceSign::Repel => "Pointer: repel",
                    ForceSign::Attract => "Pointer: attract",
                };
                if ui.button(sign_label).clicked() {
                    p.force_sign = p.force_sign.flipped();
                }

                ui.separator();
                ui.horizontal(|ui| {
                    let paused = self.sim.clock().is_paused();
                    if ui.button(if paused { "▶ Resume" } else { "⏸ Pause" }).clicked() {
                        self.sim.toggle_pause();
                    }
                    ui.checkbox(&mut self.show_grid, "Grid");
                });
                if ui.button("Export SVG").clicked() {
                    self.export();
                }
                if let Some(status) = &self.status {
                    ui.small(status);
                }

                ui.separator();
                ui.label(format!("particles = {}", self.sim.particles().len()));
                ui.small("Enter: pause · Space+drag: pan · G: grid · F: fullscreen");
            });

        for change in param_changes(self.sim.params(), &self.edited) {
            self.sim.queue(change);
        }
    }

    /// Feeds mouse, wheel, touch and space-drag input to the simulator.
    fn handle_canvas_input(&mut self, ctx: &egui::Context, response: &egui::Response) {
        let origin = response.rect.min;
        let local = |p: egui::Pos2| Vec2::new(p.x - origin.x, p.y - origin.y);

        let pointer = self.sim.pointer_mut();
        match response.hover_pos() {
            Some(pos) => {
                pointer.mouse_entered();
                pointer.mouse_moved(local(pos));
            }
            None => pointer.mouse_left(),
        }

        let space_held = ctx.input(|i| i.key_down(egui::Key::Space));
        if space_held && response.dragged() {
            let d = response.drag_delta();
            self.sim.view_mut().pan_by(Vec2::new(d.x, d.y));
        }

        let scroll = ctx.input(|i| i.raw_scroll_delta.y);
        if scroll != 0.0 {
            // egui reports scrolling up as positive; zoom in on scroll up.
            self.sim.view_mut().zoom_wheel(-scroll);
        }

        let events = ctx.input(|i| i.events.clone());
        for event in events {
            let egui::Event::Touch { id, phase, pos, .. } = event else {
                continue;
            };
            self.handle_touch(id.0, phase, local(pos));
        }
    }

    fn handle_touch(&mut self, id: u64, phase: egui::TouchPhase, pos: Vec2) {
        match phase {
            egui::TouchPhase::Start => {
                self.touches.touches.insert(id, pos);
                let scale = self.sim.view().target_scale();
                self.sim
                    .pointer_mut()
                    .touch_started(&self.touches.positions(), scale);
            }
            egui::TouchPhase::Move => {
                self.touches.touches.insert(id, pos);
                let positions = self.touches.positions();
                if let Some(gesture) = self.sim.pointer_mut().touch_moved(&positions) {
                    self.sim.apply_gesture(gesture);
                }
            }
            egui::TouchPhase::End => {
                self.touches.touches.remove(&id);
                let remaining = self.touches.positions();
                self.sim.pointer_mut().touch_ended(&remaining);
            }
            egui::TouchPhase::Cancel => {
                self.touches.touches.clear();
                self.sim.pointer_mut().touch_cancelled();
            }
        }
    }

    /// Swiss-style grid: faint lines every [`GRID_STEP`] with crosshairs at intersections.
    fn paint_grid(&self, painter: &egui::Painter, rect: egui::Rect) {
        let pan = self.sim.view().pan();
        let xs = grid_lines(rect.width(), pan.x, GRID_STEP);
        let ys = grid_lines(rect.height(), pan.y, GRID_STEP);
        let to_pos = |x: f32, y: f32| rect.min + egui::vec2(x + pan.x, y + pan.y);

        let line = egui::Stroke::new(1.0, egui::Color32::from_white_alpha(30));
        let accent = egui::Stroke::new(2.0, egui::Color32::from_white_alpha(60));
        let (top, bottom) = (-pan.y - GRID_STEP, -pan.y + rect.height() + GRID_STEP);
        let (left, right) = (-pan.x - GRID_STEP, -pan.x + rect.width() + GRID_STEP);

        for &x in &xs {
            painter.line_segment([to_pos(x, top), to_pos(x, bottom)], line);
        }
        for &y in &ys {
            painter.line_segment([to_pos(left, y), to_pos(right, y)], line);
        }
        for &x in &xs {
            for &y in &ys {
                painter.line_segment([to_pos(x - CROSSHAIR, y), to_pos(x + CROSSHAIR, y)], accent);
                painter.line_segment([to_pos(x, y - CROSSHAIR), to_pos(x, y + CROSSHAIR)], accent);
            }
        }
    }

    /// Builds the central canvas: runs one simulation frame and draws it.
    fn ui_canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                let response = ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
                let rect = response.rect;
                let painter = ui.painter_at(rect);

                self.sim.set_viewport(Vec2::new(rect.width(), rect.height()));
                self.handle_canvas_input(ctx, &response);

                self.fonts.poll();
                let dt = ctx.input(|i| i.unstable_dt);
                let status = self.sim.frame(Some(dt), &mut self.fonts);

                if self.show_grid {
                    self.paint_grid(&painter, rect);
                }

                if status == FrameStatus::WaitingForFont {
                    let ch = self.sim.character().map(String::from).unwrap_or_default();
                    painter.text(
                        rect.center(),
                        egui::Align2::CENTER_CENTER,
                        ch,
                        egui::FontId::proportional(FALLBACK_GLYPH_PX),
                        egui::Color32::WHITE,
                    );
                } else {
                    let mut renderer = EguiRenderer {
                        painter: &painter,
                        view: self.sim.view(),
                        origin: rect.min,
                    };
                    self.sim.draw(&mut renderer);
                }

                if self.sim.clock().is_paused() {
                    painter.text(
                        rect.right_top() + egui::vec2(-16.0, 16.0),
                        egui::Align2::RIGHT_TOP,
                        "PAUSED",
                        egui::FontId::monospace(16.0),
                        egui::Color32::WHITE,
                    );
                }
            });

        ctx.request_repaint();
    }
}

impl App for Viewer {
    /// eframe callback: keys, control panel, then the canvas frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);
        self.ui_control_panel(ctx);
        self.ui_canvas(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use std::sync::mpsc;

    fn viewer() -> Viewer {
        let (_tx, rx) = mpsc::channel();
        let options = ViewerOptions {
            character: "ア".to_owned(),
            seed: 1,
            export_path: std::env::temp_dir().join("bacteriograph-viewer-test.svg"),
        };
        Viewer::new(options, CosmicRasterizer::from_receiver(rx))
    }

    #[test]
    fn new_viewer_selects_character() {
        let viewer = viewer();
        assert_eq!(viewer.sim.character(), Some('ア'));
        assert_eq!(viewer.edited, SimParams::default());
        assert!(viewer.sim.particles().is_empty());
    }

    #[test]
    fn only_edited_params_are_queued() {
        let current = SimParams::default();
        let mut edited = current;
        assert!(param_changes(&current, &edited).is_empty());

        edited.gap = 8.0;
        edited.force_sign = ForceSign::Attract;
        assert_eq!(
            param_changes(&current, &edited),
            vec![ParamChange::ForceSign(ForceSign::Attract), ParamChange::Gap(8.0)]
        );
    }

    #[test]
    fn random_katakana_stays_in_block() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let ch = random_katakana(&mut rng);
            assert!(('\u{30A1}'..='\u{30F3}').contains(&ch), "{ch:?}");
        }
    }

    #[test]
    fn grid_lines_cover_canvas_with_overshoot() {
        let xs = grid_lines(800.0, 0.0, 200.0);
        assert_eq!(xs.first(), Some(&-200.0));
        assert_eq!(xs.last(), Some(&800.0));

        // Panned right by 50: lines stay on multiples of the step.
        let xs = grid_lines(800.0, 50.0, 200.0);
        assert_eq!(xs.first(), Some(&-400.0));
        assert!(xs.iter().all(|x| x % 200.0 == 0.0));
    }

    #[test]
    fn two_finger_touch_drives_pinch_zoom() {
        let mut viewer = viewer();
        viewer.handle_touch(1, egui::TouchPhase::Start, Vec2::new(100.0, 100.0));
        viewer.handle_touch(2, egui::TouchPhase::Start, Vec2::new(200.0, 100.0));
        viewer.handle_touch(2, egui::TouchPhase::Move, Vec2::new(300.0, 100.0));

        assert!((viewer.sim.view().target_scale() - 2.0).abs() < 1e-5);

        viewer.handle_touch(1, egui::TouchPhase::End, Vec2::new(100.0, 100.0));
        viewer.handle_touch(2, egui::TouchPhase::End, Vec2::new(300.0, 100.0));
        assert!(viewer.touches.touches.is_empty());
    }

    #[test]
    fn pinch_during_wheel_ease_starts_from_target() {
        let mut viewer = viewer();
        viewer.sim.view_mut().set_target_scale(3.0);
        viewer.sim.view_mut().animate();
        assert!(viewer.sim.view().scale() < 1.5);

        viewer.handle_touch(1, egui::TouchPhase::Start, Vec2::new(100.0, 100.0));
        viewer.handle_touch(2, egui::TouchPhase::Start, Vec2::new(200.0, 100.0));
        viewer.handle_touch(2, egui::TouchPhase::Move, Vec2::new(200.0, 100.0));

        assert!((viewer.sim.view().target_scale() - 3.0).abs() < 1e-5);
    }

    #[test]
    fn export_without_particles_reports_failure() {
        let mut viewer = viewer();
        viewer.export();
        let status = viewer.status.unwrap_or_default();
        assert!(status.starts_with("Export failed"), "{status}");
    }
}
