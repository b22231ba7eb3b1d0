//! Glyph rasterization backed by `cosmic-text`.
//!
//! System fonts take a noticeable moment to scan, so [`CosmicRasterizer`]
//! loads them on a background thread and reports "not ready" until the
//! finished [`FontSystem`] arrives over a channel.

use cosmic_text::{Attrs, Buffer, FontSystem, Metrics, Shaping, SwashCache, SwashContent};
use glam::Vec2;
use sim_core::glyph::{CoverageBuffer, GlyphMetrics, GlyphRasterRequest, GlyphRasterizer};
use std::{
    path::PathBuf,
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
};

enum FontState {
    Loading(Receiver<FontSystem>),
    Ready(FontSystem),
    Failed,
}

pub struct CosmicRasterizer {
    state: FontState,
    swash_cache: SwashCache,
}

impl CosmicRasterizer {
    /// Starts scanning system fonts, plus `extra_font` if given, on a worker thread.
    pub fn load_in_background(extra_font: Option<PathBuf>) -> Self {
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("font-loader".into())
            .spawn(move || {
                let mut font_system = FontSystem::new();
                if let Some(path) = extra_font {
                    match std::fs::read(&path) {
                        Ok(bytes) => font_system.db_mut().load_font_data(bytes),
                        Err(err) => log::warn!("cannot read font {}: {err}", path.display()),
                    }
                }
                // The receiver may already be gone if the app closed during loading.
                let _ = tx.send(font_system);
            });

        if let Err(err) = spawned {
            log::warn!("failed to start font loader: {err}");
        }
        Self::from_receiver(rx)
    }

    /// Waits on an already started loader.
    pub fn from_receiver(rx: Receiver<FontSystem>) -> Self {
        Self {
            state: FontState::Loading(rx),
            swash_cache: SwashCache::new(),
        }
    }

    /// Picks up the loaded font system if the worker has finished.
    ///
    /// ### Returns
    /// `true` once fonts are usable.
    pub fn poll(&mut self) -> bool {
        if let FontState::Loading(rx) = &self.state {
            match rx.try_recv() {
                Ok(font_system) => {
                    log::info!("fonts ready ({} faces)", font_system.db().len());
                    self.state = FontState::Ready(font_system);
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    log::warn!("font loader exited without fonts");
                    self.state = FontState::Failed;
                }
            }
        }
        self.is_ready()
    }

    fn font_system(&mut self) -> Option<&mut FontSystem> {
        match &mut self.state {
            FontState::Ready(font_system) => Some(font_system),
            FontState::Loading(_) | FontState::Failed => None,
        }
    }
}

/// Shapes a single glyph on one unwrapped line.
fn shape_glyph(font_system: &mut FontSystem, ch: char, font_px: f32) -> Option<Buffer> {
    if !(font_px.is_finite() && font_px > 0.0) {
        return None;
    }
    let metrics = Metrics::new(font_px, font_px * 1.2);
    let mut buffer = Buffer::new(font_system, metrics);
    buffer.set_size(font_system, Some(f32::MAX), Some(metrics.line_height));

    let mut utf8 = [0u8; 4];
    buffer.set_text(
        font_system,
        ch.encode_utf8(&mut utf8),
        &Attrs::new(),
        Shaping::Advanced,
        None,
    );
    buffer.shape_until_scroll(font_system, false);
    Some(buffer)
}

impl GlyphRasterizer for CosmicRasterizer {
    fn is_ready(&self) -> bool {
        matches!(self.state, FontState::Ready(_))
    }

    fn measure(&mut self, ch: char, font_px: f32) -> Option<GlyphMetrics> {
        let font_system = self.font_system()?;
        let buffer = shape_glyph(font_system, ch, font_px)?;
        let run = buffer.layout_runs().next()?;
        if run.glyphs.is_empty() {
            return None;
        }
        Some(GlyphMetrics {
            advance_width: run.line_w,
        })
    }

    fn rasterize(&mut self, request: &GlyphRasterRequest) -> Option<CoverageBuffer> {
        let FontState::Ready(font_system) = &mut self.state else {
            return None;
        };
        let buffer = shape_glyph(font_system, request.ch, request.font_px)?;
        let mut coverage = CoverageBuffer::new(request.width, request.height);

        for run in buffer.layout_runs() {
            // Center the line box on the anchor.
            let origin = request.anchor - Vec2::new(run.line_w, run.line_height) / 2.0;
            let baseline = origin.y + (run.line_y - run.line_top);

            for glyph in run.glyphs.iter() {
                let physical = glyph.physical((origin.x, baseline), 1.0);
                let Some(image) = self
                    .swash_cache
                    .get_image(font_system, physical.cache_key)
                    .clone()
                else {
                    continue;
                };

                let (stride, channel) = match image.content {
                    SwashContent::Mask => (1, 0),
                    SwashContent::Color => (4, 3),
                    SwashContent::SubpixelMask => continue,
                };

                let left = physical.x + image.placement.left;
                let top = physical.y - image.placement.top;
                let (w, h) = (image.placement.width as i32, image.placement.height as i32);

                for gy in 0..h {
                    for gx in 0..w {
                        let (x, y) = (left + gx, top + gy);
                        if x < 0 || y < 0 || x >= request.width as i32 || y >= request.height as i32
                        {
                            continue;
                        }
                        let src = (gy * w + gx) as usize * stride + channel;
                        let dst = y as usize * request.width as usize + x as usize;
                        if let (Some(&a), Some(slot)) = (image.data.get(src), coverage.alpha.get_mut(dst)) {
                            *slot = (*slot).max(a);
                        }
                    }
                }
            }
        }

        Some(coverage)
    }
}
