//! Core particle glyph field simulation library.
//!
//! Main components:
//! - [`simulator`] - the frame loop owning the whole field.
//! - [`glyph`] - glyph layout and rejection sampling into home anchors.
//! - [`particle`] - per-particle state, roles and the behavior pipeline.
//! - [`steering`] - neighbor, pointer and wander forces; elastic walls.
//! - [`grid`] - uniform spatial hash rebuilt every frame.
//! - [`clock`] - pausable simulated time.
//! - [`view`] - pan/zoom/drift screen transform.
//! - [`input`] - touch vs. mouse pointer arbitration and gestures.
//! - [`shape`], [`color`] - renderer-neutral particle primitives.
//! - [`export`] - SVG snapshot of the current frame.
//! - [`config`] - tunable parameters and constants.
//! - [`types`] - shared type aliases and IDs.

pub mod clock;
pub mod color;
pub mod config;
pub mod export;
pub mod glyph;
pub mod grid;
pub mod input;
pub mod particle;
pub mod shape;
pub mod simulator;
pub mod steering;
pub mod types;
pub mod view;

pub use simulator::{FieldSimulator, FrameStatus};
