//! Application entry point for the Bacteriograph glyph field viewer.
//!
//! This binary parses command-line options, sets up logging and
//! eframe/egui, and delegates all interactive logic and rendering to
//! [`Viewer`] from the `viewer` module.

mod painter;
mod text;
mod viewer;

use clap::Parser;
use sim_core::export::DEFAULT_EXPORT_FILE;
use std::path::PathBuf;
use text::CosmicRasterizer;
use viewer::{Viewer, ViewerOptions};

#[derive(Parser, Debug)]
#[command(name = "bacteriograph")]
#[command(about = "Particle field that self-organizes into a glyph", long_about = None)]
#[command(version)]
struct Cli {
    /// Character to display; only the first code point is used
    #[arg(short, long, default_value = "ア")]
    char: String,

    /// Seed for a reproducible field (random when omitted)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Extra font file loaded alongside the system fonts
    #[arg(short, long)]
    font: Option<PathBuf>,

    /// Where the export button writes the SVG snapshot
    #[arg(short, long, default_value = DEFAULT_EXPORT_FILE)]
    export: PathBuf,
}

/// Starts the native eframe application.
///
/// ### Returns
/// - `Ok(())` if the application runs to completion without errors.
/// - `Err` if eframe fails to create the native window or event loop.
fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let seed = cli.seed.unwrap_or_else(rand::random);
    log::info!("starting with {:?}, seed {seed}", cli.char);

    let options = ViewerOptions {
        character: cli.char,
        seed,
        export_path: cli.export,
    };
    let fonts = CosmicRasterizer::load_in_background(cli.font);

    eframe::run_native(
        "Bacteriograph",
        eframe::NativeOptions::default(),
        Box::new(|_cc| Ok(Box::new(Viewer::new(options, fonts)))),
    )
}
