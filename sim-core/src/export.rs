//! SVG snapshot of the current frame.
//!
//! The exporter consumes the same [`ShapeDraw`] records as the live
//! painter and projects them through the same [`ViewTransform`], so
//! position, size and color match the screen exactly.

use crate::{
    shape::{Paint, ShapeDraw, ShapeKind},
    view::ViewTransform,
};
use std::{
    fmt::{self, Write as _},
    io,
    path::Path,
};
use thiserror::Error;

/// File name suggested to users when saving an export.
pub const DEFAULT_EXPORT_FILE: &str = "bacteriograph_design.svg";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export: the particle population is empty")]
    EmptyPopulation,
    #[error("failed to format SVG document")]
    Format(#[from] fmt::Error),
    #[error("failed to write SVG document")]
    Io(#[from] io::Error),
}

struct PaintAttrs {
    fill: String,
    stroke: String,
    stroke_width: String,
}

impl PaintAttrs {
    fn of(paint: &Paint) -> Self {
        match *paint {
            Paint::Fill(color) => Self {
                fill: color.to_hex(),
                stroke: "none".to_owned(),
                stroke_width: "0".to_owned(),
            },
            Paint::Stroke { color, width } => Self {
                fill: "none".to_owned(),
                stroke: color.to_hex(),
                stroke_width: format!("{width:.2}"),
            },
        }
    }
}

fn write_shape(out: &mut String, shape: &ShapeDraw) -> fmt::Result {
    let attrs = PaintAttrs::of(&shape.paint);
    let paint = format!(
        r#"fill="{}" stroke="{}" stroke-width="{}""#,
        attrs.fill, attrs.stroke, attrs.stroke_width
    );

    write!(
        out,
        r#"<g transform="translate({:.2}, {:.2}) rotate({:.2})">"#,
        shape.center.x,
        shape.center.y,
        shape.rotation.to_degrees()
    )?;

    match shape.kind {
        ShapeKind::Circle => {
            write!(out, r#"<circle cx="0" cy="0" r="{:.2}" {paint} />"#, shape.size / 2.0)?;
        }
        ShapeKind::Square => {
            let half = shape.size / 2.0;
            write!(
                out,
                r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" {paint} />"#,
                -half, -half, shape.size, shape.size, shape.corner_radius
            )?;
        }
        ShapeKind::Triangle | ShapeKind::Pentagon | ShapeKind::Hexagon => {
            let points = shape
                .local_vertices()
                .unwrap_or_default()
                .iter()
                .map(|v| format!("{:.2},{:.2}", v.x, v.y))
                .collect::<Vec<_>>()
                .join(" ");
            write!(out, r#"<polygon points="{points}" {paint} />"#)?;
        }
    }

    out.push_str("</g>\n");
    Ok(())
}

/// Renders `shapes` into a standalone SVG document of the visible frame.
///
/// ### Parameters
/// - `shapes` - One record per particle, in world coordinates.
/// - `view` - Live view; its viewport becomes the document size and view
///   box, and every shape is placed and scaled as on screen.
///
/// ### Returns
/// The document text, or [`ExportError::EmptyPopulation`] when `shapes` is empty.
pub fn export_svg(shapes: &[ShapeDraw], view: &ViewTransform) -> Result<String, ExportError> {
    if shapes.is_empty() {
        return Err(ExportError::EmptyPopulation);
    }

    let viewport = view.viewport();
    let w = viewport.x.round().max(0.0) as u32;
    let h = viewport.y.round().max(0.0) as u32;

    let mut out = String::with_capacity(256 + shapes.len() * 160);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n");
    writeln!(
        out,
        r#"<svg width="{w}" height="{h}" viewBox="0 0 {w} {h}" xmlns="http://www.w3.org/2000/svg">"#
    )?;
    out.push_str("<rect width=\"100%\" height=\"100%\" fill=\"black\" />\n");

    for shape in shapes {
        write_shape(&mut out, &shape.projected(view))?;
    }
    out.push_str("</svg>");
    Ok(out)
}

/// Writes an exported document to `path`.
pub fn save_svg(document: &str, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let path = path.as_ref();
    std::fs::write(path, document)?;
    log::info!("exported {} bytes to {}", document.len(), path.display());
    Ok(())
}
