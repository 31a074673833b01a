//! Export: raster orchestration, SVG rendering and preview fitting.
//!
//! Pixels are produced by an external backend behind the [`Rasterizer`]
//! trait. When the backend refuses a scene because a cross-origin image
//! tainted it, [`export_raster`] degrades the scene step by step instead of
//! failing outright.

use crate::model::{
    Bounds, ImageFit, LockFlags, ObjectKind, Paint, SceneDocument, SceneObject, TextAlign,
};
use crate::path;
use crate::snapshot::placeholder;
use std::fmt::Write as _;

pub const PREVIEW_WIDTH: f64 = 200.0;
pub const PREVIEW_HEIGHT: f64 = 150.0;

// ─── Raster ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterFormat {
    #[default]
    Png,
    Jpeg,
}

impl RasterFormat {
    pub fn mime(self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportQuality {
    High,
    #[default]
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    pub format: RasterFormat,
    /// Encoder quality, 0..=1. Ignored by PNG encoders.
    pub quality: f32,
    /// Output pixels per canvas unit.
    pub multiplier: f64,
    /// Canvas area to export; the whole canvas when `None`.
    pub region: Option<Bounds>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self::preset(RasterFormat::Png, ExportQuality::Standard)
    }
}

impl RasterOptions {
    pub fn preset(format: RasterFormat, quality: ExportQuality) -> Self {
        let (quality, multiplier) = match (format, quality) {
            (RasterFormat::Png, ExportQuality::High) => (1.0, 2.0),
            (RasterFormat::Png, ExportQuality::Standard) => (1.0, 1.0),
            (RasterFormat::Jpeg, ExportQuality::High) => (0.9, 2.0),
            (RasterFormat::Jpeg, ExportQuality::Standard) => (0.7, 1.0),
        };
        Self {
            format,
            quality,
            multiplier,
            region: None,
        }
    }

    /// Pixel size of the exported image for `scene`.
    pub fn output_size(&self, scene: &SceneDocument) -> (u32, u32) {
        let (w, h) = match self.region {
            Some(region) => (region.width, region.height),
            None => (scene.width, scene.height),
        };
        let px = |v: f64| (v * self.multiplier).round().max(1.0) as u32;
        (px(w), px(h))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RasterError {
    /// The backend refused to read pixels back (cross-origin content).
    #[error("canvas is tainted by a cross-origin source")]
    TaintedSource,

    #[error("raster backend failed: {0}")]
    Backend(String),
}

/// Pixel backend (a browser canvas, a software renderer).
pub trait Rasterizer {
    fn rasterize(
        &mut self,
        scene: &SceneDocument,
        opts: &RasterOptions,
    ) -> Result<Vec<u8>, RasterError>;
}

/// Which scene ended up in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterSource {
    Live,
    /// Images and unsupported objects replaced by placeholders.
    Degraded,
    BackgroundOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterOutput {
    pub bytes: Vec<u8>,
    pub source: RasterSource,
}

/// Rasterize the scene, falling back to a degraded scene and then to a
/// background-only scene when the source is tainted. Returns the last
/// error if every attempt fails.
pub fn export_raster<R: Rasterizer + ?Sized>(
    backend: &mut R,
    scene: &SceneDocument,
    opts: &RasterOptions,
) -> Result<RasterOutput, RasterError> {
    let err = match backend.rasterize(scene, opts) {
        Ok(bytes) => {
            return Ok(RasterOutput {
                bytes,
                source: RasterSource::Live,
            });
        }
        Err(RasterError::TaintedSource) => RasterError::TaintedSource,
        Err(e) => return Err(e),
    };
    log::warn!("raster export failed ({err}); retrying with a degraded scene");

    let err = match backend.rasterize(&degrade(scene), opts) {
        Ok(bytes) => {
            return Ok(RasterOutput {
                bytes,
                source: RasterSource::Degraded,
            });
        }
        Err(e) => e,
    };
    log::warn!("degraded raster export failed ({err}); exporting background only");

    backend
        .rasterize(&background_only(scene), opts)
        .map(|bytes| RasterOutput {
            bytes,
            source: RasterSource::BackgroundOnly,
        })
}

/// Lossy copy of the scene without any external sources.
pub fn degrade(scene: &SceneDocument) -> SceneDocument {
    let mut out = scene.clone();
    out.background.image = None;
    for object in &mut out.objects {
        if matches!(
            object.kind,
            ObjectKind::Image { .. } | ObjectKind::Unsupported { .. }
        ) {
            *object = placeholder(object);
        }
    }
    out
}

pub fn background_only(scene: &SceneDocument) -> SceneDocument {
    let mut out = SceneDocument::new(scene.width, scene.height);
    out.name.clone_from(&scene.name);
    out.background.color.clone_from(&scene.background.color);
    out
}

// ─── Preview ─────────────────────────────────────────────────────────────

/// Fit a scene into a `width × height` thumbnail. Content is scaled down
/// (never up), centered when it ends up smaller than the thumbnail, and
/// locked.
pub fn fit_preview(scene: &SceneDocument, width: f64, height: f64) -> SceneDocument {
    let scale = (width / scene.width).min(height / scene.height).min(1.0);
    let mut out = scene.clone();
    out.width = width;
    out.height = height;
    for object in &mut out.objects {
        object.scale_x *= scale;
        object.scale_y *= scale;
        object.left *= scale;
        object.top *= scale;
        object.lock = LockFlags::locked();
    }

    let Some(content) = out.content_bounds() else {
        return out;
    };
    if content.width < width && content.height < height {
        let dx = (width - content.width) / 2.0 - content.x;
        let dy = (height - content.height) / 2.0 - content.y;
        for object in &mut out.objects {
            object.left += dx;
            object.top += dy;
        }
    }
    out
}

// ─── SVG ─────────────────────────────────────────────────────────────────

/// Render the scene as an SVG document the size of the canvas, objects in
/// paint order.
pub fn render_svg(scene: &SceneDocument) -> String {
    let (w, h) = (scene.width, scene.height);
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">"
    );

    if let Some(color) = scene.background.color.as_ref().and_then(Paint::css) {
        let _ = writeln!(
            svg,
            "  <rect width=\"{w}\" height=\"{h}\" fill=\"{}\" />",
            escape(&color)
        );
    }
    if let Some(image) = &scene.background.image {
        let aspect = match image.fit {
            ImageFit::Cover => "xMidYMid slice",
            ImageFit::Contain => "xMidYMid meet",
            ImageFit::Stretch => "none",
            ImageFit::Original => "xMinYMin",
        };
        let size = match image.fit {
            ImageFit::Original => String::new(),
            _ => format!(" width=\"{w}\" height=\"{h}\""),
        };
        let _ = writeln!(
            svg,
            "  <image href=\"{}\"{size} preserveAspectRatio=\"{aspect}\" />",
            escape(&image.src)
        );
    }

    for object in &scene.objects {
        render_object(&mut svg, object);
    }
    svg.push_str("</svg>\n");
    svg
}

fn render_object(out: &mut String, object: &SceneObject) {
    if let ObjectKind::Unsupported { .. } = object.kind {
        return render_object(out, &placeholder(object));
    }

    let (w, h) = object.kind.extent();
    let mut transform = format!("translate({} {})", object.left, object.top);
    if object.angle != 0.0 {
        let _ = write!(transform, " rotate({})", object.angle);
    }
    if object.scale_x != 1.0 || object.scale_y != 1.0 {
        let _ = write!(transform, " scale({} {})", object.scale_x, object.scale_y);
    }
    if object.flip_x || object.flip_y {
        let (fx, fy) = (flip(object.flip_x), flip(object.flip_y));
        let tx = if object.flip_x { w } else { 0.0 };
        let ty = if object.flip_y { h } else { 0.0 };
        let _ = write!(transform, " translate({tx} {ty}) scale({fx} {fy})");
    }

    let mut group = format!("  <g id=\"{}\" transform=\"{transform}\"", escape(object.id.as_str()));
    if object.opacity < 1.0 {
        let _ = write!(group, " opacity=\"{}\"", object.opacity);
    }
    out.push_str(&group);
    out.push_str(">\n");

    let paint = paint_attrs(object);
    match &object.kind {
        ObjectKind::Rect { width, height, rx, ry } => {
            let _ = writeln!(
                out,
                "    <rect width=\"{width}\" height=\"{height}\" rx=\"{rx}\" ry=\"{ry}\"{paint} />"
            );
        }
        ObjectKind::Circle { radius } => {
            let _ = writeln!(out, "    <circle cx=\"{radius}\" cy=\"{radius}\" r=\"{radius}\"{paint} />");
        }
        ObjectKind::Ellipse { rx, ry } => {
            let _ = writeln!(out, "    <ellipse cx=\"{rx}\" cy=\"{ry}\" rx=\"{rx}\" ry=\"{ry}\"{paint} />");
        }
        ObjectKind::Triangle { width, height } => {
            let _ = writeln!(
                out,
                "    <polygon points=\"0,{height} {},0 {width},{height}\"{paint} />",
                width / 2.0
            );
        }
        ObjectKind::Line { x1, y1, x2, y2 } => {
            let (ox, oy) = (x1.min(*x2), y1.min(*y2));
            let _ = writeln!(
                out,
                "    <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\"{paint} />",
                x1 - ox,
                y1 - oy,
                x2 - ox,
                y2 - oy
            );
        }
        ObjectKind::Polygon { points, closed } => {
            let min_x = points.iter().map(|p| p.x).fold(f64::MAX, f64::min);
            let min_y = points.iter().map(|p| p.y).fold(f64::MAX, f64::min);
            let list = points
                .iter()
                .map(|p| format!("{},{}", p.x - min_x, p.y - min_y))
                .collect::<Vec<_>>()
                .join(" ");
            let tag = if *closed { "polygon" } else { "polyline" };
            let _ = writeln!(out, "    <{tag} points=\"{list}\"{paint} />");
        }
        ObjectKind::Path { data } => {
            let (d, offset) = match path::parse_path_data(data) {
                Ok(cmds) => (
                    path::emit_path_data(&cmds),
                    path::hull(&cmds).map_or((0.0, 0.0), |b| (b.x, b.y)),
                ),
                Err(_) => (data.clone(), (0.0, 0.0)),
            };
            let _ = writeln!(
                out,
                "    <path transform=\"translate({} {})\" d=\"{}\"{paint} />",
                -offset.0,
                -offset.1,
                escape(&d)
            );
        }
        ObjectKind::Text {
            content,
            font,
            align,
            decorations,
            line_height,
            width,
            ..
        } => {
            let (anchor, x) = match align {
                TextAlign::Center => ("middle", width / 2.0),
                TextAlign::Right => ("end", *width),
                TextAlign::Left | TextAlign::Justify => ("start", 0.0),
            };
            let mut style = format!(
                " font-family=\"{}\" font-size=\"{}\" font-weight=\"{}\" text-anchor=\"{anchor}\"",
                escape(&font.family),
                font.size,
                font.weight
            );
            if font.italic {
                style.push_str(" font-style=\"italic\"");
            }
            let decoration: Vec<&str> = [
                (decorations.underline, "underline"),
                (decorations.linethrough, "line-through"),
                (decorations.overline, "overline"),
            ]
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect();
            if !decoration.is_empty() {
                let _ = write!(style, " text-decoration=\"{}\"", decoration.join(" "));
            }

            let step = font.size * line_height;
            for (i, line) in content.split('\n').enumerate() {
                let y = font.size * 0.9 + i as f64 * step;
                let _ = writeln!(
                    out,
                    "    <text x=\"{x}\" y=\"{y}\"{style}{paint}>{}</text>",
                    escape(line)
                );
            }
        }
        ObjectKind::Image { src, width, height } => {
            let _ = writeln!(
                out,
                "    <image href=\"{}\" width=\"{width}\" height=\"{height}\" preserveAspectRatio=\"none\" />",
                escape(src)
            );
        }
        ObjectKind::Unsupported { .. } => {}
    }
    out.push_str("  </g>\n");
}

fn flip(on: bool) -> f64 {
    if on { -1.0 } else { 1.0 }
}

fn paint_attrs(object: &SceneObject) -> String {
    let fill = object.fill.css().unwrap_or_else(|| "none".into());
    let mut attrs = format!(" fill=\"{}\"", escape(&fill));
    match object.stroke.css() {
        Some(stroke) if object.stroke_width > 0.0 => {
            let _ = write!(
                attrs,
                " stroke=\"{}\" stroke-width=\"{}\"",
                escape(&stroke),
                object.stroke_width
            );
        }
        _ => attrs.push_str(" stroke=\"none\""),
    }
    attrs
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
