//! Shape factory for the editor's "add element" actions.
//!
//! Every shape is created around a given center point with the editor's
//! stock styling; a [`ShapeProps`] bag overrides any of it.

use crate::id::ObjectId;
use crate::model::{
    Color, FontSpec, ObjectKind, Paint, Point, Points, SceneObject, TextAlign, TextDecorations,
    TextFlavor,
};
use std::f64::consts::PI;

const DEFAULT_STROKE: Color = Color::BLACK;
const TEXT_BOX_WIDTH: f64 = 200.0;
const TEXT_LINE_HEIGHT: f64 = 1.16;

/// Text styles offered by the text panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextPreset {
    #[default]
    Default,
    Heading,
    Subheading,
    Body,
}

impl TextPreset {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" | "" => Some(TextPreset::Default),
            "heading" => Some(TextPreset::Heading),
            "subheading" => Some(TextPreset::Subheading),
            "body" => Some(TextPreset::Body),
            _ => None,
        }
    }

    /// `(content, fill, font size)`.
    fn style(self) -> (&'static str, &'static str, f64) {
        match self {
            TextPreset::Default => ("Click to edit", "#000000", 24.0),
            TextPreset::Heading => ("Heading", "#1f2937", 32.0),
            TextPreset::Subheading => ("Subheading", "#374151", 24.0),
            TextPreset::Body => ("Body text", "#6b7280", 16.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rect,
    RoundedRect,
    Circle,
    Triangle,
    Star,
    Text(TextPreset),
}

impl ShapeKind {
    /// Parse the toolbar names (`rect`, `rounded-rectangle`, `circle`,
    /// `triangle`, `star`, `text`, `heading`, `subheading`, `body`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rect" | "rectangle" => Some(ShapeKind::Rect),
            "rounded-rectangle" | "rounded-rect" => Some(ShapeKind::RoundedRect),
            "circle" => Some(ShapeKind::Circle),
            "triangle" => Some(ShapeKind::Triangle),
            "star" => Some(ShapeKind::Star),
            "text" => Some(ShapeKind::Text(TextPreset::Default)),
            other => TextPreset::parse(other).map(ShapeKind::Text),
        }
    }
}

/// Optional overrides applied on top of a shape's stock styling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeProps {
    pub fill: Option<Paint>,
    pub stroke: Option<Paint>,
    pub stroke_width: Option<f64>,
    pub opacity: Option<f64>,
    /// Corner radius for plain rectangles.
    pub corner_radius: Option<f64>,
    pub text: Option<String>,
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    pub font_weight: Option<u16>,
    pub italic: Option<bool>,
    pub align: Option<TextAlign>,
}

/// Build a new object of `kind` positioned around `center`.
pub fn create_shape(
    kind: ShapeKind,
    id: ObjectId,
    center: (f64, f64),
    props: &ShapeProps,
) -> SceneObject {
    let (cx, cy) = center;
    let (object_kind, left, top, fill) = match kind {
        ShapeKind::Rect => {
            let r = props.corner_radius.unwrap_or(0.0);
            (
                ObjectKind::Rect {
                    width: 100.0,
                    height: 100.0,
                    rx: r,
                    ry: r,
                },
                cx - 50.0,
                cy - 50.0,
                "#ff6b6b",
            )
        }
        ShapeKind::RoundedRect => (
            ObjectKind::Rect {
                width: 200.0,
                height: 100.0,
                rx: 25.0,
                ry: 25.0,
            },
            cx - 100.0,
            cy - 50.0,
            "#8B5CF6",
        ),
        ShapeKind::Circle => (ObjectKind::Circle { radius: 50.0 }, cx - 50.0, cy - 50.0, "#4ecdc4"),
        ShapeKind::Triangle => (
            ObjectKind::Polygon {
                points: triangle_points(),
                closed: true,
            },
            cx,
            cy,
            "#10B981",
        ),
        ShapeKind::Star => (
            ObjectKind::Polygon {
                points: star_points(5, 50.0, 25.0),
                closed: true,
            },
            cx,
            cy,
            "#F59E0B",
        ),
        ShapeKind::Text(preset) => return create_text(preset, id, center, props),
    };

    let mut object = SceneObject::new(id, object_kind);
    object.left = left;
    object.top = top;
    object.fill = Paint::parse(fill);
    object.stroke = Paint::Solid(DEFAULT_STROKE);
    object.stroke_width = 0.0;
    apply_paint_props(&mut object, props);
    object
}

fn create_text(
    preset: TextPreset,
    id: ObjectId,
    (cx, cy): (f64, f64),
    props: &ShapeProps,
) -> SceneObject {
    let (content, fill, size) = preset.style();
    let defaults = FontSpec::default();
    let font = FontSpec {
        family: props.font_family.clone().unwrap_or(defaults.family),
        weight: props.font_weight.unwrap_or(defaults.weight),
        size: props.font_size.unwrap_or(size),
        italic: props.italic.unwrap_or(false),
    };
    let mut object = SceneObject::new(
        id,
        ObjectKind::Text {
            content: props.text.clone().unwrap_or_else(|| content.to_string()),
            font,
            align: props.align.unwrap_or_default(),
            decorations: TextDecorations::default(),
            line_height: TEXT_LINE_HEIGHT,
            char_spacing: 0.0,
            width: TEXT_BOX_WIDTH,
            flavor: TextFlavor::Textbox,
        },
    );
    object.left = cx;
    object.top = cy;
    object.fill = Paint::parse(fill);
    object.stroke = Paint::None;
    object.stroke_width = 1.0;
    apply_paint_props(&mut object, props);
    object
}

fn apply_paint_props(object: &mut SceneObject, props: &ShapeProps) {
    if let Some(fill) = &props.fill {
        object.fill = fill.clone();
    }
    if let Some(stroke) = &props.stroke {
        object.stroke = stroke.clone();
    }
    if let Some(width) = props.stroke_width {
        object.stroke_width = width.max(0.0);
    }
    if let Some(opacity) = props.opacity {
        object.opacity = opacity.clamp(0.0, 1.0);
    }
}

/// Equilateral-ish triangle around the origin, apex up.
fn triangle_points() -> Points {
    [(0.0, -50.0), (-43.3, 25.0), (43.3, 25.0)]
        .into_iter()
        .map(|(x, y)| Point::new(x, y))
        .collect()
}

/// Star outline alternating between the outer and inner radius.
pub fn star_points(spikes: usize, outer: f64, inner: f64) -> Points {
    (0..spikes * 2)
        .map(|i| {
            let radius = if i % 2 == 0 { outer } else { inner };
            let angle = i as f64 * PI / spikes as f64;
            Point::new(angle.cos() * radius, angle.sin() * radius)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CENTER: (f64, f64) = (325.0, 325.0);

    fn make(kind: ShapeKind) -> SceneObject {
        create_shape(kind, ObjectId::intern("shape_test"), CENTER, &ShapeProps::default())
    }

    #[test]
    fn rect_is_centered() {
        let rect = make(ShapeKind::Rect);
        assert_eq!(rect.bounds().center(), CENTER);
        assert_eq!(rect.fill, Paint::parse("#ff6b6b"));
        assert_eq!(rect.stroke_width, 0.0);
    }

    #[test]
    fn rounded_rect_has_fixed_radius() {
        let rect = make(ShapeKind::RoundedRect);
        assert_eq!(
            rect.kind,
            ObjectKind::Rect {
                width: 200.0,
                height: 100.0,
                rx: 25.0,
                ry: 25.0
            }
        );
        assert_eq!(rect.bounds().center(), CENTER);
    }

    #[test]
    fn star_has_ten_alternating_points() {
        let points = star_points(5, 50.0, 25.0);
        assert_eq!(points.len(), 10);
        assert_eq!(points[0], Point::new(50.0, 0.0));
        let inner = (points[1].x.powi(2) + points[1].y.powi(2)).sqrt();
        assert!((inner - 25.0).abs() < 1e-9);
    }

    #[test]
    fn text_presets() {
        let heading = make(ShapeKind::Text(TextPreset::Heading));
        match &heading.kind {
            ObjectKind::Text { content, font, .. } => {
                assert_eq!(content, "Heading");
                assert_eq!(font.size, 32.0);
                assert_eq!(font.family, "Arial");
            }
            other => panic!("expected text, got {other:?}"),
        }
        assert_eq!(heading.fill.css().as_deref(), Some("#1f2937"));
        assert_eq!((heading.left, heading.top), CENTER);
    }

    #[test]
    fn props_override_defaults() {
        let props = ShapeProps {
            fill: Some(Paint::parse("#123456")),
            opacity: Some(1.5),
            corner_radius: Some(8.0),
            ..ShapeProps::default()
        };
        let rect = create_shape(ShapeKind::Rect, ObjectId::intern("p"), CENTER, &props);
        assert_eq!(rect.fill, Paint::parse("#123456"));
        assert_eq!(rect.opacity, 1.0);
        assert!(matches!(rect.kind, ObjectKind::Rect { rx: 8.0, ry: 8.0, .. }));
    }

    #[test]
    fn parses_toolbar_names() {
        assert_eq!(ShapeKind::parse("rounded-rectangle"), Some(ShapeKind::RoundedRect));
        assert_eq!(ShapeKind::parse("body"), Some(ShapeKind::Text(TextPreset::Body)));
        assert_eq!(ShapeKind::parse("hexagon"), None);
    }
}
