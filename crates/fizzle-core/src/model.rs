//! Scene document data model.
//!
//! A scene is a canvas (size + background) holding an ordered list of
//! objects. List order is paint order, back to front, and is preserved
//! exactly through every codec in this crate.
//!
//! Objects are a tagged sum type (`ObjectKind`) over the primitives the
//! editor understands. Anything else read from a fabric document is kept as
//! `ObjectKind::Unsupported` so it survives a lossless JSON round-trip.
//! Fabric keys that the model does not interpret are carried in
//! `SceneObject::extra` for the same reason.

use crate::id::ObjectId;
use crate::path;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use smallvec::SmallVec;

/// Object-format version written into `canvas.version`.
pub const OBJECT_FORMAT_VERSION: &str = "6.0.0";

// ─── Colors & Paint ──────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
pub fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA`. The leading `#` is
    /// required so that CSS color names never parse as hex.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let bytes = hex.strip_prefix('#')?.as_bytes();
        let short = |i: usize| hex_val(bytes[i]).map(|v| (v * 17) as f32 / 255.0);
        let long = |i: usize| {
            let hi = hex_val(bytes[i])?;
            let lo = hex_val(bytes[i + 1])?;
            Some((hi << 4 | lo) as f32 / 255.0)
        };

        match bytes.len() {
            3 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, 1.0)),
            4 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Some(Self::rgba(long(0)?, long(2)?, long(4)?, 1.0)),
            8 => Some(Self::rgba(long(0)?, long(2)?, long(4)?, long(6)?)),
            _ => None,
        }
    }

    /// Emit as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = [self.r, self.g, self.b, self.a].map(|c| (c * 255.0).round() as u8);
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

/// Fill or stroke paint, as fabric stores it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Paint {
    /// `null` or empty string: nothing is painted.
    #[default]
    None,
    /// Any hex color.
    Solid(Color),
    /// Any other CSS color string (`rgb(...)`, `transparent`, `red`).
    Css(String),
    /// A fabric gradient or pattern object, kept verbatim.
    Gradient(Value),
}

impl Paint {
    /// Parse a CSS color string the way fabric accepts it.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return Paint::None;
        }
        match Color::from_hex(s) {
            Some(c) => Paint::Solid(c),
            None => Paint::Css(s.to_string()),
        }
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Paint::None,
            Value::String(s) => Paint::parse(&s),
            other => Paint::Gradient(other),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Paint::None)
    }

    /// CSS color for consumers that need a flat color. Gradients fall back
    /// to their first stop.
    pub fn css(&self) -> Option<String> {
        match self {
            Paint::None => None,
            Paint::Solid(c) => Some(c.to_hex()),
            Paint::Css(s) => Some(s.clone()),
            Paint::Gradient(v) => v
                .get("colorStops")
                .and_then(|stops| stops.get(0))
                .and_then(|stop| stop.get("color"))
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

impl Serialize for Paint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Paint::None => serializer.serialize_none(),
            Paint::Solid(c) => serializer.serialize_str(&c.to_hex()),
            Paint::Css(s) => serializer.serialize_str(s),
            Paint::Gradient(v) => v.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Paint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Paint::from_value)
    }
}

// ─── Geometry ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Polygon vertex list. Shapes created by the editor have at most ten.
pub type Points = SmallVec<[Point; 10]>;

/// Axis-aligned bounding box in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Bounds {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }
}

/// Bounding box of a point set, relative to its own top-left corner.
pub fn points_extent(points: &[Point]) -> (f64, f64) {
    if points.is_empty() {
        return (0.0, 0.0);
    }
    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    (max_x - min_x, max_y - min_y)
}

// ─── Font / Text ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub weight: u16, // 100..900
    pub size: f64,
    pub italic: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Arial".into(),
            weight: 400,
            size: 20.0,
            italic: false,
        }
    }
}

impl FontSpec {
    pub fn is_bold(&self) -> bool {
        self.weight >= 600
    }
}

/// Parse a CSS font weight (`"bold"`, `"normal"`, `700`, `"600"`).
pub fn parse_font_weight(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|w| u16::try_from(w).ok()),
        Value::String(s) => match s.as_str() {
            "normal" => Some(400),
            "bold" => Some(700),
            "lighter" => Some(300),
            "bolder" => Some(800),
            other => other.parse().ok(),
        },
        _ => None,
    }
}

fn font_weight_value(weight: u16) -> Value {
    match weight {
        400 => Value::from("normal"),
        700 => Value::from("bold"),
        w => Value::from(w),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    /// Lenient parse; fabric's `justify-left` style variants map to `Justify`.
    pub fn parse(s: &str) -> Self {
        match s {
            "center" => TextAlign::Center,
            "right" => TextAlign::Right,
            s if s.starts_with("justify") => TextAlign::Justify,
            _ => TextAlign::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
            TextAlign::Justify => "justify",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextDecorations {
    pub underline: bool,
    pub linethrough: bool,
    pub overline: bool,
}

/// Which fabric text class a text object came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFlavor {
    Text,
    IText,
    #[default]
    Textbox,
}

impl TextFlavor {
    pub fn type_name(self) -> &'static str {
        match self {
            TextFlavor::Text => "text",
            TextFlavor::IText => "i-text",
            TextFlavor::Textbox => "textbox",
        }
    }
}

// ─── Locking ─────────────────────────────────────────────────────────────

/// Interaction restrictions. The editor only ever sets or clears the
/// whole set together; see [`LockFlags::lock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockFlags {
    pub movement_x: bool,
    pub movement_y: bool,
    pub rotation: bool,
    pub scaling_x: bool,
    pub scaling_y: bool,
    pub uni_scaling: bool,
    pub editable: bool,
}

impl Default for LockFlags {
    fn default() -> Self {
        Self::unlocked()
    }
}

impl LockFlags {
    pub const fn unlocked() -> Self {
        Self {
            movement_x: false,
            movement_y: false,
            rotation: false,
            scaling_x: false,
            scaling_y: false,
            uni_scaling: false,
            editable: true,
        }
    }

    pub const fn locked() -> Self {
        Self {
            movement_x: true,
            movement_y: true,
            rotation: true,
            scaling_x: true,
            scaling_y: true,
            uni_scaling: true,
            editable: false,
        }
    }

    pub fn lock(&mut self) {
        *self = Self::locked();
    }

    pub fn unlock(&mut self) {
        *self = Self::unlocked();
    }

    /// An object counts as locked when horizontal movement is locked.
    pub fn is_locked(&self) -> bool {
        self.movement_x
    }

    /// Flip the whole set. Returns the new locked state.
    pub fn toggle(&mut self) -> bool {
        if self.is_locked() {
            self.unlock();
        } else {
            self.lock();
        }
        self.is_locked()
    }
}

// ─── Scene Objects ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Rect {
        width: f64,
        height: f64,
        rx: f64,
        ry: f64,
    },
    Circle {
        radius: f64,
    },
    Ellipse {
        rx: f64,
        ry: f64,
    },
    Triangle {
        width: f64,
        height: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    Polygon {
        points: Points,
        /// `false` for fabric polylines.
        closed: bool,
    },
    /// SVG path grammar string.
    Path {
        data: String,
    },
    Text {
        content: String,
        font: FontSpec,
        align: TextAlign,
        decorations: TextDecorations,
        line_height: f64,
        char_spacing: f64,
        /// Box width (textboxes wrap to it).
        width: f64,
        flavor: TextFlavor,
    },
    Image {
        src: String,
        width: f64,
        height: f64,
    },
    /// Any fabric type this model does not interpret (groups, custom
    /// classes). Its own properties live in `SceneObject::extra`.
    Unsupported {
        type_name: String,
        width: f64,
        height: f64,
    },
}

impl ObjectKind {
    /// The fabric `type` tag this kind is written with. Unsupported objects
    /// keep the tag exactly as it was read.
    pub fn type_name(&self) -> &str {
        match self {
            ObjectKind::Rect { .. } => "rect",
            ObjectKind::Circle { .. } => "circle",
            ObjectKind::Ellipse { .. } => "ellipse",
            ObjectKind::Triangle { .. } => "triangle",
            ObjectKind::Line { .. } => "line",
            ObjectKind::Polygon { closed: true, .. } => "polygon",
            ObjectKind::Polygon { closed: false, .. } => "polyline",
            ObjectKind::Path { .. } => "path",
            ObjectKind::Text { flavor, .. } => flavor.type_name(),
            ObjectKind::Image { .. } => "image",
            ObjectKind::Unsupported { type_name, .. } => type_name,
        }
    }

    /// Prefix for generated ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ObjectKind::Rect { .. } => "rect",
            ObjectKind::Circle { .. } => "circle",
            ObjectKind::Ellipse { .. } => "ellipse",
            ObjectKind::Triangle { .. } => "triangle",
            ObjectKind::Line { .. } => "line",
            ObjectKind::Polygon { .. } => "polygon",
            ObjectKind::Path { .. } => "path",
            ObjectKind::Text { .. } => "text",
            ObjectKind::Image { .. } => "image",
            ObjectKind::Unsupported { .. } => "object",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ObjectKind::Text { .. })
    }

    /// Unscaled width and height.
    pub fn extent(&self) -> (f64, f64) {
        match self {
            ObjectKind::Rect { width, height, .. }
            | ObjectKind::Triangle { width, height }
            | ObjectKind::Image { width, height, .. }
            | ObjectKind::Unsupported { width, height, .. } => (*width, *height),
            ObjectKind::Circle { radius } => (radius * 2.0, radius * 2.0),
            ObjectKind::Ellipse { rx, ry } => (rx * 2.0, ry * 2.0),
            ObjectKind::Line { x1, y1, x2, y2 } => ((x2 - x1).abs(), (y2 - y1).abs()),
            ObjectKind::Polygon { points, .. } => points_extent(points),
            ObjectKind::Path { data } => match path::parse_path_data(data) {
                Ok(cmds) => path::extent(&cmds),
                Err(_) => (0.0, 0.0),
            },
            ObjectKind::Text {
                content,
                font,
                line_height,
                width,
                ..
            } => {
                let lines = content.split('\n').count().max(1) as f64;
                (*width, lines * font.size * line_height)
            }
        }
    }
}

/// One visual primitive on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireObject", into = "WireObject")]
pub struct SceneObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub left: f64,
    pub top: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Rotation in degrees.
    pub angle: f64,
    /// Clamped to 0..=1.
    pub opacity: f64,
    pub flip_x: bool,
    pub flip_y: bool,
    pub fill: Paint,
    pub stroke: Paint,
    pub stroke_width: f64,
    pub lock: LockFlags,
    /// Fabric keys the model does not interpret, preserved for export.
    pub extra: Map<String, Value>,
}

impl SceneObject {
    pub fn new(id: ObjectId, kind: ObjectKind) -> Self {
        Self {
            id,
            kind,
            left: 0.0,
            top: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            opacity: 1.0,
            flip_x: false,
            flip_y: false,
            fill: Paint::Solid(Color::BLACK),
            stroke: Paint::None,
            stroke_width: 1.0,
            lock: LockFlags::unlocked(),
            extra: Map::new(),
        }
    }

    /// Axis-aligned bounds (rotation ignored).
    pub fn bounds(&self) -> Bounds {
        let (w, h) = self.kind.extent();
        Bounds {
            x: self.left,
            y: self.top,
            width: w * self.scale_x.abs(),
            height: h * self.scale_y.abs(),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }
}

// ─── Fabric wire form ────────────────────────────────────────────────────

fn one() -> f64 {
    1.0
}

fn black() -> Paint {
    Paint::Solid(Color::BLACK)
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Fabric's flat object JSON. Only used to (de)serialize `SceneObject`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireObject {
    #[serde(rename = "type", default)]
    type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<ObjectId>,
    #[serde(default)]
    left: f64,
    #[serde(default)]
    top: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<f64>,
    #[serde(default = "one")]
    scale_x: f64,
    #[serde(default = "one")]
    scale_y: f64,
    #[serde(default)]
    angle: f64,
    #[serde(default = "one")]
    opacity: f64,
    #[serde(default)]
    flip_x: bool,
    #[serde(default)]
    flip_y: bool,
    #[serde(default = "black")]
    fill: Paint,
    #[serde(default)]
    stroke: Paint,
    #[serde(default = "one")]
    stroke_width: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    rx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ry: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    points: Option<Points>,
    /// String or fabric's `[["M", x, y], ...]` array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_weight: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text_align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    linethrough: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    overline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    char_spacing: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    src: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    lock_movement_x: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    lock_movement_y: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    lock_rotation: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    lock_scaling_x: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    lock_scaling_y: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    lock_uni_scaling: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    editable: Option<bool>,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<WireObject> for SceneObject {
    fn from(w: WireObject) -> Self {
        let size = |v: Option<f64>| v.unwrap_or(0.0);
        let kind = match w.type_name.to_ascii_lowercase().as_str() {
            "rect" => ObjectKind::Rect {
                width: size(w.width),
                height: size(w.height),
                rx: size(w.rx),
                ry: size(w.ry),
            },
            "circle" => ObjectKind::Circle {
                radius: w
                    .radius
                    .unwrap_or_else(|| size(w.width).max(size(w.height)) / 2.0),
            },
            "ellipse" => ObjectKind::Ellipse {
                rx: size(w.rx),
                ry: size(w.ry),
            },
            "triangle" => ObjectKind::Triangle {
                width: size(w.width),
                height: size(w.height),
            },
            "line" => ObjectKind::Line {
                x1: size(w.x1),
                y1: size(w.y1),
                x2: size(w.x2),
                y2: size(w.y2),
            },
            t @ ("polygon" | "polyline") => ObjectKind::Polygon {
                points: w.points.clone().unwrap_or_default(),
                closed: t == "polygon",
            },
            "path" => ObjectKind::Path {
                data: w.path.as_ref().map(path::data_from_value).unwrap_or_default(),
            },
            t @ ("text" | "i-text" | "itext" | "textbox" | "fabrictext") => {
                let flavor = match t {
                    "textbox" => TextFlavor::Textbox,
                    "i-text" | "itext" => TextFlavor::IText,
                    _ => TextFlavor::Text,
                };
                ObjectKind::Text {
                    content: w.text.clone().unwrap_or_default(),
                    font: FontSpec {
                        family: w.font_family.clone().unwrap_or_else(|| "Times New Roman".into()),
                        weight: w.font_weight.as_ref().and_then(parse_font_weight).unwrap_or(400),
                        size: w.font_size.unwrap_or(40.0),
                        italic: w.font_style.as_deref() == Some("italic"),
                    },
                    align: w.text_align.as_deref().map(TextAlign::parse).unwrap_or_default(),
                    decorations: TextDecorations {
                        underline: w.underline.unwrap_or(false),
                        linethrough: w.linethrough.unwrap_or(false),
                        overline: w.overline.unwrap_or(false),
                    },
                    line_height: w.line_height.unwrap_or(1.16),
                    char_spacing: w.char_spacing.unwrap_or(0.0),
                    width: size(w.width),
                    flavor,
                }
            }
            "image" => ObjectKind::Image {
                src: w.src.clone().unwrap_or_default(),
                width: size(w.width),
                height: size(w.height),
            },
            _ => ObjectKind::Unsupported {
                type_name: w.type_name.clone(),
                width: size(w.width),
                height: size(w.height),
            },
        };

        let id = w
            .name
            .filter(|name| !name.is_blank())
            .unwrap_or_else(|| ObjectId::numbered(kind.id_prefix()));
        SceneObject {
            id,
            kind,
            left: w.left,
            top: w.top,
            scale_x: w.scale_x,
            scale_y: w.scale_y,
            angle: w.angle,
            opacity: w.opacity.clamp(0.0, 1.0),
            flip_x: w.flip_x,
            flip_y: w.flip_y,
            fill: w.fill,
            stroke: w.stroke,
            stroke_width: w.stroke_width,
            lock: LockFlags {
                movement_x: w.lock_movement_x,
                movement_y: w.lock_movement_y,
                rotation: w.lock_rotation,
                scaling_x: w.lock_scaling_x,
                scaling_y: w.lock_scaling_y,
                uni_scaling: w.lock_uni_scaling,
                editable: w.editable.unwrap_or(true),
            },
            extra: w.extra,
        }
    }
}

impl From<SceneObject> for WireObject {
    fn from(o: SceneObject) -> Self {
        let mut w = WireObject {
            type_name: o.kind.type_name().to_string(),
            name: Some(o.id),
            left: o.left,
            top: o.top,
            width: None,
            height: None,
            scale_x: o.scale_x,
            scale_y: o.scale_y,
            angle: o.angle,
            opacity: o.opacity,
            flip_x: o.flip_x,
            flip_y: o.flip_y,
            fill: o.fill,
            stroke: o.stroke,
            stroke_width: o.stroke_width,
            rx: None,
            ry: None,
            radius: None,
            x1: None,
            y1: None,
            x2: None,
            y2: None,
            points: None,
            path: None,
            text: None,
            font_size: None,
            font_family: None,
            font_weight: None,
            font_style: None,
            text_align: None,
            underline: None,
            linethrough: None,
            overline: None,
            line_height: None,
            char_spacing: None,
            src: None,
            lock_movement_x: o.lock.movement_x,
            lock_movement_y: o.lock.movement_y,
            lock_rotation: o.lock.rotation,
            lock_scaling_x: o.lock.scaling_x,
            lock_scaling_y: o.lock.scaling_y,
            lock_uni_scaling: o.lock.uni_scaling,
            editable: (!o.lock.editable).then_some(false),
            extra: o.extra,
        };

        let (extent_w, extent_h) = o.kind.extent();
        match o.kind {
            ObjectKind::Rect { width, height, rx, ry } => {
                w.width = Some(width);
                w.height = Some(height);
                w.rx = Some(rx);
                w.ry = Some(ry);
            }
            ObjectKind::Circle { radius } => {
                w.radius = Some(radius);
                w.width = Some(radius * 2.0);
                w.height = Some(radius * 2.0);
            }
            ObjectKind::Ellipse { rx, ry } => {
                w.rx = Some(rx);
                w.ry = Some(ry);
                w.width = Some(rx * 2.0);
                w.height = Some(ry * 2.0);
            }
            ObjectKind::Triangle { width, height } | ObjectKind::Unsupported { width, height, .. } => {
                w.width = Some(width);
                w.height = Some(height);
            }
            ObjectKind::Line { x1, y1, x2, y2 } => {
                w.x1 = Some(x1);
                w.y1 = Some(y1);
                w.x2 = Some(x2);
                w.y2 = Some(y2);
            }
            ObjectKind::Polygon { points, .. } => {
                w.width = Some(extent_w);
                w.height = Some(extent_h);
                w.points = Some(points);
            }
            ObjectKind::Path { data } => {
                w.width = Some(extent_w);
                w.height = Some(extent_h);
                w.path = Some(Value::String(data));
            }
            ObjectKind::Text {
                content,
                font,
                align,
                decorations,
                line_height,
                char_spacing,
                width,
                ..
            } => {
                w.width = Some(width);
                w.text = Some(content);
                w.font_size = Some(font.size);
                w.font_weight = Some(font_weight_value(font.weight));
                w.font_style = Some(if font.italic { "italic" } else { "normal" }.into());
                w.font_family = Some(font.family);
                w.text_align = Some(align.as_str().to_string());
                w.underline = Some(decorations.underline);
                w.linethrough = Some(decorations.linethrough);
                w.overline = Some(decorations.overline);
                w.line_height = Some(line_height);
                w.char_spacing = Some(char_spacing);
            }
            ObjectKind::Image { src, width, height } => {
                w.src = Some(src);
                w.width = Some(width);
                w.height = Some(height);
            }
        }
        w
    }
}

// ─── Background ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    #[default]
    Cover,
    Contain,
    Stretch,
    Original,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundImage {
    pub src: String,
    #[serde(default)]
    pub fit: ImageFit,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Background {
    pub color: Option<Paint>,
    pub image: Option<BackgroundImage>,
}

// ─── Scene Document ──────────────────────────────────────────────────────

/// The live scene: canvas size, background, and objects in paint order.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDocument {
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub background: Background,
    pub objects: Vec<SceneObject>,
}

impl SceneDocument {
    pub const DEFAULT_NAME: &'static str = "Fizzle Design";

    pub fn new(width: f64, height: f64) -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            width,
            height,
            background: Background {
                color: Some(Paint::Solid(Color::WHITE)),
                image: None,
            },
            objects: Vec::new(),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.index_of(id).is_some()
    }

    /// An id with the given prefix that no object in this scene uses.
    pub fn fresh_id(&self, prefix: &str) -> ObjectId {
        loop {
            let id = ObjectId::numbered(prefix);
            if !self.contains(id) {
                return id;
            }
        }
    }

    /// Append on top of the paint order.
    pub fn push(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let idx = self.index_of(id)?;
        Some(self.objects.remove(idx))
    }

    /// Bounds covering every object, or `None` for an empty scene.
    pub fn content_bounds(&self) -> Option<Bounds> {
        self.objects
            .iter()
            .map(SceneObject::bounds)
            .reduce(|acc, b| acc.union(&b))
    }

    // ─── Z-order ─────────────────────────────────────────────────────────

    /// Move an object one step backward in paint order.
    /// Returns true if the order changed.
    pub fn send_backward(&mut self, id: ObjectId) -> bool {
        match self.index_of(id) {
            Some(pos) if pos > 0 => self.reinsert(pos, pos - 1),
            _ => false,
        }
    }

    /// Move an object one step forward in paint order.
    pub fn bring_forward(&mut self, id: ObjectId) -> bool {
        match self.index_of(id) {
            Some(pos) if pos + 1 < self.objects.len() => self.reinsert(pos, pos + 1),
            _ => false,
        }
    }

    /// Move an object to the back (first in paint order).
    pub fn send_to_back(&mut self, id: ObjectId) -> bool {
        match self.index_of(id) {
            Some(pos) if pos > 0 => self.reinsert(pos, 0),
            _ => false,
        }
    }

    /// Move an object to the front (last in paint order).
    pub fn bring_to_front(&mut self, id: ObjectId) -> bool {
        let last = self.objects.len().saturating_sub(1);
        match self.index_of(id) {
            Some(pos) if pos < last => self.reinsert(pos, last),
            _ => false,
        }
    }

    fn reinsert(&mut self, from: usize, to: usize) -> bool {
        let object = self.objects.remove(from);
        self.objects.insert(to, object);
        true
    }
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self::new(650.0, 650.0)
    }
}
