//! Object commands.
//!
//! Every scene mutation the toolbar, panels and shortcuts can issue is a
//! [`Command`]. `apply` validates its target before touching the scene, so
//! an `Err` always means nothing changed and nothing must be recorded.

use crate::config::EditorConfig;
use fizzle_core::error::CoreError;
use fizzle_core::id::ObjectId;
use fizzle_core::model::{ObjectKind, Paint, SceneDocument, SceneObject, TextAlign};
use fizzle_core::shapes::{ShapeKind, ShapeProps, create_shape};

const LINE_HEIGHT_RESET: f64 = 1.2;
const WEIGHT_NORMAL: u16 = 400;
const WEIGHT_BOLD: u16 = 700;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("no object selected")]
    NoSelection,

    #[error("object not found: {0}")]
    NotFound(ObjectId),

    #[error("object {0} is locked")]
    Locked(ObjectId),

    #[error("object {0} is not a text object")]
    NotText(ObjectId),

    #[error("no design with id `{0}` in history")]
    UnknownDesign(String),

    #[error(transparent)]
    Document(#[from] CoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterCase {
    Upper,
    Lower,
    /// First letter of every word.
    Capitalize,
    /// Leaves the text as it is.
    None,
}

impl LetterCase {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upper" | "uppercase" => Some(LetterCase::Upper),
            "lower" | "lowercase" => Some(LetterCase::Lower),
            "capitalize" | "title" => Some(LetterCase::Capitalize),
            "none" => Some(LetterCase::None),
            _ => None,
        }
    }

    pub fn apply(self, text: &str) -> String {
        match self {
            LetterCase::Upper => text.to_uppercase(),
            LetterCase::Lower => text.to_lowercase(),
            LetterCase::None => text.to_string(),
            LetterCase::Capitalize => {
                let mut out = String::with_capacity(text.len());
                let mut in_word = false;
                for c in text.chars() {
                    let word_char = c.is_alphanumeric() || c == '_';
                    if word_char && !in_word {
                        out.extend(c.to_uppercase());
                    } else {
                        out.push(c);
                    }
                    in_word = word_char;
                }
                out
            }
        }
    }
}

/// Style edits from the object toolbar.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleAction {
    // ── Text only ──
    ToggleBold,
    ToggleItalic,
    ToggleUnderline,
    ToggleStrikethrough,
    Align(TextAlign),
    FontSize(f64),
    FontFamily(String),
    CharSpacing(f64),
    LineHeight(f64),
    LetterCase(LetterCase),
    /// Char spacing back to 0 and line height back to 1.2.
    ResetSpacing,

    // ── Any object ──
    Fill(Paint),
    Stroke(Paint),
    StrokeWidth(f64),
    Opacity(f64),
    /// Degrees added to the current angle.
    RotateBy(f64),
    FlipHorizontal,
    FlipVertical,
}

impl StyleAction {
    pub fn is_text_only(&self) -> bool {
        matches!(
            self,
            StyleAction::ToggleBold
                | StyleAction::ToggleItalic
                | StyleAction::ToggleUnderline
                | StyleAction::ToggleStrikethrough
                | StyleAction::Align(_)
                | StyleAction::FontSize(_)
                | StyleAction::FontFamily(_)
                | StyleAction::CharSpacing(_)
                | StyleAction::LineHeight(_)
                | StyleAction::LetterCase(_)
                | StyleAction::ResetSpacing
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            StyleAction::ToggleBold => "Bold",
            StyleAction::ToggleItalic => "Italic",
            StyleAction::ToggleUnderline => "Underline",
            StyleAction::ToggleStrikethrough => "Strikethrough",
            StyleAction::Align(_) => "Text Align",
            StyleAction::FontSize(_) => "Font Size",
            StyleAction::FontFamily(_) => "Font Family",
            StyleAction::CharSpacing(_) => "Letter Spacing",
            StyleAction::LineHeight(_) => "Line Height",
            StyleAction::LetterCase(_) => "Letter Case",
            StyleAction::ResetSpacing => "Reset Spacing",
            StyleAction::Fill(_) => "Fill",
            StyleAction::Stroke(_) => "Stroke",
            StyleAction::StrokeWidth(_) => "Stroke Width",
            StyleAction::Opacity(_) => "Opacity",
            StyleAction::RotateBy(_) => "Rotate",
            StyleAction::FlipHorizontal => "Flip Horizontal",
            StyleAction::FlipVertical => "Flip Vertical",
        }
    }

    fn apply(&self, object: &mut SceneObject) {
        if let ObjectKind::Text {
            content,
            font,
            align,
            decorations,
            line_height,
            char_spacing,
            ..
        } = &mut object.kind
        {
            match self {
                StyleAction::ToggleBold => {
                    font.weight = if font.is_bold() { WEIGHT_NORMAL } else { WEIGHT_BOLD };
                    return;
                }
                StyleAction::ToggleItalic => {
                    font.italic = !font.italic;
                    return;
                }
                StyleAction::ToggleUnderline => {
                    decorations.underline = !decorations.underline;
                    return;
                }
                StyleAction::ToggleStrikethrough => {
                    decorations.linethrough = !decorations.linethrough;
                    return;
                }
                StyleAction::Align(a) => {
                    *align = *a;
                    return;
                }
                StyleAction::FontSize(size) => {
                    font.size = size.max(1.0);
                    return;
                }
                StyleAction::FontFamily(family) => {
                    font.family = family.clone();
                    return;
                }
                StyleAction::CharSpacing(spacing) => {
                    *char_spacing = *spacing;
                    return;
                }
                StyleAction::LineHeight(height) => {
                    *line_height = height.max(0.1);
                    return;
                }
                StyleAction::LetterCase(case) => {
                    *content = case.apply(content);
                    return;
                }
                StyleAction::ResetSpacing => {
                    *char_spacing = 0.0;
                    *line_height = LINE_HEIGHT_RESET;
                    return;
                }
                _ => {}
            }
        }

        match self {
            StyleAction::Fill(paint) => object.fill = paint.clone(),
            StyleAction::Stroke(paint) => object.stroke = paint.clone(),
            StyleAction::StrokeWidth(width) => object.stroke_width = width.max(0.0),
            StyleAction::Opacity(opacity) => object.opacity = opacity.clamp(0.0, 1.0),
            StyleAction::RotateBy(degrees) => {
                object.angle = (object.angle + degrees).rem_euclid(360.0);
            }
            StyleAction::FlipHorizontal => object.flip_x = !object.flip_x,
            StyleAction::FlipVertical => object.flip_y = !object.flip_y,
            // Text-only actions are rejected for other kinds before apply.
            _ => {}
        }
    }
}

/// A scene mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Create a shape centered on the canvas.
    Create { kind: ShapeKind, props: ShapeProps },
    /// Add an image centered on the canvas, scaled down to fit.
    AddImage { src: String, width: f64, height: f64 },
    Duplicate(ObjectId),
    ToggleLock(ObjectId),
    BringToFront(ObjectId),
    SendToBack(ObjectId),
    BringForward(ObjectId),
    SendBackward(ObjectId),
    Delete(ObjectId),
    Move { id: ObjectId, dx: f64, dy: f64 },
    Style(ObjectId, StyleAction),
}

/// How a command wants the selection updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Keep,
    Select(ObjectId),
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// False when the command was valid but left the scene as it was
    /// (e.g. bringing the topmost object to the front).
    pub changed: bool,
    pub selection: SelectionChange,
}

impl Outcome {
    fn changed(changed: bool) -> Self {
        Self {
            changed,
            selection: SelectionChange::Keep,
        }
    }

    fn select(id: ObjectId) -> Self {
        Self {
            changed: true,
            selection: SelectionChange::Select(id),
        }
    }
}

impl Command {
    /// History label.
    pub fn label(&self) -> &'static str {
        match self {
            Command::Create { kind, .. } => match kind {
                ShapeKind::Text(_) => "Add Text",
                _ => "Add Shape",
            },
            Command::AddImage { .. } => "Add Image",
            Command::Duplicate(_) => "Duplicate",
            Command::ToggleLock(_) => "Toggle Lock",
            Command::BringToFront(_) => "Bring to Front",
            Command::SendToBack(_) => "Send to Back",
            Command::BringForward(_) => "Bring Forward",
            Command::SendBackward(_) => "Send Backward",
            Command::Delete(_) => "Delete",
            Command::Move { .. } => "Move",
            Command::Style(_, action) => action.label(),
        }
    }

    /// The object this command acts on, if any.
    pub fn target(&self) -> Option<ObjectId> {
        match self {
            Command::Create { .. } | Command::AddImage { .. } => None,
            Command::Duplicate(id)
            | Command::ToggleLock(id)
            | Command::BringToFront(id)
            | Command::SendToBack(id)
            | Command::BringForward(id)
            | Command::SendBackward(id)
            | Command::Delete(id)
            | Command::Move { id, .. }
            | Command::Style(id, _) => Some(*id),
        }
    }

    /// Validate against the scene without mutating it.
    pub fn validate(&self, scene: &SceneDocument) -> Result<(), CommandError> {
        let Some(id) = self.target() else {
            return Ok(());
        };
        let object = scene.get(id).ok_or(CommandError::NotFound(id))?;
        match self {
            Command::Move { dx, dy, .. } => {
                let blocked = (*dx != 0.0 && object.lock.movement_x)
                    || (*dy != 0.0 && object.lock.movement_y);
                if blocked {
                    return Err(CommandError::Locked(id));
                }
            }
            Command::Style(_, action) if action.is_text_only() && !object.kind.is_text() => {
                return Err(CommandError::NotText(id));
            }
            _ => {}
        }
        Ok(())
    }

    /// Validate, then mutate the scene.
    pub fn apply(
        &self,
        scene: &mut SceneDocument,
        config: &EditorConfig,
    ) -> Result<Outcome, CommandError> {
        self.validate(scene)?;

        let outcome = match self {
            Command::Create { kind, props } => {
                let id = scene.fresh_id(shape_prefix(*kind));
                let shape = create_shape(*kind, id, scene.center(), props);
                scene.push(shape);
                Outcome::select(id)
            }
            Command::AddImage { src, width, height } => {
                let id = scene.fresh_id("image");
                let image = place_image(scene, id, src, *width, *height);
                scene.push(image);
                Outcome::select(id)
            }
            Command::Duplicate(id) => {
                let source = scene.get(*id).ok_or(CommandError::NotFound(*id))?;
                let mut copy = source.clone();
                copy.id = scene.fresh_id(source.kind.id_prefix());
                copy.left += config.duplicate_offset.0;
                copy.top += config.duplicate_offset.1;
                copy.lock.unlock();
                let new_id = copy.id;
                scene.push(copy);
                Outcome::select(new_id)
            }
            Command::ToggleLock(id) => {
                let object = scene.get_mut(*id).ok_or(CommandError::NotFound(*id))?;
                let locked = object.lock.toggle();
                log::debug!("{id} {}", if locked { "locked" } else { "unlocked" });
                Outcome::changed(true)
            }
            Command::BringToFront(id) => Outcome::changed(scene.bring_to_front(*id)),
            Command::SendToBack(id) => Outcome::changed(scene.send_to_back(*id)),
            Command::BringForward(id) => Outcome::changed(scene.bring_forward(*id)),
            Command::SendBackward(id) => Outcome::changed(scene.send_backward(*id)),
            Command::Delete(id) => {
                scene.remove(*id).ok_or(CommandError::NotFound(*id))?;
                Outcome {
                    changed: true,
                    selection: SelectionChange::Clear,
                }
            }
            Command::Move { id, dx, dy } => {
                let object = scene.get_mut(*id).ok_or(CommandError::NotFound(*id))?;
                object.left += dx;
                object.top += dy;
                Outcome::changed(*dx != 0.0 || *dy != 0.0)
            }
            Command::Style(id, action) => {
                let object = scene.get_mut(*id).ok_or(CommandError::NotFound(*id))?;
                let before = object.clone();
                action.apply(object);
                Outcome::changed(*object != before)
            }
        };
        Ok(outcome)
    }
}

fn shape_prefix(kind: ShapeKind) -> &'static str {
    match kind {
        ShapeKind::Rect | ShapeKind::RoundedRect => "rect",
        ShapeKind::Circle => "circle",
        ShapeKind::Triangle | ShapeKind::Star => "polygon",
        ShapeKind::Text(_) => "text",
    }
}

fn place_image(scene: &SceneDocument, id: ObjectId, src: &str, width: f64, height: f64) -> SceneObject {
    let width = if width > 0.0 { width } else { 100.0 };
    let height = if height > 0.0 { height } else { 100.0 };
    let scale = (scene.width / width).min(scene.height / height).min(1.0);
    let (cx, cy) = scene.center();

    let mut image = SceneObject::new(
        id,
        ObjectKind::Image {
            src: src.to_string(),
            width,
            height,
        },
    );
    image.scale_x = scale;
    image.scale_y = scale;
    image.left = cx - width * scale / 2.0;
    image.top = cy - height * scale / 2.0;
    image.stroke_width = 0.0;
    image
}
