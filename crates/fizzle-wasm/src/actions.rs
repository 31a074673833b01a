//! Toolbar action names from the web UI, mapped onto editor commands.
//!
//! The toolbar sends `(action, value)` pairs where `value` is whatever JSON
//! the control produced: a number for sliders, a string for pickers, an
//! object for the color picker.

use fizzle_core::model::{Paint, TextAlign};
use fizzle_core::shapes::ShapeProps;
use fizzle_editor::shortcuts::ShortcutAction;
use fizzle_editor::{Command, LetterCase, StyleAction};
use fizzle_core::ObjectId;
use serde_json::Value;

/// A parsed toolbar action, not yet bound to an object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectAction {
    Style(StyleAction),
    Duplicate,
    ToggleLock,
    Delete,
    BringToFront,
    SendToBack,
    BringForward,
    SendBackward,
}

impl ObjectAction {
    pub fn into_command(self, id: ObjectId) -> Command {
        match self {
            ObjectAction::Style(style) => Command::Style(id, style),
            ObjectAction::Duplicate => Command::Duplicate(id),
            ObjectAction::ToggleLock => Command::ToggleLock(id),
            ObjectAction::Delete => Command::Delete(id),
            ObjectAction::BringToFront => Command::BringToFront(id),
            ObjectAction::SendToBack => Command::SendToBack(id),
            ObjectAction::BringForward => Command::BringForward(id),
            ObjectAction::SendBackward => Command::SendBackward(id),
        }
    }
}

pub fn parse_object_action(action: &str, value: &Value) -> Option<ObjectAction> {
    let style = |s| Some(ObjectAction::Style(s));
    match action {
        "duplicate" => Some(ObjectAction::Duplicate),
        "lock" | "toggleLock" => Some(ObjectAction::ToggleLock),
        "delete" => Some(ObjectAction::Delete),
        "bringToFront" => Some(ObjectAction::BringToFront),
        "sendToBack" => Some(ObjectAction::SendToBack),
        "bringForward" => Some(ObjectAction::BringForward),
        "sendBackward" => Some(ObjectAction::SendBackward),

        "textStyle" => match value.as_str()? {
            "bold" => style(StyleAction::ToggleBold),
            "italic" => style(StyleAction::ToggleItalic),
            "underline" => style(StyleAction::ToggleUnderline),
            "strikethrough" | "linethrough" => style(StyleAction::ToggleStrikethrough),
            _ => None,
        },
        "textAlign" => style(StyleAction::Align(TextAlign::parse(value.as_str()?))),
        "fontSize" => style(StyleAction::FontSize(number(value)?)),
        "fontFamily" => style(StyleAction::FontFamily(value.as_str()?.to_string())),
        "charSpacing" | "letterSpacing" => style(StyleAction::CharSpacing(number(value)?)),
        "lineHeight" => style(StyleAction::LineHeight(number(value)?)),
        "letterCase" => style(StyleAction::LetterCase(LetterCase::parse(value.as_str()?)?)),
        "resetSpacing" => style(StyleAction::ResetSpacing),

        // `{ "type": "fill" | "stroke", "color": "#rrggbb" }`
        "color" => {
            let paint = Paint::parse(value.get("color")?.as_str()?);
            match value.get("type").and_then(Value::as_str).unwrap_or("fill") {
                "fill" => style(StyleAction::Fill(paint)),
                "stroke" => style(StyleAction::Stroke(paint)),
                _ => None,
            }
        }
        "fill" => style(StyleAction::Fill(Paint::parse(value.as_str()?))),
        "stroke" => style(StyleAction::Stroke(Paint::parse(value.as_str()?))),
        "strokeWidth" => style(StyleAction::StrokeWidth(number(value)?)),
        "opacity" => style(StyleAction::Opacity(number(value)?)),
        "rotate" => style(StyleAction::RotateBy(number(value).unwrap_or(90.0))),
        "flip" => match value.as_str()? {
            "horizontal" => style(StyleAction::FlipHorizontal),
            "vertical" => style(StyleAction::FlipVertical),
            _ => None,
        },
        _ => None,
    }
}

/// Sliders send numbers; text inputs send numeric strings.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Shape creation props from the panel's JSON. Unknown keys are ignored.
pub fn shape_props_from_json(value: &Value) -> ShapeProps {
    let str_field = |key: &str| value.get(key).and_then(Value::as_str);
    let num_field = |key: &str| value.get(key).and_then(number);
    ShapeProps {
        fill: str_field("fill").map(Paint::parse),
        stroke: str_field("stroke").map(Paint::parse),
        stroke_width: num_field("strokeWidth"),
        opacity: num_field("opacity"),
        corner_radius: num_field("cornerRadius").or_else(|| num_field("rx")),
        text: str_field("text").map(str::to_string),
        font_size: num_field("fontSize"),
        font_family: str_field("fontFamily").map(str::to_string),
        font_weight: value
            .get("fontWeight")
            .and_then(fizzle_core::model::parse_font_weight),
        italic: str_field("fontStyle").map(|s| s == "italic"),
        align: str_field("textAlign").map(TextAlign::parse),
    }
}

pub fn action_to_name(action: ShortcutAction) -> &'static str {
    match action {
        ShortcutAction::Undo => "undo",
        ShortcutAction::Redo => "redo",
        ShortcutAction::Duplicate => "duplicate",
        ShortcutAction::Delete => "delete",
        ShortcutAction::ToggleLock => "toggleLock",
        ShortcutAction::Deselect => "deselect",
        ShortcutAction::SendBackward => "sendBackward",
        ShortcutAction::BringForward => "bringForward",
        ShortcutAction::SendToBack => "sendToBack",
        ShortcutAction::BringToFront => "bringToFront",
    }
}
