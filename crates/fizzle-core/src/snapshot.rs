//! Snapshot Store: immutable serialized captures of a scene.
//!
//! A snapshot is the bare canvas payload as compact JSON text, carrying no
//! timestamps, so equal scenes always produce byte-equal snapshots.
//! Restoring parses into a brand-new `SceneDocument`; nothing is shared
//! with the scene that was captured.

use crate::document::{CanvasPayload, ExportOptions};
use crate::error::CoreError;
use crate::model::{Color, ObjectKind, Paint, SceneDocument, SceneObject};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Marker key set on placeholder rectangles, naming the replaced type.
pub const PLACEHOLDER_KEY: &str = "placeholderFor";

const PLACEHOLDER_FILL: Color = Color::rgba(240.0 / 255.0, 240.0 / 255.0, 240.0 / 255.0, 1.0);
const PLACEHOLDER_STROKE: Color = Color::rgba(204.0 / 255.0, 204.0 / 255.0, 204.0 / 255.0, 1.0);
const PLACEHOLDER_DEFAULT_SIZE: f64 = 100.0;

#[derive(Clone, PartialEq, Eq)]
pub struct Snapshot(Arc<str>);

impl Snapshot {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap JSON text obtained elsewhere (e.g. persisted history).
    pub fn from_json(text: impl Into<Arc<str>>) -> Self {
        Snapshot(text.into())
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snapshot({} bytes)", self.0.len())
    }
}

/// Capture the scene. Never fails: objects of unsupported types are
/// replaced by placeholder rectangles at their original bounds.
pub fn capture(doc: &SceneDocument) -> Snapshot {
    let mut payload = CanvasPayload::from_scene(doc, ExportOptions::default());
    payload.name = Some(doc.name.clone());
    if let Some(objects) = payload.objects.as_mut() {
        for object in objects.iter_mut() {
            if let ObjectKind::Unsupported { type_name, .. } = &object.kind {
                log::warn!(
                    "capturing unsupported object {} (`{type_name}`) as a placeholder",
                    object.id
                );
                *object = placeholder(object);
            }
        }
    }

    match serde_json::to_string(&payload) {
        Ok(json) => Snapshot(json.into()),
        Err(e) => {
            log::error!("snapshot serialization failed: {e}");
            Snapshot("{}".into())
        }
    }
}

/// Rebuild a fresh scene from a snapshot.
pub fn restore(snapshot: &Snapshot) -> Result<SceneDocument, CoreError> {
    let value: Value = serde_json::from_str(snapshot.as_str())
        .map_err(|e| CoreError::MalformedDocument(e.to_string()))?;
    if !value.get("objects").is_some_and(Value::is_array) {
        return Err(CoreError::MalformedDocument(
            "snapshot has no `objects` list".into(),
        ));
    }
    let payload: CanvasPayload = serde_json::from_value(value)
        .map_err(|e| CoreError::MalformedDocument(e.to_string()))?;
    payload.into_scene()
}

/// Lowest-common-denominator stand-in for an object that cannot be
/// reproduced: a light grey rectangle over the same area, tagged with the
/// original type.
pub fn placeholder(object: &SceneObject) -> SceneObject {
    let (width, height) = object.kind.extent();
    let size = |v: f64| if v > 0.0 { v } else { PLACEHOLDER_DEFAULT_SIZE };

    let mut rect = SceneObject::new(
        object.id,
        ObjectKind::Rect {
            width: size(width),
            height: size(height),
            rx: 0.0,
            ry: 0.0,
        },
    );
    rect.left = object.left;
    rect.top = object.top;
    rect.scale_x = object.scale_x;
    rect.scale_y = object.scale_y;
    rect.angle = object.angle;
    rect.opacity = object.opacity;
    rect.fill = Paint::Solid(PLACEHOLDER_FILL);
    rect.stroke = Paint::Solid(PLACEHOLDER_STROKE);
    rect.stroke_width = 1.0;
    rect.lock = object.lock;
    rect.extra.insert(
        PLACEHOLDER_KEY.into(),
        Value::from(object.kind.type_name()),
    );
    rect
}
