//! Scene Document JSON: the wrapped project file and the bare canvas form.
//!
//! Wrapped:
//! `{ version, name, createdAt, canvas: { width, height, backgroundColor?,
//! backgroundImage?, objects, version }, metadata: { totalObjects,
//! exportDate, app } }`
//!
//! Bare (also the "pure" export): the inner `canvas` object on its own.
//! [`normalize`] accepts either and always yields the wrapped shape.

use crate::error::CoreError;
use crate::model::{
    Background, BackgroundImage, ImageFit, OBJECT_FORMAT_VERSION, Paint, SceneDocument,
    SceneObject,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const PROJECT_VERSION: &str = "1.0.0";
pub const APP_NAME: &str = "Fizzle";
pub const GENERATED_NAME: &str = "AI Generated Design";
pub const GENERATED_APP_NAME: &str = "Fizzle AI";

/// RFC 3339 timestamp for document metadata.
pub fn timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

// ─── Wire shapes ─────────────────────────────────────────────────────────

/// The canvas payload: bare documents, pure exports and snapshots.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Fabric writes the canvas color as `background`.
    #[serde(default, alias = "background", skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Paint>,
    /// Either `{ src, fit }` or a serialized fabric image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<Value>,
    /// Mandatory. `None` only while validating untrusted input.
    #[serde(default)]
    pub objects: Option<Vec<SceneObject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub total_objects: usize,
    #[serde(default)]
    pub export_date: String,
    #[serde(default)]
    pub app: String,
}

/// The wrapped project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub created_at: String,
    pub canvas: CanvasPayload,
    #[serde(default = "empty_metadata")]
    pub metadata: Metadata,
}

fn default_version() -> String {
    PROJECT_VERSION.to_string()
}

fn default_name() -> String {
    SceneDocument::DEFAULT_NAME.to_string()
}

fn empty_metadata() -> Metadata {
    Metadata {
        total_objects: 0,
        export_date: String::new(),
        app: String::new(),
    }
}

impl ProjectFile {
    pub fn objects(&self) -> &[SceneObject] {
        self.canvas.objects.as_deref().unwrap_or_default()
    }
}

// ─── Background image ────────────────────────────────────────────────────

fn background_image_from_value(value: &Value) -> Option<BackgroundImage> {
    let src = value.get("src").and_then(Value::as_str)?;
    let fit = value
        .get("fit")
        .cloned()
        .and_then(|f| serde_json::from_value::<ImageFit>(f).ok())
        .unwrap_or_default();
    Some(BackgroundImage {
        src: src.to_string(),
        fit,
    })
}

fn background_image_to_value(image: &BackgroundImage) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), Value::from("image"));
    map.insert("src".into(), Value::from(image.src.clone()));
    map.insert(
        "fit".into(),
        serde_json::to_value(image.fit).unwrap_or(Value::Null),
    );
    Value::Object(map)
}

// ─── Scene ⇄ payload ─────────────────────────────────────────────────────

/// What an export carries besides the objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub include_background: bool,
    pub include_background_image: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_background: true,
            include_background_image: true,
        }
    }
}

impl CanvasPayload {
    pub fn from_scene(doc: &SceneDocument, opts: ExportOptions) -> Self {
        Self {
            name: None,
            width: Some(doc.width),
            height: Some(doc.height),
            background_color: doc
                .background
                .color
                .clone()
                .filter(|_| opts.include_background),
            background_image: doc
                .background
                .image
                .as_ref()
                .filter(|_| opts.include_background_image)
                .map(background_image_to_value),
            objects: Some(doc.objects.clone()),
            version: Some(OBJECT_FORMAT_VERSION.to_string()),
        }
    }

    /// Canvas size, when both sides are present and positive.
    pub fn size(&self) -> Option<(f64, f64)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Some((w, h)),
            _ => None,
        }
    }

    /// The canvas color, with a blank value read as absent.
    pub fn background_color(&self) -> Option<Paint> {
        self.background_color.clone().filter(|paint| !paint.is_none())
    }

    pub fn background_image(&self) -> Option<BackgroundImage> {
        self.background_image
            .as_ref()
            .and_then(background_image_from_value)
    }

    /// Build a fresh scene. Fails when the object list is absent.
    pub fn into_scene(self) -> Result<SceneDocument, CoreError> {
        let size = self.size();
        let color = self.background_color();
        let image = self.background_image();
        let objects = self
            .objects
            .ok_or_else(|| CoreError::MalformedDocument("missing `objects` list".into()))?;
        let defaults = SceneDocument::default();
        let (width, height) = size.unwrap_or((defaults.width, defaults.height));
        Ok(SceneDocument {
            name: self.name.unwrap_or(defaults.name),
            width,
            height,
            background: Background { color, image },
            objects,
        })
    }
}

// ─── Export ──────────────────────────────────────────────────────────────

/// Wrap the scene in the project envelope.
pub fn export_project(doc: &SceneDocument, opts: ExportOptions, at: OffsetDateTime) -> ProjectFile {
    let stamp = timestamp(at);
    ProjectFile {
        version: PROJECT_VERSION.to_string(),
        name: doc.name.clone(),
        created_at: stamp.clone(),
        canvas: CanvasPayload::from_scene(doc, opts),
        metadata: Metadata {
            total_objects: doc.objects.len(),
            export_date: stamp,
            app: APP_NAME.to_string(),
        },
    }
}

/// Wrapped export as pretty-printed JSON.
pub fn export_project_json(
    doc: &SceneDocument,
    opts: ExportOptions,
    at: OffsetDateTime,
) -> Result<String, CoreError> {
    Ok(serde_json::to_string_pretty(&export_project(doc, opts, at))?)
}

/// Bare export as pretty-printed JSON.
pub fn export_pure_json(doc: &SceneDocument, opts: ExportOptions) -> Result<String, CoreError> {
    Ok(serde_json::to_string_pretty(&CanvasPayload::from_scene(doc, opts))?)
}

// ─── Import ──────────────────────────────────────────────────────────────

/// Bring any accepted input shape into the wrapped form.
///
/// * an array stands for its first element (the generate endpoint may
///   return a list of designs),
/// * an object with an object-valued `canvas` key is already wrapped,
/// * any other object is bare and gets synthesized metadata.
///
/// Fails with `InvalidDocument` when no object list is present afterwards.
pub fn normalize(value: Value, at: OffsetDateTime) -> Result<ProjectFile, CoreError> {
    let value = match value {
        Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::InvalidDocument("empty design list".into()))?,
        other => other,
    };

    let Value::Object(map) = value else {
        return Err(CoreError::InvalidDocument(
            "expected a JSON object or array".into(),
        ));
    };

    let file = if map.get("canvas").is_some_and(Value::is_object) {
        serde_json::from_value::<ProjectFile>(Value::Object(map))
            .map_err(|e| CoreError::InvalidDocument(e.to_string()))?
    } else {
        let canvas = serde_json::from_value::<CanvasPayload>(Value::Object(map))
            .map_err(|e| CoreError::InvalidDocument(e.to_string()))?;
        wrap_bare(canvas, at)
    };

    if file.canvas.objects.is_none() {
        return Err(CoreError::InvalidDocument(
            "missing `canvas.objects` list".into(),
        ));
    }
    log::debug!(
        "normalized document `{}` with {} objects",
        file.name,
        file.objects().len()
    );
    Ok(file)
}

/// Parse JSON text, then [`normalize`].
pub fn parse_document(text: &str, at: OffsetDateTime) -> Result<ProjectFile, CoreError> {
    let value: Value = serde_json::from_str(text)?;
    normalize(value, at)
}

fn wrap_bare(canvas: CanvasPayload, at: OffsetDateTime) -> ProjectFile {
    let stamp = timestamp(at);
    let total_objects = canvas.objects.as_ref().map_or(0, Vec::len);
    ProjectFile {
        version: PROJECT_VERSION.to_string(),
        name: canvas
            .name
            .clone()
            .unwrap_or_else(|| GENERATED_NAME.to_string()),
        created_at: stamp.clone(),
        canvas,
        metadata: Metadata {
            total_objects,
            export_date: stamp,
            app: GENERATED_APP_NAME.to_string(),
        },
    }
}
